//! Claude Code plugin model and loader.
//!
//! Walks a plugin directory tree (manifest, agents, commands, skills, hook
//! and MCP-server declarations), parses instruction-document frontmatter,
//! and produces the normalized [`types::PluginModel`] that the target
//! converters consume.

pub mod error;
pub mod frontmatter;
pub mod loader;
pub mod naming;
pub mod types;

pub use {
    error::{Error, Result},
    loader::{load_plugin, resolve_plugin_root, resolve_within_root},
    types::PluginModel,
};

//! Plugin data model.
//!
//! Everything here is built once by the loader and never mutated
//! afterwards; converters take the model by reference.

use std::{collections::BTreeMap, path::PathBuf};

use serde::Deserialize;

// ── Manifest ────────────────────────────────────────────────────────────────

/// Parsed `.claude-plugin/plugin.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Extra agent document paths beyond the default `agents/` directory.
    #[serde(default)]
    pub agents: Option<PathList>,
    /// Extra command document paths beyond the default `commands/` directory.
    #[serde(default)]
    pub commands: Option<PathList>,
    /// Extra skill paths beyond the default `skills/` directory.
    #[serde(default)]
    pub skills: Option<PathList>,
    /// Hook declarations: file path(s) or an inline config object.
    #[serde(default)]
    pub hooks: Option<HooksField>,
    /// Tool server declarations: file path(s) or an inline server map.
    #[serde(default, rename = "mcpServers")]
    pub mcp_servers: Option<ToolServersField>,
}

/// One path or several; manifests accept both spellings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PathList {
    One(String),
    Many(Vec<String>),
}

impl PathList {
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::One(path) => std::slice::from_ref(path),
            Self::Many(paths) => paths,
        }
    }
}

/// The manifest `hooks` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HooksField {
    Path(String),
    Paths(Vec<String>),
    Inline(HookConfig),
}

/// The manifest `mcpServers` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ToolServersField {
    Path(String),
    Paths(Vec<String>),
    Inline(BTreeMap<String, ToolServer>),
}

// ── Hooks ───────────────────────────────────────────────────────────────────

/// Hook declarations keyed by source event name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookConfig {
    #[serde(default)]
    pub hooks: BTreeMap<String, Vec<HookMatcher>>,
}

/// A tool-name pattern plus the actions it triggers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookMatcher {
    /// Pipe-separated tool names, case-insensitive; `*` or absent matches any.
    #[serde(default)]
    pub matcher: Option<String>,
    #[serde(default)]
    pub hooks: Vec<HookAction>,
}

/// One action attached to a hook matcher.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawHookAction")]
pub enum HookAction {
    /// Shell command execution, with an optional advisory timeout in seconds.
    Command {
        command: String,
        timeout: Option<u64>,
    },
    /// Prompt injection; surfaced as a comment in generated output.
    Prompt { prompt: String },
    /// Delegation to a named agent; surfaced as a comment in generated output.
    AgentDelegate { agent: String },
    /// Anything with an unknown `type`.
    Unrecognized { kind: String },
}

#[derive(Deserialize)]
struct RawHookAction {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    timeout: Option<u64>,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    agent: Option<String>,
}

impl From<RawHookAction> for HookAction {
    fn from(raw: RawHookAction) -> Self {
        match raw.kind.as_str() {
            "command" => Self::Command {
                command: raw.command.unwrap_or_default(),
                timeout: raw.timeout,
            },
            "prompt" => Self::Prompt {
                prompt: raw.prompt.unwrap_or_default(),
            },
            "agent" => Self::AgentDelegate {
                agent: raw.agent.unwrap_or_default(),
            },
            _ => Self::Unrecognized { kind: raw.kind },
        }
    }
}

// ── Tool servers ────────────────────────────────────────────────────────────

/// A declared tool server: a spawned local process or a remote endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ToolServer {
    Local {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: BTreeMap<String, String>,
    },
    Remote {
        url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
}

// ── Components ──────────────────────────────────────────────────────────────

/// A delegated agent definition.
#[derive(Debug, Clone, Default)]
pub struct Agent {
    pub name: String,
    pub description: Option<String>,
    pub capabilities: Vec<String>,
    pub model: Option<String>,
    pub body: String,
    pub source_path: PathBuf,
}

/// A user-invocable command document.
#[derive(Debug, Clone, Default)]
pub struct Command {
    pub name: String,
    pub description: Option<String>,
    pub argument_hint: Option<String>,
    pub model: Option<String>,
    /// Declared tool grants, each `tool` or `tool(pattern)`.
    pub allowed_tools: Option<Vec<String>>,
    pub disable_model_invocation: Option<bool>,
    pub body: String,
    pub source_path: PathBuf,
}

/// A skill: command metadata plus a supporting directory.
#[derive(Debug, Clone, Default)]
pub struct Skill {
    pub name: String,
    pub description: Option<String>,
    pub argument_hint: Option<String>,
    pub model: Option<String>,
    pub allowed_tools: Option<Vec<String>>,
    pub disable_model_invocation: Option<bool>,
    /// Absent means invocable.
    pub user_invocable: Option<bool>,
    /// Target platform tags restricting where the skill installs.
    pub platforms: Option<Vec<String>>,
    pub body: String,
    pub source_dir: PathBuf,
    pub source_path: PathBuf,
}

// ── Plugin model ────────────────────────────────────────────────────────────

/// A loaded plugin.
#[derive(Debug, Clone)]
pub struct PluginModel {
    pub root: PathBuf,
    pub manifest: PluginManifest,
    pub agents: Vec<Agent>,
    /// Effective command set: legacy commands plus user-invocable skills,
    /// deduplicated by normalized name with first-seen precedence.
    pub commands: Vec<Command>,
    pub skills: Vec<Skill>,
    pub hooks: Option<HookConfig>,
    pub mcp_servers: Option<BTreeMap<String, ToolServer>>,
}

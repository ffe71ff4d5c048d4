//! Target converters.
//!
//! Consume a loaded [`PluginModel`] and produce an in-memory bundle for one
//! target platform. Converters are pure: all filesystem work happens in the
//! loader before and the installer after.

pub mod codex;
pub mod hooks;
pub mod opencode;
pub mod permissions;
pub mod rewrite;

use std::{collections::HashSet, path::PathBuf, str::FromStr};

use replug_plugin::{
    PluginModel,
    naming::normalize_name,
    types::{Command, Skill},
};

pub use {
    codex::CodexBundle,
    opencode::OpenCodeBundle,
    permissions::PermissionMode,
};

// ── Targets and options ─────────────────────────────────────────────────────

/// A supported conversion target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    OpenCode,
    Codex,
}

impl Target {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenCode => "opencode",
            Self::Codex => "codex",
        }
    }
}

impl FromStr for Target {
    type Err = UnknownTarget;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "opencode" => Ok(Self::OpenCode),
            "codex" => Ok(Self::Codex),
            other => Err(UnknownTarget(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown target: {0}")]
pub struct UnknownTarget(String);

/// Whether generated agents act as primary agents or subagents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AgentMode {
    Primary,
    #[default]
    Subagent,
}

impl AgentMode {
    /// Anything that isn't exactly `primary` means subagent.
    pub fn parse(value: &str) -> Self {
        if value == "primary" {
            Self::Primary
        } else {
            Self::Subagent
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Subagent => "subagent",
        }
    }
}

/// Conversion knobs shared by every target.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub agent_mode: AgentMode,
    pub infer_temperature: bool,
    pub permissions: PermissionMode,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            agent_mode: AgentMode::Subagent,
            infer_temperature: true,
            permissions: PermissionMode::Broad,
        }
    }
}

// ── Bundles ─────────────────────────────────────────────────────────────────

/// A rendered document ready to be written under a target root.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDoc {
    pub name: String,
    pub content: String,
}

/// A skill directory to copy verbatim into a target root.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillDirCopy {
    pub name: String,
    pub source_dir: PathBuf,
}

/// The per-target conversion output handed to the installer.
#[derive(Debug, Clone)]
pub enum Bundle {
    OpenCode(OpenCodeBundle),
    Codex(CodexBundle),
}

/// Convert a loaded plugin for one target.
pub fn convert(plugin: &PluginModel, target: Target, options: &ConvertOptions) -> Bundle {
    match target {
        Target::OpenCode => Bundle::OpenCode(opencode::convert(plugin, options)),
        Target::Codex => Bundle::Codex(codex::convert(plugin, options)),
    }
}

// ── Platform filtering ──────────────────────────────────────────────────────

/// Drop skills whose platform tags exclude `platform`, along with any
/// effective command derived from them.
pub(crate) fn filter_by_platform<'a>(
    skills: &'a [Skill],
    commands: &'a [Command],
    platform: &str,
) -> (Vec<&'a Skill>, Vec<&'a Command>) {
    let excluded: HashSet<String> = skills
        .iter()
        .filter(|skill| {
            skill
                .platforms
                .as_ref()
                .is_some_and(|tags| !tags.iter().any(|tag| tag == platform))
        })
        .map(|skill| normalize_name(&skill.name))
        .collect();

    if excluded.is_empty() {
        return (skills.iter().collect(), commands.iter().collect());
    }

    (
        skills
            .iter()
            .filter(|skill| !excluded.contains(&normalize_name(&skill.name)))
            .collect(),
        commands
            .iter()
            .filter(|command| !excluded.contains(&normalize_name(&command.name)))
            .collect(),
    )
}

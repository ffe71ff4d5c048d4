//! Codex target conversion.
//!
//! Everything becomes a skill document: effective commands and agents each
//! render as a generated `SKILL.md`, non-invocable skills copy through as
//! library material, and the tool-server map renders as `config.toml`.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use replug_plugin::{
    PluginModel,
    frontmatter,
    naming::{NamePool, slug},
    types::{Agent, Command, ToolServer},
};

use crate::{ConvertOptions, GeneratedDoc, SkillDirCopy, filter_by_platform, rewrite::rewrite_body};

/// Generated descriptions are capped to keep skill headers scannable.
const DESCRIPTION_MAX_LENGTH: usize = 1024;

/// Everything to install for the Codex target.
#[derive(Debug, Clone)]
pub struct CodexBundle {
    /// Library skills copied verbatim (the not-user-invocable ones).
    pub skill_dirs: Vec<SkillDirCopy>,
    /// One generated skill per effective command.
    pub command_skills: Vec<GeneratedDoc>,
    /// One generated skill per agent, installed under the agents home.
    pub agent_skills: Vec<GeneratedDoc>,
    pub servers: Option<BTreeMap<String, ToolServer>>,
}

pub fn convert(plugin: &PluginModel, _options: &ConvertOptions) -> CodexBundle {
    let (skills, commands) = filter_by_platform(&plugin.skills, &plugin.commands, "codex");

    let skill_dirs: Vec<SkillDirCopy> = skills
        .iter()
        .filter(|skill| skill.user_invocable == Some(false))
        .map(|skill| SkillDirCopy {
            name: skill.name.clone(),
            source_dir: skill.source_dir.clone(),
        })
        .collect();

    // One shared pool keeps every generated name distinct across the run.
    let mut pool = NamePool::new();
    for dir in &skill_dirs {
        pool.reserve(slug(&dir.name));
    }

    let command_names: Vec<String> = commands
        .iter()
        .map(|command| pool.claim(&slug(&command.name)))
        .collect();
    let known_commands: HashSet<String> = command_names.iter().cloned().collect();
    let command_skills = commands
        .iter()
        .zip(&command_names)
        .map(|(command, name)| convert_command_skill(command, name.clone(), &known_commands))
        .collect();

    let agent_skills = plugin
        .agents
        .iter()
        .map(|agent| convert_agent_skill(agent, &mut pool))
        .collect();

    CodexBundle {
        skill_dirs,
        command_skills,
        agent_skills,
        servers: plugin.mcp_servers.clone(),
    }
}

fn convert_command_skill(
    command: &Command,
    name: String,
    known_commands: &HashSet<String>,
) -> GeneratedDoc {
    let description = sanitize_description(
        command
            .description
            .clone()
            .unwrap_or_else(|| format!("Converted from Claude command {}", command.name)),
    );

    let mut fields: Vec<(String, Value)> = vec![
        ("name".to_string(), Value::String(name.clone())),
        ("description".to_string(), Value::String(description)),
    ];
    if let Some(hint) = &command.argument_hint {
        fields.push(("argument-hint".to_string(), Value::String(hint.clone())));
    }
    if let Some(disable) = command.disable_model_invocation {
        fields.push(("disable-model-invocation".to_string(), Value::Bool(disable)));
    }

    let mut sections: Vec<String> = Vec::new();
    if let Some(tools) = command.allowed_tools.as_ref().filter(|tools| !tools.is_empty()) {
        let lines: Vec<String> = tools.iter().map(|tool| format!("- {tool}")).collect();
        sections.push(format!("## Allowed tools\n{}", lines.join("\n")));
    }
    let transformed = rewrite_body(command.body.trim(), known_commands);
    if !transformed.is_empty() {
        sections.push(transformed);
    }

    let body = sections.join("\n\n").trim().to_string();
    let body = if body.is_empty() {
        command.body.clone()
    } else {
        body
    };

    GeneratedDoc {
        content: frontmatter::render(&fields, &body),
        name,
    }
}

fn convert_agent_skill(agent: &Agent, pool: &mut NamePool) -> GeneratedDoc {
    let name = pool.claim(&slug(&agent.name));
    let description = sanitize_description(
        agent
            .description
            .clone()
            .unwrap_or_else(|| format!("Converted from Claude agent {}", agent.name)),
    );
    let fields: Vec<(String, Value)> = vec![
        ("name".to_string(), Value::String(name.clone())),
        ("description".to_string(), Value::String(description)),
    ];

    let mut body = agent.body.trim().to_string();
    if !agent.capabilities.is_empty() {
        let lines: Vec<String> = agent
            .capabilities
            .iter()
            .map(|capability| format!("- {capability}"))
            .collect();
        body = format!("## Capabilities\n{}\n\n{body}", lines.join("\n"))
            .trim()
            .to_string();
    }
    if body.is_empty() {
        body = format!("Instructions converted from the {} agent.", agent.name);
    }

    GeneratedDoc {
        content: frontmatter::render(&fields, &body),
        name,
    }
}

/// Collapse whitespace and cap the length, ellipsizing overlong text.
pub fn sanitize_description(value: String) -> String {
    let normalized = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.chars().count() <= DESCRIPTION_MAX_LENGTH {
        return normalized;
    }
    let truncated: String = normalized.chars().take(DESCRIPTION_MAX_LENGTH - 3).collect();
    format!("{}...", truncated.trim_end())
}

// ── Config rendering ────────────────────────────────────────────────────────

/// Render the tool-server map as a Codex `config.toml`.
///
/// Relaxed rendering: bare keys unless they need quoting, escaped strings,
/// a nested table for a local server's environment, an inline table for
/// remote headers. Returns `None` when there is nothing to render.
pub fn render_config_toml(servers: &BTreeMap<String, ToolServer>) -> Option<String> {
    if servers.is_empty() {
        return None;
    }

    let mut lines = vec!["# Generated by replug".to_string(), String::new()];
    for (name, server) in servers {
        let key = toml_key(name);
        lines.push(format!("[mcp_servers.{key}]"));
        match server {
            ToolServer::Local { command, args, env } => {
                lines.push(format!("command = {}", toml_string(command)));
                if !args.is_empty() {
                    let rendered: Vec<String> = args.iter().map(|arg| toml_string(arg)).collect();
                    lines.push(format!("args = [{}]", rendered.join(", ")));
                }
                if !env.is_empty() {
                    lines.push(String::new());
                    lines.push(format!("[mcp_servers.{key}.env]"));
                    for (env_key, value) in env {
                        lines.push(format!("{} = {}", toml_key(env_key), toml_string(value)));
                    }
                }
            },
            ToolServer::Remote { url, headers } => {
                lines.push(format!("url = {}", toml_string(url)));
                if !headers.is_empty() {
                    lines.push(format!("http_headers = {}", toml_inline_table(headers)));
                }
            },
        }
        lines.push(String::new());
    }

    Some(lines.join("\n"))
}

fn toml_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

fn toml_key(value: &str) -> String {
    let bare = !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if bare {
        value.to_string()
    } else {
        toml_string(value)
    }
}

fn toml_inline_table(entries: &BTreeMap<String, String>) -> String {
    let parts: Vec<String> = entries
        .iter()
        .map(|(key, value)| format!("{} = {}", toml_key(key), toml_string(value)))
        .collect();
    format!("{{ {} }}", parts.join(", "))
}

//! OpenCode target conversion.
//!
//! Produces the `opencode.json` config payload, one generated agent
//! document per agent, the rendered hook plugin, and the list of skill
//! directories to copy.

use std::collections::BTreeMap;

use {serde::Serialize, serde_json::Value};

use replug_plugin::{
    PluginModel,
    frontmatter,
    types::{Agent, Command, ToolServer},
};

use crate::{
    ConvertOptions, GeneratedDoc, SkillDirCopy, filter_by_platform,
    hooks::convert_hooks,
    permissions::{self, PermissionRule, ToolPolicy},
};

pub const CONFIG_SCHEMA: &str = "https://opencode.ai/config.json";

// ── Config shapes ───────────────────────────────────────────────────────────

/// The generated `opencode.json` payload. Empty sections are omitted.
#[derive(Debug, Clone, Serialize)]
pub struct OpenCodeConfig {
    #[serde(rename = "$schema")]
    pub schema: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<BTreeMap<String, CommandEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp: Option<BTreeMap<String, ServerEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<BTreeMap<String, PermissionRule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<BTreeMap<String, bool>>,
}

/// A command template entry.
#[derive(Debug, Clone, Serialize)]
pub struct CommandEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// A tool server split into the target's local/remote shapes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEntry {
    Local {
        command: Vec<String>,
        #[serde(skip_serializing_if = "BTreeMap::is_empty")]
        environment: BTreeMap<String, String>,
        enabled: bool,
    },
    Remote {
        url: String,
        #[serde(skip_serializing_if = "BTreeMap::is_empty")]
        headers: BTreeMap<String, String>,
        enabled: bool,
    },
}

/// Everything to install for the OpenCode target.
#[derive(Debug, Clone)]
pub struct OpenCodeBundle {
    pub config: OpenCodeConfig,
    pub agents: Vec<GeneratedDoc>,
    pub plugins: Vec<GeneratedDoc>,
    pub skill_dirs: Vec<SkillDirCopy>,
}

// ── Conversion ──────────────────────────────────────────────────────────────

pub fn convert(plugin: &PluginModel, options: &ConvertOptions) -> OpenCodeBundle {
    let (skills, commands) = filter_by_platform(&plugin.skills, &plugin.commands, "opencode");

    let agents = plugin
        .agents
        .iter()
        .map(|agent| convert_agent(agent, options))
        .collect();
    let command_map = convert_commands(&commands);
    let mcp = plugin
        .mcp_servers
        .as_ref()
        .map(convert_servers)
        .filter(|servers| !servers.is_empty());
    let plugins = plugin
        .hooks
        .as_ref()
        .map(|hooks| vec![convert_hooks(hooks)])
        .unwrap_or_default();

    let (permission, tools) = match permissions::synthesize(&commands, options.permissions) {
        Some(ToolPolicy { tools, permission }) => (Some(permission), Some(tools)),
        None => (None, None),
    };

    OpenCodeBundle {
        config: OpenCodeConfig {
            schema: CONFIG_SCHEMA.to_string(),
            command: (!command_map.is_empty()).then_some(command_map),
            mcp,
            permission,
            tools,
        },
        agents,
        plugins,
        skill_dirs: skills
            .iter()
            .map(|skill| SkillDirCopy {
                name: skill.name.clone(),
                source_dir: skill.source_dir.clone(),
            })
            .collect(),
    }
}

fn convert_agent(agent: &Agent, options: &ConvertOptions) -> GeneratedDoc {
    let mut fields: Vec<(String, Value)> = Vec::new();
    if let Some(description) = &agent.description {
        fields.push(("description".to_string(), Value::String(description.clone())));
    }
    fields.push((
        "mode".to_string(),
        Value::String(options.agent_mode.as_str().to_string()),
    ));
    if let Some(model) = agent.model.as_deref().filter(|model| *model != "inherit") {
        fields.push(("model".to_string(), Value::String(normalize_model(model))));
    }
    if options.infer_temperature {
        fields.push(("temperature".to_string(), number(infer_temperature(agent))));
    }

    GeneratedDoc {
        name: agent.name.clone(),
        content: frontmatter::render(&fields, &agent.body),
    }
}

fn convert_commands(commands: &[&Command]) -> BTreeMap<String, CommandEntry> {
    commands
        .iter()
        .map(|command| {
            let entry = CommandEntry {
                description: command.description.clone(),
                template: command.body.clone(),
                model: command
                    .model
                    .as_deref()
                    .filter(|model| *model != "inherit")
                    .map(normalize_model),
            };
            (command.name.clone(), entry)
        })
        .collect()
}

fn convert_servers(servers: &BTreeMap<String, ToolServer>) -> BTreeMap<String, ServerEntry> {
    servers
        .iter()
        .map(|(name, server)| {
            let entry = match server {
                ToolServer::Local { command, args, env } => ServerEntry::Local {
                    command: std::iter::once(command.clone())
                        .chain(args.iter().cloned())
                        .collect(),
                    environment: env.clone(),
                    enabled: true,
                },
                ToolServer::Remote { url, headers } => ServerEntry::Remote {
                    url: url.clone(),
                    headers: headers.clone(),
                    enabled: true,
                },
            };
            (name.clone(), entry)
        })
        .collect()
}

// ── Model and temperature inference ─────────────────────────────────────────

/// Qualify a bare model id with its provider prefix. Ids already carrying a
/// provider pass through.
pub fn normalize_model(model: &str) -> String {
    if model.contains('/') {
        return model.to_string();
    }
    let provider = if model.starts_with("claude-") {
        "anthropic"
    } else if model.starts_with("gpt-") || model.starts_with("o1-") || model.starts_with("o3-") {
        "openai"
    } else if model.starts_with("gemini-") {
        "google"
    } else {
        "anthropic"
    };
    format!("{provider}/{model}")
}

const REVIEW_TERMS: &[&str] = &[
    "review",
    "audit",
    "security",
    "sentinel",
    "oracle",
    "lint",
    "verification",
    "guardian",
];
const PLANNING_TERMS: &[&str] = &[
    "plan",
    "planning",
    "architecture",
    "strategist",
    "analysis",
    "research",
];
const WRITING_TERMS: &[&str] = &["doc", "readme", "changelog", "editor", "writer"];
const CREATIVE_TERMS: &[&str] = &["brainstorm", "creative", "ideate", "design", "concept"];

/// Keyword classifier over name + description; first matching rule wins.
pub fn infer_temperature(agent: &Agent) -> f64 {
    let sample = format!(
        "{} {}",
        agent.name,
        agent.description.as_deref().unwrap_or_default()
    )
    .to_lowercase();

    let matches = |terms: &[&str]| terms.iter().any(|term| sample.contains(term));
    if matches(REVIEW_TERMS) {
        0.1
    } else if matches(PLANNING_TERMS) {
        0.2
    } else if matches(WRITING_TERMS) {
        0.3
    } else if matches(CREATIVE_TERMS) {
        0.6
    } else {
        0.3
    }
}

fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        replug_plugin::types::{HookAction, HookConfig, HookMatcher, PluginManifest, Skill},
        rstest::rstest,
    };

    use {super::*, crate::PermissionMode};

    fn model_with(
        agents: Vec<Agent>,
        commands: Vec<Command>,
        skills: Vec<Skill>,
    ) -> PluginModel {
        PluginModel {
            root: "/plugins/demo".into(),
            manifest: PluginManifest {
                name: "demo".to_string(),
                ..Default::default()
            },
            agents,
            commands,
            skills,
            hooks: None,
            mcp_servers: None,
        }
    }

    #[rstest]
    #[case("claude-sonnet-4", "anthropic/claude-sonnet-4")]
    #[case("gpt-5", "openai/gpt-5")]
    #[case("o3-mini", "openai/o3-mini")]
    #[case("gemini-2.0-flash", "google/gemini-2.0-flash")]
    #[case("mystery-model", "anthropic/mystery-model")]
    #[case("openrouter/some-model", "openrouter/some-model")]
    fn model_normalization(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_model(input), expected);
    }

    #[rstest]
    #[case("security-reviewer", "Audits pull requests", 0.1)]
    #[case("roadmap-strategist", "Plans the quarter", 0.2)]
    #[case("changelog-writer", "Writes release docs", 0.3)]
    #[case("idea-machine", "Brainstorms concepts", 0.6)]
    #[case("helper", "Does chores", 0.3)]
    fn temperature_inference(#[case] name: &str, #[case] description: &str, #[case] expected: f64) {
        let agent = Agent {
            name: name.to_string(),
            description: Some(description.to_string()),
            ..Default::default()
        };
        assert_eq!(infer_temperature(&agent), expected);
    }

    #[test]
    fn agent_document_carries_mode_model_and_temperature() {
        let agent = Agent {
            name: "security-reviewer".to_string(),
            description: Some("Audits pull requests".to_string()),
            model: Some("claude-sonnet-4".to_string()),
            body: "Look closely.".to_string(),
            ..Default::default()
        };
        let bundle = convert(&model_with(vec![agent], vec![], vec![]), &ConvertOptions::default());

        assert_eq!(bundle.agents.len(), 1);
        let doc = &bundle.agents[0];
        assert_eq!(doc.name, "security-reviewer");
        assert!(doc.content.contains("description: Audits pull requests"));
        assert!(doc.content.contains("mode: subagent"));
        assert!(doc.content.contains("model: anthropic/claude-sonnet-4"));
        assert!(doc.content.contains("temperature: 0.1"));
        assert!(doc.content.ends_with("Look closely."));
    }

    #[test]
    fn inherit_model_is_omitted() {
        let agent = Agent {
            name: "helper".to_string(),
            model: Some("inherit".to_string()),
            body: "Help.".to_string(),
            ..Default::default()
        };
        let options = ConvertOptions {
            infer_temperature: false,
            ..Default::default()
        };
        let bundle = convert(&model_with(vec![agent], vec![], vec![]), &options);
        assert!(!bundle.agents[0].content.contains("model:"));
        assert!(!bundle.agents[0].content.contains("temperature:"));
    }

    #[test]
    fn config_omits_empty_sections() {
        let bundle = convert(&model_with(vec![], vec![], vec![]), &ConvertOptions::default());
        let json = serde_json::to_value(&bundle.config).unwrap();

        assert_eq!(json["$schema"], CONFIG_SCHEMA);
        assert!(json.get("command").is_none());
        assert!(json.get("mcp").is_none());
        // Broad mode still emits the policy sections.
        assert_eq!(json["tools"]["bash"], true);
        assert_eq!(json["permission"]["bash"], "allow");
    }

    #[test]
    fn none_mode_omits_policy_sections() {
        let options = ConvertOptions {
            permissions: PermissionMode::None,
            ..Default::default()
        };
        let bundle = convert(&model_with(vec![], vec![], vec![]), &options);
        let json = serde_json::to_value(&bundle.config).unwrap();
        assert!(json.get("permission").is_none());
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn commands_become_template_entries() {
        let command = Command {
            name: "deploy".to_string(),
            description: Some("Ship it".to_string()),
            model: Some("gpt-5".to_string()),
            body: "Run the deploy steps.".to_string(),
            ..Default::default()
        };
        let bundle = convert(&model_with(vec![], vec![command], vec![]), &ConvertOptions::default());
        let json = serde_json::to_value(&bundle.config).unwrap();

        assert_eq!(json["command"]["deploy"]["description"], "Ship it");
        assert_eq!(json["command"]["deploy"]["template"], "Run the deploy steps.");
        assert_eq!(json["command"]["deploy"]["model"], "openai/gpt-5");
    }

    #[test]
    fn servers_split_into_local_and_remote() {
        let mut model = model_with(vec![], vec![], vec![]);
        model.mcp_servers = Some(
            [
                (
                    "files".to_string(),
                    ToolServer::Local {
                        command: "mcp-files".to_string(),
                        args: vec!["--root".to_string(), ".".to_string()],
                        env: [("DEBUG".to_string(), "1".to_string())].into_iter().collect(),
                    },
                ),
                (
                    "docs".to_string(),
                    ToolServer::Remote {
                        url: "https://docs.example.com/mcp".to_string(),
                        headers: BTreeMap::new(),
                    },
                ),
            ]
            .into_iter()
            .collect(),
        );

        let bundle = convert(&model, &ConvertOptions::default());
        let json = serde_json::to_value(&bundle.config).unwrap();

        assert_eq!(json["mcp"]["files"]["type"], "local");
        assert_eq!(
            json["mcp"]["files"]["command"],
            serde_json::json!(["mcp-files", "--root", "."])
        );
        assert_eq!(json["mcp"]["files"]["environment"]["DEBUG"], "1");
        assert_eq!(json["mcp"]["files"]["enabled"], true);
        assert_eq!(json["mcp"]["docs"]["type"], "remote");
        assert_eq!(json["mcp"]["docs"]["url"], "https://docs.example.com/mcp");
        assert!(json["mcp"]["docs"].get("headers").is_none());
    }

    #[test]
    fn hooks_produce_one_plugin_document() {
        let mut model = model_with(vec![], vec![], vec![]);
        let mut hooks = HookConfig::default();
        hooks.hooks.insert(
            "PreToolUse".to_string(),
            vec![HookMatcher {
                matcher: Some("*".to_string()),
                hooks: vec![HookAction::Command {
                    command: "echo hi".to_string(),
                    timeout: None,
                }],
            }],
        );
        model.hooks = Some(hooks);

        let bundle = convert(&model, &ConvertOptions::default());
        assert_eq!(bundle.plugins.len(), 1);
        assert_eq!(bundle.plugins[0].name, "converted-hooks.ts");
    }

    #[test]
    fn platform_excluded_skill_is_dropped_with_its_command() {
        let skill = Skill {
            name: "codex-only".to_string(),
            platforms: Some(vec!["codex".to_string()]),
            source_dir: "/plugins/demo/skills/codex-only".into(),
            ..Default::default()
        };
        let command = Command {
            name: "codex-only".to_string(),
            body: "Codex things.".to_string(),
            ..Default::default()
        };
        let bundle = convert(&model_with(vec![], vec![command], vec![skill]), &ConvertOptions::default());

        assert!(bundle.skill_dirs.is_empty());
        assert!(bundle.config.command.is_none());
    }
}

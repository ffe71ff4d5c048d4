//! Tool-access policy synthesis.

use std::{
    collections::{BTreeMap, BTreeSet},
    str::FromStr,
};

use serde::Serialize;

use replug_plugin::types::Command;

/// Tool identities known on the target side. Specs naming anything else
/// are dropped.
pub const KNOWN_TOOLS: &[&str] = &[
    "read",
    "write",
    "edit",
    "bash",
    "grep",
    "glob",
    "list",
    "webfetch",
    "skill",
    "patch",
    "task",
    "question",
    "todowrite",
    "todoread",
];

// ── Modes ───────────────────────────────────────────────────────────────────

/// How tool access is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PermissionMode {
    /// No policy at all.
    None,
    /// Every known tool gets an unconditional allow.
    #[default]
    Broad,
    /// Grants derived from per-command allowed-tool specs.
    FromCommands,
}

impl PermissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Broad => "broad",
            Self::FromCommands => "from-commands",
        }
    }
}

impl FromStr for PermissionMode {
    type Err = UnknownPermissionMode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "none" => Ok(Self::None),
            "broad" => Ok(Self::Broad),
            "from-commands" => Ok(Self::FromCommands),
            other => Err(UnknownPermissionMode(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown permissions mode: {0}")]
pub struct UnknownPermissionMode(String);

// ── Policy shapes ───────────────────────────────────────────────────────────

/// Allow or deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny,
}

/// Per-tool rule: a flat decision, or a pattern table with a wildcard
/// default.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PermissionRule {
    Flat(Decision),
    Patterns(BTreeMap<String, Decision>),
}

/// The synthesized policy: enabled-tool map plus per-tool rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolPolicy {
    pub tools: BTreeMap<String, bool>,
    pub permission: BTreeMap<String, PermissionRule>,
}

// ── Synthesis ───────────────────────────────────────────────────────────────

/// Derive the tool policy for the effective command set. `None` mode
/// produces no policy.
pub fn synthesize(commands: &[&Command], mode: PermissionMode) -> Option<ToolPolicy> {
    if mode == PermissionMode::None {
        return None;
    }

    let mut enabled: BTreeSet<&str> = BTreeSet::new();
    let mut patterns: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();

    if mode == PermissionMode::Broad {
        enabled.extend(KNOWN_TOOLS);
    } else {
        let mut has_declaration = false;
        for command in commands {
            let Some(specs) = &command.allowed_tools else {
                continue;
            };
            has_declaration = true;
            for spec in specs {
                let Some((tool, pattern)) = parse_tool_spec(spec) else {
                    continue;
                };
                enabled.insert(tool);
                if let Some(pattern) = pattern {
                    patterns
                        .entry(tool)
                        .or_default()
                        .insert(normalize_pattern(tool, &pattern));
                }
            }
        }
        // Plugins that never declared per-command grants stay usable.
        if !has_declaration {
            enabled.extend(KNOWN_TOOLS);
        }
    }

    let mut tools = BTreeMap::new();
    let mut permission = BTreeMap::new();
    for tool in KNOWN_TOOLS {
        tools.insert(tool.to_string(), enabled.contains(tool));

        let rule = if mode == PermissionMode::Broad {
            PermissionRule::Flat(Decision::Allow)
        } else {
            match patterns.get(tool) {
                Some(set) if !set.is_empty() => PermissionRule::Patterns(pattern_table(set)),
                _ => PermissionRule::Flat(if enabled.contains(tool) {
                    Decision::Allow
                } else {
                    Decision::Deny
                }),
            }
        };
        permission.insert(tool.to_string(), rule);
    }

    // File-mutation tools are one capability: write and edit share grants.
    if enabled.contains("write") || enabled.contains("edit") {
        for tool in ["write", "edit"] {
            if let Some(PermissionRule::Flat(decision)) = permission.get_mut(tool) {
                *decision = Decision::Allow;
            }
        }
    }
    let mut combined: BTreeSet<String> = BTreeSet::new();
    for tool in ["write", "edit"] {
        if let Some(set) = patterns.get(tool) {
            combined.extend(set.iter().cloned());
        }
    }
    if !combined.is_empty() {
        let table = PermissionRule::Patterns(pattern_table(&combined));
        permission.insert("write".to_string(), table.clone());
        permission.insert("edit".to_string(), table);
    }

    Some(ToolPolicy { tools, permission })
}

fn pattern_table(patterns: &BTreeSet<String>) -> BTreeMap<String, Decision> {
    let mut table = BTreeMap::new();
    table.insert("*".to_string(), Decision::Deny);
    for pattern in patterns {
        table.insert(pattern.clone(), Decision::Allow);
    }
    table
}

/// Parse `name` or `name(pattern)`; unknown tool names drop out.
fn parse_tool_spec(raw: &str) -> Option<(&'static str, Option<String>)> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (name, pattern) = match trimmed.split_once('(') {
        Some((name, rest)) => {
            let pattern = rest.strip_suffix(')').unwrap_or(rest).trim().to_string();
            (name, Some(pattern))
        },
        None => (trimmed, None),
    };
    let name = name.trim().to_lowercase();
    let tool = KNOWN_TOOLS.iter().find(|known| **known == name).copied()?;
    Some((tool, pattern))
}

/// Shell patterns swap colon separators for spaces.
fn normalize_pattern(tool: &str, pattern: &str) -> String {
    if tool == "bash" {
        pattern.replace(':', " ").trim().to_string()
    } else {
        pattern.to_string()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn command_with_tools(specs: Option<Vec<&str>>) -> Command {
        Command {
            name: "test".to_string(),
            allowed_tools: specs.map(|list| list.into_iter().map(String::from).collect()),
            ..Default::default()
        }
    }

    fn synthesize_one(specs: Option<Vec<&str>>, mode: PermissionMode) -> Option<ToolPolicy> {
        let command = command_with_tools(specs);
        synthesize(&[&command], mode)
    }

    #[test]
    fn none_mode_produces_no_policy() {
        assert!(synthesize_one(Some(vec!["bash"]), PermissionMode::None).is_none());
    }

    #[test]
    fn broad_enables_everything_with_flat_allow() {
        let policy = synthesize_one(None, PermissionMode::Broad).unwrap();
        assert_eq!(policy.tools.len(), KNOWN_TOOLS.len());
        for tool in KNOWN_TOOLS {
            assert_eq!(policy.tools[*tool], true);
            assert_eq!(
                policy.permission[*tool],
                PermissionRule::Flat(Decision::Allow)
            );
        }
    }

    #[test]
    fn from_commands_without_declarations_matches_broad() {
        let broad = synthesize_one(None, PermissionMode::Broad).unwrap();
        let fallback = synthesize_one(None, PermissionMode::FromCommands).unwrap();
        assert_eq!(broad, fallback);
    }

    #[test]
    fn bash_pattern_rewrites_colons_to_spaces() {
        let policy = synthesize_one(Some(vec!["bash(git:*)"]), PermissionMode::FromCommands).unwrap();

        let expected: BTreeMap<String, Decision> = [
            ("*".to_string(), Decision::Deny),
            ("git *".to_string(), Decision::Allow),
        ]
        .into_iter()
        .collect();
        assert_eq!(policy.permission["bash"], PermissionRule::Patterns(expected));
        assert_eq!(policy.tools["bash"], true);
        assert_eq!(policy.tools["read"], false);
        assert_eq!(
            policy.permission["read"],
            PermissionRule::Flat(Decision::Deny)
        );
    }

    #[test]
    fn unknown_tools_are_dropped() {
        let policy = synthesize_one(
            Some(vec!["teleport(home:*)", "read"]),
            PermissionMode::FromCommands,
        )
        .unwrap();
        assert_eq!(policy.tools["read"], true);
        assert!(!policy.tools.contains_key("teleport"));
        assert!(!policy.permission.contains_key("teleport"));
    }

    #[test]
    fn write_edit_union_shares_pattern_tables() {
        let policy =
            synthesize_one(Some(vec!["edit(src/**)"]), PermissionMode::FromCommands).unwrap();

        let expected: BTreeMap<String, Decision> = [
            ("*".to_string(), Decision::Deny),
            ("src/**".to_string(), Decision::Allow),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            policy.permission["edit"],
            PermissionRule::Patterns(expected.clone())
        );
        assert_eq!(policy.permission["write"], PermissionRule::Patterns(expected));
    }

    #[test]
    fn write_edit_union_merges_both_pattern_sets() {
        let policy = synthesize_one(
            Some(vec!["write(docs/**)", "edit(src/**)"]),
            PermissionMode::FromCommands,
        )
        .unwrap();

        let PermissionRule::Patterns(write_table) = &policy.permission["write"] else {
            panic!("expected pattern table for write");
        };
        assert_eq!(policy.permission["edit"], policy.permission["write"]);
        assert_eq!(write_table["docs/**"], Decision::Allow);
        assert_eq!(write_table["src/**"], Decision::Allow);
        assert_eq!(write_table["*"], Decision::Deny);
    }

    #[test]
    fn enabling_write_flat_allows_edit_too() {
        let policy = synthesize_one(Some(vec!["write"]), PermissionMode::FromCommands).unwrap();
        assert_eq!(
            policy.permission["edit"],
            PermissionRule::Flat(Decision::Allow)
        );
        assert_eq!(
            policy.permission["write"],
            PermissionRule::Flat(Decision::Allow)
        );
        // The enabled-tool map keeps the declared truth.
        assert_eq!(policy.tools["write"], true);
        assert_eq!(policy.tools["edit"], false);
    }

    #[test]
    fn grants_accumulate_across_commands() {
        let first = command_with_tools(Some(vec!["bash(git:*)"]));
        let second = command_with_tools(Some(vec!["bash(cargo:test:*)", "grep"]));
        let policy = synthesize(&[&first, &second], PermissionMode::FromCommands).unwrap();

        let PermissionRule::Patterns(table) = &policy.permission["bash"] else {
            panic!("expected pattern table for bash");
        };
        assert_eq!(table["git *"], Decision::Allow);
        assert_eq!(table["cargo test *"], Decision::Allow);
        assert_eq!(policy.tools["grep"], true);
    }
}

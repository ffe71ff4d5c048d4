//! Hook event mapping and handler rendering.
//!
//! A fixed table translates each known Claude hook event into its OpenCode
//! equivalents; the merged hook config then renders as one TypeScript
//! plugin document. Command hooks execute; prompt, agent, and unrecognized
//! hooks become comments (best-effort compatibility, not behavioral
//! fidelity). Events missing from the table are surfaced as a comment
//! rather than dropped.

use replug_plugin::types::{HookAction, HookConfig, HookMatcher};

use crate::GeneratedDoc;

// ── Event table ─────────────────────────────────────────────────────────────

/// Matcher category for a mapped event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    Tool,
    Session,
    Permission,
    Message,
}

/// How one source event maps onto target events.
#[derive(Debug, Clone, Copy)]
pub struct EventMapping {
    pub events: &'static [&'static str],
    pub kind: MatcherKind,
    /// Only fire when the incoming payload carries an error.
    pub require_error: bool,
    pub note: Option<&'static str>,
}

impl EventMapping {
    const fn new(events: &'static [&'static str], kind: MatcherKind) -> Self {
        Self {
            events,
            kind,
            require_error: false,
            note: None,
        }
    }

    const fn noted(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }

    const fn error_gated(mut self) -> Self {
        self.require_error = true;
        self
    }
}

/// Every source event with a target equivalent.
pub const HOOK_EVENT_MAP: &[(&str, EventMapping)] = &[
    (
        "PreToolUse",
        EventMapping::new(&["tool.execute.before"], MatcherKind::Tool),
    ),
    (
        "PostToolUse",
        EventMapping::new(&["tool.execute.after"], MatcherKind::Tool),
    ),
    (
        "PostToolUseFailure",
        EventMapping::new(&["tool.execute.after"], MatcherKind::Tool)
            .error_gated()
            .noted("Claude PostToolUseFailure"),
    ),
    (
        "SessionStart",
        EventMapping::new(&["session.created"], MatcherKind::Session),
    ),
    (
        "SessionEnd",
        EventMapping::new(&["session.deleted"], MatcherKind::Session),
    ),
    (
        "Stop",
        EventMapping::new(&["session.idle"], MatcherKind::Session),
    ),
    (
        "PreCompact",
        EventMapping::new(&["experimental.session.compacting"], MatcherKind::Session),
    ),
    (
        "PermissionRequest",
        EventMapping::new(
            &["permission.requested", "permission.replied"],
            MatcherKind::Permission,
        )
        .noted("Claude PermissionRequest"),
    ),
    (
        "UserPromptSubmit",
        EventMapping::new(&["message.created", "message.updated"], MatcherKind::Message)
            .noted("Claude UserPromptSubmit"),
    ),
    (
        "Notification",
        EventMapping::new(&["message.updated"], MatcherKind::Message).noted("Claude Notification"),
    ),
    (
        "Setup",
        EventMapping::new(&["session.created"], MatcherKind::Session).noted("Claude Setup"),
    ),
    (
        "SubagentStart",
        EventMapping::new(&["message.updated"], MatcherKind::Message).noted("Claude SubagentStart"),
    ),
    (
        "SubagentStop",
        EventMapping::new(&["message.updated"], MatcherKind::Message).noted("Claude SubagentStop"),
    ),
];

/// Look up the mapping for a source event name.
pub fn lookup(event: &str) -> Option<&'static EventMapping> {
    HOOK_EVENT_MAP
        .iter()
        .find(|(name, _)| *name == event)
        .map(|(_, mapping)| mapping)
}

// ── Rendering ───────────────────────────────────────────────────────────────

/// Render the merged hook config into one OpenCode plugin document.
pub fn convert_hooks(hooks: &HookConfig) -> GeneratedDoc {
    let mut handler_blocks = Vec::new();
    let mut unmapped = Vec::new();

    for (event, matchers) in &hooks.hooks {
        let Some(mapping) = lookup(event) else {
            unmapped.push(event.clone());
            continue;
        };
        if matchers.is_empty() {
            continue;
        }
        for target_event in mapping.events {
            handler_blocks.push(render_handler(target_event, matchers, mapping));
        }
    }

    let unmapped_comment = if unmapped.is_empty() {
        String::new()
    } else {
        format!("// Unmapped Claude hook events: {}\n", unmapped.join(", "))
    };

    let content = format!(
        "{unmapped_comment}import type {{ Plugin }} from \"@opencode-ai/plugin\"\n\n\
         export const ConvertedHooks: Plugin = async ({{ $ }}) => {{\n  return {{\n{}\n  }}\n}}\n\n\
         export default ConvertedHooks\n",
        handler_blocks.join(",\n")
    );

    GeneratedDoc {
        name: "converted-hooks.ts".to_string(),
        content,
    }
}

fn render_handler(event: &str, matchers: &[HookMatcher], mapping: &EventMapping) -> String {
    let use_tool_matcher = matches!(mapping.kind, MatcherKind::Tool | MatcherKind::Permission);

    let mut statements = Vec::new();
    for matcher in matchers {
        statements.extend(render_statements(matcher, use_tool_matcher));
    }

    let body = if mapping.require_error {
        let inner: Vec<String> = statements
            .iter()
            .map(|line| format!("        {line}"))
            .collect();
        format!("      if (input?.error) {{\n{}\n      }}", inner.join("\n"))
    } else {
        statements
            .iter()
            .map(|line| format!("      {line}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let note = mapping
        .note
        .map(|note| format!("      // {note}\n"))
        .unwrap_or_default();
    format!("    \"{event}\": async (input) => {{\n{note}{body}\n    }}")
}

fn render_statements(matcher: &HookMatcher, use_tool_matcher: bool) -> Vec<String> {
    if matcher.hooks.is_empty() {
        return Vec::new();
    }

    let tools: Vec<String> = matcher
        .matcher
        .as_deref()
        .unwrap_or_default()
        .split('|')
        .map(|tool| tool.trim().to_lowercase())
        .filter(|tool| !tool.is_empty())
        .collect();

    let guard = (use_tool_matcher && !tools.is_empty() && !tools.iter().any(|tool| tool == "*"))
        .then(|| {
            tools
                .iter()
                .map(|tool| format!("input.tool === \"{tool}\""))
                .collect::<Vec<_>>()
                .join(" || ")
        });

    let label = matcher.matcher.as_deref().unwrap_or("*");
    let mut statements = Vec::new();
    for action in &matcher.hooks {
        match action {
            HookAction::Command { command, timeout } => {
                let escaped = escape_template_literal(command);
                match &guard {
                    Some(condition) => {
                        statements.push(format!("if ({condition}) {{ await $`{escaped}` }}"));
                    },
                    None => statements.push(format!("await $`{escaped}`")),
                }
                if let Some(timeout) = timeout
                    && *timeout > 0
                {
                    statements.push(format!("// timeout: {timeout}s (not enforced)"));
                }
            },
            HookAction::Prompt { prompt } => {
                statements.push(format!(
                    "// Prompt hook for {label}: {}",
                    prompt.replace('\n', " ")
                ));
            },
            HookAction::AgentDelegate { agent } => {
                statements.push(format!("// Agent hook for {label}: {agent}"));
            },
            HookAction::Unrecognized { kind } => {
                statements.push(format!("// Unsupported hook for {label}: {kind}"));
            },
        }
    }
    statements
}

fn escape_template_literal(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

//! Codex bundle writer.

use std::path::{Path, PathBuf};

use tracing::info;

use replug_convert::{CodexBundle, codex::render_config_toml};

use crate::{
    cleanup::{MANAGED_PREFIXES, cleanup_managed_dirs, cleanup_managed_docs},
    confirm::ConfirmService,
    error::Result,
    fsops::{copy_dir_recursive, path_exists, write_doc},
};

/// Codex skill cleanup also claims the older `impl-` layout.
const CODEX_SKILL_PREFIXES: &[&str] = &["replug:", "replug-", "impl-"];

fn resolve_codex_root(output_root: &Path) -> PathBuf {
    if output_root.file_name().is_some_and(|name| name == ".codex") {
        output_root.to_path_buf()
    } else {
        output_root.join(".codex")
    }
}

/// Persist a Codex bundle under `output_root`, with agent skills going to
/// `agents_home`.
pub async fn write_codex_bundle(
    output_root: &Path,
    bundle: &CodexBundle,
    agents_home: &Path,
    confirm: &ConfirmService,
) -> Result<()> {
    let codex_root = resolve_codex_root(output_root);
    tokio::fs::create_dir_all(&codex_root).await?;

    // Older installs generated prompt documents; clear them out.
    cleanup_managed_docs(&codex_root.join("prompts"), "prompt", confirm).await?;

    let skills_root = codex_root.join("skills");
    cleanup_managed_dirs(&skills_root, "skill", CODEX_SKILL_PREFIXES, confirm).await?;

    for skill in &bundle.skill_dirs {
        copy_dir_recursive(&skill.source_dir, &skills_root.join(&skill.name)).await?;
    }
    for skill in &bundle.command_skills {
        write_doc(&skills_root.join(&skill.name).join("SKILL.md"), &skill.content).await?;
    }

    if !bundle.agent_skills.is_empty() {
        let agent_skills_root = agents_home.join("skills");
        cleanup_managed_dirs(&agent_skills_root, "skill", MANAGED_PREFIXES, confirm).await?;
        for skill in &bundle.agent_skills {
            let path = agent_skills_root.join(&skill.name).join("SKILL.md");
            write_doc(&path, &skill.content).await?;
        }
    }

    if let Some(servers) = &bundle.servers
        && let Some(config) = render_config_toml(servers)
    {
        write_doc(&codex_root.join("config.toml"), &config).await?;
    }

    info!(root = %codex_root.display(), "codex bundle written");
    Ok(())
}

// ── Shared AGENTS.md block ──────────────────────────────────────────────────

const AGENTS_BLOCK_START: &str = "<!-- BEGIN REPLUG CODEX TOOL MAP -->";
const AGENTS_BLOCK_END: &str = "<!-- END REPLUG CODEX TOOL MAP -->";

const AGENTS_BLOCK_BODY: &str = "\
## Replug Codex Tool Mapping (Claude Compatibility)

This section maps Claude Code plugin tool references to Codex behavior.
Only this block is managed automatically.

Tool mapping:
- Read: use shell reads (cat/sed) or rg
- Write: create files via shell redirection or apply_patch
- Edit/MultiEdit: use apply_patch
- Bash: use shell_command
- Grep: use rg (fallback: grep)
- Glob: use rg --files or find
- LS: use ls via shell_command
- WebFetch/WebSearch: use curl or Context7 for library docs
- AskUserQuestion/Question: ask the user in chat
- Task/Subagent/Parallel: run sequentially in main thread; use multi_tool_use.parallel for tool calls
- TodoWrite/TodoRead: use file-based todos in todos/ with file-todos skill
- Skill: open the referenced SKILL.md and follow it
- ExitPlanMode: ignore
";

/// Idempotently upsert the managed compatibility block in
/// `<codex_home>/AGENTS.md`. Existing text outside the sentinels is kept.
pub async fn ensure_codex_agents_file(codex_home: &Path) -> Result<()> {
    tokio::fs::create_dir_all(codex_home).await?;
    let path = codex_home.join("AGENTS.md");
    let block = format!(
        "{AGENTS_BLOCK_START}\n{}\n{AGENTS_BLOCK_END}",
        AGENTS_BLOCK_BODY.trim()
    );

    if !path_exists(&path).await {
        write_doc(&path, &block).await?;
        return Ok(());
    }

    let existing = tokio::fs::read_to_string(&path).await?;
    let updated = upsert_block(&existing, &block);
    if updated != existing {
        tokio::fs::write(&path, updated).await?;
    }
    Ok(())
}

/// Replace the sentinel-delimited block if both sentinels are present,
/// otherwise append it.
fn upsert_block(existing: &str, block: &str) -> String {
    if let (Some(start), Some(end)) = (
        existing.find(AGENTS_BLOCK_START),
        existing.find(AGENTS_BLOCK_END),
    ) && end > start
    {
        let before = existing[..start].trim_end();
        let after = existing[end + AGENTS_BLOCK_END.len()..].trim_start();
        let mut parts = Vec::new();
        if !before.is_empty() {
            parts.push(before);
        }
        parts.push(block);
        if !after.is_empty() {
            parts.push(after);
        }
        return format!("{}\n", parts.join("\n\n"));
    }

    if existing.trim().is_empty() {
        return format!("{block}\n");
    }
    format!("{}\n\n{block}\n", existing.trim_end())
}

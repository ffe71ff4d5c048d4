//! OpenCode bundle writer.

use std::path::{Path, PathBuf};

use tracing::info;

use replug_convert::OpenCodeBundle;

use crate::{
    cleanup::{MANAGED_PREFIXES, cleanup_managed_dirs, cleanup_managed_docs},
    confirm::ConfirmService,
    error::Result,
    fsops::{copy_dir_recursive, write_doc},
};

struct OpenCodePaths {
    root: PathBuf,
    config_path: PathBuf,
    agents_dir: PathBuf,
    plugins_dir: PathBuf,
    skills_dir: PathBuf,
}

/// An output root already named `opencode`/`.opencode` is used flat;
/// anything else gets the nested `.opencode/` layout.
fn resolve_paths(output_root: &Path) -> OpenCodePaths {
    let base = output_root
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let nested = if base == "opencode" || base == ".opencode" {
        output_root.to_path_buf()
    } else {
        output_root.join(".opencode")
    };

    OpenCodePaths {
        root: output_root.to_path_buf(),
        config_path: output_root.join("opencode.json"),
        agents_dir: nested.join("agents"),
        plugins_dir: nested.join("plugins"),
        skills_dir: nested.join("skills"),
    }
}

/// Persist an OpenCode bundle under `output_root`.
pub async fn write_opencode_bundle(
    output_root: &Path,
    bundle: &OpenCodeBundle,
    confirm: &ConfirmService,
) -> Result<()> {
    let paths = resolve_paths(output_root);
    tokio::fs::create_dir_all(&paths.root).await?;

    let config = serde_json::to_string_pretty(&bundle.config)?;
    write_doc(&paths.config_path, &config).await?;

    if !bundle.agents.is_empty() {
        cleanup_managed_docs(&paths.agents_dir, "agent", confirm).await?;
        for agent in &bundle.agents {
            let path = paths.agents_dir.join(format!("{}.md", agent.name));
            write_doc(&path, &agent.content).await?;
        }
    }

    for plugin in &bundle.plugins {
        write_doc(&paths.plugins_dir.join(&plugin.name), &plugin.content).await?;
    }

    if !bundle.skill_dirs.is_empty() {
        cleanup_managed_dirs(&paths.skills_dir, "skill", MANAGED_PREFIXES, confirm).await?;
        for skill in &bundle.skill_dirs {
            copy_dir_recursive(&skill.source_dir, &paths.skills_dir.join(&skill.name)).await?;
        }
    }

    info!(root = %output_root.display(), "opencode bundle written");
    Ok(())
}

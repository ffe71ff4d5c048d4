//! Confirmed cleanup of previously installed managed artifacts.
//!
//! Destinations may hold artifacts from an earlier install. Anything whose
//! name carries one of the reserved managed prefixes is listed and, once
//! the operator confirms, deleted before the new content lands. A decline
//! leaves the old entries in place; new entries are written alongside.

use std::path::Path;

use tracing::info;

use crate::{confirm::ConfirmService, error::Result};

/// Name prefixes this tool claims ownership of at destinations.
pub const MANAGED_PREFIXES: &[&str] = &["replug:", "replug-"];

fn is_managed(name: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| name.starts_with(prefix))
}

/// Delete managed `.md` documents in `dir` after confirmation.
pub(crate) async fn cleanup_managed_docs(
    dir: &Path,
    noun: &str,
    confirm: &ConfirmService,
) -> Result<()> {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return Ok(());
    };

    let mut matches = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.path().is_file() && name.ends_with(".md") && is_managed(&name, MANAGED_PREFIXES) {
            matches.push(name);
        }
    }
    if matches.is_empty() {
        return Ok(());
    }
    matches.sort();

    if !announce_and_confirm(dir, noun, &matches, confirm).await? {
        return Ok(());
    }
    for name in &matches {
        tokio::fs::remove_file(dir.join(name)).await?;
    }
    info!(count = matches.len(), dir = %dir.display(), "deleted managed {noun}s");
    Ok(())
}

/// Delete managed directories in `dir` after confirmation.
pub(crate) async fn cleanup_managed_dirs(
    dir: &Path,
    noun: &str,
    prefixes: &[&str],
    confirm: &ConfirmService,
) -> Result<()> {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return Ok(());
    };

    let mut matches = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.path().is_dir() && is_managed(&name, prefixes) {
            matches.push(name);
        }
    }
    if matches.is_empty() {
        return Ok(());
    }
    matches.sort();

    if !announce_and_confirm(dir, noun, &matches, confirm).await? {
        return Ok(());
    }
    for name in &matches {
        tokio::fs::remove_dir_all(dir.join(name)).await?;
    }
    info!(count = matches.len(), dir = %dir.display(), "deleted managed {noun}s");
    Ok(())
}

async fn announce_and_confirm(
    dir: &Path,
    noun: &str,
    matches: &[String],
    confirm: &ConfirmService,
) -> Result<bool> {
    println!(
        "\nFound {} existing managed {noun}(s) in {}:",
        matches.len(),
        dir.display()
    );
    for name in matches {
        println!("  - {name}");
    }

    let approved = confirm
        .confirm(&format!("Delete these {noun}s before installing?"))
        .await?;
    if !approved {
        info!(dir = %dir.display(), "skipping {noun} cleanup");
    }
    Ok(approved)
}

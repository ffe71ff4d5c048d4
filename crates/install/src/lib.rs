//! Bundle writers.
//!
//! Persists converted bundles to their destination roots: idempotent
//! overwrites of generated documents, recursive skill-directory copies,
//! and confirmed cleanup of previously installed managed artifacts. All
//! side effects stay under the given destination roots; a failure partway
//! leaves already-written files in place.

pub mod cleanup;
pub mod codex;
pub mod confirm;
pub mod error;
mod fsops;
pub mod opencode;

use std::path::Path;

use replug_convert::Bundle;

pub use {
    cleanup::MANAGED_PREFIXES,
    codex::{ensure_codex_agents_file, write_codex_bundle},
    confirm::{ConfirmPolicy, ConfirmService},
    error::{Error, Result},
    opencode::write_opencode_bundle,
};

/// Everything a writer needs besides the bundle itself.
pub struct WriteOptions<'a> {
    /// Root for agent-level skills (Codex installs them outside its home).
    pub agents_home: &'a Path,
    pub confirm: &'a ConfirmService,
}

/// Persist a converted bundle to its destination root.
pub async fn write_bundle(
    destination_root: &Path,
    bundle: &Bundle,
    options: &WriteOptions<'_>,
) -> Result<()> {
    match bundle {
        Bundle::OpenCode(bundle) => {
            write_opencode_bundle(destination_root, bundle, options.confirm).await
        },
        Bundle::Codex(bundle) => {
            write_codex_bundle(destination_root, bundle, options.agents_home, options.confirm).await
        },
    }
}

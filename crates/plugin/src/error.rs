use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not find .claude-plugin/plugin.json under {}", path.display())]
    ManifestNotFound { path: PathBuf },
    #[error("invalid {label}: {entry}. Paths must stay within the plugin root.")]
    PathEscapesRoot { label: String, entry: String },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

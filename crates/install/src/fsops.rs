//! Small filesystem helpers shared by the writers.

use std::path::Path;

use walkdir::WalkDir;

use crate::error::Result;

/// Write a generated document as UTF-8 with a single trailing newline.
pub(crate) async fn write_doc(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut text = content.trim_end_matches('\n').to_string();
    text.push('\n');
    tokio::fs::write(path, text).await?;
    Ok(())
}

/// Recursively copy a directory, creating destinations as needed and
/// copying every file byte for byte.
pub(crate) async fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dest).await?;

    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(src)?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            tokio::fs::create_dir_all(&target).await?;
        } else {
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(entry.path(), &target).await?;
        }
    }

    Ok(())
}

pub(crate) async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_doc_normalizes_trailing_newlines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/doc.md");

        write_doc(&path, "no newline").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "no newline\n");

        write_doc(&path, "too many\n\n\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "too many\n");
    }

    #[tokio::test]
    async fn copies_nested_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(src.join("sub/deeper")).unwrap();
        std::fs::write(src.join("SKILL.md"), "top").unwrap();
        std::fs::write(src.join("sub/deeper/data.bin"), [0u8, 159, 146, 150]).unwrap();

        let dest = tmp.path().join("dest");
        copy_dir_recursive(&src, &dest).await.unwrap();

        assert_eq!(std::fs::read_to_string(dest.join("SKILL.md")).unwrap(), "top");
        assert_eq!(
            std::fs::read(dest.join("sub/deeper/data.bin")).unwrap(),
            vec![0u8, 159, 146, 150]
        );
    }
}

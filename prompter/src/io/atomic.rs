//! Atomic file writes: temp file in the target directory, fsync, rename.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

/// What to do when the destination already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail and leave the existing file untouched.
    CreateNew,
    /// Replace the existing file.
    Replace,
}

/// Write `contents` to `path` so readers see either nothing or the whole file.
///
/// On failure the temp file is dropped and removed.
pub fn write_atomic(path: &Path, contents: &[u8], mode: WriteMode) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".prompter-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .with_context(|| format!("create temp file in {}", parent.display()))?;
    tmp.write_all(contents)
        .with_context(|| format!("write temp file {}", tmp.path().display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("sync temp file {}", tmp.path().display()))?;

    let persisted = match mode {
        WriteMode::CreateNew => tmp.persist_noclobber(path),
        WriteMode::Replace => tmp.persist(path),
    };
    persisted
        .map_err(|err| err.error)
        .with_context(|| format!("rename into {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn creates_missing_parent_directories() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("a/b/out.json");

        write_atomic(&path, b"[]", WriteMode::CreateNew).expect("write");

        assert_eq!(fs::read_to_string(&path).expect("read"), "[]");
        assert_eq!(entries(&temp.path().join("a/b")), vec!["out.json"]);
    }

    #[test]
    fn create_new_keeps_existing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("taken.json");
        fs::write(&path, "keep").expect("write");

        assert!(write_atomic(&path, b"new", WriteMode::CreateNew).is_err());
        assert_eq!(fs::read_to_string(&path).expect("read"), "keep");
        assert_eq!(entries(temp.path()), vec!["taken.json"]);
    }

    #[test]
    fn replace_overwrites_existing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "old").expect("write");

        write_atomic(&path, b"new", WriteMode::Replace).expect("write");

        assert_eq!(fs::read_to_string(&path).expect("read"), "new");
        assert_eq!(entries(temp.path()), vec!["config.toml"]);
    }
}

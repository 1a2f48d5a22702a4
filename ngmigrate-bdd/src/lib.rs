//! BDD harness (cucumber-rs).
//!
//! This crate exists to keep scenario tests isolated from the production crates.
//! It only offers the on-disk fixture helpers the step definitions share.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use tempfile::TempDir;

/// A fresh workspace directory, removed when the `TempDir` drops.
pub fn scratch_workspace() -> anyhow::Result<(TempDir, Utf8PathBuf)> {
    let td = tempfile::tempdir().context("create scratch workspace")?;
    let root = Utf8PathBuf::from_path_buf(td.path().to_path_buf())
        .map_err(|p| anyhow::anyhow!("{} is not valid UTF-8", p.display()))?;
    Ok((td, root))
}

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Utf8Path, rel: &str, contents: &str) -> anyhow::Result<()> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_file_creates_parents() {
        let (_td, root) = scratch_workspace().unwrap();
        write_file(&root, "apps/shell/src/main.ts", "x").unwrap();
        assert_eq!(
            fs::read_to_string(root.join("apps/shell/src/main.ts")).unwrap(),
            "x"
        );
    }
}

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use std::collections::BTreeMap;
use tracing::debug;

/// Workspace file access for the migrations.
///
/// Paths are relative to the workspace root. `visit_files` enumerates
/// non-ignored files under a directory, in a stable order.
pub trait ProjectTree {
    fn root(&self) -> &Utf8Path;

    /// `None` when the tree has no copy of the file.
    fn read(&self, rel: &Utf8Path) -> Option<String>;

    fn write(&mut self, rel: &Utf8Path, contents: &str) -> anyhow::Result<()>;

    fn visit_files(&self, dir: &Utf8Path, visit: &mut dyn FnMut(&Utf8Path)) -> anyhow::Result<()>;
}

/// Read through the tree, falling back to the file on disk under its root.
pub fn read_with_fallback(tree: &dyn ProjectTree, rel: &Utf8Path) -> Option<String> {
    tree.read(rel).or_else(|| {
        let abs = tree.root().join(rel);
        let text = fs::read_to_string(&abs).ok();
        if text.is_some() {
            debug!(path = %abs, "read from disk");
        }
        text
    })
}

/// File-system backed `ProjectTree`. Honors `.gitignore` and skips hidden
/// entries and `node_modules`.
#[derive(Debug, Clone)]
pub struct FsProjectTree {
    root: Utf8PathBuf,
}

impl FsProjectTree {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn abs(&self, rel: &Utf8Path) -> Utf8PathBuf {
        match rel.as_str() {
            "" | "." => self.root.clone(),
            _ if rel.is_absolute() => rel.to_path_buf(),
            _ => self.root.join(rel),
        }
    }
}

impl ProjectTree for FsProjectTree {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn read(&self, rel: &Utf8Path) -> Option<String> {
        fs::read_to_string(self.abs(rel)).ok()
    }

    fn write(&mut self, rel: &Utf8Path, contents: &str) -> anyhow::Result<()> {
        let abs = self.abs(rel);
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create parent dir for {}", abs))?;
        }
        fs::write(&abs, contents).with_context(|| format!("write {}", abs))
    }

    fn visit_files(&self, dir: &Utf8Path, visit: &mut dyn FnMut(&Utf8Path)) -> anyhow::Result<()> {
        let start = self.abs(dir);
        let walker = ignore::WalkBuilder::new(&start)
            .hidden(true)
            .git_ignore(true)
            .git_exclude(true)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(|entry| entry.file_name() != "node_modules")
            .build();

        for entry in walker {
            let entry = entry.with_context(|| format!("walk {}", start))?;
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let Some(path) = Utf8Path::from_path(entry.path()) else {
                debug!(path = %entry.path().display(), "skipping non-UTF-8 path");
                continue;
            };
            let rel = path.strip_prefix(&self.root).unwrap_or(path);
            visit(rel);
        }
        Ok(())
    }
}

/// In-memory `ProjectTree` for embedding and tests.
#[derive(Debug, Clone)]
pub struct MemoryProjectTree {
    root: Utf8PathBuf,
    files: BTreeMap<Utf8PathBuf, String>,
}

impl Default for MemoryProjectTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProjectTree {
    pub fn new() -> Self {
        Self {
            root: Utf8PathBuf::from("."),
            files: BTreeMap::new(),
        }
    }

    pub fn with_file(mut self, rel: impl Into<Utf8PathBuf>, contents: impl Into<String>) -> Self {
        self.files.insert(rel.into(), contents.into());
        self
    }

    pub fn get(&self, rel: impl AsRef<Utf8Path>) -> Option<&str> {
        self.files.get(rel.as_ref()).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Utf8PathBuf> {
        self.files.keys()
    }
}

impl ProjectTree for MemoryProjectTree {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn read(&self, rel: &Utf8Path) -> Option<String> {
        self.files.get(rel).cloned()
    }

    fn write(&mut self, rel: &Utf8Path, contents: &str) -> anyhow::Result<()> {
        self.files.insert(rel.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn visit_files(&self, dir: &Utf8Path, visit: &mut dyn FnMut(&Utf8Path)) -> anyhow::Result<()> {
        let everything = dir.as_str().is_empty() || dir == ".";
        for path in self.files.keys() {
            let hidden_or_vendored = path.components().any(|c| {
                let s = c.as_str();
                s == "node_modules" || (s.starts_with('.') && s != "." && s != "..")
            });
            if hidden_or_vendored {
                continue;
            }
            if everything || path.starts_with(dir) {
                visit(path);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn visited(tree: &dyn ProjectTree, dir: &str) -> Vec<String> {
        let mut out = Vec::new();
        tree.visit_files(Utf8Path::new(dir), &mut |p| out.push(p.to_string()))
            .unwrap();
        out
    }

    #[test]
    fn memory_visit_filters_by_dir_and_skips_vendored() {
        let tree = MemoryProjectTree::new()
            .with_file("apps/a/src/x.ts", "")
            .with_file("apps/b/y.ts", "")
            .with_file("node_modules/lib/z.ts", "")
            .with_file(".angular/cache/c.ts", "");
        assert_eq!(visited(&tree, "apps/a"), vec!["apps/a/src/x.ts"]);
        assert_eq!(visited(&tree, "."), vec!["apps/a/src/x.ts", "apps/b/y.ts"]);
    }

    #[test]
    fn memory_write_then_read() {
        let mut tree = MemoryProjectTree::new();
        tree.write(Utf8Path::new("a.ts"), "x").unwrap();
        assert_eq!(tree.read(Utf8Path::new("a.ts")).as_deref(), Some("x"));
        assert_eq!(tree.read(Utf8Path::new("b.ts")), None);
    }

    #[test]
    fn fs_visit_respects_gitignore_and_node_modules() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        fs::create_dir_all(root.join("src/app")).unwrap();
        fs::create_dir_all(root.join("node_modules/dep")).unwrap();
        fs::create_dir_all(root.join("dist")).unwrap();
        fs::write(root.join(".gitignore"), "dist/\n").unwrap();
        fs::write(root.join("src/app/a.ts"), "a").unwrap();
        fs::write(root.join("src/main.ts"), "m").unwrap();
        fs::write(root.join("node_modules/dep/index.ts"), "n").unwrap();
        fs::write(root.join("dist/out.ts"), "d").unwrap();

        let tree = FsProjectTree::new(root.clone());
        assert_eq!(visited(&tree, "."), vec!["src/app/a.ts", "src/main.ts"]);
        assert_eq!(visited(&tree, "src/app"), vec!["src/app/a.ts"]);
    }

    #[test]
    fn fs_write_creates_parents() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        let mut tree = FsProjectTree::new(root.clone());
        tree.write(Utf8Path::new("deep/dir/f.html"), "<p></p>").unwrap();
        assert_eq!(
            fs::read_to_string(root.join("deep/dir/f.html")).unwrap(),
            "<p></p>"
        );
    }

    #[test]
    fn fallback_reads_disk_when_tree_has_no_copy() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        fs::write(root.join("t.html"), "<p></p>").unwrap();
        let tree = FsProjectTree::new(root);
        assert_eq!(
            read_with_fallback(&tree, Utf8Path::new("t.html")).as_deref(),
            Some("<p></p>")
        );
        assert_eq!(read_with_fallback(&tree, Utf8Path::new("none.html")), None);
    }
}

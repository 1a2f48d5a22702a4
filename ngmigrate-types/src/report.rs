use crate::file::FileRole;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// One file whose contents a migration pass changed (or would change).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: Utf8PathBuf,
    pub role: FileRole,
    pub before: String,
    pub after: String,
}

impl FileChange {
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }
}

/// Outcome of one orchestrator run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Source files visited under the project roots.
    pub files_scanned: u64,
    /// Source files that passed the textual pre-filter.
    pub candidates: u64,
    /// Component templates that contained router vocabulary.
    pub template_targets: u64,
    /// Files whose contents changed, in write order.
    #[serde(default)]
    pub changes: Vec<FileChange>,
    /// Whether the changes were written back.
    pub applied: bool,
}

impl MigrationReport {
    pub fn changed_paths(&self) -> impl Iterator<Item = &Utf8PathBuf> {
        self.changes.iter().map(|c| &c.path)
    }
}

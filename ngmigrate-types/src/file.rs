use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// What a project file is to the migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileRole {
    TsSource,
    Template,
    Manifest,
}

impl FileRole {
    /// Role inferred from the file extension.
    pub fn from_path(path: &Utf8Path) -> Option<Self> {
        match path.extension() {
            Some("ts") => Some(FileRole::TsSource),
            Some("html") => Some(FileRole::Template),
            Some("json") if path.file_name() == Some("package.json") => Some(FileRole::Manifest),
            _ => None,
        }
    }
}

/// Where a component's template text lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateLocation {
    /// `template: \`...\`` inside the decorator.
    Inline,
    /// `templateUrl: './x.html'`, resolved against the component file.
    External { path: Utf8PathBuf },
}

impl TemplateLocation {
    pub fn is_inline(&self) -> bool {
        matches!(self, TemplateLocation::Inline)
    }
}

//! `package.json` access that preserves key order and unrelated fields.

use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Sections a dependency patch may touch.
pub const PATCHABLE_SECTIONS: [&str; 2] = ["dependencies", "devDependencies"];

/// Sections consulted, in order, when reading a dependency's current range.
pub const LOOKUP_SECTIONS: [&str; 3] = ["dependencies", "devDependencies", "peerDependencies"];

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read or write {path}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid JSON")]
    Json {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} does not contain a JSON object")]
    NotAnObject { path: Utf8PathBuf },
}

/// One dependency pin: `name` set to `range`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyUpdate {
    pub name: String,
    pub range: String,
}

impl DependencyUpdate {
    pub fn new(name: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            range: range.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageManifest {
    root: Map<String, Value>,
}

impl PackageManifest {
    pub fn parse(path: &Utf8Path, text: &str) -> Result<Self, ManifestError> {
        let value: Value = serde_json::from_str(text).map_err(|source| ManifestError::Json {
            path: path.to_owned(),
            source,
        })?;
        match value {
            Value::Object(root) => Ok(Self { root }),
            _ => Err(ManifestError::NotAnObject {
                path: path.to_owned(),
            }),
        }
    }

    pub fn load(path: &Utf8Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(path, &text)
    }

    pub fn save(&self, path: &Utf8Path) -> Result<(), ManifestError> {
        fs::write(path, self.to_json_string()).map_err(|source| ManifestError::Io {
            path: path.to_owned(),
            source,
        })
    }

    /// Two-space indented JSON with a trailing newline.
    pub fn to_json_string(&self) -> String {
        let mut out = serde_json::to_string_pretty(&self.root).unwrap_or_default();
        out.push('\n');
        out
    }

    pub fn name(&self) -> Option<&str> {
        self.root.get("name").and_then(Value::as_str)
    }

    pub fn dependency(&self, section: &str, name: &str) -> Option<&str> {
        self.root
            .get(section)
            .and_then(|deps| deps.get(name))
            .and_then(Value::as_str)
    }

    /// Listed under `dependencies` or `devDependencies`.
    pub fn has_dependency(&self, name: &str) -> bool {
        PATCHABLE_SECTIONS
            .iter()
            .any(|section| self.dependency(section, name).is_some())
    }

    /// The declared range, preferring runtime over dev over peer entries.
    pub fn current_range(&self, name: &str) -> Option<&str> {
        LOOKUP_SECTIONS
            .iter()
            .find_map(|section| self.dependency(section, name))
    }

    /// Overwrite `name` wherever it already exists. Returns how many entries
    /// changed; a name that is not declared is left absent.
    pub fn set_existing(&mut self, name: &str, range: &str) -> usize {
        let mut changed = 0;
        for section in PATCHABLE_SECTIONS {
            let Some(Value::Object(deps)) = self.root.get_mut(section) else {
                continue;
            };
            if let Some(slot) = deps.get_mut(name) {
                *slot = Value::String(range.to_string());
                changed += 1;
            }
        }
        if changed == 0 {
            debug!(dependency = name, range, "not declared; patch skipped");
        }
        changed
    }

    pub fn apply_updates(&mut self, updates: &[DependencyUpdate]) -> usize {
        updates
            .iter()
            .map(|u| self.set_existing(&u.name, &u.range))
            .sum()
    }

    /// Replace `old` with `new` at `version` in every section that declares
    /// `old`. Returns whether anything changed.
    pub fn rename_dependency(&mut self, old: &str, new: &str, version: &str) -> bool {
        let mut renamed = false;
        for section in PATCHABLE_SECTIONS {
            let Some(Value::Object(deps)) = self.root.get_mut(section) else {
                continue;
            };
            if deps.shift_remove(old).is_some() {
                deps.insert(new.to_string(), Value::String(version.to_string()));
                renamed = true;
            }
        }
        renamed
    }
}

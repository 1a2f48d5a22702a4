//! Move a dependency into the `@ngx-maintenance` scope.

use crate::error::DomainError;
use crate::ports::{ProjectTree, read_with_fallback};
use crate::workspace::MANIFEST_FILE;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use ngmigrate_npm::PackageManifest;
use tracing::{debug, info};

pub const MAINTENANCE_SCOPE: &str = "@ngx-maintenance";
pub const DEFAULT_MAINTENANCE_VERSION: &str = "1.0.0";

/// `foo` and `@scope/foo` both become `@ngx-maintenance/foo`.
pub fn maintenance_name(package: &str) -> String {
    let unscoped = match package.strip_prefix('@') {
        Some(scoped) => scoped.split_once('/').map_or(package, |(_, name)| name),
        None => package,
    };
    format!("{MAINTENANCE_SCOPE}/{unscoped}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOutcome {
    pub new_name: String,
    pub manifest_updated: bool,
    /// Source files whose imports were rewritten.
    pub sources: Vec<Utf8PathBuf>,
}

/// Rename `package` in the manifest and in every source file.
pub fn rename_to_maintenance(
    tree: &mut dyn ProjectTree,
    package: &str,
    version: &str,
) -> anyhow::Result<RenameOutcome> {
    let new_name = maintenance_name(package);
    if new_name == package {
        debug!(package, "already in the maintenance scope");
    }

    let manifest_path = Utf8Path::new(MANIFEST_FILE);
    let text = read_with_fallback(tree, manifest_path).ok_or(DomainError::NoManifest)?;
    let mut manifest = PackageManifest::parse(manifest_path, &text).map_err(DomainError::from)?;
    let manifest_updated =
        new_name != package && manifest.rename_dependency(package, &new_name, version);
    if manifest_updated {
        tree.write(manifest_path, &manifest.to_json_string())?;
        info!(from = package, to = %new_name, version, "renamed dependency");
    }

    let mut candidates = Vec::new();
    tree.visit_files(Utf8Path::new("."), &mut |path| {
        if path.extension() == Some("ts") {
            candidates.push(path.to_path_buf());
        }
    })
    .context("list source files")?;

    let mut sources = Vec::new();
    for path in candidates {
        let Some(before) = read_with_fallback(tree, &path) else {
            continue;
        };
        let after = replace_package_name(&before, package, &new_name);
        if after != before {
            tree.write(&path, &after)?;
            info!(path = %path, "updated imports");
            sources.push(path);
        }
    }

    Ok(RenameOutcome {
        new_name,
        manifest_updated,
        sources,
    })
}

/// Replace occurrences of `old` that are not already the tail of `new`.
fn replace_package_name(text: &str, old: &str, new: &str) -> String {
    if old.is_empty() || old == new {
        return text.to_string();
    }
    let already = new.strip_suffix(old);
    let mut out = String::with_capacity(text.len());
    let mut rest = 0;
    for (at, _) in text.match_indices(old) {
        let migrated = already.is_some_and(|prefix| text[..at].ends_with(prefix));
        out.push_str(&text[rest..at]);
        out.push_str(if migrated { old } else { new });
        rest = at + old.len();
    }
    out.push_str(&text[rest..]);
    out
}

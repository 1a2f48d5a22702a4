//! Workspace-level checks that run before the ui-router pass.

use crate::error::DomainError;
use crate::ports::{ProjectTree, read_with_fallback};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use ngmigrate_npm::PackageManifest;
use ngmigrate_types::vocab::UI_ROUTER_PACKAGE;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

pub const MANIFEST_FILE: &str = "package.json";
const ANGULAR_WORKSPACE_FILE: &str = "angular.json";
const PROJECT_FILE: &str = "project.json";

/// Fail unless the workspace manifest depends on `@uirouter/angular`.
pub fn require_router_dependency(tree: &dyn ProjectTree) -> Result<(), DomainError> {
    let path = Utf8Path::new(MANIFEST_FILE);
    let text = read_with_fallback(tree, path).ok_or(DomainError::NoManifest)?;
    let manifest = PackageManifest::parse(path, &text)?;
    if manifest.has_dependency(UI_ROUTER_PACKAGE) {
        Ok(())
    } else {
        Err(DomainError::MissingRouterDependency)
    }
}

/// The project roots to migrate, sorted and de-duplicated.
///
/// `angular.json` project roots first, then every directory holding a
/// `project.json`, then the workspace root.
pub fn discover_project_roots(tree: &dyn ProjectTree) -> anyhow::Result<Vec<Utf8PathBuf>> {
    let from_workspace = angular_json_roots(tree)?;
    if !from_workspace.is_empty() {
        debug!(roots = ?from_workspace, "roots from {}", ANGULAR_WORKSPACE_FILE);
        return Ok(from_workspace.into_iter().collect());
    }

    let mut from_projects = BTreeSet::new();
    tree.visit_files(Utf8Path::new("."), &mut |path| {
        if path.file_name() == Some(PROJECT_FILE) {
            from_projects.insert(dir_or_root(path.parent()));
        }
    })
    .context("look for project.json files")?;
    if !from_projects.is_empty() {
        debug!(roots = ?from_projects, "roots from {} files", PROJECT_FILE);
        return Ok(from_projects.into_iter().collect());
    }

    Ok(vec![Utf8PathBuf::from(".")])
}

fn angular_json_roots(tree: &dyn ProjectTree) -> anyhow::Result<BTreeSet<Utf8PathBuf>> {
    let path = Utf8Path::new(ANGULAR_WORKSPACE_FILE);
    let Some(text) = read_with_fallback(tree, path) else {
        return Ok(BTreeSet::new());
    };
    let workspace: Value =
        serde_json::from_str(&text).with_context(|| format!("parse {}", path))?;

    let roots = workspace
        .get("projects")
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|projects| projects.values())
        .filter_map(|project| project.get("root").and_then(Value::as_str))
        .map(|root| dir_or_root(Some(Utf8Path::new(root.trim_end_matches('/')))))
        .collect();
    Ok(roots)
}

fn dir_or_root(dir: Option<&Utf8Path>) -> Utf8PathBuf {
    match dir {
        Some(dir) if !dir.as_str().is_empty() => dir.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    }
}

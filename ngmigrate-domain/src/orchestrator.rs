//! The UI-Router to Angular Router pass over a workspace.
//!
//! Every source file under the project roots is pre-filtered on text,
//! parsed when it declares a component, and rewritten in one pass: the
//! markup rewrite, the inline-template splice and the lifecycle-hook
//! transform all land in a single write per file.

use crate::ports::{ProjectTree, read_with_fallback};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use ngmigrate_markup::{MarkupNode, parse_markup, rewrite_markup};
use ngmigrate_source::{SourceFile, TemplateSource};
use ngmigrate_types::vocab::{
    COMPONENT_MARKER, LEGACY_ROUTER_MARKER, PARAMS_CHANGED_HOOK, mentions_router_vocabulary,
};
use ngmigrate_types::{FileChange, FileRole, MigrationReport, TemplateLocation};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// A component template that mentions the router vocabulary.
#[derive(Debug, Clone)]
pub struct TemplateInfo {
    pub class_name: String,
    pub location: TemplateLocation,
    pub nodes: Vec<MarkupNode>,
    pub raw: String,
}

/// A source file the pass will touch.
///
/// `templates` is empty for a transform-only target: a file that talks to
/// UI-Router but whose components carry no vocabulary in their markup.
#[derive(Debug, Clone)]
pub struct MigrationTarget {
    pub source_path: Utf8PathBuf,
    pub needs_hook: bool,
    pub templates: Vec<TemplateInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct MigrationOptions {
    /// Workspace-relative directories to scan. Empty scans the whole tree.
    pub roots: Vec<Utf8PathBuf>,
    pub dry_run: bool,
}

/// Compute every rewrite, then write it back unless this is a dry run.
pub fn run_migration(
    tree: &mut dyn ProjectTree,
    options: &MigrationOptions,
) -> anyhow::Result<MigrationReport> {
    let mut report = plan_migration(tree, &options.roots)?;
    if options.dry_run {
        info!(files = report.changes.len(), "dry run; nothing written");
    } else {
        apply_report(tree, &mut report)?;
    }
    Ok(report)
}

/// Compute the rewrites without touching the tree.
pub fn plan_migration(
    tree: &dyn ProjectTree,
    roots: &[Utf8PathBuf],
) -> anyhow::Result<MigrationReport> {
    let sources = source_files(tree, roots)?;
    let mut report = MigrationReport {
        files_scanned: sources.len() as u64,
        ..MigrationReport::default()
    };
    let mut seen_templates = BTreeSet::new();

    for path in sources {
        let Some(text) = read_with_fallback(tree, &path) else {
            warn!(path = %path, "listed but unreadable; skipping");
            continue;
        };
        let Some((target, parsed)) = scan_source(tree, &path, &text)? else {
            continue;
        };
        report.candidates += 1;
        report.template_targets += target.templates.len() as u64;
        migrate_target(&target, parsed, &text, &mut seen_templates, &mut report.changes)?;
    }

    debug!(
        scanned = report.files_scanned,
        candidates = report.candidates,
        templates = report.template_targets,
        changed = report.changes.len(),
        "migration planned"
    );
    Ok(report)
}

/// Write every change in the report, one write per file.
pub fn apply_report(tree: &mut dyn ProjectTree, report: &mut MigrationReport) -> anyhow::Result<()> {
    for change in &report.changes {
        tree.write(&change.path, &change.after)
            .with_context(|| format!("write migrated {}", change.path))?;
        info!(path = %change.path, "updated");
    }
    report.applied = true;
    Ok(())
}

fn source_files(tree: &dyn ProjectTree, roots: &[Utf8PathBuf]) -> anyhow::Result<BTreeSet<Utf8PathBuf>> {
    let whole_tree = [Utf8PathBuf::from(".")];
    let roots = if roots.is_empty() { &whole_tree[..] } else { roots };

    let mut files = BTreeSet::new();
    for root in roots {
        tree.visit_files(root, &mut |path| {
            if path.extension() == Some("ts") {
                files.insert(path.to_path_buf());
            }
        })
        .with_context(|| format!("list files under {}", root))?;
    }
    Ok(files)
}

fn scan_source(
    tree: &dyn ProjectTree,
    path: &Utf8Path,
    text: &str,
) -> anyhow::Result<Option<(MigrationTarget, Option<SourceFile>)>> {
    let needs_hook = text.contains(LEGACY_ROUTER_MARKER);
    let declares_component = text.contains(COMPONENT_MARKER);
    if !needs_hook && !declares_component {
        return Ok(None);
    }

    let mut target = MigrationTarget {
        source_path: path.to_path_buf(),
        needs_hook,
        templates: Vec::new(),
    };
    if !declares_component {
        return Ok(Some((target, None)));
    }

    let source = SourceFile::parse(path, text).with_context(|| format!("parse {}", path))?;
    for component in source.components() {
        let Some(template) = component.template else {
            continue;
        };
        let raw = match &template {
            TemplateSource::Inline(literal) => literal.value(),
            TemplateSource::External { path: template_path, .. } => {
                match read_with_fallback(tree, template_path) {
                    Some(raw) => raw,
                    None => {
                        warn!(component = %path, template = %template_path, "template file not found");
                        continue;
                    }
                }
            }
        };
        if !mentions_router_vocabulary(&raw) {
            continue;
        }
        target.templates.push(TemplateInfo {
            class_name: component.class_name,
            location: template.location(),
            nodes: parse_markup(&raw),
            raw,
        });
    }
    Ok(Some((target, Some(source))))
}

fn migrate_target(
    target: &MigrationTarget,
    parsed: Option<SourceFile>,
    original: &str,
    seen_templates: &mut BTreeSet<Utf8PathBuf>,
    changes: &mut Vec<FileChange>,
) -> anyhow::Result<()> {
    let path = &target.source_path;
    if target.templates.is_empty() && !target.needs_hook {
        return Ok(());
    }
    let mut source = match parsed {
        Some(source) => source,
        None => SourceFile::parse(path.clone(), original).with_context(|| format!("parse {}", path))?,
    };

    let mut template_changes = Vec::new();
    for info in &target.templates {
        let migrated = rewrite_markup(&info.raw, &info.nodes)
            .with_context(|| format!("rewrite template of {} in {}", info.class_name, path))?;
        match &info.location {
            TemplateLocation::Inline => {
                source = source
                    .splice_template(&info.class_name, &migrated)
                    .with_context(|| format!("splice template into {}", path))?;
            }
            TemplateLocation::External { path: template_path } => {
                if migrated != info.raw && seen_templates.insert(template_path.clone()) {
                    template_changes.push(FileChange {
                        path: template_path.clone(),
                        role: FileRole::Template,
                        before: info.raw.clone(),
                        after: migrated,
                    });
                }
            }
        }
    }

    if target.needs_hook {
        source = source
            .migrate_params_hook()
            .with_context(|| format!("migrate {} in {}", PARAMS_CHANGED_HOOK, path))?;
    }

    if source.text() != original {
        changes.push(FileChange {
            path: path.clone(),
            role: FileRole::TsSource,
            before: original.to_string(),
            after: source.into_text(),
        });
    }
    changes.extend(template_changes);
    Ok(())
}

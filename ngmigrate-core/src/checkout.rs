//! Clone a package repository, bring it up to date and copy it out.
//!
//! The clone lives in a temporary `angular-update-*` directory owned by one
//! run; it is removed as the last step whether or not the run succeeded.

use crate::ports::{CommandRunner, ProgressReporter, Tone};
use crate::repair::{RepairLoop, RepairOutcome};
use crate::settings::CheckoutSettings;
use anyhow::{Context, anyhow, bail};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use ngmigrate_domain::{
    DomainError, FsProjectTree, MigrationOptions, discover_project_roots, require_router_dependency,
    run_migration,
};
use ngmigrate_npm::{RegistryClient, normalize_repository_url};
use ngmigrate_types::MigrationReport;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub package_name: String,
    pub target: Utf8PathBuf,
    pub repair: RepairOutcome,
    /// Present when the clone depended on `@uirouter/angular`.
    pub migration: Option<MigrationReport>,
}

/// The repository basename without `.git`.
pub fn package_name_from_url(repo_url: &str) -> String {
    let trimmed = repo_url.trim_end_matches('/');
    let base = trimmed.rsplit(['/', ':']).next().unwrap_or(trimmed);
    base.strip_suffix(".git").unwrap_or(base).to_string()
}

/// Clone URL for an npm package, from its registry `repository` field.
pub fn resolve_repository_url(registry: &dyn RegistryClient, package: &str) -> anyhow::Result<String> {
    let metadata = registry
        .package_metadata(package)
        .with_context(|| format!("fetch registry metadata for {package}"))?;
    let repository = metadata.repository.or_else(|| {
        let latest = metadata.dist_tags.get("latest")?;
        metadata.versions.get(latest)?.repository.clone()
    });
    match repository {
        Some(repository) => Ok(normalize_repository_url(repository.url())),
        None => bail!("{package} does not declare a repository"),
    }
}

/// Clone, install, repair, migrate and copy out one package.
pub fn checkout_and_update(
    settings: &CheckoutSettings,
    runner: &dyn CommandRunner,
    registry: &dyn RegistryClient,
    progress: &mut dyn ProgressReporter,
) -> anyhow::Result<CheckoutOutcome> {
    let package_name = settings
        .package_name
        .clone()
        .unwrap_or_else(|| package_name_from_url(&settings.repo_url));
    let target = match &settings.target {
        Some(target) if target.is_absolute() => target.clone(),
        Some(target) => settings.work_dir.join(target),
        None => settings
            .work_dir
            .join(&settings.target_root)
            .join(&package_name),
    };

    progress.message(Tone::Warning, "Starting the Angular package update process...");
    let temp = tempfile::Builder::new()
        .prefix("angular-update-")
        .tempdir()
        .context("create temporary clone directory")?;
    let clone_dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
        .map_err(|p| anyhow!("temporary directory {} is not valid UTF-8", p.display()))?;

    let result = update_clone(settings, &clone_dir, &package_name, &target, runner, registry, progress);
    match &result {
        Ok(_) => progress.message(
            Tone::Success,
            "Angular package update process completed successfully.",
        ),
        Err(err) => progress.message(Tone::Failure, &format!("An error occurred: {err:#}")),
    }

    let cleanup = run_step(progress, "Cleaning up temporary files", |_| {
        temp.close()
            .with_context(|| format!("remove temporary clone {clone_dir}"))
    });
    let (repair, migration) = result?;
    cleanup?;

    Ok(CheckoutOutcome {
        package_name,
        target,
        repair,
        migration,
    })
}

fn update_clone(
    settings: &CheckoutSettings,
    clone_dir: &Utf8Path,
    package_name: &str,
    target: &Utf8Path,
    runner: &dyn CommandRunner,
    registry: &dyn RegistryClient,
    progress: &mut dyn ProgressReporter,
) -> anyhow::Result<(RepairOutcome, Option<MigrationReport>)> {
    run_step(progress, "Cloning repository", |_| {
        runner.run(
            &format!(r#"git clone "{}" "{}""#, settings.repo_url, clone_dir),
            &settings.work_dir,
        )?;
        Ok(())
    })?;

    run_step(progress, "Installing NPM packages", |_| {
        runner.run("npm install", clone_dir)?;
        Ok(())
    })?;

    let repair = run_step(progress, "Updating Angular versions", |progress| {
        let mut repair = RepairLoop::new(&settings.repair, runner, registry);
        Ok(repair.run(clone_dir, progress)?)
    })?;

    let package_dir = run_step(progress, "Locating package directory", |_| {
        find_package_dir(clone_dir, package_name)
    })?;

    let migration = if settings.migrate_ui_router && depends_on_ui_router(clone_dir)? {
        Some(run_step(progress, "Migrating UI-Router to Angular Router", |_| {
            migrate_clone(clone_dir)
        })?)
    } else {
        None
    };

    run_step(progress, "Copying updated package to target location", |_| {
        copy_dir(&package_dir, target)
    })?;

    Ok((repair, migration))
}

fn run_step<T>(
    progress: &mut dyn ProgressReporter,
    label: &str,
    step: impl FnOnce(&mut dyn ProgressReporter) -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    progress.on_step_start(label);
    let value = step(&mut *progress).with_context(|| label.to_lowercase())?;
    progress.on_step_end(label);
    Ok(value)
}

/// Depth-first, sorted, hidden directories and `node_modules` skipped: the
/// first directory named `package_name` or `src`.
pub fn find_package_dir(root: &Utf8Path, package_name: &str) -> anyhow::Result<Utf8PathBuf> {
    let candidates = [package_name, "src"];
    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !name.starts_with('.') && name != "node_modules"
        });

    for entry in walker {
        let entry = entry.with_context(|| format!("walk {root}"))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        if candidates.iter().any(|c| entry.file_name() == *c) {
            let found = Utf8PathBuf::from_path_buf(entry.into_path())
                .map_err(|p| anyhow!("{} is not valid UTF-8", p.display()))?;
            debug!(path = %found, "package directory");
            return Ok(found);
        }
    }

    bail!(
        "none of the specified directories ({}) were found in the repository",
        candidates.join(", ")
    )
}

fn depends_on_ui_router(clone_dir: &Utf8Path) -> anyhow::Result<bool> {
    match require_router_dependency(&FsProjectTree::new(clone_dir)) {
        Ok(()) => Ok(true),
        Err(DomainError::MissingRouterDependency) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

fn migrate_clone(clone_dir: &Utf8Path) -> anyhow::Result<MigrationReport> {
    let mut tree = FsProjectTree::new(clone_dir);
    let roots = discover_project_roots(&tree)?;
    let report = run_migration(&mut tree, &MigrationOptions { roots, dry_run: false })?;
    info!(changed = report.changes.len(), "ui-router migration applied to clone");
    Ok(report)
}

/// Recursive copy of `src` into `dest`, creating `dest`.
pub fn copy_dir(src: &Utf8Path, dest: &Utf8Path) -> anyhow::Result<()> {
    fs::create_dir_all(dest).with_context(|| format!("create {dest}"))?;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.with_context(|| format!("walk {src}"))?;
        let rel = entry
            .path()
            .strip_prefix(src.as_std_path())
            .with_context(|| format!("{} is outside {src}", entry.path().display()))?;
        let to = dest.as_std_path().join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&to)?;
        } else {
            fs::copy(entry.path(), &to)?;
        }
    }
    Ok(())
}

//! The dependency-version repair loop.
//!
//! Steps the target dependency one major version at a time with `ng update`.
//! A failed step is classified, repaired and retried from the same major;
//! every failure counts against one shared attempt budget.

use crate::classify::{FailureKind, PeerConflict, classify_failure};
use crate::ports::{CommandFailure, CommandRunner, ProgressReporter, Tone};
use crate::settings::RepairSettings;
use camino::Utf8Path;
use ngmigrate_npm::{
    DependencyUpdate, ManifestError, PackageManifest, RegistryClient, RegistryError,
    find_compatible_version, latest_major, major_of,
};
use thiserror::Error;
use tracing::{debug, info, warn};

const MANIFEST_FILE: &str = "package.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RepairState {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
    AttemptsExhausted,
}

#[derive(Debug, Error)]
pub enum RepairError {
    #[error("update failed with an unhandled error: {text}")]
    ClassificationMiss { text: String },

    #[error("update failed after reaching maximum attempts ({attempts})")]
    AttemptsExhausted { attempts: u32, last_failure: String },

    #[error("{reason}")]
    Unrecoverable { reason: String },

    #[error("registry lookup failed")]
    Lookup(#[from] RegistryError),

    #[error(transparent)]
    Command(#[from] CommandFailure),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

impl RepairError {
    /// The state the loop ends in when it fails with this error.
    pub fn terminal_state(&self) -> RepairState {
        match self {
            RepairError::AttemptsExhausted { .. } => RepairState::AttemptsExhausted,
            _ => RepairState::Failed,
        }
    }

    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// Attempt bookkeeping shared by every failure branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptState {
    pub attempts: u32,
    pub max_attempts: u32,
    pub last_failure: Option<String>,
}

impl AttemptState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            last_failure: None,
        }
    }

    fn record(&mut self, failure: &str) {
        self.attempts += 1;
        self.last_failure = Some(failure.to_string());
    }

    pub fn exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairOutcome {
    pub state: RepairState,
    pub from_major: u64,
    pub to_major: u64,
    /// Majors whose `ng update` step succeeded, in order.
    pub completed: Vec<u64>,
    /// Failed attempts along the way.
    pub attempts: u32,
}

/// `npx ng update <p>@^M.0.0 ... --allow-dirty`.
pub fn update_command(settings: &RepairSettings, major: u64) -> String {
    let targets: Vec<String> = settings
        .update_packages
        .iter()
        .map(|p| format!("{p}@^{major}.0.0"))
        .collect();
    format!("npx ng update {} --allow-dirty", targets.join(" "))
}

pub struct RepairLoop<'a> {
    settings: &'a RepairSettings,
    runner: &'a dyn CommandRunner,
    registry: &'a dyn RegistryClient,
    state: RepairState,
}

impl<'a> RepairLoop<'a> {
    pub fn new(
        settings: &'a RepairSettings,
        runner: &'a dyn CommandRunner,
        registry: &'a dyn RegistryClient,
    ) -> Self {
        Self {
            settings,
            runner,
            registry,
            state: RepairState::Idle,
        }
    }

    pub fn state(&self) -> RepairState {
        self.state
    }

    /// Step `project_dir` up to the latest major of the configured package.
    pub fn run(
        &mut self,
        project_dir: &Utf8Path,
        progress: &mut dyn ProgressReporter,
    ) -> Result<RepairOutcome, RepairError> {
        self.state = RepairState::Running;
        let result = self.drive(project_dir, progress);
        self.state = match &result {
            Ok(_) => RepairState::Succeeded,
            Err(err) => err.terminal_state(),
        };
        match &result {
            Ok(_) => progress.message(
                Tone::Success,
                &format!("Successfully updated {} to the latest major.", self.settings.package),
            ),
            Err(err) => progress.message(Tone::Failure, &format!("Update failed: {err}")),
        }
        result.map(|outcome| RepairOutcome {
            state: RepairState::Succeeded,
            ..outcome
        })
    }

    fn drive(
        &self,
        project_dir: &Utf8Path,
        progress: &mut dyn ProgressReporter,
    ) -> Result<RepairOutcome, RepairError> {
        let package = self.settings.package.as_str();
        let manifest_path = project_dir.join(MANIFEST_FILE);
        let manifest = PackageManifest::load(&manifest_path)?;

        let current = manifest
            .current_range(package)
            .and_then(major_of)
            .ok_or_else(|| RepairError::Unrecoverable {
                reason: format!("{manifest_path} does not declare a version of {package}"),
            })?;
        let latest = latest_major(self.registry, package)?.ok_or_else(|| RepairError::Unrecoverable {
            reason: format!("the registry's latest {package} has no major version"),
        })?;
        info!(package, current, latest, "stepping majors");

        let mut outcome = RepairOutcome {
            state: RepairState::Running,
            from_major: current,
            to_major: latest,
            completed: Vec::new(),
            attempts: 0,
        };
        let mut attempt = AttemptState::new(self.settings.max_attempts);
        let mut next = current + 1;

        while next <= latest {
            let label = format!("Updating {package} to ^{next}.0.0");
            progress.on_step_start(&label);

            match self.runner.run(&update_command(self.settings, next), project_dir) {
                Ok(_) => {
                    progress.on_step_end(&label);
                    outcome.completed.push(next);
                    next += 1;
                }
                Err(failure) => {
                    let text = failure.diagnostic_text().to_string();
                    attempt.record(&text);
                    outcome.attempts = attempt.attempts;

                    let Some(kind) = classify_failure(&text) else {
                        return Err(RepairError::ClassificationMiss { text });
                    };
                    if attempt.exhausted() {
                        return Err(RepairError::AttemptsExhausted {
                            attempts: attempt.attempts,
                            last_failure: text,
                        });
                    }
                    warn!(
                        attempt = attempt.attempts,
                        major = next,
                        kind = kind.name(),
                        "update step failed; repairing"
                    );
                    self.repair(kind, project_dir, progress)?;
                }
            }
        }

        Ok(outcome)
    }

    fn repair(
        &self,
        kind: FailureKind,
        project_dir: &Utf8Path,
        progress: &mut dyn ProgressReporter,
    ) -> Result<(), RepairError> {
        match kind {
            FailureKind::NpmVersionMismatch {
                required: Some(version),
            } => {
                progress.message(
                    Tone::Warning,
                    &format!("Updating global npm to version {version} to meet Angular CLI requirements."),
                );
                self.runner
                    .run(&format!("npm install --global npm@{version}"), project_dir)?;
            }
            FailureKind::NpmVersionMismatch { required: None } => {
                warn!("npm version mismatch without a required version; retrying as is");
            }
            FailureKind::UnmetPeers(updates) => {
                for update in &updates {
                    progress.message(
                        Tone::Failure,
                        &format!("Found peer dependency issue: {} {}", update.name, update.range),
                    );
                }
                if updates.is_empty() {
                    return Ok(());
                }
                self.patch_manifest(project_dir, &updates, progress)?;
                progress.message(Tone::Warning, "Attempting to fix peer dependencies and retrying.");
                self.runner.run("npm install", project_dir)?;
            }
            FailureKind::IncompatiblePeers(conflicts) => {
                let mut updates = Vec::new();
                for conflict in conflicts {
                    progress.message(
                        Tone::Failure,
                        &format!(
                            "Found incompatible peer dependency issue: {} {} {}",
                            conflict.package, conflict.peer, conflict.detail
                        ),
                    );
                    match self.pin_for(&conflict)? {
                        Some(update) => updates.push(update),
                        None => self.force_install(&conflict, project_dir, progress)?,
                    }
                }
                if !updates.is_empty() {
                    self.patch_manifest(project_dir, &updates, progress)?;
                    progress.message(
                        Tone::Warning,
                        "Attempting to fix incompatible peer dependencies and retrying.",
                    );
                    self.runner.run("npm install -f", project_dir)?;
                }
            }
        }
        Ok(())
    }

    /// A compatible version of the conflicting package, else the version npm
    /// would install for the peer.
    fn pin_for(&self, conflict: &PeerConflict) -> Result<Option<DependencyUpdate>, RepairError> {
        let Some(would_install) = conflict.would_install.as_deref() else {
            return Ok(None);
        };
        let compatible =
            find_compatible_version(self.registry, &conflict.package, &conflict.peer, would_install)?;
        Ok(Some(match compatible {
            Some(version) => {
                debug!(package = %conflict.package, %version, "compatible version found");
                DependencyUpdate::new(&conflict.package, version)
            }
            None => DependencyUpdate::new(&conflict.peer, would_install),
        }))
    }

    fn force_install(
        &self,
        conflict: &PeerConflict,
        project_dir: &Utf8Path,
        progress: &mut dyn ProgressReporter,
    ) -> Result<(), RepairError> {
        progress.message(
            Tone::Failure,
            "Unable to find compatible version. Trying to force the install",
        );
        self.runner
            .run("npm install -f", project_dir)
            .map(|_| ())
            .map_err(|failure| RepairError::Unrecoverable {
                reason: format!(
                    "unable to extract a version for {} ({}); forced install failed: {}",
                    conflict.package,
                    conflict.detail,
                    failure.diagnostic_text().trim()
                ),
            })
    }

    fn patch_manifest(
        &self,
        project_dir: &Utf8Path,
        updates: &[DependencyUpdate],
        progress: &mut dyn ProgressReporter,
    ) -> Result<(), RepairError> {
        let path = project_dir.join(MANIFEST_FILE);
        let mut manifest = PackageManifest::load(&path)?;
        let changed = manifest.apply_updates(updates);
        manifest.save(&path)?;
        debug!(path = %path, changed, "manifest patched");
        progress.message(Tone::Success, "package.json updated with new versions.");
        Ok(())
    }
}

#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use ngmigrate_core::ports::{CommandFailure, CommandOutput, CommandRunner, ProgressReporter, Tone};
use ngmigrate_npm::{PackageMetadata, RegistryClient, RegistryError, VersionManifest};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};

type Hook = Box<dyn Fn(&str, &Utf8Path)>;

/// Commands succeed unless the next scripted entry's prefix matches.
#[derive(Default)]
pub struct ScriptedRunner {
    pub calls: RefCell<Vec<String>>,
    script: RefCell<VecDeque<(String, String)>>,
    hook: Option<Hook>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next command starting with `prefix` fails with `stderr`.
    pub fn fail(self, prefix: &str, stderr: &str) -> Self {
        self.script
            .borrow_mut()
            .push_back((prefix.to_string(), stderr.to_string()));
        self
    }

    /// Runs before every command, e.g. to fake `git clone`.
    pub fn on_run(mut self, hook: impl Fn(&str, &Utf8Path) + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn calls_starting_with(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &str, cwd: &Utf8Path) -> Result<CommandOutput, CommandFailure> {
        self.calls.borrow_mut().push(command.to_string());

        let scripted = {
            let mut script = self.script.borrow_mut();
            match script.front() {
                Some((prefix, _)) if command.starts_with(prefix.as_str()) => script.pop_front(),
                _ => None,
            }
        };
        if let Some((_, stderr)) = scripted {
            return Err(CommandFailure {
                command: command.to_string(),
                stdout: String::new(),
                stderr,
                exit_code: Some(1),
            });
        }

        if let Some(hook) = &self.hook {
            hook(command, cwd);
        }
        Ok(CommandOutput::default())
    }
}

#[derive(Default)]
pub struct CannedRegistry {
    pub latest: BTreeMap<String, String>,
    pub metadata: BTreeMap<String, PackageMetadata>,
    pub rate_limited: bool,
}

impl CannedRegistry {
    pub fn with_latest(mut self, package: &str, version: &str) -> Self {
        self.latest.insert(package.to_string(), version.to_string());
        self
    }

    /// Publish `versions` of `package`, each declaring `peer` at the paired range.
    pub fn with_versions(mut self, package: &str, peer: &str, versions: &[(&str, &str)]) -> Self {
        let versions = versions
            .iter()
            .map(|(version, range)| {
                (
                    version.to_string(),
                    VersionManifest {
                        name: package.to_string(),
                        version: version.to_string(),
                        peer_dependencies: BTreeMap::from([(peer.to_string(), range.to_string())]),
                        ..VersionManifest::default()
                    },
                )
            })
            .collect();
        self.metadata.insert(
            package.to_string(),
            PackageMetadata {
                name: package.to_string(),
                versions,
                ..PackageMetadata::default()
            },
        );
        self
    }
}

impl RegistryClient for CannedRegistry {
    fn package_metadata(&self, name: &str) -> Result<PackageMetadata, RegistryError> {
        if self.rate_limited {
            return Err(RegistryError::RateLimited { url: name.to_string() });
        }
        self.metadata
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::HttpStatus {
                url: name.to_string(),
                status: 404,
            })
    }

    fn package_manifest(&self, name: &str, version: &str) -> Result<VersionManifest, RegistryError> {
        if self.rate_limited {
            return Err(RegistryError::RateLimited { url: name.to_string() });
        }
        let version = match version {
            "latest" => self.latest.get(name).cloned(),
            other => Some(other.to_string()),
        };
        version
            .map(|version| VersionManifest {
                name: name.to_string(),
                version,
                ..VersionManifest::default()
            })
            .ok_or_else(|| RegistryError::HttpStatus {
                url: name.to_string(),
                status: 404,
            })
    }
}

/// Records step transitions and messages.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    pub events: Vec<String>,
}

impl ProgressReporter for RecordingProgress {
    fn on_step_start(&mut self, label: &str) {
        self.events.push(format!("start {label}"));
    }

    fn on_step_end(&mut self, label: &str) {
        self.events.push(format!("end {label}"));
    }

    fn message(&mut self, tone: Tone, text: &str) {
        self.events.push(format!("{tone:?}: {text}"));
    }
}

pub fn project_with_manifest(manifest: &str) -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 temp dir");
    fs_err::write(root.join("package.json"), manifest).expect("write manifest");
    (temp, root)
}

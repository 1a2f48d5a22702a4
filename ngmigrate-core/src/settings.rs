//! Clap-free settings for the repair loop and the checkout pipeline.

use camino::Utf8PathBuf;
use ngmigrate_npm::DEFAULT_REGISTRY;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Settings for the dependency-version repair loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairSettings {
    /// The dependency whose major version is stepped.
    pub package: String,
    /// Packages passed to every `ng update` step.
    pub update_packages: Vec<String>,
    pub max_attempts: u32,
    pub registry_url: String,
}

impl Default for RepairSettings {
    fn default() -> Self {
        Self {
            package: "@angular/core".to_string(),
            update_packages: vec!["@angular/cli".to_string(), "@angular/core".to_string()],
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            registry_url: DEFAULT_REGISTRY.to_string(),
        }
    }
}

/// Settings for `migrate repo` / `migrate npm`.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub repo_url: String,
    /// Where the package lands. Defaults to `<work_dir>/<target_root>/<package name>`.
    pub target: Option<Utf8PathBuf>,
    /// Directory name to look for in the clone. Defaults to the repository basename.
    pub package_name: Option<String>,
    pub work_dir: Utf8PathBuf,
    pub target_root: Utf8PathBuf,
    /// Run the ui-router migration when the clone depends on `@uirouter/angular`.
    pub migrate_ui_router: bool,
    pub repair: RepairSettings,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            repo_url: String::new(),
            target: None,
            package_name: None,
            work_dir: Utf8PathBuf::from("."),
            target_root: Utf8PathBuf::from("angular-pkgs"),
            migrate_ui_router: true,
            repair: RepairSettings::default(),
        }
    }
}

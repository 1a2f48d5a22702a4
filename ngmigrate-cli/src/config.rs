//! Configuration file loading for ngmigrate.
//!
//! Discovers and loads `ngmigrate.toml` from the working directory.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use ngmigrate_core::settings::{CheckoutSettings, RepairSettings};
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "ngmigrate.toml";

/// Top-level configuration from ngmigrate.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NgmigrateConfig {
    pub repair: RepairConfig,
    pub migrate: MigrateConfig,
    pub ui_router: UiRouterConfig,
}

/// `[repair]`: the major-version stepping loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// The dependency whose major version is stepped.
    pub package: String,

    /// Packages handed to every `ng update` step.
    pub update_packages: Vec<String>,

    /// Failed attempts allowed before giving up.
    pub max_attempts: u32,

    /// npm registry base URL.
    pub registry_url: String,
}

impl Default for RepairConfig {
    fn default() -> Self {
        let defaults = RepairSettings::default();
        Self {
            package: defaults.package,
            update_packages: defaults.update_packages,
            max_attempts: defaults.max_attempts,
            registry_url: defaults.registry_url,
        }
    }
}

/// `[migrate]`: the checkout-and-update pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrateConfig {
    /// Parent directory of default targets.
    pub target_root: Utf8PathBuf,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            target_root: CheckoutSettings::default().target_root,
        }
    }
}

/// `[ui_router]`: the in-place markup and source migration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiRouterConfig {
    /// Explicit project roots. Empty means discover them.
    pub projects: Vec<Utf8PathBuf>,

    /// Refuse to run unless `@uirouter/angular` is a dependency.
    pub require_dependency: bool,
}

impl Default for UiRouterConfig {
    fn default() -> Self {
        Self {
            projects: Vec::new(),
            require_dependency: true,
        }
    }
}

/// Discover the ngmigrate.toml config file.
///
/// Returns `None` if no config file is found.
pub fn discover_config(work_dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = work_dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse an ngmigrate.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<NgmigrateConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<NgmigrateConfig> {
    let config: NgmigrateConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from the working directory, or return default if not found.
pub fn load_or_default(work_dir: &Utf8Path) -> anyhow::Result<NgmigrateConfig> {
    match discover_config(work_dir) {
        Some(path) => load_config(&path),
        None => Ok(NgmigrateConfig::default()),
    }
}

/// CLI overrides shared by `migrate repo` and `migrate npm`.
#[derive(Debug, Clone, Default)]
pub struct RepairOverrides {
    pub max_attempts: Option<u32>,
    pub registry_url: Option<String>,
}

/// The ui-router settings after merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedUiRouter {
    pub projects: Vec<Utf8PathBuf>,
    pub require_dependency: bool,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: NgmigrateConfig,
}

impl ConfigMerger {
    pub fn new(config: NgmigrateConfig) -> Self {
        Self { config }
    }

    /// Repair settings with CLI values replacing file values when given.
    pub fn merge_repair_args(&self, cli: &RepairOverrides) -> RepairSettings {
        let file = &self.config.repair;
        RepairSettings {
            package: file.package.clone(),
            update_packages: file.update_packages.clone(),
            max_attempts: cli.max_attempts.unwrap_or(file.max_attempts),
            registry_url: cli
                .registry_url
                .clone()
                .unwrap_or_else(|| file.registry_url.clone()),
        }
    }

    /// Checkout settings for one `migrate` invocation rooted at `work_dir`.
    pub fn merge_checkout_args(
        &self,
        work_dir: &Utf8Path,
        repo_url: String,
        target: Option<Utf8PathBuf>,
        package_name: Option<String>,
        skip_ui_router: bool,
        repair: &RepairOverrides,
    ) -> CheckoutSettings {
        CheckoutSettings {
            repo_url,
            target,
            package_name,
            work_dir: work_dir.to_path_buf(),
            target_root: self.config.migrate.target_root.clone(),
            migrate_ui_router: !skip_ui_router,
            repair: self.merge_repair_args(repair),
        }
    }

    /// CLI `--project` values replace the configured list when any are given.
    pub fn merge_ui_router_args(
        &self,
        cli_projects: &[Utf8PathBuf],
        skip_dependency_check: bool,
    ) -> MergedUiRouter {
        let projects = if cli_projects.is_empty() {
            self.config.ui_router.projects.clone()
        } else {
            cli_projects.to_vec()
        };
        MergedUiRouter {
            projects,
            require_dependency: self.config.ui_router.require_dependency && !skip_dependency_check,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let contents = r#"
[repair]
package = "@angular/core"
update_packages = ["@angular/cli", "@angular/core", "@angular/material"]
max_attempts = 4
registry_url = "https://npm.example.test"

[migrate]
target_root = "vendor"

[ui_router]
projects = ["apps/shell", "libs/ui"]
require_dependency = false
"#;

        let config = parse_config(contents).unwrap();
        assert_eq!(config.repair.update_packages.len(), 3);
        assert_eq!(config.repair.max_attempts, 4);
        assert_eq!(config.repair.registry_url, "https://npm.example.test");
        assert_eq!(config.migrate.target_root, "vendor");
        assert_eq!(config.ui_router.projects, vec!["apps/shell", "libs/ui"]);
        assert!(!config.ui_router.require_dependency);
    }

    #[test]
    fn test_parse_partial_sections_keep_defaults() {
        let contents = r#"
[repair]
max_attempts = 3
"#;

        let config = parse_config(contents).unwrap();
        assert_eq!(config.repair.max_attempts, 3);
        assert_eq!(config.repair.package, "@angular/core");
        assert_eq!(
            config.repair.update_packages,
            vec!["@angular/cli", "@angular/core"]
        );
        assert_eq!(config.migrate.target_root, "angular-pkgs");
        assert!(config.ui_router.require_dependency);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert_eq!(config.repair.max_attempts, 8);
        assert!(config.ui_router.projects.is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_types() {
        let err = parse_config("[repair]\nmax_attempts = \"many\"\n").unwrap_err();
        assert!(err.to_string().contains("invalid TOML"));
    }

    #[test]
    fn test_cli_wins_for_repair() {
        let config = parse_config("[repair]\nmax_attempts = 3\n").unwrap();
        let merger = ConfigMerger::new(config);

        let from_file = merger.merge_repair_args(&RepairOverrides::default());
        assert_eq!(from_file.max_attempts, 3);

        let from_cli = merger.merge_repair_args(&RepairOverrides {
            max_attempts: Some(10),
            registry_url: Some("http://localhost:4873".to_string()),
        });
        assert_eq!(from_cli.max_attempts, 10);
        assert_eq!(from_cli.registry_url, "http://localhost:4873");
    }

    #[test]
    fn test_checkout_settings_use_configured_target_root() {
        let config = parse_config("[migrate]\ntarget_root = \"vendor\"\n").unwrap();
        let settings = ConfigMerger::new(config).merge_checkout_args(
            Utf8Path::new("/work"),
            "https://github.com/acme/lib.git".to_string(),
            None,
            None,
            true,
            &RepairOverrides::default(),
        );
        assert_eq!(settings.target_root, "vendor");
        assert_eq!(settings.work_dir, "/work");
        assert!(!settings.migrate_ui_router);
    }

    #[test]
    fn test_ui_router_projects_cli_replaces_config() {
        let config = parse_config("[ui_router]\nprojects = [\"apps/a\"]\n").unwrap();
        let merger = ConfigMerger::new(config);

        let merged = merger.merge_ui_router_args(&[], false);
        assert_eq!(merged.projects, vec!["apps/a"]);
        assert!(merged.require_dependency);

        let merged = merger.merge_ui_router_args(&[Utf8PathBuf::from("libs/b")], true);
        assert_eq!(merged.projects, vec!["libs/b"]);
        assert!(!merged.require_dependency);
    }

    #[test]
    fn test_discover_config_some_and_none() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        assert!(discover_config(&root).is_none());

        std::fs::write(root.join(CONFIG_FILE_NAME), "").expect("write config");
        assert!(discover_config(&root).is_some());
    }

    #[test]
    fn test_load_or_default_returns_default_when_missing() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        let cfg = load_or_default(&root).expect("load default");
        assert!(cfg.ui_router.require_dependency);
        assert_eq!(cfg.repair.max_attempts, 8);
    }
}

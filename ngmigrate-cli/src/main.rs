use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use ngmigrate_cli::config::{self, ConfigMerger, RepairOverrides};
use ngmigrate_cli::notice::maintenance_notice;
use ngmigrate_core::adapters::{ConsoleProgress, ShellCommandRunner};
use ngmigrate_core::{NpmRegistry, RepairError, checkout_and_update, resolve_repository_url};
use ngmigrate_domain::{
    DEFAULT_MAINTENANCE_VERSION, FsProjectTree, MigrationOptions, discover_project_roots,
    rename_to_maintenance, require_router_dependency, run_migration,
};
use ngmigrate_edit::render_patch;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "ngmigrate",
    version,
    about = "Migrate Angular workspaces off UI-Router and step them to the latest Angular major."
)]
struct Cli {
    /// Working directory holding the workspace and ngmigrate.toml.
    #[arg(long, global = true, default_value = ".")]
    root: Utf8PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the maintenance notice for a renamed package (postinstall hook).
    Warn(WarnArgs),
    /// Clone a package, update its Angular version and copy it out.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Rewrite UI-Router templates and hooks to the Angular Router in place.
    UiRouter(UiRouterArgs),
    /// Move a dependency into the @ngx-maintenance scope.
    Rename(RenameArgs),
}

#[derive(Debug, Subcommand)]
enum MigrateCommand {
    /// Start from a git repository URL.
    Repo(RepoArgs),
    /// Start from an npm package; the repository comes from the registry.
    Npm(NpmArgs),
}

#[derive(Debug, Args)]
struct WarnArgs {
    /// Name of the original package.
    package: String,
}

#[derive(Debug, Args)]
struct RepoArgs {
    /// URL of the git repository to clone.
    repo_url: String,

    /// Where to copy the updated package (default: <target_root>/<package name>).
    target: Option<Utf8PathBuf>,

    /// Directory to look for in the clone (default: repository name).
    #[arg(long)]
    package_name: Option<String>,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Debug, Args)]
struct NpmArgs {
    /// npm package name.
    package: String,

    /// Where to copy the updated package (default: <target_root>/<package name>).
    target: Option<Utf8PathBuf>,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Debug, Args)]
struct PipelineArgs {
    /// Failed update attempts allowed before giving up.
    #[arg(long)]
    max_attempts: Option<u32>,

    /// npm registry base URL.
    #[arg(long, env = "NGMIGRATE_REGISTRY")]
    registry: Option<String>,

    /// Skip the UI-Router migration even when the clone depends on it.
    #[arg(long, default_value_t = false)]
    no_ui_router: bool,
}

impl PipelineArgs {
    fn overrides(&self) -> RepairOverrides {
        RepairOverrides {
            max_attempts: self.max_attempts,
            registry_url: self.registry.clone(),
        }
    }
}

#[derive(Debug, Args)]
struct UiRouterArgs {
    /// Project root to migrate, relative to --root. Repeatable; default: discovered.
    #[arg(long = "project")]
    projects: Vec<Utf8PathBuf>,

    /// Compute every rewrite and print a patch without writing anything.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Run even when package.json does not list @uirouter/angular.
    #[arg(long, default_value_t = false)]
    skip_dependency_check: bool,
}

#[derive(Debug, Args)]
struct RenameArgs {
    /// Package to move into the maintenance scope.
    package: String,

    /// Version range for the renamed dependency.
    #[arg(long, default_value = DEFAULT_MAINTENANCE_VERSION)]
    version: String,
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        error!("{:?}", e);
        return ExitCode::from(exit_code(&e));
    }
    ExitCode::from(0)
}

fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<RepairError>()
        .map(RepairError::exit_code)
        .unwrap_or(1)
}

fn real_main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Warn(args) => cmd_warn(args),
        Command::Migrate(MigrateCommand::Repo(args)) => cmd_migrate_repo(cli.root, args),
        Command::Migrate(MigrateCommand::Npm(args)) => cmd_migrate_npm(cli.root, args),
        Command::UiRouter(args) => cmd_ui_router(cli.root, args),
        Command::Rename(args) => cmd_rename(cli.root, args),
    }
}

fn cmd_warn(args: WarnArgs) -> anyhow::Result<()> {
    println!("{}", maintenance_notice(&args.package));
    Ok(())
}

fn cmd_migrate_repo(root: Utf8PathBuf, args: RepoArgs) -> anyhow::Result<()> {
    let file_config = config::load_or_default(&root).context("load ngmigrate.toml config")?;
    let settings = ConfigMerger::new(file_config).merge_checkout_args(
        &root,
        args.repo_url,
        args.target,
        args.package_name,
        args.pipeline.no_ui_router,
        &args.pipeline.overrides(),
    );
    debug!("merged settings: {:?}", settings);

    let registry = NpmRegistry::new(settings.repair.registry_url.as_str())
        .context("create registry client")?;
    let outcome = checkout_and_update(
        &settings,
        &ShellCommandRunner,
        &registry,
        &mut ConsoleProgress::new(),
    )?;

    info!(
        package = %outcome.package_name,
        target = %outcome.target,
        from = outcome.repair.from_major,
        to = outcome.repair.to_major,
        "package updated"
    );
    Ok(())
}

fn cmd_migrate_npm(root: Utf8PathBuf, args: NpmArgs) -> anyhow::Result<()> {
    let file_config = config::load_or_default(&root).context("load ngmigrate.toml config")?;
    let merger = ConfigMerger::new(file_config);
    let overrides = args.pipeline.overrides();

    let registry_url = merger.merge_repair_args(&overrides).registry_url;
    let registry = NpmRegistry::new(registry_url.as_str()).context("create registry client")?;
    let repo_url = resolve_repository_url(&registry, &args.package)?;
    info!(package = %args.package, %repo_url, "resolved repository");

    let settings = merger.merge_checkout_args(
        &root,
        repo_url,
        args.target,
        None,
        args.pipeline.no_ui_router,
        &overrides,
    );
    checkout_and_update(
        &settings,
        &ShellCommandRunner,
        &registry,
        &mut ConsoleProgress::new(),
    )?;
    Ok(())
}

fn cmd_ui_router(root: Utf8PathBuf, args: UiRouterArgs) -> anyhow::Result<()> {
    let file_config = config::load_or_default(&root).context("load ngmigrate.toml config")?;
    let merged =
        ConfigMerger::new(file_config).merge_ui_router_args(&args.projects, args.skip_dependency_check);
    debug!("merged config: {:?}", merged);

    let mut tree = FsProjectTree::new(root.clone());
    if merged.require_dependency {
        require_router_dependency(&tree)?;
    }
    let roots = if merged.projects.is_empty() {
        discover_project_roots(&tree).context("discover project roots")?
    } else {
        merged.projects
    };

    let report = run_migration(
        &mut tree,
        &MigrationOptions {
            roots,
            dry_run: args.dry_run,
        },
    )
    .context("migrate ui-router usages")?;

    if args.dry_run {
        print!("{}", render_patch(&report.changes));
    }
    info!(
        scanned = report.files_scanned,
        templates = report.template_targets,
        changed = report.changes.len(),
        applied = report.applied,
        "ui-router migration finished"
    );
    Ok(())
}

fn cmd_rename(root: Utf8PathBuf, args: RenameArgs) -> anyhow::Result<()> {
    let mut tree = FsProjectTree::new(root);
    let outcome = rename_to_maintenance(&mut tree, &args.package, &args.version)?;
    for path in &outcome.sources {
        println!("updated {path}");
    }
    if outcome.manifest_updated {
        println!("package.json: {} -> {}", args.package, outcome.new_name);
    }
    Ok(())
}

//! Domain logic: find the UI-Router usages in a workspace and migrate them.
//!
//! This crate owns *which* files change and in what order. Parsing and span
//! rewriting live in `ngmigrate-markup` and `ngmigrate-source`; file access
//! goes through the [`ProjectTree`] port.

mod error;
mod orchestrator;
mod ports;
mod rename;
mod workspace;

pub use error::DomainError;
pub use orchestrator::{
    MigrationOptions, MigrationTarget, TemplateInfo, apply_report, plan_migration, run_migration,
};
pub use ports::{FsProjectTree, MemoryProjectTree, ProjectTree, read_with_fallback};
pub use rename::{
    DEFAULT_MAINTENANCE_VERSION, MAINTENANCE_SCOPE, RenameOutcome, maintenance_name,
    rename_to_maintenance,
};
pub use workspace::{MANIFEST_FILE, discover_project_roots, require_router_dependency};

//! Shared DTOs for the ngmigrate workspace.
//!
//! # Design constraints
//! - Offsets are byte offsets into the *original* text buffer they were
//!   computed from, never into a partially edited one.
//! - Reports are serializable so the CLI can emit them as JSON.

pub mod file;
pub mod report;
pub mod span;
pub mod vocab;

pub use file::{FileRole, TemplateLocation};
pub use report::{FileChange, MigrationReport};
pub use span::{ReplacementSpan, Span};

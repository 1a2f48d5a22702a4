//! TypeScript source introspection and rewrites.
//!
//! Files are parsed with tree-sitter. Each transform computes replacement
//! spans against the current text, applies them through `ngmigrate-edit`
//! and reparses, so text outside the touched nodes is preserved byte for
//! byte.

mod component;
mod error;
mod lifecycle;
mod syntax;

pub use component::{Component, StringLiteral, TemplateSource, resolve_template_url};
pub use error::{SourceError, SourceResult};
pub use syntax::SourceFile;

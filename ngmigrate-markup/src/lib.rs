//! Angular template parsing and UI-Router rewrite.
//!
//! Offsets in the parsed tree address the original template text; the
//! rewriter turns vocabulary hits into replacement spans and hands them to
//! `ngmigrate-edit`, which applies them back to front.

pub mod parser;
pub mod rewrite;

pub use parser::{
    Attribute, Element, Expansion, ExpansionCase, MarkupError, MarkupNode, Visit, parse_markup,
    try_parse_markup, visit_all,
};
pub use rewrite::{collect_spans, migrate_markup, rewrite_markup};

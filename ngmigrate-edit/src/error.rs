//! Error types for ngmigrate-edit.
//!
//! Overlapping spans are not errors: they are skipped and reported on the
//! outcome. Only spans that cannot address the buffer at all are errors,
//! because they mean the producer computed offsets against different text.

use ngmigrate_types::Span;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    /// The span reaches past the end of the buffer.
    #[error("span {span} is out of bounds for a buffer of {len} bytes")]
    OutOfBounds {
        span: Span,
        len: usize,
    },

    /// The span cuts a multi-byte character in half.
    #[error("span {span} does not fall on a char boundary")]
    CharBoundary { span: Span },
}

/// Result type alias using EditError.
pub type EditResult<T> = Result<T, EditError>;

//! Edit engine for ngmigrate rewrites.
//!
//! Responsibilities:
//! - Apply a set of replacement spans to one buffer, back to front, so every
//!   span keeps addressing the original text.
//! - Refuse (skip) spans that would overlap an edit already made.
//! - Generate a unified diff preview of a batch of file changes.

mod error;

pub use error::{EditError, EditResult};

use diffy::PatchFormatter;
use ngmigrate_types::{FileChange, ReplacementSpan, Span};
use tracing::{debug, warn};

/// Result of applying spans to one buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpliceOutcome {
    pub text: String,
    pub applied: usize,
    /// Spans dropped because they overlapped an edit already made.
    pub skipped: Vec<ReplacementSpan>,
}

/// Apply `spans` to `original`.
///
/// Spans are processed in descending `start` order (ties: longer first), so
/// each splice happens strictly after the region any later splice touches.
/// A span that overlaps one already applied is skipped and reported rather
/// than spliced at stale offsets.
pub fn apply_spans(original: &str, mut spans: Vec<ReplacementSpan>) -> EditResult<SpliceOutcome> {
    for span in &spans {
        check_addressable(original, span.range)?;
    }

    spans.sort_by(|a, b| {
        b.range
            .start
            .cmp(&a.range.start)
            .then(b.range.end.cmp(&a.range.end))
    });

    let mut text = original.to_string();
    let mut floor: Option<Span> = None;
    let mut applied = 0;
    let mut skipped = Vec::new();

    for span in spans {
        if let Some(prev) = floor
            && (span.range.end > prev.start || span.range.overlaps(&prev))
        {
            warn!(span = %span.range, previous = %prev, "skipping overlapping span");
            skipped.push(span);
            continue;
        }

        text.replace_range(span.range.start..span.range.end, &span.replacement);
        debug!(span = %span.range, bytes = span.replacement.len(), "applied span");
        floor = Some(span.range);
        applied += 1;
    }

    Ok(SpliceOutcome {
        text,
        applied,
        skipped,
    })
}

fn check_addressable(text: &str, span: Span) -> EditResult<()> {
    if span.start > span.end || span.end > text.len() {
        return Err(EditError::OutOfBounds {
            span,
            len: text.len(),
        });
    }
    if !text.is_char_boundary(span.start) || !text.is_char_boundary(span.end) {
        return Err(EditError::CharBoundary { span });
    }
    Ok(())
}

/// Render a git-style unified diff for every change that is not a no-op.
pub fn render_patch(changes: &[FileChange]) -> String {
    let mut out = String::new();
    let formatter = PatchFormatter::new();

    for change in changes {
        if change.is_noop() {
            continue;
        }

        out.push_str(&format!("diff --git a/{0} b/{0}\n", change.path));
        out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", change.path));

        let patch = diffy::create_patch(&change.before, &change.after);
        let rendered = formatter.fmt_patch(&patch).to_string();
        // diffy repeats the ---/+++ header; keep only the hunks.
        let hunks = rendered
            .split_once("\n@@")
            .map(|(_, rest)| format!("@@{rest}"))
            .unwrap_or(rendered);
        out.push_str(&hunks);
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }

    out
}

//! Property-based tests for span application.
//!
//! These tests verify key invariants:
//! - Offset safety: applying disjoint spans back to front equals computing
//!   every replacement against the original text at once
//! - Input order does not matter for disjoint spans
//! - Overlap never corrupts: the output always equals some disjoint subset

use ngmigrate_edit::apply_spans;
use ngmigrate_types::{ReplacementSpan, Span};
use proptest::prelude::*;

/// Text plus a set of disjoint spans over it, with replacement texts.
fn arb_disjoint_edits() -> impl Strategy<Value = (String, Vec<ReplacementSpan>)> {
    prop::string::string_regex(r"[a-z <>=\x22.]{0,60}")
        .unwrap()
        .prop_flat_map(|text| {
            let len = text.len();
            (
                Just(text),
                prop::collection::btree_set(0..=len, 0..10),
                prop::collection::vec(prop::string::string_regex(r"[A-Z]{0,4}").unwrap(), 10),
            )
        })
        .prop_map(|(text, cuts, replacements)| {
            let cuts: Vec<usize> = cuts.into_iter().collect();
            let spans = cuts
                .chunks(2)
                .zip(replacements)
                .filter(|(pair, _)| pair.len() == 2)
                .map(|(pair, rep)| ReplacementSpan::new(Span::new(pair[0], pair[1]), rep))
                .collect();
            (text, spans)
        })
}

/// Reference: build the output in one left-to-right pass over the original.
fn simultaneous(original: &str, spans: &[ReplacementSpan]) -> String {
    let mut sorted = spans.to_vec();
    sorted.sort_by_key(|s| (s.range.start, s.range.end));
    let mut out = String::new();
    let mut cursor = 0;
    for span in sorted {
        out.push_str(&original[cursor..span.range.start]);
        out.push_str(&span.replacement);
        cursor = span.range.end;
    }
    out.push_str(&original[cursor..]);
    out
}

proptest! {
    #[test]
    fn descending_application_matches_simultaneous((text, spans) in arb_disjoint_edits()) {
        let expected = simultaneous(&text, &spans);
        let outcome = apply_spans(&text, spans.clone()).unwrap();
        prop_assert_eq!(outcome.text, expected);
        prop_assert_eq!(outcome.applied, spans.len());
        prop_assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn input_order_is_irrelevant(
        (text, spans) in arb_disjoint_edits(),
        seed in any::<u64>(),
    ) {
        let mut shuffled = spans.clone();
        if !shuffled.is_empty() {
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
            shuffled.reverse();
        }
        let a = apply_spans(&text, spans).unwrap();
        let b = apply_spans(&text, shuffled).unwrap();
        prop_assert_eq!(a.text, b.text);
    }

    #[test]
    fn overlapping_input_yields_a_disjoint_subset(
        text in prop::string::string_regex(r"[a-z]{1,40}").unwrap(),
        raw in prop::collection::vec((0usize..40, 0usize..10), 0..8),
    ) {
        let len = text.len();
        let spans: Vec<ReplacementSpan> = raw
            .into_iter()
            .map(|(start, width)| {
                let start = start.min(len);
                let end = (start + width).min(len);
                ReplacementSpan::new(Span::new(start, end), "#")
            })
            .collect();

        let outcome = apply_spans(&text, spans.clone()).unwrap();
        prop_assert_eq!(outcome.applied + outcome.skipped.len(), spans.len());

        let applied: Vec<ReplacementSpan> = spans
            .iter()
            .filter(|s| !outcome.skipped.contains(s))
            .cloned()
            .collect();
        // Duplicates of a skipped span are filtered out above too; only compare
        // when the applied set is unambiguous.
        if applied.len() == outcome.applied {
            prop_assert_eq!(outcome.text, simultaneous(&text, &applied));
        }
    }
}

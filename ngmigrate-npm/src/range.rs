//! npm-flavoured version ranges on top of `semver`.
//!
//! npm writes comparator sets separated by spaces and alternatives with
//! `||`; a bare version means an exact match. `semver::VersionReq` uses
//! commas and treats a bare version as a caret requirement, so ranges are
//! translated before parsing.

use semver::{Version, VersionReq};

/// The leading integer run of a version or range string (`^12.1.0` -> 12).
pub fn major_of(version: &str) -> Option<u64> {
    let digits: String = version
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

pub fn parse_version(version: &str) -> Option<Version> {
    let trimmed = version.trim().trim_start_matches(['v', '=']);
    Version::parse(trimmed).ok()
}

/// Whether `range` admits `version`. Unparsable input never matches.
pub fn range_admits(range: &str, version: &str) -> bool {
    let Some(version) = parse_version(version) else {
        return false;
    };
    range
        .split("||")
        .filter_map(to_version_req)
        .any(|req| req.matches(&version))
}

fn to_version_req(alternative: &str) -> Option<VersionReq> {
    let alternative = alternative.trim();
    if matches!(alternative, "" | "*" | "x" | "X" | "latest") {
        return Some(VersionReq::STAR);
    }

    if let Some((low, high)) = alternative.split_once(" - ") {
        return VersionReq::parse(&format!(">={}, <={}", low.trim(), high.trim())).ok();
    }

    let mut comparators = Vec::new();
    let mut pending_op = String::new();
    for token in alternative.split_whitespace() {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            pending_op.push_str(token);
            continue;
        }
        let comparator = format!("{}{token}", std::mem::take(&mut pending_op));
        comparators.push(normalize_comparator(&comparator));
    }
    if comparators.is_empty() {
        return None;
    }
    VersionReq::parse(&comparators.join(", ")).ok()
}

/// npm's bare `1.2.3` is exact and `1.x` is a wildcard.
fn normalize_comparator(comparator: &str) -> String {
    let split = comparator
        .find(|c| !matches!(c, '<' | '>' | '=' | '~' | '^'))
        .unwrap_or(comparator.len());
    let (op, body) = comparator.split_at(split);
    let body = body.strip_prefix('v').unwrap_or(body);
    let body = body
        .split('.')
        .map(|part| if matches!(part, "x" | "X") { "*" } else { part })
        .collect::<Vec<_>>()
        .join(".");

    match op {
        "" | "=" if body.contains('*') => body,
        "" | "=" => format!("={body}"),
        _ if body.contains('*') => format!("{op}{}", body.trim_end_matches(".*")),
        _ => format!("{op}{body}"),
    }
}

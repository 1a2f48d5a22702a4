//! Failure classification for `ng update` and `npm` output.
//!
//! The rules below match the wording of external, unversioned tool output.
//! They are checked in order; the first rule whose marker appears wins. A
//! wording change upstream surfaces as a classification miss, not as a
//! wrong fix.

use ngmigrate_npm::DependencyUpdate;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

const NPM_MISMATCH_MARKER: &str = "The Angular CLI currently requires npm version";
const INCOMPATIBLE_MARKER: &str = "Incompatible peer dependencies found";

static NPM_INSTALL_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"npm@(\d+(?:\.\d+){0,2})")
        .unwrap_or_else(|err| panic!("invalid NPM_INSTALL_HINT regex: {err}"))
});

static NPM_REQUIRED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"requires npm version (\d+(?:\.\d+){0,2})")
        .unwrap_or_else(|err| panic!("invalid NPM_REQUIRED regex: {err}"))
});

static NPM_DETECTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"npm version (\d+\.\d+\.\d+) detected")
        .unwrap_or_else(|err| panic!("invalid NPM_DETECTED regex: {err}"))
});

static PEER_REQUIREMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"requires a peer of (\S+) "([^"]+)""#)
        .unwrap_or_else(|err| panic!("invalid PEER_REQUIREMENT regex: {err}"))
});

static INCOMPATIBLE_PEER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"Package "([^"]+)" has an incompatible peer dependency to "([^"]+)" \(([^)]+)\)"#)
        .unwrap_or_else(|err| panic!("invalid INCOMPATIBLE_PEER regex: {err}"))
});

static INSTALL_DETAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"requires "([^"]+)", would install "([^"]+)""#)
        .unwrap_or_else(|err| panic!("invalid INSTALL_DETAIL regex: {err}"))
});

/// One `Package "a" has an incompatible peer dependency to "b" (...)` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConflict {
    pub package: String,
    pub peer: String,
    pub detail: String,
    pub required: Option<String>,
    pub would_install: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The CLI wants a different npm. `required` is `None` when the message
    /// names no version.
    NpmVersionMismatch { required: Option<String> },
    UnmetPeers(Vec<DependencyUpdate>),
    IncompatiblePeers(Vec<PeerConflict>),
}

impl FailureKind {
    pub fn name(&self) -> &'static str {
        match self {
            FailureKind::NpmVersionMismatch { .. } => "npm-version-mismatch",
            FailureKind::UnmetPeers(_) => "unmet-peer",
            FailureKind::IncompatiblePeers(_) => "incompatible-peers",
        }
    }
}

struct FailureRule {
    name: &'static str,
    matches: fn(&str) -> bool,
    extract: fn(&str) -> FailureKind,
}

const FAILURE_RULES: [FailureRule; 3] = [
    FailureRule {
        name: "npm-version-mismatch",
        matches: mentions_npm_mismatch,
        extract: extract_npm_version,
    },
    FailureRule {
        name: "unmet-peer",
        matches: mentions_unmet_peer,
        extract: extract_unmet_peers,
    },
    FailureRule {
        name: "incompatible-peers",
        matches: mentions_incompatible_peers,
        extract: extract_incompatible_peers,
    },
];

/// `None` means no rule knows this failure.
pub fn classify_failure(text: &str) -> Option<FailureKind> {
    let rule = FAILURE_RULES.iter().find(|rule| (rule.matches)(text))?;
    debug!(rule = rule.name, "classified update failure");
    Some((rule.extract)(text))
}

fn mentions_npm_mismatch(text: &str) -> bool {
    text.contains(NPM_MISMATCH_MARKER)
}

fn mentions_unmet_peer(text: &str) -> bool {
    PEER_REQUIREMENT.is_match(text)
}

fn mentions_incompatible_peers(text: &str) -> bool {
    text.contains(INCOMPATIBLE_MARKER)
}

fn extract_npm_version(text: &str) -> FailureKind {
    let required = [&*NPM_INSTALL_HINT, &*NPM_REQUIRED, &*NPM_DETECTED]
        .into_iter()
        .find_map(|re| re.captures(text))
        .map(|caps| caps[1].to_string());
    FailureKind::NpmVersionMismatch { required }
}

fn extract_unmet_peers(text: &str) -> FailureKind {
    let updates = PEER_REQUIREMENT
        .captures_iter(text)
        .map(|caps| DependencyUpdate::new(&caps[1], &caps[2]))
        .collect();
    FailureKind::UnmetPeers(updates)
}

fn extract_incompatible_peers(text: &str) -> FailureKind {
    let conflicts = INCOMPATIBLE_PEER
        .captures_iter(text)
        .map(|caps| {
            let detail = caps[3].to_string();
            let (required, would_install) = match INSTALL_DETAIL.captures(&detail) {
                Some(install) => (Some(install[1].to_string()), Some(install[2].to_string())),
                None => (None, None),
            };
            PeerConflict {
                package: caps[1].to_string(),
                peer: caps[2].to_string(),
                detail,
                required,
                would_install,
            }
        })
        .collect();
    FailureKind::IncompatiblePeers(conflicts)
}

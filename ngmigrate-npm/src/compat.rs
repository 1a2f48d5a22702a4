//! Version lookups the repair loop asks the registry for.

use crate::range::{major_of, parse_version, range_admits};
use crate::registry::{PackageMetadata, RegistryClient, RegistryError, VersionManifest};
use tracing::debug;

/// Published versions, newest first. Versions that do not parse as semver
/// sort last.
pub fn versions_newest_first(metadata: &PackageMetadata) -> Vec<(&str, &VersionManifest)> {
    let mut versions: Vec<(&str, &VersionManifest)> = metadata
        .versions
        .iter()
        .map(|(v, m)| (v.as_str(), m))
        .collect();
    versions.sort_by(|(a, _), (b, _)| parse_version(b).cmp(&parse_version(a)));
    versions
}

/// The newest version of `package` whose declared range for `peer` admits
/// `peer_version`.
pub fn find_compatible_version(
    registry: &dyn RegistryClient,
    package: &str,
    peer: &str,
    peer_version: &str,
) -> Result<Option<String>, RegistryError> {
    let metadata = registry.package_metadata(package)?;
    let found = versions_newest_first(&metadata)
        .into_iter()
        .find(|(_, manifest)| {
            manifest
                .merged_dependencies()
                .get(peer)
                .is_some_and(|range| range_admits(range, peer_version))
        })
        .map(|(version, _)| version.to_string());
    debug!(package, peer, peer_version, found = ?found, "compatible version lookup");
    Ok(found)
}

/// Major of the `latest` dist-tag of `package`.
pub fn latest_major(registry: &dyn RegistryClient, package: &str) -> Result<Option<u64>, RegistryError> {
    let manifest = registry.package_manifest(package, "latest")?;
    Ok(major_of(&manifest.version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn manifest(version: &str, peer: &str) -> VersionManifest {
        VersionManifest {
            version: version.to_string(),
            peer_dependencies: BTreeMap::from([("@angular/core".to_string(), peer.to_string())]),
            ..VersionManifest::default()
        }
    }

    #[test]
    fn newest_first_uses_semver_not_lexical_order() {
        let metadata = PackageMetadata {
            versions: BTreeMap::from([
                ("9.0.0".to_string(), manifest("9.0.0", "^9")),
                ("10.0.0".to_string(), manifest("10.0.0", "^10")),
                ("10.0.0-rc.0".to_string(), manifest("10.0.0-rc.0", "^10")),
            ]),
            ..PackageMetadata::default()
        };
        let order: Vec<&str> = versions_newest_first(&metadata)
            .into_iter()
            .map(|(v, _)| v)
            .collect();
        assert_eq!(order, vec!["10.0.0", "10.0.0-rc.0", "9.0.0"]);
    }
}

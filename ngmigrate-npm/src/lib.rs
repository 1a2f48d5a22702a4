//! npm plumbing for ngmigrate: `package.json` edits, range matching and the
//! registry client.

pub mod compat;
pub mod manifest;
pub mod range;
pub mod registry;

pub use compat::{find_compatible_version, latest_major, versions_newest_first};
pub use manifest::{DependencyUpdate, ManifestError, PackageManifest};
pub use range::{major_of, parse_version, range_admits};
pub use registry::{
    DEFAULT_REGISTRY, NpmRegistry, PackageMetadata, RegistryClient, RegistryError, Repository,
    VersionManifest, normalize_repository_url,
};

//! npm registry access.
//!
//! The [`RegistryClient`] trait is the seam the repair loop depends on;
//! [`NpmRegistry`] is the HTTPS adapter. Rate limiting and other non-2xx
//! responses are distinct errors from malformed bodies.

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("rate limited by the registry while fetching {url}")]
    RateLimited { url: String },

    #[error("registry returned HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not parse the registry response from {url}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The fields of a published `package.json` the tools look at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub peer_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub repository: Option<Repository>,
}

impl VersionManifest {
    /// Runtime, dev and peer dependencies in one map; later sections win.
    pub fn merged_dependencies(&self) -> BTreeMap<&str, &str> {
        self.dependencies
            .iter()
            .chain(&self.dev_dependencies)
            .chain(&self.peer_dependencies)
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Repository {
    Shorthand(String),
    Detailed {
        url: String,
        #[serde(rename = "type", default)]
        kind: Option<String>,
        #[serde(default)]
        directory: Option<String>,
    },
}

impl Repository {
    pub fn url(&self) -> &str {
        match self {
            Repository::Shorthand(url) | Repository::Detailed { url, .. } => url,
        }
    }
}

/// A package document: every published version's manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PackageMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "dist-tags")]
    pub dist_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub versions: BTreeMap<String, VersionManifest>,
    #[serde(default)]
    pub repository: Option<Repository>,
}

pub trait RegistryClient {
    fn package_metadata(&self, name: &str) -> Result<PackageMetadata, RegistryError>;

    /// `version` may be a dist-tag such as `latest`.
    fn package_manifest(&self, name: &str, version: &str) -> Result<VersionManifest, RegistryError>;
}

#[derive(Debug, Clone)]
pub struct NpmRegistry {
    client: Client,
    base_url: String,
}

impl NpmRegistry {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RegistryError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .user_agent(format!("ngmigrate/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|source| RegistryError::Transport {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self { client, base_url })
    }

    fn package_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(name))
    }

    fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, RegistryError> {
        debug!(%url, "registry request");
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .map_err(|source| RegistryError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RegistryError::RateLimited { url });
        }
        if !status.is_success() {
            return Err(RegistryError::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(|source| RegistryError::Transport {
            url: url.clone(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|source| RegistryError::Parse { url, source })
    }
}

impl RegistryClient for NpmRegistry {
    fn package_metadata(&self, name: &str) -> Result<PackageMetadata, RegistryError> {
        self.get_json(self.package_url(name))
    }

    fn package_manifest(&self, name: &str, version: &str) -> Result<VersionManifest, RegistryError> {
        let url = format!("{}/{}", self.package_url(name), urlencoding::encode(version));
        self.get_json(url)
    }
}

/// Turn a `repository.url` into something `git clone` accepts over HTTPS.
pub fn normalize_repository_url(raw: &str) -> String {
    let raw = raw.trim();
    if let Some(shorthand) = raw.strip_prefix("github:") {
        return format!("https://github.com/{shorthand}.git");
    }
    if let Some(rest) = raw.strip_prefix("git@") {
        return format!("https://{}", rest.replacen(':', "/", 1));
    }
    if let Some(rest) = raw.strip_prefix("git+ssh://git@") {
        return format!("https://{}", rest.replacen(':', "/", 1));
    }
    if let Some(rest) = raw.strip_prefix("git+") {
        return rest.to_string();
    }
    if let Some(rest) = raw.strip_prefix("git://") {
        return format!("https://{rest}");
    }
    if !raw.contains(':') && raw.split('/').count() == 2 {
        return format!("https://github.com/{raw}.git");
    }
    raw.to_string()
}

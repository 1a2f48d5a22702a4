use ngmigrate_npm::ManifestError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("No @uirouter/angular detected")]
    MissingRouterDependency,

    #[error("no package.json at the workspace root")]
    NoManifest,

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

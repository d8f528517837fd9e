use crate::host::{BuildError, Pipeline};
use crate::pm::InstallError;
use thiserror::Error;

/// Core error type for autoinstall operations.
#[derive(Error, Debug)]
pub enum Error {
    /// No resolver adapter understands the host's resolver API.
    #[error("Unsupported build host: {name} (resolver API {version})")]
    UnsupportedHost {
        name: String,
        version: semver::Version,
    },

    #[error("Build host {name} does not expose a {pipeline} resolver")]
    MissingResolver { name: String, pipeline: Pipeline },

    #[error("Invalid options: {0}")]
    Options(#[from] serde_json::Error),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error("Shadow build failed: {0}")]
    Shadow(#[from] BuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error aborts plugin setup rather than a single build cycle.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedHost { .. } | Self::MissingResolver { .. } | Self::Options(_)
        )
    }
}

//! Package manager collaborator.
//!
//! The [`DependencyDir`] trait is everything the plugin needs from a package
//! manager: whether a package is already installed, and a blocking install.
//! [`NodeModules`] implements it for a project's `node_modules` directory by
//! running `npm` or `yarn`.

pub mod error;
pub mod npm;

use crate::config::InstallerOptions;

pub use error::{codes, InstallError};
pub use npm::NodeModules;

/// Packages to install in a single package manager invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallJob {
    /// Installable names, in invocation order.
    pub packages: Vec<String>,
    /// Save as development dependencies.
    pub dev: bool,
}

/// What an install invocation asked the package manager for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstallReport {
    pub packages: Vec<String>,
    pub dev: bool,
    /// Peer dependencies installed in a follow-up invocation (`name@range`).
    pub peers: Vec<String>,
}

impl InstallReport {
    #[must_use]
    pub fn for_job(job: &InstallJob) -> Self {
        Self {
            packages: job.packages.clone(),
            dev: job.dev,
            peers: Vec::new(),
        }
    }
}

/// A dependency directory managed by a package manager.
pub trait DependencyDir: Send + Sync {
    /// Whether `name` is installed.
    fn present(&self, name: &str) -> bool;

    /// Install `job`, returning once the package manager has exited.
    fn install(
        &self,
        job: &InstallJob,
        options: &InstallerOptions,
    ) -> Result<InstallReport, InstallError>;
}

//! Deciding what to install, and installing it.

use crate::config::Options;
use crate::pm::{DependencyDir, InstallError, InstallJob, InstallReport};
use crate::spec::PackageSpecifier;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A missing dependency recovered from a failed resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Identifier recovered from the diagnostic (may include a subpath).
    pub specifier: String,
    /// Directory the failing import was issued from.
    pub origin: PathBuf,
}

impl InstallRequest {
    pub fn new(specifier: impl Into<String>, origin: impl Into<PathBuf>) -> Self {
        Self {
            specifier: specifier.into(),
            origin: origin.into(),
        }
    }
}

/// Turns install requests into blocking package manager invocations.
pub struct InstallCoordinator {
    options: Arc<Options>,
    deps: Arc<dyn DependencyDir>,
}

impl InstallCoordinator {
    pub fn new(options: Arc<Options>, deps: Arc<dyn DependencyDir>) -> Self {
        Self { options, deps }
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Work needed for `request`, or `None` if nothing should be installed.
    #[must_use]
    pub fn plan(&self, request: &InstallRequest) -> Option<InstallJob> {
        let name = PackageSpecifier::root_name(&request.specifier)?;

        if self.deps.present(&name) {
            debug!(package = %name, "already installed");
            return None;
        }

        let dev = self.options.dev.resolve(&request.specifier, &request.origin);
        let packages = match self.options.aliases.get(&name) {
            Some(real) => real.clone(),
            None => vec![name],
        };

        Some(InstallJob { packages, dev })
    }

    /// Install the package behind `request` and wait for the package manager.
    ///
    /// Returns `Ok(None)` when there was nothing to install.
    pub fn install(&self, request: &InstallRequest) -> Result<Option<InstallReport>, InstallError> {
        let Some(job) = self.plan(request) else {
            return Ok(None);
        };

        info!(
            specifier = %request.specifier,
            origin = %request.origin.display(),
            packages = ?job.packages,
            dev = job.dev,
            "installing missing dependency"
        );

        match self.deps.install(&job, &self.options.installer) {
            Ok(report) => Ok(Some(report)),
            Err(e) => {
                warn!(packages = ?job.packages, error = %e, "install failed");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for InstallCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallCoordinator")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

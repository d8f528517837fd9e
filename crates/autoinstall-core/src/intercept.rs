//! Module and loader resolution interception.
//!
//! The interceptor runs ahead of the host's own resolution. It resolves the
//! request itself and, when that fails, installs the missing package. The
//! host then carries on with its normal resolution, so a failure is still
//! reported for this attempt; the installed package is picked up by the next
//! resolution pass.

use crate::coordinator::{InstallCoordinator, InstallRequest};
use crate::extract::extract_dependency;
use crate::host::{
    HookResult, RequestKind, ResolutionRequest, ResolveOutcome, ResolveTap, ResolverApi,
};
use crate::inflight::InFlight;
use crate::loader::LoaderNames;
use crate::pm::{InstallError, InstallReport};
use autoinstall_util::path::is_managed;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Name the plugin registers under.
pub const PLUGIN_NAME: &str = "auto-install";

/// Why a request was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassReason {
    /// Issued from inside a managed dependency directory.
    Managed,
    /// The same specifier is already being handled.
    InFlight,
    /// A loader chain or query, not a plain package import.
    Compound,
}

/// What the interceptor observed for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tap {
    PassThrough(PassReason),
    Resolved(PathBuf),
    Failed {
        /// The resolver's own failure, reported unchanged.
        diagnostic: String,
        /// `Ok(None)` when nothing was installed.
        install: Result<Option<InstallReport>, InstallError>,
    },
}

pub struct ResolutionInterceptor {
    resolver: Arc<dyn ResolverApi>,
    coordinator: Arc<InstallCoordinator>,
    loaders: Arc<dyn LoaderNames>,
    in_flight: Arc<InFlight>,
}

impl ResolutionInterceptor {
    pub fn new(
        resolver: Arc<dyn ResolverApi>,
        coordinator: Arc<InstallCoordinator>,
        loaders: Arc<dyn LoaderNames>,
        in_flight: Arc<InFlight>,
    ) -> Self {
        Self {
            resolver,
            coordinator,
            loaders,
            in_flight,
        }
    }

    #[must_use]
    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Observe one resolution attempt, installing on failure.
    ///
    /// Only direct project imports are considered. The specifier stays
    /// claimed in the in-flight registry until resolution and any install
    /// have finished. A failed install is carried in the returned
    /// [`Tap::Failed`] next to the resolver's diagnostic.
    pub fn intercept(&self, request: &ResolutionRequest) -> Tap {
        if is_managed(&request.origin) {
            return Tap::PassThrough(PassReason::Managed);
        }

        let Some(_claim) = self.in_flight.try_claim(&request.specifier) else {
            debug!(specifier = %request.specifier, "already in flight");
            return Tap::PassThrough(PassReason::InFlight);
        };

        match self.resolver.resolve(request) {
            ResolveOutcome::Resolved(path) => Tap::Resolved(path),
            ResolveOutcome::Failed(diagnostic) => {
                let install = self.react(request, &diagnostic);
                Tap::Failed {
                    diagnostic,
                    install,
                }
            }
        }
    }

    fn react(
        &self,
        request: &ResolutionRequest,
        diagnostic: &str,
    ) -> Result<Option<InstallReport>, InstallError> {
        let Some(dependency) = extract_dependency(diagnostic) else {
            debug!(specifier = %request.specifier, diagnostic, "unrecognized diagnostic");
            return Ok(None);
        };

        let specifier = match request.kind {
            RequestKind::Loader => self.loaders.normalize(dependency),
            RequestKind::Module | RequestKind::External => dependency.to_string(),
        };

        self.coordinator
            .install(&InstallRequest::new(specifier, request.origin.clone()))
    }
}

impl ResolveTap for ResolutionInterceptor {
    fn tap(&self, request: &ResolutionRequest) -> HookResult<Tap> {
        Ok(self.intercept(request))
    }
}

impl std::fmt::Debug for ResolutionInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionInterceptor")
            .field("coordinator", &self.coordinator)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

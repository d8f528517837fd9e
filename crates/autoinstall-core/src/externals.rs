//! Install-on-demand for the host's externals chain.
//!
//! Registered first in the chain, the resolver probes each plain external
//! request with module resolution and installs what is missing. It never
//! decides an external itself; the rest of the chain always gets the request.

use crate::coordinator::{InstallCoordinator, InstallRequest};
use crate::extract::extract_dependency;
use crate::host::{ExternalDecision, ExternalResolver, HookResult, ResolveOutcome, ResolverApi};
use crate::inflight::InFlight;
use crate::intercept::{PassReason, Tap};
use autoinstall_util::path::is_managed;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub struct ExternalsResolver {
    resolver: Arc<dyn ResolverApi>,
    coordinator: Arc<InstallCoordinator>,
    in_flight: Arc<InFlight>,
}

impl ExternalsResolver {
    /// `in_flight` is shared with the plugin's module and loader taps.
    pub fn new(
        resolver: Arc<dyn ResolverApi>,
        coordinator: Arc<InstallCoordinator>,
        in_flight: Arc<InFlight>,
    ) -> Self {
        Self {
            resolver,
            coordinator,
            in_flight,
        }
    }

    /// Probe one external request, installing its package if it is missing.
    pub fn observe(&self, context: &Path, request: &str) -> Tap {
        if is_managed(context) {
            return Tap::PassThrough(PassReason::Managed);
        }
        // `!!bundle?lazy!./chunk` and friends
        if request.contains(['?', '!']) {
            return Tap::PassThrough(PassReason::Compound);
        }

        let Some(_claim) = self.in_flight.try_claim(request) else {
            debug!(request, "already in flight");
            return Tap::PassThrough(PassReason::InFlight);
        };

        match self.resolver.resolve_external(context, request) {
            ResolveOutcome::Resolved(path) => Tap::Resolved(path),
            ResolveOutcome::Failed(diagnostic) => {
                let install = match extract_dependency(&diagnostic) {
                    Some(dependency) => self
                        .coordinator
                        .install(&InstallRequest::new(dependency, context)),
                    None => {
                        debug!(request, diagnostic = %diagnostic, "unrecognized diagnostic");
                        Ok(None)
                    }
                };
                Tap::Failed {
                    diagnostic,
                    install,
                }
            }
        }
    }
}

impl ExternalResolver for ExternalsResolver {
    fn resolve(&self, context: &Path, request: &str) -> HookResult<ExternalDecision> {
        self.observe(context, request);
        Ok(ExternalDecision::Next)
    }
}

impl std::fmt::Debug for ExternalsResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalsResolver")
            .field("coordinator", &self.coordinator)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

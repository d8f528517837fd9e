//! The auto-install plugin.
//!
//! ## Example
//!
//! ```ignore
//! use autoinstall_core::{AutoInstall, Options, OptionsOverride};
//!
//! let options = Options::from_override(
//!     OptionsOverride::new()
//!         .with_dev_predicate(|spec, _origin| spec.ends_with("-loader"))
//!         .with_alias("fetch", ["whatwg-fetch", "promise-polyfill"]),
//! );
//! let plugin = AutoInstall::new("/path/to/project", options);
//! config.plugins.push(Arc::new(plugin));
//! ```

use crate::config::Options;
use crate::coordinator::InstallCoordinator;
use crate::error::Error;
use crate::externals::ExternalsResolver;
use crate::host::{
    default_adapters, select_adapter, BuildHost, BuildPlugin, HookRegistry, Pipeline,
    ResolverAdapter, WatchNext,
};
use crate::inflight::InFlight;
use crate::intercept::{ResolutionInterceptor, PLUGIN_NAME};
use crate::loader::{ConventionalLoaderNames, LoaderNames};
use crate::pm::{DependencyDir, NodeModules};
use crate::shadow::ShadowPreBuilder;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Installs missing packages as the build discovers them.
///
/// Each instance owns its in-flight registry and its shadow build.
/// Configuration and collaborators are shared with the fresh instance the
/// shadow build runs.
pub struct AutoInstall {
    options: Arc<Options>,
    deps: Arc<dyn DependencyDir>,
    loaders: Arc<dyn LoaderNames>,
    adapters: Vec<Arc<dyn ResolverAdapter>>,
    in_flight: Arc<InFlight>,
    shadow: ShadowPreBuilder,
}

impl AutoInstall {
    /// Install into the `node_modules` of the project at `root`.
    pub fn new(root: impl Into<PathBuf>, options: Options) -> Self {
        Self::with_dependency_dir(options, Arc::new(NodeModules::new(root)))
    }

    /// Install through a custom package manager collaborator.
    pub fn with_dependency_dir(options: Options, deps: Arc<dyn DependencyDir>) -> Self {
        Self {
            options: Arc::new(options),
            deps,
            loaders: Arc::new(ConventionalLoaderNames),
            adapters: default_adapters(),
            in_flight: Arc::new(InFlight::new()),
            shadow: ShadowPreBuilder::new(),
        }
    }

    #[must_use]
    pub fn with_loader_names(mut self, loaders: Arc<dyn LoaderNames>) -> Self {
        self.loaders = loaders;
        self
    }

    /// Try `adapter` before the built-in ones.
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn ResolverAdapter>) -> Self {
        self.adapters.insert(0, adapter);
        self
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    #[must_use]
    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    #[must_use]
    pub fn shadow(&self) -> &ShadowPreBuilder {
        &self.shadow
    }

    /// A new instance with the same configuration and collaborators and
    /// empty state.
    #[must_use]
    pub fn fresh(&self) -> Self {
        Self {
            options: self.options.clone(),
            deps: self.deps.clone(),
            loaders: self.loaders.clone(),
            adapters: self.adapters.clone(),
            in_flight: Arc::new(InFlight::new()),
            shadow: ShadowPreBuilder::new(),
        }
    }
}

impl BuildPlugin for AutoInstall {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn apply(&self, host: &dyn BuildHost, hooks: &mut HookRegistry) -> Result<(), Error> {
        let info = host.info();
        let adapter = select_adapter(&info, &self.adapters)?;
        let resolver = adapter.bind(host)?;
        debug!(
            host = %info.name,
            resolver_api = %info.resolver_api,
            adapter = adapter.name(),
            "attaching resolution hooks"
        );

        let coordinator = Arc::new(InstallCoordinator::new(
            self.options.clone(),
            self.deps.clone(),
        ));
        let interceptor = Arc::new(ResolutionInterceptor::new(
            resolver.clone(),
            coordinator.clone(),
            self.loaders.clone(),
            self.in_flight.clone(),
        ));
        hooks.tap(Pipeline::Normal, interceptor.clone());
        hooks.tap(Pipeline::Loader, interceptor);

        let externals = Arc::new(ExternalsResolver::new(
            resolver,
            coordinator,
            self.in_flight.clone(),
        ));
        if !hooks.prepend_external(externals) {
            debug!(host = %info.name, "no externals chain to join");
        }
        Ok(())
    }

    fn watch_run(&self, host: &dyn BuildHost, next: WatchNext) {
        let result = self
            .shadow
            .run(host, || -> Arc<dyn BuildPlugin> { Arc::new(self.fresh()) });
        next(result);
    }
}

impl std::fmt::Debug for AutoInstall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let adapters: Vec<&str> = self.adapters.iter().map(|a| a.name()).collect();
        f.debug_struct("AutoInstall")
            .field("options", &self.options)
            .field("adapters", &adapters)
            .field("in_flight", &self.in_flight)
            .field("shadow", &self.shadow)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptionsOverride;

    #[test]
    fn test_fresh_shares_config_not_state() {
        let plugin = AutoInstall::new(
            std::env::temp_dir(),
            Options::from_override(OptionsOverride::new().with_dev(true)),
        );
        let _claim = plugin.in_flight().try_claim("react").unwrap();

        let fresh = plugin.fresh();
        assert!(Arc::ptr_eq(&plugin.options, &fresh.options));
        assert!(Arc::ptr_eq(&plugin.deps, &fresh.deps));
        assert!(fresh.in_flight().is_empty());
        assert!(!fresh.shadow().is_created());
        assert_eq!(fresh.name(), "auto-install");
    }

    #[test]
    fn test_custom_adapter_tried_first() {
        struct Never;

        impl ResolverAdapter for Never {
            fn name(&self) -> &'static str {
                "never"
            }

            fn supports(&self, _info: &crate::host::HostInfo) -> bool {
                false
            }

            fn bind(
                &self,
                _host: &dyn BuildHost,
            ) -> Result<Arc<dyn crate::host::ResolverApi>, Error> {
                unreachable!()
            }
        }

        let plugin = AutoInstall::new(std::env::temp_dir(), Options::default())
            .with_adapter(Arc::new(Never));
        let names: Vec<&str> = plugin.adapters.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["never", "pipeline-v1"]);
    }
}

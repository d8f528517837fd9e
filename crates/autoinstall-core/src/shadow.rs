//! Shadow builds ahead of each watch cycle.
//!
//! Before the real build of a watch cycle starts, a second build of the same
//! project runs to completion with its output kept in memory. Its resolution
//! failures trigger installs, so missing dependencies are on disk before the
//! user-visible build resolves them. The shadow build is created once and
//! rerun every cycle; its cache carries over between runs.

use crate::host::{
    Build, BuildConfig, BuildError, BuildHost, BuildPlugin, CacheMode, MemoryFs, OutputTarget,
};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Configuration of a shadow build derived from `base`.
///
/// The result shares the project context with `base`, starts from an empty
/// cache, writes into a fresh [`MemoryFs`] and runs only `plugin`.
#[must_use]
pub fn shadow_config(base: &BuildConfig, plugin: Arc<dyn BuildPlugin>) -> BuildConfig {
    BuildConfig {
        context: base.context.clone(),
        cache: CacheMode::Fresh,
        output: OutputTarget::Memory(Arc::new(MemoryFs::new())),
        plugins: vec![plugin],
        watch: false,
    }
}

/// Owns the lazily created shadow build of one plugin instance.
#[derive(Default)]
pub struct ShadowPreBuilder {
    build: Mutex<Option<Box<dyn Build>>>,
}

impl ShadowPreBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the shadow build has been created.
    #[must_use]
    pub fn is_created(&self) -> bool {
        self.build
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Run the shadow build, creating it on first use.
    ///
    /// `plugin` is only called when the build is created; it supplies the
    /// fresh plugin instance the shadow build runs with. Concurrent callers
    /// wait for the running shadow build to finish.
    pub fn run<F>(&self, host: &dyn BuildHost, plugin: F) -> Result<(), BuildError>
    where
        F: FnOnce() -> Arc<dyn BuildPlugin>,
    {
        let mut slot = self.build.lock().unwrap_or_else(PoisonError::into_inner);

        let build = match slot.take() {
            Some(build) => build,
            None => {
                let config = shadow_config(&host.config(), plugin());
                debug!(context = %config.context.display(), "creating shadow build");
                host.create_build(config)?
            }
        };
        let build = slot.insert(build);

        let result = build.run();
        if let Err(e) = &result {
            warn!(error = %e, "shadow build failed");
        }
        result
    }
}

impl std::fmt::Debug for ShadowPreBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowPreBuilder")
            .field("created", &self.is_created())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HookRegistry, HostInfo, HostResolver, Pipeline};
    use crate::Error;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Noop;

    impl BuildPlugin for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        fn apply(&self, _host: &dyn BuildHost, _hooks: &mut HookRegistry) -> Result<(), Error> {
            Ok(())
        }
    }

    fn noop() -> Arc<dyn BuildPlugin> {
        Arc::new(Noop)
    }

    struct CountingBuild {
        runs: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Build for CountingBuild {
        fn run(&mut self) -> Result<(), BuildError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(BuildError::new("syntax error in src/index.js"))
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct Host {
        created: AtomicUsize,
        runs: Arc<AtomicUsize>,
        configs: Mutex<Vec<BuildConfig>>,
        fail: bool,
    }

    impl BuildHost for Host {
        fn info(&self) -> HostInfo {
            HostInfo::new("test", semver::Version::new(1, 0, 0))
        }

        fn resolver(&self, _pipeline: Pipeline) -> Option<Arc<dyn HostResolver>> {
            None
        }

        fn config(&self) -> BuildConfig {
            let output = OutputTarget::Disk(PathBuf::from("/project/dist"));
            let mut config = BuildConfig::new("/project", output);
            config.cache = CacheMode::Persistent(PathBuf::from("/project/.cache"));
            config.watch = true;
            config
        }

        fn create_build(&self, config: BuildConfig) -> Result<Box<dyn Build>, BuildError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            self.configs.lock().unwrap().push(config);
            Ok(Box::new(CountingBuild {
                runs: self.runs.clone(),
                fail: self.fail,
            }))
        }
    }

    #[test]
    fn test_shadow_config() {
        let host = Host::default();
        let config = shadow_config(&host.config(), noop());

        assert_eq!(config.context, PathBuf::from("/project"));
        assert_eq!(config.cache, CacheMode::Fresh);
        assert!(matches!(config.output, OutputTarget::Memory(ref fs) if fs.is_empty()));
        assert_eq!(config.plugins.len(), 1);
        assert_eq!(config.plugins[0].name(), "noop");
        assert!(!config.watch);
    }

    #[test]
    fn test_created_once_and_rerun() {
        let host = Host::default();
        let shadow = ShadowPreBuilder::new();
        let made = AtomicUsize::new(0);
        let plugin = || -> Arc<dyn BuildPlugin> {
            made.fetch_add(1, Ordering::SeqCst);
            Arc::new(Noop)
        };

        assert!(!shadow.is_created());
        shadow.run(&host, plugin).unwrap();
        shadow.run(&host, plugin).unwrap();
        shadow.run(&host, plugin).unwrap();

        assert!(shadow.is_created());
        assert_eq!(host.created.load(Ordering::SeqCst), 1);
        assert_eq!(made.load(Ordering::SeqCst), 1);
        assert_eq!(host.runs.load(Ordering::SeqCst), 3);

        let configs = host.configs.lock().unwrap();
        assert_eq!(configs[0].cache, CacheMode::Fresh);
        assert!(matches!(configs[0].output, OutputTarget::Memory(_)));
    }

    #[test]
    fn test_failure_keeps_handle() {
        let host = Host {
            fail: true,
            ..Host::default()
        };
        let shadow = ShadowPreBuilder::new();

        let err = shadow.run(&host, noop).unwrap_err();
        assert_eq!(err.message, "syntax error in src/index.js");
        assert!(shadow.run(&host, noop).is_err());

        assert_eq!(host.created.load(Ordering::SeqCst), 1);
        assert_eq!(host.runs.load(Ordering::SeqCst), 2);
    }
}

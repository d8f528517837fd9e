//! Build host integration.
//!
//! A build host is the bundler the plugin is attached to. It exposes:
//! - raw resolvers per pipeline ([`HostResolver`]), which a version-matched
//!   [`ResolverAdapter`] binds into the [`ResolverApi`] capability
//! - a [`HookRegistry`] where plugins tap module/loader resolution and
//!   prepend externals resolvers
//! - its [`BuildConfig`] and a way to create standalone builds from one
//!
//! The host calls [`BuildPlugin::apply`] once its resolvers are ready and
//! [`BuildPlugin::watch_run`] at the start of each watch cycle.

#![allow(clippy::type_complexity)]

use crate::error::Error;
use autoinstall_util::fs::write_atomic;
use semver::{Comparator, Op, Prerelease, Version, VersionReq};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Result type for hook callbacks.
pub type HookResult<T> = Result<T, HookError>;

/// Error raised from inside a hook callback.
#[derive(Debug, Clone)]
pub struct HookError {
    /// Plugin that raised the error.
    pub plugin: String,
    /// Hook that failed.
    pub hook: &'static str,
    pub message: String,
}

impl HookError {
    pub fn new(plugin: impl Into<String>, hook: &'static str, message: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            hook,
            message: message.into(),
        }
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.plugin, self.hook, self.message)
    }
}

impl std::error::Error for HookError {}

/// A failed build run.
#[derive(Debug, Clone, Default)]
pub struct BuildError {
    pub message: String,
    /// Individual diagnostics (e.g. one per unresolved import).
    pub diagnostics: Vec<String>,
}

impl BuildError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            diagnostics: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Vec<String>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if !self.diagnostics.is_empty() {
            write!(f, " ({} diagnostics)", self.diagnostics.len())?;
        }
        Ok(())
    }
}

impl std::error::Error for BuildError {}

/// Which stage issued a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Module,
    Loader,
    External,
}

/// Host resolver pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pipeline {
    Normal,
    Loader,
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::Loader => "loader",
        })
    }
}

/// One resolution attempt issued by the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    /// Directory the import is issued from.
    pub origin: PathBuf,
    /// Raw import string.
    pub specifier: String,
    pub kind: RequestKind,
}

impl ResolutionRequest {
    pub fn new(origin: impl Into<PathBuf>, specifier: impl Into<String>, kind: RequestKind) -> Self {
        Self {
            origin: origin.into(),
            specifier: specifier.into(),
            kind,
        }
    }

    pub fn module(origin: impl Into<PathBuf>, specifier: impl Into<String>) -> Self {
        Self::new(origin, specifier, RequestKind::Module)
    }

    pub fn loader(origin: impl Into<PathBuf>, specifier: impl Into<String>) -> Self {
        Self::new(origin, specifier, RequestKind::Loader)
    }
}

/// Outcome of a single resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    Resolved(PathBuf),
    /// Resolution failed with this diagnostic text.
    Failed(String),
}

impl ResolveOutcome {
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

impl From<Result<PathBuf, String>> for ResolveOutcome {
    fn from(result: Result<PathBuf, String>) -> Self {
        match result {
            Ok(path) => Self::Resolved(path),
            Err(diagnostic) => Self::Failed(diagnostic),
        }
    }
}

/// Identity of a build host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub name: String,
    /// Version of the host's resolver API.
    pub resolver_api: Version,
}

impl HostInfo {
    pub fn new(name: impl Into<String>, resolver_api: Version) -> Self {
        Self {
            name: name.into(),
            resolver_api,
        }
    }
}

/// A host's raw resolver for one pipeline.
pub trait HostResolver: Send + Sync {
    /// Resolve `request` from the `context` directory; `Err` carries the diagnostic.
    fn resolve(&self, context: &Path, request: &str) -> Result<PathBuf, String>;
}

/// Resolution capability the plugin works against.
pub trait ResolverApi: Send + Sync {
    fn resolve_module(&self, origin: &Path, specifier: &str) -> ResolveOutcome;

    fn resolve_loader(&self, origin: &Path, specifier: &str) -> ResolveOutcome;

    /// Externals are probed with module resolution unless a host says otherwise.
    fn resolve_external(&self, origin: &Path, specifier: &str) -> ResolveOutcome {
        self.resolve_module(origin, specifier)
    }

    /// Dispatch on the request kind.
    fn resolve(&self, request: &ResolutionRequest) -> ResolveOutcome {
        match request.kind {
            RequestKind::Module => self.resolve_module(&request.origin, &request.specifier),
            RequestKind::Loader => self.resolve_loader(&request.origin, &request.specifier),
            RequestKind::External => self.resolve_external(&request.origin, &request.specifier),
        }
    }
}

/// Binds one family of host resolver APIs into a [`ResolverApi`].
pub trait ResolverAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports(&self, info: &HostInfo) -> bool;

    fn bind(&self, host: &dyn BuildHost) -> Result<Arc<dyn ResolverApi>, Error>;
}

/// Adapter for hosts that hand out one resolver object per pipeline
/// (resolver API 1.x).
#[derive(Debug, Clone)]
pub struct PipelineAdapter {
    req: VersionReq,
}

impl PipelineAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            req: VersionReq {
                comparators: vec![Comparator {
                    op: Op::Caret,
                    major: 1,
                    minor: None,
                    patch: None,
                    pre: Prerelease::EMPTY,
                }],
            },
        }
    }
}

impl Default for PipelineAdapter {
    fn default() -> Self {
        Self::new()
    }
}

struct PipelineResolvers {
    normal: Arc<dyn HostResolver>,
    loader: Arc<dyn HostResolver>,
}

impl ResolverApi for PipelineResolvers {
    fn resolve_module(&self, origin: &Path, specifier: &str) -> ResolveOutcome {
        self.normal.resolve(origin, specifier).into()
    }

    fn resolve_loader(&self, origin: &Path, specifier: &str) -> ResolveOutcome {
        self.loader.resolve(origin, specifier).into()
    }
}

impl ResolverAdapter for PipelineAdapter {
    fn name(&self) -> &'static str {
        "pipeline-v1"
    }

    fn supports(&self, info: &HostInfo) -> bool {
        self.req.matches(&info.resolver_api)
    }

    fn bind(&self, host: &dyn BuildHost) -> Result<Arc<dyn ResolverApi>, Error> {
        let get = |pipeline| {
            host.resolver(pipeline).ok_or_else(|| Error::MissingResolver {
                name: host.info().name,
                pipeline,
            })
        };
        Ok(Arc::new(PipelineResolvers {
            normal: get(Pipeline::Normal)?,
            loader: get(Pipeline::Loader)?,
        }))
    }
}

/// Adapters shipped with the crate.
#[must_use]
pub fn default_adapters() -> Vec<Arc<dyn ResolverAdapter>> {
    vec![Arc::new(PipelineAdapter::new())]
}

/// Pick the first adapter that supports `info`.
pub fn select_adapter(
    info: &HostInfo,
    adapters: &[Arc<dyn ResolverAdapter>],
) -> Result<Arc<dyn ResolverAdapter>, Error> {
    adapters
        .iter()
        .find(|a| a.supports(info))
        .cloned()
        .ok_or_else(|| Error::UnsupportedHost {
            name: info.name.clone(),
            version: info.resolver_api.clone(),
        })
}

/// Observes a resolution attempt before the host resolves it itself.
pub trait ResolveTap: Send + Sync {
    fn tap(&self, request: &ResolutionRequest) -> HookResult<crate::intercept::Tap>;
}

/// Decision of one externals resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalDecision {
    /// Defer to the next resolver in the chain.
    Next,
    /// Treat the request as external under this name.
    External(String),
}

/// An entry in the host's externals chain.
pub trait ExternalResolver: Send + Sync {
    fn resolve(&self, context: &Path, request: &str) -> HookResult<ExternalDecision>;
}

/// Hook points a plugin registers on.
#[derive(Default)]
pub struct HookRegistry {
    module: Vec<Arc<dyn ResolveTap>>,
    loader: Vec<Arc<dyn ResolveTap>>,
    /// `None` when the host does not take a list of externals resolvers.
    externals: Option<Vec<Arc<dyn ExternalResolver>>>,
}

impl HookRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry whose host accepts an ordered externals chain.
    #[must_use]
    pub fn with_externals(externals: Vec<Arc<dyn ExternalResolver>>) -> Self {
        Self {
            externals: Some(externals),
            ..Self::default()
        }
    }

    /// Tap resolution on `pipeline`.
    pub fn tap(&mut self, pipeline: Pipeline, tap: Arc<dyn ResolveTap>) {
        match pipeline {
            Pipeline::Normal => self.module.push(tap),
            Pipeline::Loader => self.loader.push(tap),
        }
    }

    #[must_use]
    pub fn taps(&self, pipeline: Pipeline) -> &[Arc<dyn ResolveTap>] {
        match pipeline {
            Pipeline::Normal => &self.module,
            Pipeline::Loader => &self.loader,
        }
    }

    /// Put `resolver` first in the externals chain. Returns false if the
    /// host has no chain.
    pub fn prepend_external(&mut self, resolver: Arc<dyn ExternalResolver>) -> bool {
        match &mut self.externals {
            Some(chain) => {
                chain.insert(0, resolver);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn externals(&self) -> Option<&[Arc<dyn ExternalResolver>]> {
        self.externals.as_deref()
    }

    /// Run every tap registered for the request's pipeline, in order.
    pub fn dispatch(&self, request: &ResolutionRequest) -> Vec<HookResult<crate::intercept::Tap>> {
        let pipeline = match request.kind {
            RequestKind::Loader => Pipeline::Loader,
            RequestKind::Module | RequestKind::External => Pipeline::Normal,
        };
        self.taps(pipeline).iter().map(|t| t.tap(request)).collect()
    }

    /// Walk the externals chain until a resolver decides.
    pub fn resolve_external(&self, context: &Path, request: &str) -> HookResult<ExternalDecision> {
        for resolver in self.externals().unwrap_or_default() {
            match resolver.resolve(context, request)? {
                ExternalDecision::Next => {}
                decided => return Ok(decided),
            }
        }
        Ok(ExternalDecision::Next)
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("module", &self.module.len())
            .field("loader", &self.loader.len())
            .field("externals", &self.externals.as_ref().map(Vec::len))
            .finish()
    }
}

/// Destination of build artifacts.
pub trait OutputStore: Send + Sync {
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Artifacts kept in memory and dropped with the store.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: RwLock<HashMap<PathBuf, Vec<u8>>>,
}

impl MemoryFs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OutputStore for MemoryFs {
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }
}

/// Artifacts written below a real output directory.
#[derive(Debug, Clone)]
pub struct DiskFs {
    root: PathBuf,
}

impl DiskFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl OutputStore for DiskFs {
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        write_atomic(&self.root.join(path), contents)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(self.root.join(path))
    }
}

/// Where a build writes its output.
#[derive(Debug, Clone)]
pub enum OutputTarget {
    Disk(PathBuf),
    Memory(Arc<MemoryFs>),
}

impl OutputTarget {
    /// Store to write through.
    #[must_use]
    pub fn store(&self) -> Arc<dyn OutputStore> {
        match self {
            Self::Disk(dir) => Arc::new(DiskFs::new(dir.clone())),
            Self::Memory(fs) => fs.clone(),
        }
    }
}

/// Build cache setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheMode {
    Disabled,
    /// Reuse the cache stored in this directory.
    Persistent(PathBuf),
    /// Start from an empty in-memory cache owned by the build instance.
    Fresh,
}

/// Configuration of a build, as far as plugins are concerned.
#[derive(Clone)]
pub struct BuildConfig {
    /// Project directory the build runs in.
    pub context: PathBuf,
    pub cache: CacheMode,
    pub output: OutputTarget,
    pub plugins: Vec<Arc<dyn BuildPlugin>>,
    pub watch: bool,
}

impl BuildConfig {
    pub fn new(context: impl Into<PathBuf>, output: OutputTarget) -> Self {
        Self {
            context: context.into(),
            cache: CacheMode::Disabled,
            output,
            plugins: Vec::new(),
            watch: false,
        }
    }
}

impl fmt::Debug for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plugins: Vec<&str> = self.plugins.iter().map(|p| p.name()).collect();
        f.debug_struct("BuildConfig")
            .field("context", &self.context)
            .field("cache", &self.cache)
            .field("output", &self.output)
            .field("plugins", &plugins)
            .field("watch", &self.watch)
            .finish()
    }
}

/// A standalone build created by the host.
pub trait Build: Send {
    /// Run the build to completion.
    fn run(&mut self) -> Result<(), BuildError>;
}

/// The bundler a plugin is attached to.
pub trait BuildHost: Send + Sync {
    fn info(&self) -> HostInfo;

    /// Raw resolver for `pipeline`, if the host has one.
    fn resolver(&self, pipeline: Pipeline) -> Option<Arc<dyn HostResolver>>;

    /// Configuration of the running build.
    fn config(&self) -> BuildConfig;

    /// Create a new build from `config`.
    fn create_build(&self, config: BuildConfig) -> Result<Box<dyn Build>, BuildError>;
}

/// Continuation handed to [`BuildPlugin::watch_run`].
pub type WatchNext = Box<dyn FnOnce(Result<(), BuildError>) + Send>;

/// A plugin the host drives through its build lifecycle.
pub trait BuildPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Called once the host's resolvers are ready.
    fn apply(&self, host: &dyn BuildHost, hooks: &mut HookRegistry) -> Result<(), Error>;

    /// Called when a watch cycle starts. The host does not begin the cycle's
    /// build until `next` has been called.
    fn watch_run(&self, _host: &dyn BuildHost, next: WatchNext) {
        next(Ok(()));
    }
}

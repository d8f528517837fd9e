//! In-memory build host and recording package manager shared by the
//! integration tests.

#![allow(dead_code)]

use autoinstall_core::config::InstallerOptions;
use autoinstall_core::host::{
    Build, BuildConfig, BuildError, BuildHost, CacheMode, HookRegistry, HostInfo, HostResolver,
    OutputStore, OutputTarget, Pipeline,
};
use autoinstall_core::{
    DependencyDir, InstallError, InstallJob, InstallReport, PackageSpecifier, RequestKind,
    ResolutionRequest,
};
use autoinstall_util::path::{package_dir, PACKAGE_JSON};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};

/// Helper to put a package into `root/node_modules`.
pub fn install_package(root: &Path, name: &str) {
    let dir = package_dir(root, name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(PACKAGE_JSON), format!(r#"{{"name": "{name}"}}"#)).unwrap();
}

/// Resolves relative requests anywhere and bare requests against
/// `root/node_modules`, failing with a bundler-style diagnostic.
pub struct FsResolver {
    root: PathBuf,
    pub calls: AtomicUsize,
}

impl FsResolver {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl HostResolver for FsResolver {
    fn resolve(&self, context: &Path, request: &str) -> Result<PathBuf, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.starts_with("./") {
            return Ok(context.join(request));
        }
        let missing = || {
            format!(
                "Cannot resolve module '{request}' in {}",
                context.display()
            )
        };
        let name = PackageSpecifier::root_name(request).ok_or_else(missing)?;
        let dir = package_dir(&self.root, &name);
        if dir.join(PACKAGE_JSON).is_file() {
            Ok(dir)
        } else {
            Err(missing())
        }
    }
}

/// Lets a test hold an install open until it says otherwise.
pub struct Gate {
    started: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl Gate {
    pub fn new(started: Sender<()>, release: Receiver<()>) -> Self {
        Self {
            started: Mutex::new(started),
            release: Mutex::new(release),
        }
    }
}

/// Package manager double that records every invocation.
#[derive(Default)]
pub struct RecordingDeps {
    root: PathBuf,
    pub jobs: Mutex<Vec<InstallJob>>,
    /// Create the packages on disk when installing.
    pub materialize: bool,
    pub fail: bool,
    pub gate: Option<Gate>,
}

impl RecordingDeps {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            ..Self::default()
        }
    }

    pub fn materializing(root: &Path) -> Self {
        let mut deps = Self::new(root);
        deps.materialize = true;
        deps
    }

    /// Every install exits non-zero.
    pub fn failing(root: &Path) -> Self {
        let mut deps = Self::new(root);
        deps.fail = true;
        deps
    }

    /// Every install blocks on `gate` until the test releases it.
    pub fn gated(root: &Path, gate: Gate) -> Self {
        let mut deps = Self::new(root);
        deps.gate = Some(gate);
        deps
    }

    pub fn jobs(&self) -> Vec<InstallJob> {
        self.jobs.lock().unwrap().clone()
    }
}

impl DependencyDir for RecordingDeps {
    fn present(&self, name: &str) -> bool {
        package_dir(&self.root, name).join(PACKAGE_JSON).is_file()
    }

    fn install(
        &self,
        job: &InstallJob,
        _options: &InstallerOptions,
    ) -> Result<InstallReport, InstallError> {
        self.jobs.lock().unwrap().push(job.clone());

        if let Some(gate) = &self.gate {
            gate.started.lock().unwrap().send(()).unwrap();
            gate.release.lock().unwrap().recv().unwrap();
        }

        if self.fail {
            return Err(InstallError::exit_nonzero(
                "npm",
                Some(1),
                "npm ERR! 404 Not Found - GET https://registry.npmjs.org/nope",
            ));
        }
        if self.materialize {
            for name in &job.packages {
                install_package(&self.root, name);
            }
        }
        Ok(InstallReport::for_job(job))
    }
}

struct HostInner {
    root: PathBuf,
    version: semver::Version,
    normal: Arc<FsResolver>,
    loader: Arc<FsResolver>,
    imports: Vec<ResolutionRequest>,
    created: AtomicUsize,
    runs: AtomicUsize,
    last_output: Mutex<Option<OutputTarget>>,
}

/// A build host whose builds resolve a fixed list of imports.
#[derive(Clone)]
pub struct TestHost {
    inner: Arc<HostInner>,
}

impl TestHost {
    pub fn new(root: &Path, imports: Vec<ResolutionRequest>) -> Self {
        Self::with_version(root, imports, semver::Version::new(1, 2, 0))
    }

    pub fn with_version(
        root: &Path,
        imports: Vec<ResolutionRequest>,
        version: semver::Version,
    ) -> Self {
        Self {
            inner: Arc::new(HostInner {
                root: root.to_path_buf(),
                version,
                normal: Arc::new(FsResolver::new(root)),
                loader: Arc::new(FsResolver::new(root)),
                imports,
                created: AtomicUsize::new(0),
                runs: AtomicUsize::new(0),
                last_output: Mutex::new(None),
            }),
        }
    }

    pub fn normal_calls(&self) -> usize {
        self.inner.normal.calls.load(Ordering::SeqCst)
    }

    pub fn builds_created(&self) -> usize {
        self.inner.created.load(Ordering::SeqCst)
    }

    pub fn build_runs(&self) -> usize {
        self.inner.runs.load(Ordering::SeqCst)
    }

    /// Output target of the most recently created build.
    pub fn last_output(&self) -> Option<OutputTarget> {
        self.inner.last_output.lock().unwrap().clone()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.inner.root.join("dist")
    }

    /// Resolve the way the host would after the plugin's taps ran.
    pub fn resolve(&self, request: &ResolutionRequest) -> Result<PathBuf, String> {
        self.inner.normal.resolve(&request.origin, &request.specifier)
    }
}

impl BuildHost for TestHost {
    fn info(&self) -> HostInfo {
        HostInfo::new("test-bundler", self.inner.version.clone())
    }

    fn resolver(&self, pipeline: Pipeline) -> Option<Arc<dyn HostResolver>> {
        match pipeline {
            Pipeline::Normal => Some(self.inner.normal.clone()),
            Pipeline::Loader => Some(self.inner.loader.clone()),
        }
    }

    fn config(&self) -> BuildConfig {
        let mut config = BuildConfig::new(&self.inner.root, OutputTarget::Disk(self.output_dir()));
        config.cache = CacheMode::Persistent(self.inner.root.join(".cache"));
        config.watch = true;
        config
    }

    fn create_build(&self, config: BuildConfig) -> Result<Box<dyn Build>, BuildError> {
        let mut hooks = HookRegistry::with_externals(Vec::new());
        for plugin in &config.plugins {
            plugin
                .apply(self, &mut hooks)
                .map_err(|e| BuildError::new(e.to_string()))?;
        }
        self.inner.created.fetch_add(1, Ordering::SeqCst);
        *self.inner.last_output.lock().unwrap() = Some(config.output.clone());

        Ok(Box::new(TestBuild {
            host: self.clone(),
            hooks,
            output: config.output.store(),
        }))
    }
}

struct TestBuild {
    host: TestHost,
    hooks: HookRegistry,
    output: Arc<dyn OutputStore>,
}

impl Build for TestBuild {
    fn run(&mut self) -> Result<(), BuildError> {
        self.host.inner.runs.fetch_add(1, Ordering::SeqCst);
        let mut diagnostics = Vec::new();

        for request in &self.host.inner.imports {
            if request.kind == RequestKind::External {
                if let Err(e) = self.hooks.resolve_external(&request.origin, &request.specifier) {
                    diagnostics.push(e.to_string());
                }
                continue;
            }
            for result in self.hooks.dispatch(request) {
                if let Err(e) = result {
                    diagnostics.push(e.to_string());
                }
            }
            if let Err(diagnostic) = self.host.resolve(request) {
                diagnostics.push(diagnostic);
            }
        }

        self.output
            .write(Path::new("bundle.js"), b"/* bundle */")
            .map_err(|e| BuildError::new(e.to_string()))?;

        if diagnostics.is_empty() {
            Ok(())
        } else {
            Err(BuildError::new("Build failed").with_diagnostics(diagnostics))
        }
    }
}

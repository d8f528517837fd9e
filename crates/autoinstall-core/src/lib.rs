#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! On-demand dependency installation for module builds.
//!
//! When a build fails to resolve an import, the [`AutoInstall`] plugin
//! recovers the missing package name from the resolver diagnostic, installs
//! it with the project's package manager, and lets the next resolution pass
//! pick it up. A shadow build runs ahead of every watch cycle so that cold
//! dependencies are installed before the user-visible build starts.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod externals;
pub mod extract;
pub mod host;
pub mod inflight;
pub mod intercept;
pub mod loader;
pub mod plugin;
pub mod pm;
pub mod shadow;
pub mod spec;

pub use config::{Client, DevScope, InstallerOptions, Options, OptionsOverride};
pub use coordinator::{InstallCoordinator, InstallRequest};
pub use error::Error;
pub use externals::ExternalsResolver;
pub use extract::extract_dependency;
pub use host::{
    BuildConfig, BuildError, BuildHost, BuildPlugin, CacheMode, HookError, HookRegistry,
    HookResult, HostInfo, OutputTarget, RequestKind, ResolutionRequest, ResolveOutcome,
};
pub use inflight::InFlight;
pub use intercept::{PassReason, ResolutionInterceptor, Tap};
pub use loader::{ConventionalLoaderNames, LoaderNames};
pub use plugin::AutoInstall;
pub use pm::{DependencyDir, InstallError, InstallJob, InstallReport, NodeModules};
pub use shadow::{shadow_config, ShadowPreBuilder};
pub use spec::PackageSpecifier;

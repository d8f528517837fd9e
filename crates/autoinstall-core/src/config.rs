//! Plugin configuration.
//!
//! [`Options`] is the merged, read-only configuration a plugin instance works
//! with. Callers hand over partial settings as an [`OptionsOverride`] (usually
//! deserialized from JSON) and [`Options::merge`] folds them over a set of
//! defaults without touching the defaults themselves.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

type DevPredicate = dyn Fn(&str, &Path) -> bool + Send + Sync;

/// Whether installed packages are saved as development dependencies.
#[derive(Clone)]
pub enum DevScope {
    /// Same scope for every package.
    Flag(bool),
    /// Decided per package from `(specifier, origin)`.
    Predicate(Arc<DevPredicate>),
}

impl DevScope {
    /// Create a predicate scope.
    pub fn predicate(f: impl Fn(&str, &Path) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(f))
    }

    /// Evaluate the scope for one install.
    #[must_use]
    pub fn resolve(&self, specifier: &str, origin: &Path) -> bool {
        match self {
            Self::Flag(dev) => *dev,
            Self::Predicate(f) => f(specifier, origin),
        }
    }
}

impl Default for DevScope {
    fn default() -> Self {
        Self::Flag(false)
    }
}

impl fmt::Debug for DevScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(dev) => f.debug_tuple("Flag").field(dev).finish(),
            Self::Predicate(_) => f.write_str("Predicate(<fn>)"),
        }
    }
}

// Only the flag form has a serialized representation.
impl<'de> Deserialize<'de> for DevScope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        bool::deserialize(deserializer).map(Self::Flag)
    }
}

/// Package manager client used for installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Client {
    /// `yarn` when the project has a `yarn.lock`, otherwise `npm`.
    #[default]
    Auto,
    Npm,
    Yarn,
}

impl Client {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Npm => "npm",
            Self::Yarn => "yarn",
        }
    }
}

/// Options passed through to the package manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallerOptions {
    pub client: Client,
    /// Program run for npm-style installs (e.g. `cnpm`).
    pub npm: String,
    /// Pass `--silent` to the client.
    pub quiet: bool,
    /// Follow up with missing peer dependencies of installed packages.
    pub peer_dependencies: bool,
}

impl Default for InstallerOptions {
    fn default() -> Self {
        Self {
            client: Client::Auto,
            npm: "npm".to_string(),
            quiet: false,
            peer_dependencies: true,
        }
    }
}

/// Merged plugin configuration.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Save scope for installed packages.
    pub dev: DevScope,
    /// Virtual package name -> real packages to install in its place.
    pub aliases: BTreeMap<String, Vec<String>>,
    pub installer: InstallerOptions,
}

impl Options {
    /// Fold `over` onto `defaults`, producing a new configuration.
    #[must_use]
    pub fn merge(defaults: &Options, over: OptionsOverride) -> Options {
        let base = defaults.installer.clone();
        Options {
            dev: over.dev.unwrap_or_else(|| defaults.dev.clone()),
            aliases: over.deps.unwrap_or_else(|| defaults.aliases.clone()),
            installer: InstallerOptions {
                client: over.client.unwrap_or(base.client),
                npm: over.npm.unwrap_or(base.npm),
                quiet: over.quiet.unwrap_or(base.quiet),
                peer_dependencies: over.peer_dependencies.unwrap_or(base.peer_dependencies),
            },
        }
    }

    /// Merge caller settings over the built-in defaults.
    #[must_use]
    pub fn from_override(over: OptionsOverride) -> Options {
        Self::merge(&Options::default(), over)
    }

    /// Parse a JSON options object and merge it over the built-in defaults.
    pub fn from_json(json: &str) -> Result<Options, crate::Error> {
        let over: OptionsOverride = serde_json::from_str(json)?;
        Ok(Self::from_override(over))
    }
}

/// Caller-supplied partial configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OptionsOverride {
    pub dev: Option<DevScope>,
    pub deps: Option<BTreeMap<String, Vec<String>>>,
    pub client: Option<Client>,
    pub npm: Option<String>,
    pub quiet: Option<bool>,
    pub peer_dependencies: Option<bool>,
}

impl OptionsOverride {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a fixed dev scope.
    #[must_use]
    pub fn with_dev(mut self, dev: bool) -> Self {
        self.dev = Some(DevScope::Flag(dev));
        self
    }

    /// Decide the dev scope per package.
    #[must_use]
    pub fn with_dev_predicate(
        mut self,
        f: impl Fn(&str, &Path) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.dev = Some(DevScope::predicate(f));
        self
    }

    /// Map a virtual package to the real packages installed for it.
    #[must_use]
    pub fn with_alias<I, S>(mut self, name: impl Into<String>, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deps
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), packages.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    #[must_use]
    pub fn with_npm(mut self, program: impl Into<String>) -> Self {
        self.npm = Some(program.into());
        self
    }

    #[must_use]
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = Some(quiet);
        self
    }

    #[must_use]
    pub fn with_peer_dependencies(mut self, enabled: bool) -> Self {
        self.peer_dependencies = Some(enabled);
        self
    }
}

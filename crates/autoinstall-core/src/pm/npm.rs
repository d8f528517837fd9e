//! `node_modules` backed by the npm or yarn command line clients.

use super::{DependencyDir, InstallError, InstallJob, InstallReport};
use crate::config::{Client, InstallerOptions};
use autoinstall_util::fs::read_lossy;
use autoinstall_util::path::{find_package, PACKAGE_JSON};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Lockfile whose presence selects yarn under [`Client::Auto`].
pub const YARN_LOCK: &str = "yarn.lock";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    #[serde(default)]
    peer_dependencies: BTreeMap<String, Value>,
}

/// The `node_modules` tree of a project root.
#[derive(Debug, Clone)]
pub struct NodeModules {
    root: PathBuf,
}

impl NodeModules {
    /// Manage dependencies of the project at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = dunce::canonicalize(&root).unwrap_or(root);
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Client an install will actually run.
    #[must_use]
    pub fn client(&self, options: &InstallerOptions) -> Client {
        match options.client {
            Client::Auto if self.root.join(YARN_LOCK).is_file() => Client::Yarn,
            Client::Auto => Client::Npm,
            client => client,
        }
    }

    /// Program and arguments for installing `packages`.
    #[must_use]
    pub fn command(
        &self,
        packages: &[String],
        dev: bool,
        options: &InstallerOptions,
    ) -> (String, Vec<String>) {
        let (program, mut args) = match self.client(options) {
            Client::Yarn => {
                let mut args = vec!["add".to_string()];
                if dev {
                    args.push("--dev".to_string());
                }
                ("yarn", args)
            }
            _ => {
                let save = if dev { "--save-dev" } else { "--save" };
                (
                    options.npm.as_str(),
                    vec!["install".to_string(), save.to_string()],
                )
            }
        };

        if options.quiet {
            args.push("--silent".to_string());
        }
        args.extend(packages.iter().cloned());

        (program_name(program), args)
    }

    /// Declared peer dependencies of an installed package, as `(name, range)`.
    pub fn peer_dependencies(&self, name: &str) -> Result<Vec<(String, String)>, InstallError> {
        let Some(dir) = find_package(&self.root, name) else {
            return Ok(Vec::new());
        };
        let path = dir.join(PACKAGE_JSON);
        let text = read_lossy(&path).map_err(|e| InstallError::manifest_invalid(&path, e))?;
        let manifest: Manifest =
            serde_json::from_str(&text).map_err(|e| InstallError::manifest_invalid(&path, e))?;

        Ok(manifest
            .peer_dependencies
            .into_iter()
            .filter_map(|(peer, range)| match range {
                Value::String(range) => Some((peer, range)),
                _ => None,
            })
            .collect())
    }

    /// Peers of `packages` that are neither installed nor part of the job.
    pub(crate) fn missing_peers(&self, packages: &[String]) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        for name in packages {
            let peers = match self.peer_dependencies(name) {
                Ok(peers) => peers,
                Err(e) => {
                    debug!(package = %name, error = %e, "skipping peer dependencies");
                    continue;
                }
            };
            for (peer, range) in peers {
                if packages.contains(&peer) || self.present(&peer) {
                    continue;
                }
                let spec = format!("{peer}@{range}");
                if !missing.contains(&spec) {
                    missing.push(spec);
                }
            }
        }
        missing
    }

    fn run(
        &self,
        packages: &[String],
        dev: bool,
        options: &InstallerOptions,
    ) -> Result<(), InstallError> {
        let (program, args) = self.command(packages, dev, options);
        info!(program = %program, args = ?args, cwd = %self.root.display(), "running package manager");

        let output = Command::new(&program)
            .args(&args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| InstallError::spawn_failed(&program, &e))?;

        if !output.stdout.is_empty() {
            debug!(program = %program, stdout = %String::from_utf8_lossy(&output.stdout).trim_end());
        }

        if output.status.success() {
            Ok(())
        } else {
            Err(InstallError::exit_nonzero(
                &program,
                output.status.code(),
                &String::from_utf8_lossy(&output.stderr),
            ))
        }
    }
}

impl DependencyDir for NodeModules {
    fn present(&self, name: &str) -> bool {
        find_package(&self.root, name).is_some()
    }

    fn install(
        &self,
        job: &InstallJob,
        options: &InstallerOptions,
    ) -> Result<InstallReport, InstallError> {
        let mut report = InstallReport::for_job(job);
        if job.packages.is_empty() {
            return Ok(report);
        }

        self.run(&job.packages, job.dev, options)?;

        if options.peer_dependencies {
            let peers = self.missing_peers(&job.packages);
            if !peers.is_empty() {
                info!(peers = ?peers, "installing peer dependencies");
                self.run(&peers, job.dev, options)?;
                report.peers = peers;
            }
        }

        Ok(report)
    }
}

fn program_name(base: &str) -> String {
    if cfg!(windows) && Path::new(base).extension().is_none() {
        format!("{base}.cmd")
    } else {
        base.to_string()
    }
}

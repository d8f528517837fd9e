//! Locating packages inside managed dependency directories.

use std::path::{Component, Path, PathBuf};

/// Directory name package managers install packages into.
pub const NODE_MODULES: &str = "node_modules";

/// Manifest file every installed package carries.
pub const PACKAGE_JSON: &str = "package.json";

/// Check whether `path` lies inside a managed dependency directory.
///
/// Only whole path components count, so `/src/node_modules_backup` is not
/// managed while `/app/node_modules/react/index.js` is.
#[must_use]
pub fn is_managed(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(name) if name == NODE_MODULES))
}

/// Directory a package named `name` occupies under `base/node_modules`.
///
/// Scoped names (`@scope/pkg`) map to nested directories.
#[must_use]
pub fn package_dir(base: &Path, name: &str) -> PathBuf {
    let mut dir = base.join(NODE_MODULES);
    for segment in name.split('/').filter(|s| !s.is_empty()) {
        dir.push(segment);
    }
    dir
}

/// Find the installed directory of `name`, searching `start` and its ancestors.
///
/// This follows the node lookup order: the nearest `node_modules` wins. A
/// directory only counts as installed when it holds a `package.json`.
#[must_use]
pub fn find_package(start: &Path, name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .filter(|dir| dir.file_name().map_or(true, |n| n != NODE_MODULES))
        .map(|dir| package_dir(dir, name))
        .find(|dir| dir.join(PACKAGE_JSON).is_file())
}

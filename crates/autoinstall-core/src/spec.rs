//! Import specifier parsing.
//!
//! Splits bare import specifiers into the installable package and the path
//! inside it:
//! - `react` -> `react`
//! - `lodash.random` -> `lodash.random`
//! - `@cycle/core/lib/run` -> `@cycle/core` + `lib/run`
//! - `bootswatch/lumen/bootstrap.css` -> `bootswatch` + `lumen/bootstrap.css`

/// A bare import specifier split at the package boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpecifier {
    /// Installable package name (e.g. `@scope/name` or `name`).
    pub name: String,
    /// Scope without the `@` prefix, if scoped.
    pub scope: Option<String>,
    /// Path below the package root, if any.
    pub subpath: Option<String>,
}

impl PackageSpecifier {
    /// Parse an import specifier.
    ///
    /// Returns `None` for anything a package manager cannot install:
    /// relative and absolute paths, empty input, or a scope without a name.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let first = input.chars().next()?;
        if !(first == '@' || first == '_' || first.is_ascii_alphanumeric()) {
            return None;
        }

        let mut segments = input.split('/');
        let head = segments.next()?;

        let (name, scope) = if let Some(scope) = head.strip_prefix('@') {
            let pkg = segments.next().filter(|s| !s.is_empty())?;
            if scope.is_empty() {
                return None;
            }
            (format!("@{scope}/{pkg}"), Some(scope.to_string()))
        } else {
            (head.to_string(), None)
        };

        let rest: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
        let subpath = (!rest.is_empty()).then(|| rest.join("/"));

        Some(Self {
            name,
            scope,
            subpath,
        })
    }

    /// Installable root package name of `specifier`, if it has one.
    #[must_use]
    pub fn root_name(specifier: &str) -> Option<String> {
        Self::parse(specifier).map(|spec| spec.name)
    }
}

//! Loader package naming.

use crate::spec::PackageSpecifier;

/// Conventional suffix of loader packages.
pub const LOADER_SUFFIX: &str = "-loader";

/// Maps a loader request to the package that publishes it.
pub trait LoaderNames: Send + Sync {
    fn normalize(&self, raw: &str) -> String;
}

/// `babel` -> `babel-loader`, `css-loader?modules` -> `css-loader`.
///
/// Query strings and chained loaders after the first are dropped. Requests
/// that are not bare package names come back unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConventionalLoaderNames;

impl LoaderNames for ConventionalLoaderNames {
    fn normalize(&self, raw: &str) -> String {
        let request = raw
            .trim_start_matches('!')
            .split(['?', '!'])
            .next()
            .unwrap_or(raw);

        let Some(spec) = PackageSpecifier::parse(request) else {
            return request.to_string();
        };

        if spec.name.ends_with(LOADER_SUFFIX) {
            spec.name
        } else {
            format!("{}{LOADER_SUFFIX}", spec.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        let names = ConventionalLoaderNames;
        assert_eq!(names.normalize("babel"), "babel-loader");
        assert_eq!(names.normalize("babel-loader"), "babel-loader");
        assert_eq!(names.normalize("css-loader?modules&importLoaders=1"), "css-loader");
        assert_eq!(names.normalize("style!css"), "style-loader");
        assert_eq!(names.normalize("@org/svg"), "@org/svg-loader");
        assert_eq!(names.normalize("@org/svg-loader/lib/index.js"), "@org/svg-loader");
    }

    #[test]
    fn test_normalize_local_loader() {
        assert_eq!(ConventionalLoaderNames.normalize("./loaders/md"), "./loaders/md");
    }
}

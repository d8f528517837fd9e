//! Recovering package names from resolver diagnostics.
//!
//! Resolvers report a missing import as free text. The phrasings below are
//! the only ones recognized; anything else is a silent non-match.

use regex_lite::Regex;
use std::sync::OnceLock;

/// Known "missing module" phrasings. Group 1 captures the specifier.
///
/// - `Cannot resolve module 'x' in /dir` (older bundler resolvers)
/// - `Can't resolve 'x' in '/dir'` (current bundler resolvers)
/// - `Cannot resolve 'x' from '/file'` (in-tree bundler resolver)
const PATTERNS: &[&str] = &[
    r"(?i)cannot resolve module '([@\w/.-]+)' in",
    r"(?i)can't resolve '([@\w/.-]+)' in",
    r"(?i)cannot resolve '([@\w/.-]+)' from",
];

fn patterns() -> &'static [Regex] {
    static COMPILED: OnceLock<Vec<Regex>> = OnceLock::new();
    COMPILED.get_or_init(|| PATTERNS.iter().filter_map(|p| Regex::new(p).ok()).collect())
}

/// Extract the unresolved specifier from a resolver diagnostic.
///
/// Handles scoped names (`@cycle/core`), dotted names (`lodash.random`),
/// hyphens and nested paths (`bootswatch/lumen/bootstrap.css`).
#[must_use]
pub fn extract_dependency(diagnostic: &str) -> Option<&str> {
    patterns()
        .iter()
        .find_map(|re| re.captures(diagnostic))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

//! Package manager invocation errors.

use std::fmt;
use std::io;
use std::path::Path;

/// Install error codes.
pub mod codes {
    pub const INSTALL_SPAWN_FAILED: &str = "INSTALL_SPAWN_FAILED";
    pub const INSTALL_EXIT_NONZERO: &str = "INSTALL_EXIT_NONZERO";
    pub const INSTALL_MANIFEST_INVALID: &str = "INSTALL_MANIFEST_INVALID";
}

/// Longest stderr excerpt kept in an error message.
const MAX_STDERR_EXCERPT: usize = 2048;

/// A failed package manager invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallError {
    code: &'static str,
    message: String,
}

impl InstallError {
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The client program could not be started.
    #[must_use]
    pub fn spawn_failed(program: &str, err: &io::Error) -> Self {
        Self::new(
            codes::INSTALL_SPAWN_FAILED,
            format!("Failed to run {program}: {err}"),
        )
    }

    /// The client ran and reported failure.
    #[must_use]
    pub fn exit_nonzero(program: &str, status: Option<i32>, stderr: &str) -> Self {
        let status = status.map_or_else(|| "signal".to_string(), |c| c.to_string());
        let stderr = stderr.trim();
        let excerpt = if stderr.len() > MAX_STDERR_EXCERPT {
            let mut end = stderr.len() - MAX_STDERR_EXCERPT;
            while !stderr.is_char_boundary(end) {
                end += 1;
            }
            &stderr[end..]
        } else {
            stderr
        };
        Self::new(
            codes::INSTALL_EXIT_NONZERO,
            format!("{program} exited with {status}: {excerpt}"),
        )
    }

    /// An installed package's manifest could not be read.
    #[must_use]
    pub fn manifest_invalid(path: &Path, msg: impl fmt::Display) -> Self {
        Self::new(
            codes::INSTALL_MANIFEST_INVALID,
            format!("Invalid manifest {}: {msg}", path.display()),
        )
    }
}

impl fmt::Display for InstallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for InstallError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        let err = InstallError::exit_nonzero("npm", Some(1), "npm ERR! 404 Not Found\n");
        assert_eq!(err.code(), codes::INSTALL_EXIT_NONZERO);
        assert_eq!(
            err.to_string(),
            "INSTALL_EXIT_NONZERO: npm exited with 1: npm ERR! 404 Not Found"
        );
    }

    #[test]
    fn test_stderr_excerpt_keeps_tail() {
        let noisy = format!("{}tail", "x".repeat(MAX_STDERR_EXCERPT * 2));
        let err = InstallError::exit_nonzero("yarn", None, &noisy);
        assert!(err.message().ends_with("tail"));
        assert!(err.message().contains("signal"));
        assert!(err.message().len() < MAX_STDERR_EXCERPT + 64);
    }

    #[test]
    fn test_error_codes_uppercase() {
        for code in [
            codes::INSTALL_SPAWN_FAILED,
            codes::INSTALL_EXIT_NONZERO,
            codes::INSTALL_MANIFEST_INVALID,
        ] {
            assert!(
                code.chars().all(|c| c.is_uppercase() || c == '_'),
                "Error code '{code}' should be SCREAMING_SNAKE_CASE"
            );
        }
    }
}

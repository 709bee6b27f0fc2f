//! Error type returned by back-end size/encode calls.

use std::fmt;

/// A back-end failed to size or encode an atom.
///
/// The core wraps this into its own numbered diagnostic taxonomy; the
/// back-end only needs to describe what went wrong in prose.
#[derive(Debug, Clone)]
pub struct BackendError(pub String);

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BackendError {}

impl From<String> for BackendError {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BackendError {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

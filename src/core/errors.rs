//! Error types for the resembl core library.
//!
//! The error surface is a closed set — the tokenizer, fingerprint builder,
//! and similarity kernels never fail on content (they produce degenerate
//! but valid outputs instead), so every variant here corresponds to a
//! genuine boundary failure: a missing key, a violated invariant, or an
//! underlying I/O problem.

use std::io;

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, ResemblError>;

/// The closed set of error kinds the core surfaces to callers.
#[derive(Error, Debug)]
pub enum ResemblError {
    /// Code string was empty (or all whitespace) after trimming.
    #[error("blank input: {message}")]
    BlankInput {
        /// Human-readable context.
        message: String,
    },

    /// No snippet/collection exists for the given key.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable context.
        message: String,
    },

    /// A checksum prefix matched more than one snippet.
    #[error("ambiguous checksum prefix '{prefix}': {count} matches")]
    Ambiguous {
        /// The prefix that was queried.
        prefix: String,
        /// Number of snippets it matched.
        count: usize,
    },

    /// A name (or LSH key) is already present.
    #[error("duplicate: {message}")]
    Duplicate {
        /// Human-readable context.
        message: String,
    },

    /// A parameter was out of its valid range (threshold, permutation
    /// count, empty tag, etc).
    #[error("invalid parameter '{parameter}': {message}")]
    InvalidParameter {
        /// Name of the offending parameter.
        parameter: String,
        /// Human-readable context.
        message: String,
    },

    /// Attempted to remove the last remaining name of a snippet.
    #[error("cannot remove the last name of snippet {checksum}")]
    LastNameProtected {
        /// Checksum of the affected snippet.
        checksum: String,
    },

    /// Underlying storage or filesystem error.
    #[error("I/O failure: {message}")]
    IOFailure {
        /// Human-readable context.
        message: String,
        /// Underlying error, when available.
        #[source]
        source: Option<io::Error>,
    },

    /// A cache file exists but could not be deserialized.
    #[error("corrupt cache at {path}: {message}")]
    CorruptCache {
        /// Path to the offending cache file.
        path: String,
        /// Human-readable context.
        message: String,
    },
}

impl ResemblError {
    /// Build a [`ResemblError::BlankInput`].
    pub fn blank_input(message: impl Into<String>) -> Self {
        Self::BlankInput {
            message: message.into(),
        }
    }

    /// Build a [`ResemblError::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Build a [`ResemblError::Duplicate`].
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::Duplicate {
            message: message.into(),
        }
    }

    /// Build a [`ResemblError::Ambiguous`].
    pub fn ambiguous(prefix: impl Into<String>, count: usize) -> Self {
        Self::Ambiguous {
            prefix: prefix.into(),
            count,
        }
    }

    /// Build a [`ResemblError::InvalidParameter`].
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Build a [`ResemblError::IOFailure`] wrapping a `std::io::Error`.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::IOFailure {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Build a [`ResemblError::IOFailure`] with no underlying source.
    pub fn io_message(message: impl Into<String>) -> Self {
        Self::IOFailure {
            message: message.into(),
            source: None,
        }
    }

    /// Build a [`ResemblError::CorruptCache`].
    pub fn corrupt_cache(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CorruptCache {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<io::Error> for ResemblError {
    fn from(source: io::Error) -> Self {
        Self::IOFailure {
            message: source.to_string(),
            source: Some(source),
        }
    }
}

impl From<serde_json::Error> for ResemblError {
    fn from(source: serde_json::Error) -> Self {
        Self::IOFailure {
            message: format!("JSON error: {source}"),
            source: None,
        }
    }
}

impl From<bincode::Error> for ResemblError {
    fn from(source: bincode::Error) -> Self {
        Self::CorruptCache {
            path: String::new(),
            message: source.to_string(),
        }
    }
}

impl From<toml::de::Error> for ResemblError {
    fn from(source: toml::de::Error) -> Self {
        Self::IOFailure {
            message: format!("TOML decode error: {source}"),
            source: None,
        }
    }
}

impl From<toml::ser::Error> for ResemblError {
    fn from(source: toml::ser::Error) -> Self {
        Self::IOFailure {
            message: format!("TOML encode error: {source}"),
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_informative() {
        let err = ResemblError::ambiguous("dead", 3);
        assert!(err.to_string().contains("dead"));
    }
}

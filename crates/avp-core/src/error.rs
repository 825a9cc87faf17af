//! Error taxonomy for the AVP control layer.
//!
//! Three layers, matching where a failure is detected:
//! - [`ConfigError`]: local configuration conflicts, rejected before any
//!   provider interaction.
//! - [`SessionError`]: statuses reported by a [`SessionProvider`]; the
//!   dispatcher reports these verbatim and never retries.
//! - [`DispatchError`]: a failed dispatch, naming the operation that failed.
//!
//! [`SessionProvider`]: crate::provider::SessionProvider

use thiserror::Error;

/// Non-success status reported by a session provider operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The provider could not reach the server or the connection broke.
    #[error("transport failure: {message}")]
    Transport { message: String },

    /// The server (or the provider's own checks) rejected the request.
    #[error("validation failure: {message}")]
    Validation { message: String },

    /// A local file the provider had to read or write was not usable.
    #[error("file I/O failure during {operation}: {message}")]
    Io { operation: String, message: String },

    /// A test case arrived for an algorithm with no registered capability.
    #[error("no capability registered for {algorithm}")]
    NoCapability { algorithm: String },
}

impl SessionError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn io(operation: impl Into<String>, source: impl std::fmt::Display) -> Self {
        Self::Io {
            operation: operation.into(),
            message: source.to_string(),
        }
    }
}

/// Local configuration conflict, detected before any network action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Offline vector processing needs the request and response files as a
    /// pair; one without the other is rejected.
    #[error("offline vector processing requires both the vector request and vector response files")]
    VectorFilePair,

    /// A session-scoped mode was selected without a session state file.
    #[error("{mode} requires a session state file")]
    MissingSessionFile { mode: &'static str },

    /// FIPS validation was requested without operating-environment metadata.
    #[error("FIPS validation requires an operating-environment metadata file")]
    MissingMetadataFile,

    #[error("{algorithm} domain minimum {min} exceeds maximum {max}")]
    InvertedDomain {
        algorithm: String,
        min: u32,
        max: u32,
    },

    #[error("{algorithm} domain granularity must be nonzero")]
    ZeroGranularity { algorithm: String },

    #[error("{algorithm} domain granularity {granularity} does not evenly divide the {min}..={max} range")]
    UnalignedDomain {
        algorithm: String,
        min: u32,
        max: u32,
        granularity: u32,
    },
}

/// A failed dispatch, carrying the operation that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Capability registration aborts the whole startup; no partial
    /// registration is retried or merged.
    #[error("capability registration for {algorithm} failed: {source}")]
    Registration {
        algorithm: String,
        source: SessionError,
    },

    #[error("{operation} failed: {source}")]
    Operation {
        operation: &'static str,
        source: SessionError,
    },
}

//! Error types for Kino Media

use crate::types::{EngineKind, MediaError};
use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine SDK acquisition failures
///
/// Cloneable because a single in-flight load is shared by every caller
/// waiting on the same engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    #[error("Failed to load engine SDK from {url}: {reason}")]
    Load { url: String, reason: String },

    #[error("Engine SDK loaded from {url} but global `{global}` is missing or of the wrong kind")]
    Integrity { url: String, global: String },
}

impl SdkError {
    /// URL of the script that failed
    pub fn url(&self) -> &str {
        match self {
            SdkError::Load { url, .. } | SdkError::Integrity { url, .. } => url,
        }
    }
}

/// Bridge error types
#[derive(Error, Debug)]
pub enum Error {
    // SDK errors
    #[error(transparent)]
    Sdk(#[from] SdkError),

    // Engine errors
    #[error("Failed to initialize {engine} engine: {cause}")]
    EngineInit {
        engine: EngineKind,
        #[source]
        cause: Box<Error>,
    },

    #[error("{engine} engine support is not compiled in")]
    EngineUnavailable { engine: EngineKind },

    #[error("Engine fault: {0}")]
    Engine(String),

    // Facade errors
    #[error("No source has been bound to this mount")]
    NotBound,

    #[error("Duration is not known yet")]
    DurationUnknown,

    // Native surface errors
    #[error("Playback error: {0}")]
    Playback(MediaError),

    // Source / configuration errors
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a failure that happened while bringing up a streaming engine
    pub fn engine_init(engine: EngineKind, cause: impl Into<Error>) -> Self {
        Error::EngineInit {
            engine,
            cause: Box::new(cause.into()),
        }
    }

    /// Returns true if the root cause is a failed SDK acquisition
    pub fn is_sdk_failure(&self) -> bool {
        match self {
            Error::Sdk(_) => true,
            Error::EngineInit { cause, .. } => cause.is_sdk_failure(),
            _ => false,
        }
    }

    /// Returns the error code for logs and hosts
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Sdk(SdkError::Load { .. }) => "SDK_LOAD",
            Error::Sdk(SdkError::Integrity { .. }) => "SDK_INTEGRITY",
            Error::EngineInit { .. } => "ENGINE_INIT",
            Error::EngineUnavailable { .. } => "ENGINE_UNAVAILABLE",
            Error::Engine(_) => "ENGINE_FAULT",
            Error::NotBound => "NOT_BOUND",
            Error::DurationUnknown => "DURATION_UNKNOWN",
            Error::Playback(_) => "PLAYBACK",
            Error::InvalidSource(_) => "INVALID_SOURCE",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Json(_) => "JSON",
        }
    }
}

impl From<MediaError> for Error {
    fn from(err: MediaError) -> Self {
        Error::Playback(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_init_wraps_sdk_failure() {
        let err = Error::engine_init(
            EngineKind::Hls,
            SdkError::Load {
                url: "//assets/hls.min.js".to_string(),
                reason: "404".to_string(),
            },
        );

        assert!(err.is_sdk_failure());
        assert_eq!(err.error_code(), "ENGINE_INIT");
        assert!(err.to_string().contains("HLS"));
    }

    #[test]
    fn test_not_bound_is_not_sdk_failure() {
        assert!(!Error::NotBound.is_sdk_failure());
        assert_eq!(Error::NotBound.error_code(), "NOT_BOUND");
    }
}

//! Error types for Inkport.
//!
//! This module provides a unified error type for all Inkport operations,
//! with specific error variants for different failure modes.

use thiserror::Error;

use crate::board::fetch::FetchError;
use crate::codec::DecodeError;

/// A specialized `Result` type for Inkport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Inkport.
#[derive(Error, Debug)]
pub enum Error {
    /// Payload could not be decoded (E101)
    #[error("invalid payload: {0}")]
    Decode(#[from] DecodeError),

    /// No transport envelope found in the input (E102)
    #[error("no exported data found: {0}")]
    EnvelopeNotFound(String),

    /// Envelope segment was present but unreadable (E103)
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Fetching a payload failed (E104)
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// No stroke had enough points to export (E105)
    #[error("nothing to export: {0}")]
    NothingToExport(String),

    /// Locator is empty or unsupported
    #[error("invalid locator: {0}")]
    InvalidLocator(String),

    /// Configuration file error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Returns the error code associated with this error, if any.
    ///
    /// Error codes follow the pattern EXXX where XXX is a 3-digit number.
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::Decode(_) => Some("E101"),
            Self::EnvelopeNotFound(_) => Some("E102"),
            Self::MalformedEnvelope(_) => Some("E103"),
            Self::Fetch(_) => Some("E104"),
            Self::NothingToExport(_) => Some("E105"),
            _ => None,
        }
    }

    /// Returns whether this error is recoverable (can be retried).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }

    /// Returns a helpful suggestion for resolving the error, if applicable.
    #[must_use]
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::EnvelopeNotFound(_) => Some(
                "Make sure the log contains lines with [START]...[END] markers.\n\
                 Run the exporter in the session first, then point extract at the output log.",
            ),
            Self::Fetch(FetchError::Timeout(_)) => Some(
                "The payload host did not answer in time. Check the URL and try again,\n\
                 or raise import.load_timeout in the configuration.",
            ),
            Self::Decode(DecodeError::MissingExportedData | DecodeError::NotAnObject) => Some(
                "The file is JSON but not an exported ink session.\n\
                 Use `inkport extract` on the raw log to produce one.",
            ),
            _ => None,
        }
    }
}

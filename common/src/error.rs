use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a single probe step did not produce an answer.
///
/// Every variant means "this method failed"; the presence chain moves on to
/// the next method regardless of which one it is.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ProbeError {
    #[error("probe timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("probe could not be executed: {message}")]
    Execution { message: String },

    #[error("target did not respond")]
    NoResponse,

    #[error("probe output could not be interpreted: {message}")]
    Unparseable { message: String },
}

impl ProbeError {
    pub fn execution(err: impl std::fmt::Display) -> Self {
        Self::Execution {
            message: err.to_string(),
        }
    }

    pub fn unparseable(message: impl Into<String>) -> Self {
        Self::Unparseable {
            message: message.into(),
        }
    }
}

/// Failures at the history storage boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read history from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("history at {path} is not a valid document: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write history to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize history: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// An observation that cannot be reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObservationError {
    #[error("observation has no ip address")]
    MissingIp,
}

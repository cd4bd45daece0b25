// src/core/error.rs

use crate::core::store::StoreError;

/// Errors the recon pipeline reports to its caller.
///
/// Unreachable ports and URLs are not errors: probes report them as absence.
#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("malformed import document: {0}")]
    MalformedImportDocument(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl ReconError {
    pub fn invalid_target<T: Into<String>>(msg: T) -> Self {
        Self::InvalidTarget(msg.into())
    }

    pub fn malformed<T: Into<String>>(msg: T) -> Self {
        Self::MalformedImportDocument(msg.into())
    }
}

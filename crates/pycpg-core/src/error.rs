//! Fatal error taxonomy
//!
//! Only conditions that stop a call before any file is processed live here.
//! Everything scoped to a single file is a [`crate::Diagnostic`] instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CpgError {
    /// The syntax backend or its grammar cannot be loaded.
    #[error("syntax backend `{backend}` is unavailable: {reason}. {remediation}")]
    BackendUnavailable {
        backend: String,
        reason: String,
        remediation: String,
    },

    #[error("project root `{}` is not a readable directory", .0.display())]
    InvalidRoot(PathBuf),

    #[error("`{}` is not a readable file", .0.display())]
    InvalidFile(PathBuf),

    #[error("invalid exclude pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CpgError {
    pub fn config(msg: impl Into<String>) -> Self {
        CpgError::Config(msg.into())
    }

    pub fn is_fatal_backend(&self) -> bool {
        matches!(self, CpgError::BackendUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, CpgError>;

//! # Errors
//!
//! Failures that halt a session. Build and test outcomes are not errors; they
//! are reported as [`crate::tools::build::BuildStepResult`] values.

use crate::manifest::ParseError;
use std::path::{Path, PathBuf};

/// Errors from manifest, workspace and generation operations
#[derive(Debug, thiserror::Error)]
pub enum KilnError {
    /// Filesystem create/read/write failure
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Manifest exists but could not be understood
    #[error("Failed to parse manifest {path}: {source}")]
    Parse { path: PathBuf, source: ParseError },

    /// Artifact path would land outside its source root
    #[error("Artifact path '{0}' must be relative and stay inside its source root")]
    InvalidArtifactPath(String),

    /// Code generator collaborator failed
    #[error("Code generation failed: {0:#}")]
    Generation(anyhow::Error),

    /// Configuration file present but unusable
    #[error("Invalid configuration {path}: {reason}")]
    Config { path: PathBuf, reason: String },
}

impl KilnError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        KilnError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

pub type Result<T, E = KilnError> = std::result::Result<T, E>;

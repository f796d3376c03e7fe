//! # Project Workspace
//!
//! The fixed on-disk layout of a generated Maven project:
//!
//! ```text
//! <root>/
//!   pom.xml
//!   src/main/java/   source root
//!   src/test/java/   test root
//! ```

pub mod artifact;

pub use artifact::{ArtifactWriter, GeneratedArtifact};

use crate::error::{KilnError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Paths for one project. Read-only after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectWorkspace {
    pub project_root: PathBuf,
    pub source_root: PathBuf,
    pub test_root: PathBuf,
    pub manifest_path: PathBuf,
}

impl ProjectWorkspace {
    /// Conventional Maven layout under `project_root`
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self {
            source_root: project_root.join("src").join("main").join("java"),
            test_root: project_root.join("src").join("test").join("java"),
            manifest_path: project_root.join("pom.xml"),
            project_root,
        }
    }

    /// Root an artifact belongs under
    pub fn root_for(&self, is_test: bool) -> &Path {
        if is_test {
            &self.test_root
        } else {
            &self.source_root
        }
    }

    /// Create the source and test roots (and any missing parents).
    ///
    /// Idempotent. Fails only when a path cannot be created, e.g. a regular
    /// file already occupies one of the directory names.
    pub async fn ensure_layout(&self) -> Result<()> {
        for dir in [&self.source_root, &self.test_root] {
            fs::create_dir_all(dir).await.map_err(|e| {
                tracing::error!(path = %dir.display(), error = %e, "Failed to create directory");
                KilnError::io(dir, e)
            })?;
        }
        tracing::debug!(root = %self.project_root.display(), "Workspace layout ready");
        Ok(())
    }
}

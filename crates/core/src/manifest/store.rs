//! # Manifest Store
//!
//! Load, bootstrap and atomically persist the project manifest.
//!
//! The store holds no state between calls: every mutation re-reads the file,
//! edits it in memory and writes it back. Concurrent writers to the same path are
//! not coordinated.

use super::defaults::{default_manifest, ProjectIdentity};
use super::document::{DependencyDeclaration, Manifest};
use crate::error::{KilnError, Result};
use crate::provenance::Provenance;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Stateless handle for manifest file operations
#[derive(Debug, Clone, Default)]
pub struct ManifestStore {
    identity: ProjectIdentity,
}

impl ManifestStore {
    pub fn new(identity: ProjectIdentity) -> Self {
        Self { identity }
    }

    /// Load the manifest at `path`, bootstrapping a default one if none exists
    pub fn ensure_manifest(&self, path: &Path, provenance: &Provenance) -> Result<Manifest> {
        if path.exists() {
            return self.load(path);
        }

        let manifest = default_manifest(&self.identity, provenance).map_err(|source| {
            KilnError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        self.save(&manifest, path)?;
        tracing::info!(
            path = %path.display(),
            created_by = %provenance.created_by,
            "Bootstrapped default manifest"
        );
        Ok(manifest)
    }

    /// Parse the manifest at `path`
    pub fn load(&self, path: &Path) -> Result<Manifest> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Failed to read manifest");
            KilnError::io(path, e)
        })?;

        Manifest::parse(&content).map_err(|source| {
            tracing::error!(path = %path.display(), error = %source, "Failed to parse manifest");
            KilnError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// Apply `declarations` to `manifest` (pure, no I/O)
    pub fn upsert_dependencies(
        &self,
        manifest: Manifest,
        declarations: &[DependencyDeclaration],
    ) -> Manifest {
        manifest.with_dependencies(declarations)
    }

    /// Write the manifest to `path` atomically.
    ///
    /// 1. Write to `.<name>.tmp` beside the target
    /// 2. fsync the temporary file
    /// 3. Rename over the target
    ///
    /// An interrupted save leaves the previous file untouched.
    pub fn save(&self, manifest: &Manifest, path: &Path) -> Result<()> {
        let temp_path = temp_path_for(path);
        let xml = manifest.to_xml();

        let written = (|| -> std::io::Result<()> {
            let mut file = std::fs::File::create(&temp_path)?;
            file.write_all(xml.as_bytes())?;
            file.sync_all()
        })();
        if let Err(e) = written {
            tracing::error!(path = %temp_path.display(), error = %e, "Failed to write manifest");
            let _ = std::fs::remove_file(&temp_path);
            return Err(KilnError::io(&temp_path, e));
        }

        std::fs::rename(&temp_path, path).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Failed to replace manifest");
            let _ = std::fs::remove_file(&temp_path);
            KilnError::io(path, e)
        })?;

        tracing::debug!(
            path = %path.display(),
            dependencies = manifest.dependency_entry_count(),
            "Manifest saved"
        );
        Ok(())
    }

    /// Ensure, upsert and save in one read-modify-write cycle
    pub fn update_dependencies(
        &self,
        path: &Path,
        provenance: &Provenance,
        declarations: &[DependencyDeclaration],
    ) -> Result<Manifest> {
        let manifest = self.ensure_manifest(path, provenance)?;
        let manifest = self.upsert_dependencies(manifest, declarations);
        self.save(&manifest, path)?;
        tracing::info!(
            path = %path.display(),
            declared = declarations.len(),
            total = manifest.dependencies().len(),
            "Manifest dependencies updated"
        );
        Ok(manifest)
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "manifest".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

//! # Artifact Writer
//!
//! Persists generated source and test files under the workspace roots, each
//! prefixed with a provenance header in the file type's comment syntax.

use super::ProjectWorkspace;
use crate::error::{KilnError, Result};
use crate::provenance::Provenance;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// A generated file waiting to be written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    /// Path relative to the source or test root, e.g. `com/example/Calculator.java`
    pub relative_path: String,
    pub content: String,
    pub is_test: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl GeneratedArtifact {
    pub fn new(
        relative_path: impl Into<String>,
        content: impl Into<String>,
        is_test: bool,
        provenance: &Provenance,
    ) -> Self {
        Self {
            relative_path: relative_path.into(),
            content: content.into(),
            is_test,
            created_at: provenance.created_at,
            created_by: provenance.created_by.clone(),
        }
    }

    fn provenance(&self) -> Provenance {
        Provenance::new(self.created_by.clone(), self.created_at)
    }
}

/// Comment syntax used for the provenance header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentStyle {
    Block,
    Hash,
    Markup,
}

impl CommentStyle {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("py" | "sh" | "properties" | "yaml" | "yml" | "toml") => CommentStyle::Hash,
            Some("xml" | "html") => CommentStyle::Markup,
            _ => CommentStyle::Block,
        }
    }

    /// Make `text` safe to place on one line inside this comment style
    fn sanitize(self, text: &str) -> String {
        let line = text.replace(['\r', '\n'], " ");
        match self {
            CommentStyle::Block => line.replace("*/", "* /"),
            CommentStyle::Hash => line,
            CommentStyle::Markup => crate::manifest::xml::comment_body(&line),
        }
    }

    fn header(self, provenance: &Provenance) -> String {
        let by = self.sanitize(&format!("Generated by: {}", provenance.created_by));
        let at = format!("Created at: {}", provenance.timestamp());
        match self {
            CommentStyle::Block => format!("/*\n * {}\n * {}\n */\n", by, at),
            CommentStyle::Hash => format!("# {}\n# {}\n", by, at),
            CommentStyle::Markup => format!("<!--\n  {}\n  {}\n-->\n", by, at),
        }
    }
}

/// Writes artifacts into a [`ProjectWorkspace`]
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    workspace: ProjectWorkspace,
}

impl ArtifactWriter {
    pub fn new(workspace: ProjectWorkspace) -> Self {
        Self { workspace }
    }

    /// Resolve where `artifact` will be written, rejecting escaping paths
    pub fn destination(&self, artifact: &GeneratedArtifact) -> Result<PathBuf> {
        let relative = Path::new(&artifact.relative_path);
        let escapes = relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(KilnError::InvalidArtifactPath(artifact.relative_path.clone()));
        }
        Ok(self.workspace.root_for(artifact.is_test).join(relative))
    }

    /// Write `artifact`, replacing any existing file.
    ///
    /// A failed write may leave the file truncated; rewriting the same artifact
    /// overwrites it fully.
    pub async fn write(&self, artifact: &GeneratedArtifact) -> Result<PathBuf> {
        let path = self.destination(artifact)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                tracing::error!(path = %parent.display(), error = %e, "Failed to create artifact directory");
                KilnError::io(parent, e)
            })?;
        }

        let header = CommentStyle::for_path(&path).header(&artifact.provenance());
        write_file(&path, &header, &artifact.content)
            .await
            .map_err(|e| {
                tracing::error!(path = %path.display(), error = %e, "Failed to write artifact");
                KilnError::io(&path, e)
            })?;

        tracing::info!(
            path = %path.display(),
            is_test = artifact.is_test,
            bytes = header.len() + artifact.content.len(),
            "Artifact written"
        );
        Ok(path)
    }
}

async fn write_file(path: &Path, header: &str, content: &str) -> std::io::Result<()> {
    // The handle is closed when `file` drops, on success and on every error return.
    let mut file = fs::File::create(path).await?;
    file.write_all(header.as_bytes()).await?;
    file.write_all(content.as_bytes()).await?;
    if !content.ends_with('\n') {
        file.write_all(b"\n").await?;
    }
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn provenance() -> Provenance {
        Provenance::new("kiln-test", Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
    }

    async fn writer(dir: &TempDir) -> ArtifactWriter {
        let workspace = ProjectWorkspace::new(dir.path());
        workspace.ensure_layout().await.unwrap();
        ArtifactWriter::new(workspace)
    }

    #[tokio::test]
    async fn test_source_goes_under_source_root_with_header() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;
        let artifact = GeneratedArtifact::new(
            "com/example/Calculator.java",
            "package com.example;\n\npublic class Calculator {}\n",
            false,
            &provenance(),
        );

        let path = writer.write(&artifact).await.unwrap();
        assert_eq!(path, dir.path().join("src/main/java/com/example/Calculator.java"));

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with(
            "/*\n * Generated by: kiln-test\n * Created at: 2024-06-01T12:00:00Z\n */\npackage com.example;"
        ));
    }

    #[tokio::test]
    async fn test_tests_go_under_test_root() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;
        let artifact = GeneratedArtifact::new(
            "com/example/CalculatorTest.java",
            "class CalculatorTest {}",
            true,
            &provenance(),
        );

        let path = writer.write(&artifact).await.unwrap();
        assert!(path.starts_with(dir.path().join("src/test/java")));
        assert!(std::fs::read_to_string(&path).unwrap().ends_with("class CalculatorTest {}\n"));
    }

    #[tokio::test]
    async fn test_rewrite_overwrites_fully() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;
        let long = GeneratedArtifact::new("A.java", "x".repeat(500), false, &provenance());
        let short = GeneratedArtifact::new("A.java", "class A {}\n", false, &provenance());

        writer.write(&long).await.unwrap();
        let path = writer.write(&short).await.unwrap();
        let written = std::fs::read_to_string(path).unwrap();
        assert!(!written.contains('x'));
        assert!(written.ends_with("class A {}\n"));
    }

    #[tokio::test]
    async fn test_hash_comment_for_properties() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;
        let artifact =
            GeneratedArtifact::new("app.properties", "key=value\n", false, &provenance());

        let path = writer.write(&artifact).await.unwrap();
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.starts_with("# Generated by: kiln-test\n"));
    }

    #[test]
    fn test_header_survives_hostile_creator() {
        let provenance = Provenance::new(
            "evil */ -->\nx",
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        );

        let block = CommentStyle::Block.header(&provenance);
        assert_eq!(block.matches("*/").count(), 1);
        assert!(block.ends_with(" */\n"));

        let markup = CommentStyle::Markup.header(&provenance);
        assert_eq!(markup.matches("-->").count(), 1);

        let hash = CommentStyle::Hash.header(&provenance);
        assert!(hash.lines().all(|line| line.starts_with('#')));
    }

    #[tokio::test]
    async fn test_escaping_paths_are_rejected() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;
        for bad in ["../Evil.java", "/etc/passwd", "a/../../b.java", ""] {
            let artifact = GeneratedArtifact::new(bad, "", false, &provenance());
            let err = writer.write(&artifact).await.unwrap_err();
            assert!(matches!(err, KilnError::InvalidArtifactPath(_)), "{}", bad);
        }
    }

    #[tokio::test]
    async fn test_write_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;
        // A directory where the file should go
        std::fs::create_dir_all(dir.path().join("src/main/java/Taken.java")).unwrap();
        let artifact = GeneratedArtifact::new("Taken.java", "class Taken {}", false, &provenance());

        let err = writer.write(&artifact).await.unwrap_err();
        assert!(matches!(err, KilnError::Io { .. }));
    }
}

//! Session controller: wires workspace, manifest, generator, writer and build.

use super::report::SessionReport;
use crate::codegen::CodeGenerator;
use crate::config::KilnConfig;
use crate::error::{KilnError, Result};
use crate::manifest::{DependencyDeclaration, ManifestStore};
use crate::provenance::Provenance;
use crate::tools::{BuildAndTest, BuildOrchestrator, CommandToolchain, Toolchain};
use crate::workspace::{ArtifactWriter, GeneratedArtifact, ProjectWorkspace};
use std::path::PathBuf;

/// A single-pass generate/build/test session over one project
pub struct Session<G: CodeGenerator, T: Toolchain> {
    workspace: ProjectWorkspace,
    store: ManifestStore,
    dependencies: Vec<DependencyDeclaration>,
    generator: G,
    orchestrator: BuildOrchestrator<T>,
    created_by: String,
}

impl<G: CodeGenerator> Session<G, CommandToolchain> {
    /// Session using the configured command-line toolchain
    pub fn from_config(workspace: ProjectWorkspace, config: &KilnConfig, generator: G) -> Self {
        let mut orchestrator = BuildOrchestrator::new(config.toolchain.clone());
        if let Some(timeout) = config.timeout() {
            orchestrator = orchestrator.with_timeout(timeout);
        }
        Self {
            workspace,
            store: ManifestStore::new(config.project.clone()),
            dependencies: config.dependencies.clone(),
            generator,
            orchestrator,
            created_by: config.created_by.clone(),
        }
    }
}

impl<G: CodeGenerator, T: Toolchain> Session<G, T> {
    pub fn new(
        workspace: ProjectWorkspace,
        store: ManifestStore,
        generator: G,
        orchestrator: BuildOrchestrator<T>,
    ) -> Self {
        Self {
            workspace,
            store,
            dependencies: Vec::new(),
            generator,
            orchestrator,
            created_by: crate::config::DEFAULT_CREATOR.to_string(),
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<DependencyDeclaration>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn orchestrator(&self) -> &BuildOrchestrator<T> {
        &self.orchestrator
    }

    /// Run the whole session, stamping everything with the current time
    pub async fn run(&self, prompt: &str) -> Result<SessionReport> {
        self.run_with(prompt, &Provenance::now(self.created_by.clone()))
            .await
    }

    /// Run the whole session with an explicit provenance stamp
    #[tracing::instrument(skip_all, fields(root = %self.workspace.project_root.display()))]
    pub async fn run_with(&self, prompt: &str, provenance: &Provenance) -> Result<SessionReport> {
        let dependencies = self.prepare(provenance).await?;

        let sources = self.generator.generate(prompt).await.map_err(|e| {
            tracing::error!(error = %e, "Code generation failed");
            KilnError::Generation(e)
        })?;
        let artifacts: Vec<GeneratedArtifact> = sources
            .into_iter()
            .map(|s| GeneratedArtifact::new(s.path, s.content, s.is_test, provenance))
            .collect();
        let written = self.write_artifacts(&artifacts).await?;

        let outcome = self.build().await;
        Ok(SessionReport::new(
            self.workspace.manifest_path.clone(),
            dependencies,
            written,
            outcome,
        ))
    }

    /// Ensure the layout exists and declare the session's dependencies.
    ///
    /// Returns the manifest's full dependency list afterwards.
    pub async fn prepare(&self, provenance: &Provenance) -> Result<Vec<DependencyDeclaration>> {
        self.workspace.ensure_layout().await?;
        let manifest = self.store.update_dependencies(
            &self.workspace.manifest_path,
            provenance,
            &self.dependencies,
        )?;
        Ok(manifest.dependencies())
    }

    /// Write artifacts in order, stopping at the first failure
    pub async fn write_artifacts(&self, artifacts: &[GeneratedArtifact]) -> Result<Vec<PathBuf>> {
        let writer = ArtifactWriter::new(self.workspace.clone());
        let mut written = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            written.push(writer.write(artifact).await?);
        }
        Ok(written)
    }

    /// Compile, then test if the build passed
    pub async fn build(&self) -> BuildAndTest {
        self.orchestrator
            .run_build_then_test(&self.workspace.project_root)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::GeneratedSource;
    use crate::tools::{Phase, ToolOutput};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FixedGenerator(Vec<GeneratedSource>);

    #[async_trait]
    impl CodeGenerator for FixedGenerator {
        async fn generate(&self, _prompt: &str) -> anyhow::Result<Vec<GeneratedSource>> {
            Ok(self.0.clone())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl CodeGenerator for FailingGenerator {
        async fn generate(&self, _prompt: &str) -> anyhow::Result<Vec<GeneratedSource>> {
            Err(anyhow::anyhow!("provider unavailable"))
        }
    }

    /// Records phases; compile fails when `fail_compile` is set
    #[derive(Default)]
    struct RecordingToolchain {
        fail_compile: bool,
        calls: Mutex<Vec<Phase>>,
    }

    #[async_trait]
    impl Toolchain for RecordingToolchain {
        fn describe(&self, phase: Phase) -> String {
            format!("recording {}", phase)
        }

        async fn invoke(&self, phase: Phase, working_dir: &Path) -> std::io::Result<ToolOutput> {
            // The manifest must already be on disk when any phase runs.
            assert!(working_dir.join("pom.xml").exists());
            self.calls.lock().unwrap().push(phase);
            let status = if self.fail_compile && phase == Phase::Compile { 1 } else { 0 };
            Ok(ToolOutput {
                status: Some(status),
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    fn provenance() -> Provenance {
        Provenance::new("kiln-test", Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
    }

    fn sources() -> Vec<GeneratedSource> {
        vec![
            GeneratedSource {
                path: "com/example/Calculator.java".to_string(),
                content: "package com.example;\npublic class Calculator {}\n".to_string(),
                is_test: false,
            },
            GeneratedSource {
                path: "com/example/CalculatorTest.java".to_string(),
                content: "package com.example;\nclass CalculatorTest {}\n".to_string(),
                is_test: true,
            },
        ]
    }

    fn session<G: CodeGenerator>(
        dir: &TempDir,
        generator: G,
        toolchain: RecordingToolchain,
    ) -> Session<G, RecordingToolchain> {
        Session::new(
            ProjectWorkspace::new(dir.path()),
            ManifestStore::default(),
            generator,
            BuildOrchestrator::new(toolchain),
        )
        .with_dependencies(vec![DependencyDeclaration::new(
            "org.junit.jupiter",
            "junit-jupiter-api",
            "5.9.2",
        )])
    }

    #[tokio::test]
    async fn test_full_session_writes_and_builds() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir, FixedGenerator(sources()), RecordingToolchain::default());

        let report = session.run_with("make a calculator", &provenance()).await.unwrap();

        assert!(report.succeeded());
        assert_eq!(report.dependencies.len(), 1);
        assert_eq!(report.artifacts.len(), 2);
        assert!(dir.path().join("src/main/java/com/example/Calculator.java").exists());
        assert!(dir.path().join("src/test/java/com/example/CalculatorTest.java").exists());
        assert_eq!(
            *session.orchestrator().toolchain().calls.lock().unwrap(),
            vec![Phase::Compile, Phase::Test]
        );
    }

    #[tokio::test]
    async fn test_repeated_sessions_keep_one_entry_per_dependency() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir, FixedGenerator(sources()), RecordingToolchain::default());

        session.run_with("first", &provenance()).await.unwrap();
        let report = session.run_with("second", &provenance()).await.unwrap();

        assert_eq!(report.dependencies.len(), 1);
        let pom = std::fs::read_to_string(dir.path().join("pom.xml")).unwrap();
        assert_eq!(pom.matches("<dependency>").count(), 1);
    }

    #[tokio::test]
    async fn test_failing_build_skips_tests() {
        let dir = TempDir::new().unwrap();
        let toolchain = RecordingToolchain {
            fail_compile: true,
            ..Default::default()
        };
        let session = session(&dir, FixedGenerator(sources()), toolchain);

        let report = session.run_with("x", &provenance()).await.unwrap();
        assert!(!report.build.succeeded);
        assert!(report.test.is_none());
        assert!(!report.succeeded());
        assert!(report.to_string().contains("skipped"));
        assert_eq!(
            *session.orchestrator().toolchain().calls.lock().unwrap(),
            vec![Phase::Compile]
        );
    }

    #[tokio::test]
    async fn test_generation_failure_stops_before_build() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir, FailingGenerator, RecordingToolchain::default());

        let err = session.run_with("x", &provenance()).await.unwrap_err();
        assert!(matches!(err, KilnError::Generation(_)));
        assert!(session.orchestrator().toolchain().calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_artifact_path_stops_before_build() {
        let dir = TempDir::new().unwrap();
        let generator = FixedGenerator(vec![GeneratedSource {
            path: "../outside.java".to_string(),
            content: String::new(),
            is_test: false,
        }]);
        let session = session(&dir, generator, RecordingToolchain::default());

        let err = session.run_with("x", &provenance()).await.unwrap_err();
        assert!(matches!(err, KilnError::InvalidArtifactPath(_)));
        assert!(session.orchestrator().toolchain().calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_manifest_stops_session() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("pom.xml"), "<project>").unwrap();
        let session = session(&dir, FixedGenerator(sources()), RecordingToolchain::default());

        let err = session.run_with("x", &provenance()).await.unwrap_err();
        assert!(matches!(err, KilnError::Parse { .. }));
        assert!(!dir.path().join("src/main/java/com").exists());
    }
}

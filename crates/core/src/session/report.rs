//! Serializable summary of a finished session.

use crate::manifest::DependencyDeclaration;
use crate::tools::{BuildAndTest, BuildStepResult, StepFailure};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub manifest_path: PathBuf,
    /// Dependencies declared in the manifest after the update
    pub dependencies: Vec<DependencyDeclaration>,
    /// Files written this session
    pub artifacts: Vec<PathBuf>,
    pub build: BuildStepResult,
    /// Absent when the build failed
    pub test: Option<BuildStepResult>,
}

impl SessionReport {
    pub fn new(
        manifest_path: PathBuf,
        dependencies: Vec<DependencyDeclaration>,
        artifacts: Vec<PathBuf>,
        outcome: BuildAndTest,
    ) -> Self {
        Self {
            manifest_path,
            dependencies,
            artifacts,
            build: outcome.build,
            test: outcome.test,
        }
    }

    /// Build and tests both ran and passed
    pub fn succeeded(&self) -> bool {
        self.build.succeeded && self.test.as_ref().is_some_and(|t| t.succeeded)
    }
}

fn step_line(f: &mut fmt::Formatter<'_>, label: &str, step: &BuildStepResult) -> fmt::Result {
    let verdict = match (step.succeeded, step.failure) {
        (true, _) => "passed".to_string(),
        (false, Some(StepFailure::LaunchFailed)) => "could not start toolchain".to_string(),
        (false, Some(StepFailure::TimedOut)) => "timed out".to_string(),
        (false, _) => match step.exit_status {
            Some(code) => format!("failed (exit {})", code),
            None => "failed (terminated)".to_string(),
        },
    };
    writeln!(f, "{:<8} {} in {}ms", label, verdict, step.duration_ms)
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Manifest: {}", self.manifest_path.display())?;
        for dep in &self.dependencies {
            writeln!(f, "  {}", dep)?;
        }
        if !self.artifacts.is_empty() {
            writeln!(f, "Artifacts:")?;
            for path in &self.artifacts {
                writeln!(f, "  {}", path.display())?;
            }
        }
        step_line(f, "Build:", &self.build)?;
        match &self.test {
            Some(test) => step_line(f, "Tests:", test),
            None => writeln!(f, "{:<8} skipped", "Tests:"),
        }
    }
}

//! # Toolchain
//!
//! The external build tool, reduced to "run this phase in that directory and
//! hand back the exit status and both output streams".
//!
//! Only the fixed phases in [`Phase`] can be requested; there is no way to pass
//! an arbitrary subcommand through this interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// A build lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Compile,
    Test,
}

impl Phase {
    /// Argument passed to the toolchain
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Compile => "compile",
            Phase::Test => "test",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw result of a process that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Something that can execute a build phase
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Human-readable command, used in logs
    fn describe(&self, phase: Phase) -> String;

    /// Run `phase` in `working_dir` and wait for it to finish.
    ///
    /// `Err` means the process could not be started at all.
    async fn invoke(&self, phase: Phase, working_dir: &Path) -> std::io::Result<ToolOutput>;
}

/// Runs `<program> [args..] <phase>` as a child process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandToolchain {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for CommandToolchain {
    /// Maven in batch mode
    fn default() -> Self {
        Self {
            program: "mvn".to_string(),
            args: vec!["-B".to_string()],
        }
    }
}

impl CommandToolchain {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl Toolchain for CommandToolchain {
    fn describe(&self, phase: Phase) -> String {
        let mut parts = vec![self.program.as_str()];
        parts.extend(self.args.iter().map(String::as_str));
        parts.push(phase.as_str());
        parts.join(" ")
    }

    async fn invoke(&self, phase: Phase, working_dir: &Path) -> std::io::Result<ToolOutput> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(phase.as_str())
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_arguments() {
        assert_eq!(Phase::Compile.as_str(), "compile");
        assert_eq!(Phase::Test.to_string(), "test");
        assert_eq!(serde_json::to_string(&Phase::Compile).unwrap(), "\"compile\"");
    }

    #[test]
    fn test_describe_default_command() {
        let toolchain = CommandToolchain::default();
        assert_eq!(toolchain.describe(Phase::Compile), "mvn -B compile");
        assert_eq!(CommandToolchain::new("gradle").describe(Phase::Test), "gradle test");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invoke_captures_both_streams() {
        let dir = tempfile::TempDir::new().unwrap();
        // `sh -c <script> <phase>` binds the phase to $0
        let toolchain = CommandToolchain::new("sh")
            .with_args(["-c", "echo \"running $0\"; echo oops >&2; exit 3"]);

        let output = toolchain.invoke(Phase::Compile, dir.path()).await.unwrap();
        assert_eq!(output.status, Some(3));
        assert_eq!(output.stdout, "running compile\n");
        assert_eq!(output.stderr, "oops\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invoke_runs_in_working_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let toolchain = CommandToolchain::new("sh").with_args(["-c", "cat marker.txt"]);

        let output = toolchain.invoke(Phase::Test, dir.path()).await.unwrap();
        assert_eq!(output.status, Some(0));
        assert_eq!(output.stdout, "here");
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let toolchain = CommandToolchain::new("kiln-no-such-toolchain-binary");
        assert!(toolchain.invoke(Phase::Compile, dir.path()).await.is_err());
    }
}

//! # Build Orchestrator
//!
//! Runs the toolchain's `compile` phase and, only if it succeeds, the `test`
//! phase. Every outcome, including a toolchain that cannot be launched or one
//! that exceeds its time limit, comes back as a [`BuildStepResult`] value rather
//! than an error, so callers can inspect build and test independently.

use super::toolchain::{Phase, Toolchain};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

/// Why a step did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepFailure {
    /// The toolchain process could not be started
    LaunchFailed,
    /// The process ran and exited non-zero (or was killed by a signal)
    NonZeroExit,
    /// The process outlived the configured timeout and was killed
    TimedOut,
}

/// Outcome of one toolchain invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStepResult {
    pub phase: Phase,
    pub succeeded: bool,
    pub stdout: String,
    pub stderr: String,
    /// Process exit code, absent if it never ran or ended by signal
    pub exit_status: Option<i32>,
    pub failure: Option<StepFailure>,
    pub duration_ms: u64,
}

impl BuildStepResult {
    fn completed(phase: Phase, status: Option<i32>, stdout: String, stderr: String) -> Self {
        let succeeded = status == Some(0);
        Self {
            phase,
            succeeded,
            stdout,
            stderr,
            exit_status: status,
            failure: (!succeeded).then_some(StepFailure::NonZeroExit),
            duration_ms: 0,
        }
    }

    fn failed(phase: Phase, failure: StepFailure, message: String) -> Self {
        Self {
            phase,
            succeeded: false,
            stdout: String::new(),
            stderr: message,
            exit_status: None,
            failure: Some(failure),
            duration_ms: 0,
        }
    }

    fn timed(mut self, started: Instant) -> Self {
        self.duration_ms = started.elapsed().as_millis() as u64;
        self
    }

    /// Last `lines` lines of stderr, falling back to stdout (Maven reports
    /// compile errors on stdout)
    pub fn output_tail(&self, lines: usize) -> String {
        let source = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        let all: Vec<&str> = source.lines().collect();
        let start = all.len().saturating_sub(lines);
        all[start..].join("\n")
    }
}

/// Build result plus the test result, absent when the build failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildAndTest {
    pub build: BuildStepResult,
    pub test: Option<BuildStepResult>,
}

impl BuildAndTest {
    pub fn succeeded(&self) -> bool {
        self.build.succeeded && self.test.as_ref().is_some_and(|t| t.succeeded)
    }
}

/// Sequences toolchain phases; no retries
pub struct BuildOrchestrator<T: Toolchain> {
    toolchain: T,
    timeout: Option<Duration>,
}

impl<T: Toolchain> BuildOrchestrator<T> {
    pub fn new(toolchain: T) -> Self {
        Self {
            toolchain,
            timeout: None,
        }
    }

    /// Kill any phase that runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn toolchain(&self) -> &T {
        &self.toolchain
    }

    /// Run a single phase in `working_dir`
    #[tracing::instrument(skip(self, working_dir), fields(dir = %working_dir.display()))]
    pub async fn run_phase(&self, phase: Phase, working_dir: &Path) -> BuildStepResult {
        let command = self.toolchain.describe(phase);
        tracing::info!(%command, "Starting toolchain phase");
        let started = Instant::now();

        let invocation = self.toolchain.invoke(phase, working_dir);
        let outcome = match self.timeout {
            // Dropping the timed-out future drops the child, which kills it.
            Some(limit) => match tokio::time::timeout(limit, invocation).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let result = BuildStepResult::failed(
                        phase,
                        StepFailure::TimedOut,
                        format!("'{}' timed out after {}s", command, limit.as_secs_f64()),
                    )
                    .timed(started);
                    tracing::warn!(%command, timeout_ms = limit.as_millis() as u64, "Toolchain phase timed out");
                    return result;
                }
            },
            None => invocation.await,
        };

        let result = match outcome {
            Ok(output) => {
                BuildStepResult::completed(phase, output.status, output.stdout, output.stderr)
                    .timed(started)
            }
            Err(e) => {
                tracing::error!(%command, error = %e, "Failed to launch toolchain");
                return BuildStepResult::failed(
                    phase,
                    StepFailure::LaunchFailed,
                    format!("Failed to run '{}': {}", command, e),
                )
                .timed(started);
            }
        };

        tracing::debug!(
            stdout_bytes = result.stdout.len(),
            stderr_bytes = result.stderr.len(),
            "Captured toolchain output"
        );
        if result.succeeded {
            tracing::info!(duration_ms = result.duration_ms, "Toolchain phase succeeded");
        } else {
            tracing::warn!(
                exit_status = ?result.exit_status,
                duration_ms = result.duration_ms,
                tail = %result.output_tail(20),
                "Toolchain phase failed"
            );
        }
        result
    }

    /// Run `compile`, then `test` only if `compile` succeeded
    pub async fn run_build_then_test(&self, working_dir: &Path) -> BuildAndTest {
        let build = self.run_phase(Phase::Compile, working_dir).await;
        if !build.succeeded {
            tracing::warn!("Build failed, skipping tests");
            return BuildAndTest { build, test: None };
        }

        let test = self.run_phase(Phase::Test, working_dir).await;
        BuildAndTest {
            build,
            test: Some(test),
        }
    }
}

//! # Build Tools
//!
//! External toolchain invocation with structured results.
//!
//! - `toolchain` - The [`Toolchain`] seam and the child-process implementation
//! - `build` - Compile-then-test sequencing with timeout and result capture

pub mod build;
pub mod toolchain;

pub use build::{BuildAndTest, BuildOrchestrator, BuildStepResult, StepFailure};
pub use toolchain::{CommandToolchain, Phase, ToolOutput, Toolchain};

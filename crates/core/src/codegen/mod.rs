//! # Code Generation
//!
//! The collaborator that turns a natural-language instruction into source files.
//! Kiln only depends on the [`CodeGenerator`] trait; [`LlmCodeGenerator`] is the
//! provider-backed implementation.

pub mod llm;
pub mod prompts;

pub use llm::LlmCodeGenerator;

use async_trait::async_trait;
use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One generated file, as returned by a generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct GeneratedSource {
    /// Path relative to the source or test root
    pub path: String,
    /// Full file content
    pub content: String,
    /// Whether this is test code
    #[serde(default)]
    pub is_test: bool,
}

/// Produces source files from a prompt
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<Vec<GeneratedSource>>;
}

//! # LLM Code Generator
//!
//! Asks a radkit `LlmFunction` for a structured list of files.

use super::{prompts, CodeGenerator, GeneratedSource};
use crate::models::ModelConfig;
use async_trait::async_trait;
use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Structured output requested from the model
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct GenerationOutput {
    /// Files to write
    pub files: Vec<GeneratedSource>,
}

/// Run a structured-output `LlmFunction` against whichever provider `$config`
/// selects. Provider types differ, so the match has to happen at each call site.
macro_rules! run_llm_function {
    ($config:expr, $output_type:ty, $system_prompt:expr, $input:expr) => {{
        use radkit::agent::LlmFunction;
        use radkit::models::providers::{AnthropicLlm, OpenAILlm, OpenRouterLlm};
        use $crate::models::LlmProvider;

        let config = $config;
        let result: anyhow::Result<$output_type> = match config.provider {
            LlmProvider::Anthropic => {
                let llm = AnthropicLlm::from_env(&config.model)?;
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run($input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::OpenAI => {
                let mut llm = OpenAILlm::from_env(&config.model)?;
                if let Some(base_url) = &config.base_url {
                    llm = llm.with_base_url(base_url);
                }
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run($input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::OpenRouter => {
                let llm = OpenRouterLlm::from_env(&config.model)?;
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run($input)
                    .await
                    .map_err(Into::into)
            }
        };
        result
    }};
}

/// Generates Java sources and JUnit 5 tests through an LLM provider
#[derive(Debug, Clone, Default)]
pub struct LlmCodeGenerator {
    config: ModelConfig,
}

impl LlmCodeGenerator {
    pub fn new(config: ModelConfig) -> Self {
        if config.base_url.is_some() && !config.provider.supports_base_url() {
            tracing::warn!(
                provider = config.provider.display_name(),
                "Base URL is only used with OpenAI-compatible providers, ignoring it"
            );
        }
        Self { config }
    }
}

#[async_trait]
impl CodeGenerator for LlmCodeGenerator {
    #[tracing::instrument(skip(self, prompt), fields(
        provider = self.config.provider.display_name(),
        model = %self.config.model,
        prompt_preview = %prompt.chars().take(50).collect::<String>(),
    ))]
    async fn generate(&self, prompt: &str) -> anyhow::Result<Vec<GeneratedSource>> {
        self.config.check_credentials()?;
        let output = run_llm_function!(
            &self.config,
            GenerationOutput,
            prompts::JAVA_CODER,
            prompt.to_string()
        )?;
        tracing::info!(files = output.files.len(), "Code generated");
        Ok(output.files)
    }
}

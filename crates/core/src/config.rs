//! # Configuration
//!
//! Per-project settings persisted at `<project>/.kiln/config.json`. A missing
//! file means defaults; a present but invalid file is an error rather than being
//! silently replaced.

use crate::error::{KilnError, Result};
use crate::manifest::{DependencyDeclaration, ProjectIdentity};
use crate::models::{LlmProvider, ModelConfig};
use crate::tools::CommandToolchain;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory holding Kiln's own files inside a project
pub const CONFIG_DIR: &str = ".kiln";
const CONFIG_FILE: &str = "config.json";

/// Identity stamped into generated files when nothing else is configured
pub const DEFAULT_CREATOR: &str = "kiln";

/// Project-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KilnConfig {
    pub model: ModelConfig,
    pub toolchain: CommandToolchain,
    /// Per-phase time limit; `None` waits indefinitely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Creator identity for provenance stamps
    pub created_by: String,
    /// Dependencies declared on every session
    pub dependencies: Vec<DependencyDeclaration>,
    /// Identity used when bootstrapping `pom.xml`
    pub project: ProjectIdentity,
}

impl Default for KilnConfig {
    fn default() -> Self {
        let junit = |artifact: &str| DependencyDeclaration::new("org.junit.jupiter", artifact, "5.9.2");
        Self {
            model: ModelConfig::default(),
            toolchain: CommandToolchain::default(),
            timeout_secs: None,
            created_by: DEFAULT_CREATOR.to_string(),
            dependencies: vec![
                junit("junit-jupiter-api"),
                junit("junit-jupiter-engine"),
                junit("junit-jupiter-params"),
            ],
            project: ProjectIdentity::default(),
        }
    }
}

/// Command-line overrides; `Some` fields replace the loaded values
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub provider: Option<LlmProvider>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Replaces the program; its default arguments are dropped unless
    /// `toolchain_args` supplies new ones
    pub toolchain_program: Option<String>,
    pub toolchain_args: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
    pub created_by: Option<String>,
}

impl KilnConfig {
    pub fn path_for(project_root: &Path) -> PathBuf {
        project_root.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Load the project's config, or defaults if it has none
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = Self::path_for(project_root);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Failed to read config");
            KilnError::io(&path, e)
        })?;
        serde_json::from_str(&content).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Invalid config");
            KilnError::Config {
                path,
                reason: e.to_string(),
            }
        })
    }

    /// Persist to `<project>/.kiln/config.json`
    pub fn save(&self, project_root: &Path) -> Result<()> {
        let path = Self::path_for(project_root);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| KilnError::io(parent, e))?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| KilnError::Config {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Failed to write config");
            KilnError::io(&path, e)
        })?;
        tracing::info!(path = %path.display(), "Config saved");
        Ok(())
    }

    pub fn merge(&mut self, overrides: ConfigOverrides) {
        if let Some(provider) = overrides.provider {
            self.model.provider = provider;
        }
        if let Some(model) = overrides.model {
            self.model.model = model;
        }
        if overrides.base_url.is_some() {
            self.model.base_url = overrides.base_url;
        }
        if let Some(program) = overrides.toolchain_program {
            if program != self.toolchain.program {
                self.toolchain.args.clear();
            }
            self.toolchain.program = program;
        }
        if let Some(args) = overrides.toolchain_args {
            self.toolchain.args = args;
        }
        if overrides.timeout_secs.is_some() {
            self.timeout_secs = overrides.timeout_secs;
        }
        if let Some(created_by) = overrides.created_by {
            self.created_by = created_by;
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = KilnConfig::load(dir.path()).unwrap();
        assert_eq!(config, KilnConfig::default());
        assert_eq!(config.dependencies.len(), 3);
        assert_eq!(config.toolchain.program, "mvn");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(CONFIG_DIR)).unwrap();
        std::fs::write(
            KilnConfig::path_for(dir.path()),
            r#"{ "timeout_secs": 600, "toolchain": { "program": "./mvnw" } }"#,
        )
        .unwrap();

        let config = KilnConfig::load(dir.path()).unwrap();
        assert_eq!(config.timeout(), Some(Duration::from_secs(600)));
        assert_eq!(config.toolchain.program, "./mvnw");
        assert!(config.toolchain.args.is_empty());
        assert_eq!(config.created_by, DEFAULT_CREATOR);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(CONFIG_DIR)).unwrap();
        std::fs::write(KilnConfig::path_for(dir.path()), "{ nope").unwrap();
        assert!(matches!(
            KilnConfig::load(dir.path()),
            Err(KilnError::Config { .. })
        ));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut config = KilnConfig::default();
        config.created_by = "ci".to_string();
        config.save(dir.path()).unwrap();
        assert_eq!(KilnConfig::load(dir.path()).unwrap(), config);
    }

    #[test]
    fn test_overrides_win() {
        let mut config = KilnConfig::default();
        config.merge(ConfigOverrides {
            provider: Some(LlmProvider::OpenAI),
            model: Some("gpt-4".to_string()),
            timeout_secs: Some(30),
            ..Default::default()
        });
        assert_eq!(config.model.provider, LlmProvider::OpenAI);
        assert_eq!(config.model.model, "gpt-4");
        assert_eq!(config.timeout_secs, Some(30));
        assert_eq!(config.toolchain.program, "mvn");
        assert_eq!(config.toolchain.args, vec!["-B".to_string()]);
    }

    #[test]
    fn test_other_program_drops_maven_args() {
        let mut config = KilnConfig::default();
        config.merge(ConfigOverrides {
            toolchain_program: Some("gradle".to_string()),
            ..Default::default()
        });
        assert_eq!(config.toolchain.program, "gradle");
        assert!(config.toolchain.args.is_empty());

        config.merge(ConfigOverrides {
            toolchain_program: Some("./gradlew".to_string()),
            toolchain_args: Some(vec!["--offline".to_string()]),
            ..Default::default()
        });
        assert_eq!(config.toolchain.program, "./gradlew");
        assert_eq!(config.toolchain.args, vec!["--offline".to_string()]);
    }

    #[test]
    fn test_same_program_keeps_args() {
        let mut config = KilnConfig::default();
        config.merge(ConfigOverrides {
            toolchain_program: Some("mvn".to_string()),
            ..Default::default()
        });
        assert_eq!(config.toolchain.args, vec!["-B".to_string()]);
    }
}

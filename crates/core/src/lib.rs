//! # Kiln Core
//!
//! Manifest editing and build orchestration for generated Java projects.
//!
//! ## Architecture
//!
//! - `manifest/` - Namespaced POM parsing, dependency upsert, atomic save
//! - `tools/` - Toolchain invocation (`compile`, then `test`)
//! - `workspace/` - Source/test root layout and artifact writing
//! - `codegen/` - The code generator interface and its LLM implementation
//! - `session/` - One pass: manifest -> generate -> write -> build -> test
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kiln_core::{config::KilnConfig, codegen::LlmCodeGenerator, session::Session};
//! use kiln_core::workspace::ProjectWorkspace;
//!
//! let config = KilnConfig::load(root)?;
//! let generator = LlmCodeGenerator::new(config.model.clone());
//! let session = Session::from_config(ProjectWorkspace::new(root), &config, generator);
//! let report = session.run("Create a Calculator class with unit tests").await?;
//! ```

pub mod codegen;
pub mod config;
pub mod error;
pub mod manifest;
pub mod models;
pub mod provenance;
pub mod session;
pub mod tools;
pub mod workspace;

pub use error::{KilnError, Result};
pub use provenance::Provenance;

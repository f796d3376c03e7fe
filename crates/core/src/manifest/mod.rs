//! # Manifest
//!
//! Structured editing of the project's Maven POM.
//!
//! - `xml` - Owned element tree over `quick-xml`
//! - `document` - Manifest model and dependency upsert
//! - `defaults` - Bootstrap document for new projects
//! - `store` - Load/save with atomic replace

pub mod defaults;
pub mod document;
pub mod store;
pub mod xml;

pub use defaults::{default_manifest, ProjectIdentity};
pub use document::{DependencyDeclaration, DependencyKey, Manifest, ParseError, POM_NAMESPACE};
pub use store::ManifestStore;

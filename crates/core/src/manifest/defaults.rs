//! # Default Manifest
//!
//! The document synthesized when a project has no `pom.xml` yet: project
//! identity, Java language-version properties, a provenance stamp, an empty
//! `dependencies` section, and compiler/surefire plugin configuration so that
//! JUnit 5 tests run under `mvn test`.

use super::document::{Manifest, ParseError, POM_NAMESPACE};
use super::xml::{comment_body, Document, Element, Node};
use crate::provenance::Provenance;
use serde::{Deserialize, Serialize};

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str =
    "http://maven.apache.org/POM/4.0.0 https://maven.apache.org/xsd/maven-4.0.0.xsd";

/// Property keys carrying the bootstrap provenance stamp
pub const CREATED_BY_PROPERTY: &str = "kiln.createdBy";
pub const CREATED_AT_PROPERTY: &str = "kiln.createdAt";

/// Identity written into a freshly bootstrapped manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectIdentity {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    /// Value for `maven.compiler.source` / `maven.compiler.target`
    pub java_version: String,
}

impl Default for ProjectIdentity {
    fn default() -> Self {
        Self {
            group_id: "com.example".to_string(),
            artifact_id: "generated-project".to_string(),
            version: "1.0-SNAPSHOT".to_string(),
            java_version: "17".to_string(),
        }
    }
}

/// Build the default manifest for `identity`, stamped with `provenance`
pub fn default_manifest(
    identity: &ProjectIdentity,
    provenance: &Provenance,
) -> Result<Manifest, ParseError> {
    let properties = Element::new("properties")
        .with_child(Element::with_text(
            "project.build.sourceEncoding",
            "UTF-8",
        ))
        .with_child(Element::with_text(
            "maven.compiler.source",
            &identity.java_version,
        ))
        .with_child(Element::with_text(
            "maven.compiler.target",
            &identity.java_version,
        ))
        .with_child(Element::with_text(
            CREATED_BY_PROPERTY,
            &provenance.created_by,
        ))
        .with_child(Element::with_text(
            CREATED_AT_PROPERTY,
            provenance.timestamp(),
        ));

    let plugins = Element::new("plugins")
        .with_child(plugin("maven-compiler-plugin", "3.11.0"))
        .with_child(plugin("maven-surefire-plugin", "3.0.0"));

    let root = Element::new("project")
        .with_attribute("xmlns", POM_NAMESPACE)
        .with_attribute("xmlns:xsi", XSI_NAMESPACE)
        .with_attribute("xsi:schemaLocation", SCHEMA_LOCATION)
        .with_child(Element::with_text("modelVersion", "4.0.0"))
        .with_child(Element::with_text("groupId", &identity.group_id))
        .with_child(Element::with_text("artifactId", &identity.artifact_id))
        .with_child(Element::with_text("version", &identity.version))
        .with_child(Element::with_text("packaging", "jar"))
        .with_child(properties)
        .with_child(Element::new("dependencies"))
        .with_child(Element::new("build").with_child(plugins));

    Manifest::from_document(Document {
        prolog: vec![Node::Comment(comment_body(&format!(
            " Generated by {} on {} ",
            provenance.created_by,
            provenance.timestamp()
        )))],
        root,
        epilog: Vec::new(),
    })
}

fn plugin(artifact_id: &str, version: &str) -> Element {
    Element::new("plugin")
        .with_child(Element::with_text("groupId", "org.apache.maven.plugins"))
        .with_child(Element::with_text("artifactId", artifact_id))
        .with_child(Element::with_text("version", version))
}

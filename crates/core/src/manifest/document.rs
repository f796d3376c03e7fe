//! # Manifest Document
//!
//! In-memory form of a Maven POM. The `dependencies` section is lifted out of the
//! element tree into a map keyed by `(groupId, artifactId)` and projected back to
//! an ordered element list when the document is serialized. Everything else in the
//! tree is carried through verbatim.

use super::xml::{self, Document, Element, Node};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Namespace every POM element lives in
pub const POM_NAMESPACE: &str = "http://maven.apache.org/POM/4.0.0";

const DEPENDENCIES: &str = "dependencies";
const DEPENDENCY: &str = "dependency";

/// Why a manifest document could not be read
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Markup is not well-formed
    #[error("malformed markup: {0}")]
    Malformed(String),

    /// Root element is not `project`
    #[error("expected root element <project>, found <{found}>")]
    UnexpectedRoot { found: String },

    /// Root element is not bound to the POM namespace
    #[error("namespace mismatch: expected {expected}, found {}", .found.as_deref().unwrap_or("none"))]
    NamespaceMismatch {
        expected: String,
        found: Option<String>,
    },

    /// A `<dependency>` entry lacks a required field
    #[error("dependency #{index} is missing <{field}>")]
    IncompleteDependency { index: usize, field: &'static str },
}

impl From<xml::XmlError> for ParseError {
    fn from(err: xml::XmlError) -> Self {
        ParseError::Malformed(err.0)
    }
}

/// Identity of a dependency: `(groupId, artifactId)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyKey {
    pub group_id: String,
    pub artifact_id: String,
}

/// A declared dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDeclaration {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl DependencyDeclaration {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }

    pub fn key(&self) -> DependencyKey {
        DependencyKey {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
        }
    }
}

impl fmt::Display for DependencyDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

/// Parses the `group:artifact:version` coordinate form
impl FromStr for DependencyDeclaration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        match parts.as_slice() {
            [group, artifact, version]
                if !group.is_empty() && !artifact.is_empty() && !version.is_empty() =>
            {
                Ok(Self::new(*group, *artifact, *version))
            }
            _ => Err(format!(
                "invalid coordinate '{}', expected groupId:artifactId:version",
                s
            )),
        }
    }
}

/// One `<dependency>` entry: the declaration plus any children Kiln does not manage
#[derive(Debug, Clone, PartialEq, Eq)]
struct DependencyEntry {
    declaration: DependencyDeclaration,
    /// `scope`, `exclusions`, comments, ...
    extra: Vec<Node>,
}

/// A parsed build manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    namespace: String,
    document: Document,
    /// Where `<dependencies>` sits among the root's children, once it exists
    section_index: Option<usize>,
    /// Attributes of the original `<dependencies>` element
    section_attributes: Vec<(String, String)>,
    /// Comments and other non-entry nodes, with their index among the section's children
    section_comments: Vec<(usize, Node)>,
    dependencies: IndexMap<DependencyKey, DependencyEntry>,
    /// Entries beyond the first for a key, kept until that key is upserted
    duplicates: Vec<(usize, DependencyEntry)>,
}

impl Manifest {
    /// Parse a manifest from its text form
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        Self::from_document(xml::parse(input)?)
    }

    /// Validate an element tree and lift its dependency section out
    pub fn from_document(mut document: Document) -> Result<Self, ParseError> {
        if document.root.local_name() != "project" {
            return Err(ParseError::UnexpectedRoot {
                found: document.root.name.clone(),
            });
        }
        let namespace = document.root.declared_namespace().map(str::to_string);
        if namespace.as_deref() != Some(POM_NAMESPACE) {
            return Err(ParseError::NamespaceMismatch {
                expected: POM_NAMESPACE.to_string(),
                found: namespace,
            });
        }

        let section = document.root.take_child(DEPENDENCIES);
        let mut manifest = Self {
            namespace: POM_NAMESPACE.to_string(),
            document,
            section_index: None,
            section_attributes: Vec::new(),
            section_comments: Vec::new(),
            dependencies: IndexMap::new(),
            duplicates: Vec::new(),
        };
        if let Some((index, section)) = section {
            manifest.section_index = Some(index);
            manifest.absorb_section(section)?;
        }
        Ok(manifest)
    }

    fn absorb_section(&mut self, section: Element) -> Result<(), ParseError> {
        self.section_attributes = section.attributes;
        let mut position = 0;
        for (index, node) in section.children.into_iter().enumerate() {
            let element = match node {
                Node::Element(e) if e.local_name() == DEPENDENCY => e,
                other => {
                    self.section_comments.push((index, other));
                    continue;
                }
            };
            let ordinal = position;
            position += 1;
            let entry = entry_from_element(element, ordinal)?;
            let key = entry.declaration.key();
            if self.dependencies.contains_key(&key) {
                self.duplicates.push((ordinal, entry));
            } else {
                self.dependencies.insert(key, entry);
            }
        }
        Ok(())
    }

    /// Namespace URI the document is bound to
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Text of a top-level project field such as `artifactId`
    pub fn project_field(&self, local_name: &str) -> Option<String> {
        self.document.root.child_text(local_name)
    }

    /// Value of a `<properties>` entry
    pub fn property(&self, key: &str) -> Option<String> {
        self.document
            .root
            .child("properties")
            .and_then(|p| p.child_text(key))
    }

    /// Whether the document has a `dependencies` section (possibly empty)
    pub fn has_dependency_section(&self) -> bool {
        self.section_index.is_some()
    }

    /// Declared dependencies in document order, one per key
    pub fn dependencies(&self) -> Vec<DependencyDeclaration> {
        self.dependencies
            .values()
            .map(|entry| entry.declaration.clone())
            .collect()
    }

    pub fn dependency(&self, group_id: &str, artifact_id: &str) -> Option<&DependencyDeclaration> {
        let key = DependencyKey {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
        };
        self.dependencies.get(&key).map(|entry| &entry.declaration)
    }

    /// Number of `<dependency>` elements that will be written, duplicates included
    pub fn dependency_entry_count(&self) -> usize {
        self.dependencies.len() + self.duplicates.len()
    }

    /// Declare dependencies, replacing the version of any key already present.
    ///
    /// New keys are appended in the order given. Upserting a key that had
    /// duplicate entries in the source document collapses them into the first.
    pub fn upsert_dependencies<'a, I>(&mut self, declarations: I)
    where
        I: IntoIterator<Item = &'a DependencyDeclaration>,
    {
        for declaration in declarations {
            let key = declaration.key();
            self.duplicates
                .retain(|(_, dup)| dup.declaration.key() != key);
            match self.dependencies.get_mut(&key) {
                Some(entry) => {
                    if entry.declaration.version != declaration.version {
                        tracing::debug!(
                            dependency = %key_display(&key),
                            from = %entry.declaration.version,
                            to = %declaration.version,
                            "Replacing dependency version"
                        );
                    }
                    entry.declaration.version = declaration.version.clone();
                }
                None => {
                    tracing::debug!(dependency = %declaration, "Adding dependency");
                    self.dependencies.insert(
                        key,
                        DependencyEntry {
                            declaration: declaration.clone(),
                            extra: Vec::new(),
                        },
                    );
                }
            }
        }

        if self.section_index.is_none() {
            self.section_index = Some(self.new_section_index());
        }
    }

    /// Consuming form of [`Manifest::upsert_dependencies`]
    pub fn with_dependencies(mut self, declarations: &[DependencyDeclaration]) -> Self {
        self.upsert_dependencies(declarations);
        self
    }

    /// Where a freshly created `dependencies` section goes: after `properties`,
    /// otherwise before `build`, otherwise at the end.
    fn new_section_index(&self) -> usize {
        let root = &self.document.root;
        if let Some(index) = root.position_of("properties") {
            return index + 1;
        }
        root.position_of("build")
            .unwrap_or(root.children.len())
    }

    /// Serialize the document, projecting dependencies back into the tree
    pub fn to_xml(&self) -> String {
        let mut document = self.document.clone();
        if let Some(index) = self.section_index {
            let section = self.render_section();
            let index = index.min(document.root.children.len());
            document.root.children.insert(index, Node::Element(section));
        }
        xml::write(&document)
    }

    fn render_section(&self) -> Element {
        let prefix = self.document.root.prefix();
        let name = |local: &str| match prefix {
            Some(p) => format!("{}:{}", p, local),
            None => local.to_string(),
        };

        let mut section = Element::new(name(DEPENDENCIES));
        section.attributes = self.section_attributes.clone();

        let mut rendered: Vec<Node> = self
            .dependencies
            .values()
            .map(|entry| Node::Element(entry_to_element(entry, &name)))
            .collect();
        // Surviving duplicates go back at their original ordinal, clamped.
        for (position, entry) in &self.duplicates {
            let at = (*position).min(rendered.len());
            rendered.insert(at, Node::Element(entry_to_element(entry, &name)));
        }
        for (index, node) in &self.section_comments {
            let at = (*index).min(rendered.len());
            rendered.insert(at, node.clone());
        }
        section.children = rendered;
        section
    }
}

fn key_display(key: &DependencyKey) -> String {
    format!("{}:{}", key.group_id, key.artifact_id)
}

fn entry_from_element(element: Element, index: usize) -> Result<DependencyEntry, ParseError> {
    let field = |name: &'static str| {
        element
            .child_text(name)
            .filter(|v| !v.is_empty())
            .ok_or(ParseError::IncompleteDependency { index, field: name })
    };
    let group_id = field("groupId")?;
    let artifact_id = field("artifactId")?;
    // Versions may be inherited from dependencyManagement or a parent POM.
    let version = element.child_text("version").unwrap_or_default();

    let extra = element
        .children
        .into_iter()
        .filter(|node| {
            !matches!(node, Node::Element(e)
                if matches!(e.local_name(), "groupId" | "artifactId" | "version"))
        })
        .collect();

    Ok(DependencyEntry {
        declaration: DependencyDeclaration {
            group_id,
            artifact_id,
            version,
        },
        extra,
    })
}

fn entry_to_element(entry: &DependencyEntry, name: &dyn Fn(&str) -> String) -> Element {
    let declaration = &entry.declaration;
    let mut element = Element::new(name(DEPENDENCY))
        .with_child(Element::with_text(name("groupId"), &declaration.group_id))
        .with_child(Element::with_text(name("artifactId"), &declaration.artifact_id));
    if !declaration.version.is_empty() {
        element = element.with_child(Element::with_text(name("version"), &declaration.version));
    }
    element.children.extend(entry.extra.iter().cloned());
    element
}

//! # Element Tree
//!
//! A minimal owned XML tree built from `quick-xml` events.
//!
//! The manifest editor needs to rewrite one section of a document while carrying
//! everything else through untouched, so the tree keeps comments, processing
//! instructions and CDATA alongside elements and text. Whitespace-only text is
//! dropped on parse and regenerated by the pretty printer.

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Low-level markup error (no path context yet)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct XmlError(pub String);

impl XmlError {
    fn at(position: u64, reason: impl std::fmt::Display) -> Self {
        Self(format!("at byte {}: {}", position, reason))
    }
}

/// A node in the element tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
}

/// An XML element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written, e.g. `project` or `pom:project`
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Element holding a single text child
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut element = Self::new(name);
        element.children.push(Node::Text(text.into()));
        element
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Namespace prefix of this element's name, if any
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Name without its namespace prefix
    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Namespace URI this element's prefix (or the default namespace) is bound to.
    ///
    /// Only declarations on this element itself are consulted.
    pub fn declared_namespace(&self) -> Option<&str> {
        match self.prefix() {
            Some(prefix) => self.attribute(&format!("xmlns:{}", prefix)),
            None => self.attribute("xmlns"),
        }
    }

    /// First child element with the given local name
    pub fn child(&self, local_name: &str) -> Option<&Element> {
        self.elements().find(|e| e.local_name() == local_name)
    }

    /// Index into `children` of the first element with the given local name
    pub fn position_of(&self, local_name: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|node| matches!(node, Node::Element(e) if e.local_name() == local_name))
    }

    /// Remove the first child element with the given local name, returning it
    /// together with the index it occupied
    pub fn take_child(&mut self, local_name: &str) -> Option<(usize, Element)> {
        let index = self.position_of(local_name)?;
        match self.children.remove(index) {
            Node::Element(element) => Some((index, element)),
            other => {
                self.children.insert(index, other);
                None
            }
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Concatenated text and CDATA content, trimmed
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Text(t) | Node::CData(t) => out.push_str(t),
                _ => {}
            }
        }
        out.trim().to_string()
    }

    /// Text of the first child element with the given local name
    pub fn child_text(&self, local_name: &str) -> Option<String> {
        self.child(local_name).map(Element::text)
    }

    fn is_text_only(&self) -> bool {
        self.children
            .iter()
            .all(|node| matches!(node, Node::Text(_) | Node::CData(_)))
    }
}

/// A parsed document: prolog nodes, the root element, trailing nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub prolog: Vec<Node>,
    pub root: Element,
    pub epilog: Vec<Node>,
}

/// Parse a complete document.
///
/// The XML declaration and DOCTYPE are not retained; the writer always emits a
/// UTF-8 declaration.
pub fn parse(input: &str) -> Result<Document, XmlError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(false);

    let mut prolog = Vec::new();
    let mut epilog = Vec::new();
    let mut root: Option<Element> = None;
    let mut stack: Vec<Element> = Vec::new();

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader
            .read_event()
            .map_err(|e| XmlError::at(position, e))?;

        let node = match event {
            Event::Start(start) => {
                stack.push(start_element(&start, position)?);
                continue;
            }
            Event::End(_) => {
                let finished = stack
                    .pop()
                    .ok_or_else(|| XmlError::at(position, "unexpected closing tag"))?;
                Node::Element(finished)
            }
            Event::Empty(start) => Node::Element(start_element(&start, position)?),
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| XmlError::at(position, e))?
                    .into_owned();
                if text.trim().is_empty() {
                    continue;
                }
                Node::Text(text)
            }
            Event::CData(data) => Node::CData(String::from_utf8_lossy(&data).into_owned()),
            Event::Comment(comment) => {
                Node::Comment(String::from_utf8_lossy(&comment).into_owned())
            }
            Event::PI(pi) => Node::ProcessingInstruction(String::from_utf8_lossy(&pi).into_owned()),
            Event::Decl(_) | Event::DocType(_) => continue,
            Event::Eof => break,
        };

        match (stack.last_mut(), node) {
            (Some(parent), node) => parent.children.push(node),
            (None, Node::Element(element)) => {
                if root.is_some() {
                    return Err(XmlError::at(position, "multiple root elements"));
                }
                root = Some(element);
            }
            (None, Node::Text(_)) | (None, Node::CData(_)) => {
                return Err(XmlError::at(position, "text outside the root element"));
            }
            (None, other) if root.is_none() => prolog.push(other),
            (None, other) => epilog.push(other),
        }
    }

    if let Some(open) = stack.last() {
        return Err(XmlError(format!("unclosed element <{}>", open.name)));
    }

    let root = root.ok_or_else(|| XmlError("document has no root element".to_string()))?;
    Ok(Document {
        prolog,
        root,
        epilog,
    })
}

fn start_element(
    start: &quick_xml::events::BytesStart<'_>,
    position: u64,
) -> Result<Element, XmlError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = Element::new(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| XmlError::at(position, e))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| XmlError::at(position, e))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

const INDENT: &str = "    ";

/// Serialize a document with a UTF-8 declaration and four-space indentation
pub fn write(document: &Document) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    for node in &document.prolog {
        write_node(&mut out, node, 0);
    }
    write_element(&mut out, &document.root, 0);
    for node in &document.epilog {
        write_node(&mut out, node, 0);
    }
    out
}

fn write_node(out: &mut String, node: &Node, depth: usize) {
    match node {
        Node::Element(element) => write_element(out, element, depth),
        Node::Text(text) => {
            push_indent(out, depth);
            out.push_str(&escape(text.trim()));
            out.push('\n');
        }
        Node::CData(data) => {
            push_indent(out, depth);
            out.push_str("<![CDATA[");
            out.push_str(data);
            out.push_str("]]>\n");
        }
        Node::Comment(comment) => {
            push_indent(out, depth);
            out.push_str("<!--");
            out.push_str(&comment_body(comment));
            out.push_str("-->\n");
        }
        Node::ProcessingInstruction(pi) => {
            push_indent(out, depth);
            out.push_str("<?");
            out.push_str(pi);
            out.push_str("?>\n");
        }
    }
}

fn write_element(out: &mut String, element: &Element, depth: usize) {
    push_indent(out, depth);
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }

    if element.children.is_empty() {
        out.push_str("/>\n");
        return;
    }

    out.push('>');
    if element.is_text_only() {
        for node in &element.children {
            match node {
                Node::Text(text) => out.push_str(&escape(text.as_str())),
                Node::CData(data) => {
                    out.push_str("<![CDATA[");
                    out.push_str(data);
                    out.push_str("]]>");
                }
                _ => {}
            }
        }
    } else {
        out.push('\n');
        for node in &element.children {
            write_node(out, node, depth + 1);
        }
        push_indent(out, depth);
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push_str(">\n");
}

/// Comment text with every `--` broken up and no trailing `-`, so the comment
/// cannot terminate early or trip strict parsers
pub fn comment_body(text: &str) -> String {
    let mut body = text.to_string();
    while body.contains("--") {
        body = body.replace("--", "- -");
    }
    if body.ends_with('-') {
        body.push(' ');
    }
    body
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_keeps_comments_and_attributes() {
        let doc = parse(
            r#"<?xml version="1.0"?>
<!-- header -->
<root xmlns="urn:x" id="1">
    <!-- inner -->
    <child>a &amp; b</child>
    <empty/>
</root>"#,
        )
        .unwrap();

        assert_eq!(doc.prolog, vec![Node::Comment(" header ".to_string())]);
        assert_eq!(doc.root.attribute("id"), Some("1"));
        assert_eq!(doc.root.declared_namespace(), Some("urn:x"));
        assert_eq!(doc.root.child_text("child").as_deref(), Some("a & b"));
        assert!(doc.root.child("empty").unwrap().children.is_empty());
        assert!(matches!(doc.root.children[0], Node::Comment(_)));
    }

    #[test]
    fn test_prefixed_names() {
        let doc = parse(r#"<p:project xmlns:p="urn:y"><p:name>n</p:name></p:project>"#).unwrap();
        assert_eq!(doc.root.prefix(), Some("p"));
        assert_eq!(doc.root.local_name(), "project");
        assert_eq!(doc.root.declared_namespace(), Some("urn:y"));
        assert_eq!(doc.root.child_text("name").as_deref(), Some("n"));
    }

    #[test]
    fn test_malformed_input_is_rejected() {
        assert!(parse("<a><b></a>").is_err());
        assert!(parse("<a>").is_err());
        assert!(parse("").is_err());
        assert!(parse("<a/><b/>").is_err());
    }

    #[test]
    fn test_comment_text_cannot_close_the_comment() {
        assert_eq!(comment_body(" plain "), " plain ");
        assert_eq!(comment_body("a-->b---c"), "a- ->b- - -c");
        assert_eq!(comment_body("trailing-"), "trailing- ");

        let doc = Document {
            prolog: vec![Node::Comment(" by ci-->bot ".to_string())],
            root: Element::new("root"),
            epilog: Vec::new(),
        };
        let reparsed = parse(&write(&doc)).unwrap();
        assert_eq!(reparsed.prolog, vec![Node::Comment(" by ci- ->bot ".to_string())]);
        assert_eq!(reparsed.root, Element::new("root"));
    }

    #[test]
    fn test_write_then_parse_is_stable() {
        let source = r#"<root a="x &quot;y&quot;"><list><item>1 &lt; 2</item><item/></list><!--c--></root>"#;
        let first = parse(source).unwrap();
        let written = write(&first);
        let second = parse(&written).unwrap();
        assert_eq!(first, second);
        assert!(written.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(written.contains("        <item>1 &lt; 2</item>\n"));
    }
}

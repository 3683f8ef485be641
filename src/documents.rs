//! XML document handling
//!
//! This module builds a small element tree from raw XML text. Every element
//! carries the namespace bindings in scope at that element and its line and
//! column, so later stages can resolve QName-valued attributes and report
//! precise locations.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{ParseError, Result};
use crate::limits::Limits;
use crate::locations::{LineIndex, TextPosition};
use crate::namespaces::{NamespaceContext, QName};

/// XML Element in the document tree
#[derive(Debug, Clone)]
pub struct Element {
    /// Element qualified name, namespace resolved
    pub qname: QName,
    /// Element attributes (excluding namespace declarations) in document order
    pub attributes: Vec<(String, String)>,
    /// Text content (if any)
    pub text: Option<String>,
    /// Child elements
    pub children: Vec<Element>,
    /// Namespace context in scope for this element
    pub namespaces: NamespaceContext,
    /// Position of the element's start tag
    pub position: TextPosition,
}

impl Element {
    /// Get the local name of the element
    pub fn local_name(&self) -> &str {
        &self.qname.local_name
    }

    /// Get the namespace of the element
    pub fn namespace(&self) -> Option<&str> {
        self.qname.namespace.as_deref()
    }

    /// Get an attribute value by its (unprefixed) name
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over child elements in a namespace with a given local name
    pub fn find_children<'a>(
        &'a self,
        namespace: &'a str,
        local_name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.children
            .iter()
            .filter(move |e| e.namespace() == Some(namespace) && e.local_name() == local_name)
    }

    fn append_text(&mut self, text: &str) {
        match &mut self.text {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }
}

/// XML Document representation
#[derive(Debug)]
pub struct Document {
    /// Identifier of the document, used in diagnostics
    pub id: String,
    /// Root element of the document
    pub root: Element,
}

impl Document {
    /// Parse an XML document from a string
    pub fn parse(id: &str, xml: &str, limits: &Limits) -> Result<Self> {
        limits.check_xml_size(xml.len())?;

        let lines = LineIndex::new(xml);
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut root: Option<Element> = None;
        let mut element_stack: Vec<Element> = Vec::new();

        loop {
            let event = reader.read_event().map_err(|e| {
                ParseError::new(format!("XML syntax error: {}", e))
                    .at(id, lines.position(reader.buffer_position()))
            })?;

            match event {
                Event::Start(e) => {
                    let start = reader.buffer_position().saturating_sub(e.len() + 2);
                    let parent = element_stack.last().map(|p| &p.namespaces);
                    let element = parse_element(id, &e, parent, lines.position(start))?;
                    element_stack.push(element);
                    limits.check_xml_depth(element_stack.len())?;
                }
                Event::Empty(e) => {
                    let start = reader.buffer_position().saturating_sub(e.len() + 3);
                    let parent = element_stack.last().map(|p| &p.namespaces);
                    let element = parse_element(id, &e, parent, lines.position(start))?;
                    attach(&mut element_stack, &mut root, element, id)?;
                }
                Event::End(_) => {
                    if let Some(current) = element_stack.pop() {
                        attach(&mut element_stack, &mut root, current, id)?;
                    }
                }
                Event::Text(e) => {
                    if let Some(current) = element_stack.last_mut() {
                        let text = e.unescape().map_err(|e| {
                            ParseError::new(format!("Failed to unescape text: {}", e))
                                .at(id, current.position)
                        })?;
                        current.append_text(&text);
                    }
                }
                Event::CData(e) => {
                    if let Some(current) = element_stack.last_mut() {
                        let text = String::from_utf8_lossy(&e).into_owned();
                        current.append_text(&text);
                    }
                }
                Event::Eof => break,
                // Comments, processing instructions, declarations, doctype
                _ => {}
            }
        }

        if let Some(open) = element_stack.last() {
            return Err(ParseError::new(format!(
                "Unexpected end of document inside <{}>",
                open.local_name()
            ))
            .at(id, open.position)
            .into());
        }

        let root = root.ok_or_else(|| {
            ParseError::new("Document has no root element").at(id, TextPosition::new(1, 1))
        })?;

        Ok(Document {
            id: id.to_string(),
            root,
        })
    }

    /// Get the root element
    pub fn root(&self) -> &Element {
        &self.root
    }
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
    id: &str,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_some() {
        return Err(ParseError::new("Document has more than one root element")
            .at(id, element.position)
            .into());
    } else {
        *root = Some(element);
    }
    Ok(())
}

/// Parse an element from a start tag, layering its namespace declarations
/// on top of the parent's context.
fn parse_element(
    id: &str,
    start: &BytesStart,
    parent: Option<&NamespaceContext>,
    position: TextPosition,
) -> Result<Element> {
    let mut namespaces = parent.cloned().unwrap_or_default();
    let mut attributes = Vec::new();

    for attr_result in start.attributes() {
        let attr = attr_result.map_err(|e| {
            ParseError::new(format!("Failed to parse attribute: {}", e)).at(id, position)
        })?;

        let attr_name = std::str::from_utf8(attr.key.as_ref()).map_err(|e| {
            ParseError::new(format!("Invalid attribute name: {}", e)).at(id, position)
        })?;

        let attr_value = attr
            .unescape_value()
            .map_err(|e| {
                ParseError::new(format!("Failed to unescape attribute value: {}", e))
                    .at(id, position)
            })?
            .to_string();

        if attr_name == "xmlns" {
            namespaces.set_default_namespace(attr_value);
        } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
            namespaces.add_prefix(prefix, attr_value);
        } else {
            attributes.push((attr_name.to_string(), attr_value));
        }
    }

    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| ParseError::new(format!("Invalid element name: {}", e)).at(id, position))?
        .to_string();

    let qname = namespaces.resolve(&name).ok_or_else(|| {
        ParseError::new(format!("Unbound namespace prefix in element name '{}'", name))
            .at(id, position)
    })?;

    Ok(Element {
        qname,
        attributes,
        text: None,
        children: Vec::new(),
        namespaces,
        position,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn parse(xml: &str) -> Result<Document> {
        Document::parse("test.xml", xml, &Limits::default())
    }

    #[test]
    fn test_parse_simple_xml() {
        let doc = parse(r#"<root><child>text</child></root>"#).unwrap();

        let root = doc.root();
        assert_eq!(root.local_name(), "root");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].local_name(), "child");
        assert_eq!(root.children[0].text.as_deref(), Some("text"));
    }

    #[test]
    fn test_parse_with_attributes() {
        let doc = parse(r#"<root attr1="value1" attr2="a &amp; b"><child/></root>"#).unwrap();

        let root = doc.root();
        assert_eq!(root.get_attribute("attr1"), Some("value1"));
        assert_eq!(root.get_attribute("attr2"), Some("a & b"));
        assert_eq!(root.get_attribute("missing"), None);
    }

    #[test]
    fn test_namespaces_are_scoped() {
        let xml = r#"<a:root xmlns:a="urn:a"><a:child xmlns="urn:d"><inner/></a:child><plain/></a:root>"#;
        let doc = parse(xml).unwrap();

        let root = doc.root();
        assert_eq!(root.qname, QName::namespaced("urn:a", "root"));
        let child = &root.children[0];
        assert_eq!(child.children[0].qname, QName::namespaced("urn:d", "inner"));
        assert_eq!(root.children[1].qname, QName::local("plain"));
    }

    #[test]
    fn test_find_children() {
        let doc = parse(r#"<r xmlns="urn:x"><c1/><c2/><c1/></r>"#).unwrap();
        assert_eq!(doc.root().find_children("urn:x", "c1").count(), 2);
    }

    #[test]
    fn test_positions() {
        let doc = parse("<root>\n  <child/>\n  <other></other>\n</root>").unwrap();
        let root = doc.root();
        assert_eq!(root.position, TextPosition::new(1, 1));
        assert_eq!(root.children[0].position, TextPosition::new(2, 3));
        assert_eq!(root.children[1].position, TextPosition::new(3, 3));
    }

    #[test]
    fn test_unbound_prefix_is_malformed() {
        let err = parse(r#"<x:root/>"#).unwrap_err();
        assert!(matches!(err, Error::MalformedSchema(_)));
    }

    #[test]
    fn test_mismatched_tags_are_malformed() {
        let err = parse(r#"<root><a></b></root>"#).unwrap_err();
        assert!(matches!(err, Error::MalformedSchema(_)));
    }

    #[test]
    fn test_depth_limit() {
        let limits = Limits {
            max_xml_depth: 2,
            ..Limits::default()
        };
        let err = Document::parse("deep.xml", "<a><b><c/></b></a>", &limits);
        assert!(err.is_ok());
        let err = Document::parse("deep.xml", "<a><b><c></c></b></a>", &limits).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
    }
}

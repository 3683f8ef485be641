//! XML Catalog support for schema locations
//!
//! A subset of OASIS XML Catalogs used to map URN or remote
//! `schemaLocation` values to local files.
//!
//! # Supported Elements
//!
//! - `<catalog>`: root element
//! - `<group>`: grouping element, inherits the base of its parent
//! - `<system>`: maps a system identifier to a URI
//! - `<uri>`: maps a URN name to a URI
//! - `<nextCatalog>`: chains another catalog file
//!
//! ```xml
//! <catalog xmlns="urn:oasis:names:tc:entity:xmlns:xml:catalog">
//!   <system systemId="urn:example:xsd:order.xsd" uri="xsd/order.xsd"/>
//!   <nextCatalog catalog="base/catalog.xml"/>
//! </catalog>
//! ```

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::documents::{Document, Element};
use crate::error::{Error, ParseError, Result};
use crate::limits::Limits;
use crate::locations::normalize_path;

/// Namespace of catalog documents
pub const CATALOG_NAMESPACE: &str = "urn:oasis:names:tc:entity:xmlns:xml:catalog";

/// Mapping of schema locations to local files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlCatalog {
    system: HashMap<String, String>,
    uri: HashMap<String, String>,
}

impl XmlCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog file and every catalog it chains with `<nextCatalog>`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut catalog = Self::new();
        let mut visited = HashSet::new();
        catalog.load(path.as_ref(), &mut visited, true)?;
        Ok(catalog)
    }

    fn load(&mut self, path: &Path, visited: &mut HashSet<PathBuf>, root: bool) -> Result<()> {
        let path = normalize_path(path);
        if !visited.insert(path.clone()) {
            return Ok(());
        }

        let id = path.to_string_lossy().to_string();
        let text = fs::read_to_string(&path)
            .map_err(|e| Error::Resource(format!("failed to read catalog '{}': {}", id, e)))?;
        let document = Document::parse(&id, &text, &Limits::default())?;

        let root_element = document.root();
        if root_element.local_name() != "catalog" {
            return Err(ParseError::new(format!(
                "expected a catalog root element, found '{}'",
                root_element.local_name()
            ))
            .at(&id, root_element.position)
            .into());
        }

        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut chained = Vec::new();
        self.read_entries(&root_element.children, &base, &mut chained);
        debug!(catalog = %id, entries = self.len(), "loaded XML catalog");

        for next in chained {
            // Chained catalogs are best effort; only the first one is required
            if let Err(e) = self.load(&next, visited, false) {
                if root {
                    warn!(catalog = %next.display(), error = %e, "skipping chained catalog");
                }
            }
        }
        Ok(())
    }

    fn read_entries(&mut self, children: &[Element], base: &Path, chained: &mut Vec<PathBuf>) {
        for child in children {
            if child.namespace().map_or(false, |ns| ns != CATALOG_NAMESPACE) {
                continue;
            }
            match child.local_name() {
                "system" => {
                    if let (Some(id), Some(uri)) =
                        (child.get_attribute("systemId"), child.get_attribute("uri"))
                    {
                        self.system
                            .entry(id.to_string())
                            .or_insert_with(|| relative_to(base, uri));
                    }
                }
                "uri" => {
                    if let (Some(name), Some(uri)) =
                        (child.get_attribute("name"), child.get_attribute("uri"))
                    {
                        self.uri
                            .entry(name.to_string())
                            .or_insert_with(|| relative_to(base, uri));
                    }
                }
                "nextCatalog" => {
                    if let Some(catalog) = child.get_attribute("catalog") {
                        chained.push(base.join(catalog));
                    }
                }
                "group" => self.read_entries(&child.children, base, chained),
                _ => {}
            }
        }
    }

    /// Local location for a schemaLocation, system identifiers first
    pub fn resolve(&self, location: &str) -> Option<&str> {
        self.system
            .get(location)
            .or_else(|| self.uri.get(location))
            .map(String::as_str)
    }

    /// Whether the catalog has no entries
    pub fn is_empty(&self) -> bool {
        self.system.is_empty() && self.uri.is_empty()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.system.len() + self.uri.len()
    }

    /// Add the entries of another catalog; existing entries win
    pub fn merge(&mut self, other: &XmlCatalog) {
        for (k, v) in &other.system {
            self.system.entry(k.clone()).or_insert_with(|| v.clone());
        }
        for (k, v) in &other.uri {
            self.uri.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
}

fn relative_to(base: &Path, uri: &str) -> String {
    if uri.contains("://") {
        return uri.to_string();
    }
    normalize_path(&base.join(uri)).to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

    #[test]
    fn test_parse_simple_catalog() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.xml");
        std::fs::write(
            &path,
            format!(
                r#"{HEADER}
<catalog xmlns="urn:oasis:names:tc:entity:xmlns:xml:catalog">
    <system systemId="urn:example:order.xsd" uri="xsd/order.xsd"/>
    <uri name="urn:example:types.xsd" uri="xsd/../types.xsd"/>
</catalog>"#
            ),
        )
        .unwrap();

        let catalog = XmlCatalog::from_file(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog
            .resolve("urn:example:order.xsd")
            .unwrap()
            .ends_with("xsd/order.xsd"));
        let types = catalog.resolve("urn:example:types.xsd").unwrap();
        assert!(types.ends_with("types.xsd"));
        assert!(!types.contains(".."));
        assert!(catalog.resolve("urn:example:missing.xsd").is_none());
    }

    #[test]
    fn test_chained_and_grouped_catalogs() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(
            dir.path().join("catalog.xml"),
            format!(
                r#"{HEADER}
<catalog xmlns="urn:oasis:names:tc:entity:xmlns:xml:catalog">
    <group><system systemId="urn:main" uri="main.xsd"/></group>
    <nextCatalog catalog="sub/catalog.xml"/>
    <nextCatalog catalog="missing/catalog.xml"/>
</catalog>"#
            ),
        )
        .unwrap();
        std::fs::write(
            sub.join("catalog.xml"),
            format!(
                r#"{HEADER}
<catalog xmlns="urn:oasis:names:tc:entity:xmlns:xml:catalog">
    <system systemId="urn:sub" uri="sub.xsd"/>
    <nextCatalog catalog="../catalog.xml"/>
</catalog>"#
            ),
        )
        .unwrap();

        let catalog = XmlCatalog::from_file(dir.path().join("catalog.xml")).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.resolve("urn:sub").unwrap().ends_with("sub/sub.xsd"));
    }

    #[test]
    fn test_rejects_other_documents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.xml");
        std::fs::write(&path, "<notACatalog/>").unwrap();
        let err = XmlCatalog::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::MalformedSchema(_)));
    }
}

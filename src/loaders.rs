//! Schema loading
//!
//! Reads a root schema from disk and follows its `xs:include` and
//! `xs:import` locations transitively. Document identifiers are produced by
//! [`resolve_reference`], the same function the resolver uses to look them
//! up again.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::catalog::XmlCatalog;
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::locations::{normalize_path, resolve_reference, Location};
use crate::xsd::parse_document;

/// Raw text of one schema document and its identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Canonical identifier (normalized path or URL)
    pub id: String,
    /// XML text
    pub text: String,
}

impl SourceDocument {
    /// Create a source document
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Documents gathered from a root schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSchema {
    /// Identifier of the root document
    pub root_id: String,
    /// Every document found, root first, in discovery order
    pub documents: Vec<SourceDocument>,
}

/// File-system loader for schema document sets
#[derive(Debug, Clone, Default)]
pub struct Loader {
    limits: Limits,
    catalog: XmlCatalog,
}

impl Loader {
    /// Create a loader with default limits and no catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Consult a catalog for URN and remote locations
    pub fn with_catalog(mut self, catalog: XmlCatalog) -> Self {
        self.catalog.merge(&catalog);
        self
    }

    /// Load a root schema and everything it references
    pub fn load(&self, path: impl AsRef<Path>) -> Result<LoadedSchema> {
        let root_id = normalize_path(path.as_ref()).to_string_lossy().to_string();

        let mut documents = Vec::new();
        let mut seen: HashSet<String> = HashSet::from([root_id.clone()]);
        let mut queue: VecDeque<(String, String)> =
            VecDeque::from([(root_id.clone(), "(root)".to_string())]);

        while let Some((id, referrer)) = queue.pop_front() {
            let Some(text) = self.read(&id, &referrer)? else {
                continue;
            };
            self.limits.check_documents(documents.len() + 1)?;

            let schema = parse_document(&id, &text, &self.limits)?;
            for hint in schema.locations() {
                let target = resolve_reference(&id, hint);
                if seen.insert(target.clone()) {
                    debug!(document = %target, referrer = %id, "discovered schema document");
                    queue.push_back((target, id.clone()));
                }
            }
            documents.push(SourceDocument::new(id, text));
        }

        info!(root = %root_id, documents = documents.len(), "loaded schema documents");
        Ok(LoadedSchema {
            root_id,
            documents,
        })
    }

    /// Text of a document, or None when the location is remote and not
    /// mapped by the catalog
    fn read(&self, id: &str, referrer: &str) -> Result<Option<String>> {
        let source = match self.catalog.resolve(id) {
            Some(mapped) => {
                debug!(location = %id, mapped = %mapped, "catalog match");
                mapped
            }
            None => id,
        };

        let path = match Location::from_str(source)? {
            Location::Url(url) => {
                warn!(
                    location = %url,
                    referrer = %referrer,
                    "remote schema locations are not fetched"
                );
                return Ok(None);
            }
            Location::Path(path) => path,
            Location::String(s) => s.into(),
        };

        let text = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::MissingDocument {
                location: id.to_string(),
                referrer: referrer.to_string(),
            },
            _ => Error::Resource(format!("failed to read '{}': {}", path.display(), e)),
        })?;
        self.limits.check_xml_size(text.len())?;
        Ok(Some(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn schema(body: &str) -> String {
        format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">{}</xs:schema>"#,
            body
        )
    }

    #[test]
    fn test_follows_includes_and_imports() {
        let dir = TempDir::new().unwrap();
        let common = dir.path().join("common");
        std::fs::create_dir_all(&common).unwrap();
        std::fs::write(
            dir.path().join("main.xsd"),
            schema(
                r#"<xs:include schemaLocation="common/types.xsd"/>
                   <xs:import namespace="urn:other" schemaLocation="other.xsd"/>"#,
            ),
        )
        .unwrap();
        std::fs::write(
            common.join("types.xsd"),
            schema(r#"<xs:include schemaLocation="../main.xsd"/>"#),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("other.xsd"),
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:other"/>"#,
        )
        .unwrap();

        let loaded = Loader::new().load(dir.path().join("main.xsd")).unwrap();
        let names: Vec<_> = loaded
            .documents
            .iter()
            .map(|d| Path::new(&d.id).file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["main.xsd", "types.xsd", "other.xsd"]);
        assert_eq!(loaded.root_id, loaded.documents[0].id);
    }

    #[test]
    fn test_missing_referenced_document() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("main.xsd"),
            schema(r#"<xs:include schemaLocation="absent.xsd"/>"#),
        )
        .unwrap();

        let err = Loader::new().load(dir.path().join("main.xsd")).unwrap_err();
        match err {
            Error::MissingDocument { location, referrer } => {
                assert!(location.ends_with("absent.xsd"));
                assert!(referrer.ends_with("main.xsd"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_remote_locations_are_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("main.xsd"),
            schema(r#"<xs:import namespace="urn:r" schemaLocation="http://example.com/r.xsd"/>"#),
        )
        .unwrap();

        let loaded = Loader::new().load(dir.path().join("main.xsd")).unwrap();
        assert_eq!(loaded.documents.len(), 1);
    }

    #[test]
    fn test_catalog_maps_urn_locations() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("main.xsd"),
            schema(r#"<xs:import namespace="urn:t" schemaLocation="urn:example:types"/>"#),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("types.xsd"),
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:t"/>"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("catalog.xml"),
            r#"<catalog xmlns="urn:oasis:names:tc:entity:xmlns:xml:catalog">
                 <uri name="urn:example:types" uri="types.xsd"/>
               </catalog>"#,
        )
        .unwrap();

        let catalog = XmlCatalog::from_file(dir.path().join("catalog.xml")).unwrap();
        let loaded = Loader::new()
            .with_catalog(catalog)
            .load(dir.path().join("main.xsd"))
            .unwrap();
        assert_eq!(loaded.documents.len(), 2);
        assert_eq!(loaded.documents[1].id, "urn:example:types");
    }

    #[test]
    fn test_document_limit() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("main.xsd"),
            schema(r#"<xs:include schemaLocation="b.xsd"/>"#),
        )
        .unwrap();
        std::fs::write(dir.path().join("b.xsd"), schema("")).unwrap();

        let limits = Limits {
            max_documents: 1,
            ..Limits::default()
        };
        let err = Loader::new()
            .with_limits(limits)
            .load(dir.path().join("main.xsd"))
            .unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
    }
}

//! Parsed schema documents

use crate::locations::TextPosition;
use crate::namespaces::NamespaceContext;

use super::components::Declaration;

/// Whether a document reference is an include or an import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// xs:include (same target namespace)
    Include,
    /// xs:import (another namespace)
    Import,
}

/// An xs:include or xs:import statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReference {
    /// Include or import
    pub kind: ReferenceKind,
    /// The imported namespace (imports only)
    pub namespace: Option<String>,
    /// The schemaLocation hint as written
    pub location: Option<String>,
    /// Position of the statement
    pub position: TextPosition,
}

/// One parsed XSD document
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    /// Identifier of the document
    pub id: String,
    /// targetNamespace of the schema
    pub target_namespace: Option<String>,
    /// Prefix bindings declared on xs:schema
    pub namespaces: NamespaceContext,
    /// Include and import statements in document order
    pub references: Vec<DocumentReference>,
    /// Top-level declarations in document order
    pub declarations: Vec<Declaration>,
}

impl SchemaDocument {
    /// Iterate over the schemaLocation hints of the document
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.references.iter().filter_map(|r| r.location.as_deref())
    }
}

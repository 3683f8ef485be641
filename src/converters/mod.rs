//! XSD to JSON Schema conversion
//!
//! A conversion run goes through these stages:
//!
//! 1. every [`SourceDocument`] is parsed into a schema document
//! 2. the reachable documents are resolved into one symbol table
//! 3. the [`translator`] walks the table into a [`JsonSchemaDocument`]
//! 4. the [`Emitter`] serializes the model for the chosen draft
//!
//! ```rust,ignore
//! use xsd2jsonschema::converters::{ConversionOptions, Converter, Draft};
//!
//! let converter = Converter::new(ConversionOptions::new().with_draft(Draft::Draft202012));
//! let conversion = converter.convert_file("schemas/order.xsd")?;
//! println!("{}", converter.emit(&conversion)?);
//! ```

pub mod config;
pub mod emitter;
pub mod nodes;
pub mod translator;

use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use crate::catalog::XmlCatalog;
use crate::error::Result;
use crate::loaders::{LoadedSchema, Loader};
use crate::xsd::{parse_document, resolve, ResolutionReport, SymbolTable};

pub use config::{ConversionOptions, Draft, MixedContent, UnionStyle};
pub use emitter::Emitter;
pub use nodes::{
    Annotations, ArrayNode, JsonSchemaDocument, NodeKind, ObjectNode, ScalarNode, ScalarType,
    SchemaNode,
};
pub use translator::translate;

pub use crate::loaders::SourceDocument;

/// Identifier given to a schema converted from a string
pub const INLINE_DOCUMENT_ID: &str = "schema.xsd";

/// Result of a successful conversion run
#[derive(Debug, Clone)]
pub struct Conversion {
    /// The translated schema
    pub document: JsonSchemaDocument,
    /// What the resolver found
    pub report: ResolutionReport,
}

/// Converts XSD document sets to JSON Schema
#[derive(Debug, Clone, Default)]
pub struct Converter {
    options: ConversionOptions,
}

impl Converter {
    /// Create a converter
    pub fn new(options: ConversionOptions) -> Self {
        Self { options }
    }

    /// Options of this converter
    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Convert a set of documents, starting from `root_id`
    pub fn convert(&self, documents: &[SourceDocument], root_id: &str) -> Result<Conversion> {
        let (table, report) = self.resolve_sources(documents, root_id)?;

        let title = self
            .options
            .title()
            .map(str::to_string)
            .or_else(|| document_stem(root_id));
        let document = translate(&table, &self.options, title)?;

        info!(root = %root_id, definitions = document.definitions.len(), "converted schema");
        Ok(Conversion { document, report })
    }

    /// Load a schema file with its includes and imports and convert it
    pub fn convert_file(&self, path: impl AsRef<Path>) -> Result<Conversion> {
        let loaded = self.load(path)?;
        self.convert(&loaded.documents, &loaded.root_id)
    }

    /// Load and resolve a schema file without translating it
    pub fn inspect_file(&self, path: impl AsRef<Path>) -> Result<ResolutionReport> {
        let loaded = self.load(path)?;
        let (_, report) = self.resolve_sources(&loaded.documents, &loaded.root_id)?;
        Ok(report)
    }

    /// Gather a schema file and the documents it references
    pub fn load(&self, path: impl AsRef<Path>) -> Result<LoadedSchema> {
        let mut loader = Loader::new().with_limits(self.options.limits().clone());
        for catalog in self.options.catalogs() {
            loader = loader.with_catalog(XmlCatalog::from_file(catalog)?);
        }
        loader.load(path)
    }

    fn resolve_sources(
        &self,
        documents: &[SourceDocument],
        root_id: &str,
    ) -> Result<(SymbolTable, ResolutionReport)> {
        let limits = self.options.limits();
        limits.check_documents(documents.len())?;

        let parsed = documents
            .iter()
            .map(|source| parse_document(&source.id, &source.text, limits))
            .collect::<Result<Vec<_>>>()?;
        debug!(documents = parsed.len(), "parsed schema documents");

        resolve(&parsed, root_id, limits)
    }

    /// Convert a single self-contained schema held in memory
    pub fn convert_str(&self, text: &str) -> Result<Conversion> {
        self.convert(
            &[SourceDocument::new(INLINE_DOCUMENT_ID, text)],
            INLINE_DOCUMENT_ID,
        )
    }

    /// JSON value of a conversion
    pub fn to_value(&self, conversion: &Conversion) -> Value {
        Emitter::from_options(&self.options).to_value(&conversion.document)
    }

    /// Serialized text of a conversion
    pub fn emit(&self, conversion: &Conversion) -> Result<String> {
        Emitter::from_options(&self.options).to_string(&conversion.document)
    }
}

fn document_stem(id: &str) -> Option<String> {
    let name = id.rsplit(['/', '\\']).next()?;
    let stem = name.split('.').next()?;
    (!stem.is_empty()).then(|| stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const ORDER: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
        <xs:element name="order">
          <xs:complexType>
            <xs:sequence>
              <xs:element name="id" type="xs:string"/>
              <xs:element name="qty" type="xs:positiveInteger" minOccurs="0"/>
            </xs:sequence>
          </xs:complexType>
        </xs:element>
      </xs:schema>"#;

    #[test]
    fn test_convert_str() {
        let converter = Converter::default();
        let conversion = converter.convert_str(ORDER).unwrap();
        let value = converter.to_value(&conversion);

        assert_eq!(value["title"], "schema");
        assert_eq!(value["properties"]["order"], json!({"$ref": "#/definitions/order"}));
        assert_eq!(
            value["definitions"]["order"],
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string"},
                    "qty": {"type": "integer", "minimum": 1}
                },
                "required": ["id"],
                "additionalProperties": false
            })
        );
        assert_eq!(conversion.report.documents, vec!["schema.xsd"]);
    }

    #[test]
    fn test_title_option() {
        let converter = Converter::new(ConversionOptions::new().with_title("Orders"));
        let conversion = converter.convert_str(ORDER).unwrap();
        assert_eq!(conversion.document.title.as_deref(), Some("Orders"));
    }

    #[test]
    fn test_emit_is_deterministic() {
        let converter = Converter::default();
        let first = converter.emit(&converter.convert_str(ORDER).unwrap()).unwrap();
        let second = converter.emit(&converter.convert_str(ORDER).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_document_count_limit() {
        let limits = crate::limits::Limits {
            max_documents: 0,
            ..Default::default()
        };
        let converter = Converter::new(ConversionOptions::new().with_limits(limits));
        let err = converter.convert_str(ORDER).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
    }

    #[test]
    fn test_document_stem() {
        assert_eq!(document_stem("/a/b/order.v2.xsd").as_deref(), Some("order"));
        assert_eq!(document_stem("http://x.org/s/types.xsd").as_deref(), Some("types"));
        assert_eq!(document_stem(""), None);
    }
}

//! # xsd2jsonschema
//!
//! Translate XML Schema (XSD 1.0) document sets into equivalent JSON Schema
//! documents.
//!
//! ## Features
//!
//! - Transitive `xs:include` / `xs:import` loading, with XML catalog support
//! - Cyclic type graphs, emitted as `$ref`s into `definitions` / `$defs`
//! - Complex type extension and restriction, model groups, attribute groups
//! - Substitution groups expanded into alternatives
//! - Facets mapped to JSON Schema validation keywords
//! - Draft-07 and 2020-12 output
//!
//! ## Example
//!
//! ```rust,ignore
//! use xsd2jsonschema::{ConversionOptions, Converter};
//!
//! let converter = Converter::new(ConversionOptions::new().with_root_element("order"));
//! let conversion = converter.convert_file("schemas/order.xsd")?;
//! std::fs::write("order.schema.json", converter.emit(&conversion)?)?;
//! ```
//!
//! Every error is fatal to its run and carries the document and line of
//! the schema construct that caused it; see [`Error`].

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Names, namespaces and locations
pub mod locations;
pub mod names;
pub mod namespaces;

// Documents and loading
pub mod catalog;
pub mod documents;
pub mod loaders;

// Schema model and resolution
pub mod xsd;

// JSON Schema translation
pub mod converters;

pub use converters::{
    Conversion, ConversionOptions, Converter, Draft, Emitter, JsonSchemaDocument, MixedContent,
    SourceDocument, UnionStyle,
};
pub use error::{Error, Result};
pub use limits::Limits;
pub use loaders::{LoadedSchema, Loader};
pub use xsd::ResolutionReport;

/// Version of the xsd2jsonschema library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Error types for xsd2jsonschema
//!
//! Every error is fatal to the conversion run that raised it. Each variant
//! carries enough context (document, position, declaration name) to locate
//! the offending schema construct.

use std::fmt;
use thiserror::Error;

use crate::locations::{SourceLocation, TextPosition};
use crate::xsd::SymbolSpace;

/// Result type alias using the crate Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for conversion runs
#[derive(Error, Debug)]
pub enum Error {
    /// Structurally invalid XSD input
    #[error("malformed schema: {0}")]
    MalformedSchema(#[from] ParseError),

    /// Two unrelated documents declare the same component
    #[error("conflicting declaration of {space} '{name}' in '{first}' and '{second}'")]
    ConflictingDeclaration {
        /// Symbol space of the component
        space: SymbolSpace,
        /// Qualified name of the component
        name: String,
        /// Document holding the first declaration
        first: String,
        /// Document holding the second declaration
        second: String,
    },

    /// A reference names a component absent from the symbol table
    #[error("unresolved reference to {space} '{name}' from {referrer} in '{document}'")]
    UnresolvedReference {
        /// Symbol space that was searched
        space: SymbolSpace,
        /// The missing qualified name
        name: String,
        /// The declaration holding the reference
        referrer: String,
        /// Document of the referrer
        document: String,
    },

    /// A base-type chain revisits a type on its own ancestor chain
    #[error("cyclic inheritance in '{document}': {}", .chain.join(" -> "))]
    CyclicInheritance {
        /// The derivation chain, ending with the repeated type
        chain: Vec<String>,
        /// Document of the first type in the chain
        document: String,
    },

    /// A model group or attribute group includes itself
    #[error("cyclic {space} reference in '{document}': {}", .chain.join(" -> "))]
    CyclicGroup {
        /// Group or attribute group space
        space: SymbolSpace,
        /// The inclusion chain, ending with the repeated group
        chain: Vec<String>,
        /// Document of the first group in the chain
        document: String,
    },

    /// A recognized XSD feature without a JSON Schema mapping
    #[error("unsupported construct: {construct} in {declaration} ({location})")]
    UnsupportedConstruct {
        /// Description of the construct
        construct: String,
        /// The declaration containing it
        declaration: String,
        /// Where it was found
        location: SourceLocation,
    },

    /// An include/import points at a document that was not supplied
    #[error("missing schema document '{location}' referenced from '{referrer}'")]
    MissingDocument {
        /// Resolved identifier of the missing document
        location: String,
        /// Identifier of the referring document
        referrer: String,
    },

    /// Conversion options are inconsistent with the schema
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for an [`Error::UnsupportedConstruct`]
    pub fn unsupported(
        construct: impl Into<String>,
        declaration: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Error::UnsupportedConstruct {
            construct: construct.into(),
            declaration: declaration.into(),
            location,
        }
    }
}

/// XML Schema parsing error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Location in the schema file
    pub location: Option<SourceLocation>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Set the location from a document identifier and position
    pub fn at(self, document: &str, position: TextPosition) -> Self {
        self.with_location(SourceLocation::new(document, position))
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref loc) = self.location {
            write!(f, " at {}", loc)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

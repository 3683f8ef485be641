//! XSD schema model
//!
//! This module holds the in-memory model of parsed XML Schema documents and
//! the machinery that turns a set of them into one resolved symbol table:
//!
//! - [`parsing`]: raw text to [`SchemaDocument`]
//! - [`resolver`]: documents to [`SymbolTable`] plus [`ResolutionReport`]
//! - [`expand`]: particle trees to group-free [`ContentParticle`] trees

use std::fmt;

use serde::Serialize;

pub mod builtins;
pub mod components;
pub mod expand;
pub mod facets;
pub mod parsing;
pub mod particles;
pub mod patterns;
pub mod resolver;
pub mod schemas;
pub mod symbols;

pub use builtins::{BuiltinType, ValueKind};
pub use components::{
    AnonymousId, AttributeDecl, AttributeGroupDef, AttributeUse, AttributeUseKind,
    AttributeUses, AttributeWildcard, ComplexTypeDef, ContentModel, DeclContent, DeclRef,
    Declaration, Derivation, DerivationMethod, ElementDecl, GroupDef, Identity, Reference,
    SimpleTypeDef, TypeRef,
};
pub use expand::{expand_particle, ContentParticle};
pub use facets::{Facet, FacetSet, WhiteSpace};
pub use parsing::parse_document;
pub use particles::{Compositor, Occurs, Particle};
pub use patterns::UnsupportedPattern;
pub use resolver::{resolve, ResolutionReport};
pub use schemas::{DocumentReference, ReferenceKind, SchemaDocument};
pub use symbols::SymbolTable;

/// Symbol space of a named schema component.
///
/// Simple and complex types share the type space, as they do in XSD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolSpace {
    /// Simple and complex type definitions
    Type,
    /// Element declarations
    Element,
    /// Attribute declarations
    Attribute,
    /// Model group definitions
    Group,
    /// Attribute group definitions
    AttributeGroup,
}

impl SymbolSpace {
    /// All symbol spaces, in table order
    pub const ALL: [SymbolSpace; 5] = [
        SymbolSpace::Type,
        SymbolSpace::Element,
        SymbolSpace::Attribute,
        SymbolSpace::Group,
        SymbolSpace::AttributeGroup,
    ];

    /// Lowercase name used in diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolSpace::Type => "type",
            SymbolSpace::Element => "element",
            SymbolSpace::Attribute => "attribute",
            SymbolSpace::Group => "group",
            SymbolSpace::AttributeGroup => "attribute group",
        }
    }
}

impl fmt::Display for SymbolSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle of a declaration in the [`SymbolTable`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub(crate) usize);

impl DeclId {
    /// Position of the declaration in the arena
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_space_display() {
        assert_eq!(SymbolSpace::Type.to_string(), "type");
        assert_eq!(SymbolSpace::AttributeGroup.to_string(), "attribute group");
    }

    #[test]
    fn test_symbol_space_serializes_snake_case() {
        let json = serde_json::to_string(&SymbolSpace::AttributeGroup).unwrap();
        assert_eq!(json, "\"attribute_group\"");
    }
}

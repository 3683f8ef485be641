//! Schema components
//!
//! Declarations as produced by the parser and stored in the symbol table.
//! Nested anonymous components start out as `Inline` and are hoisted into
//! the arena (becoming `Local`) by the resolver, which also binds every
//! [`Reference`] to its target.

use std::fmt;

use crate::error::Result;
use crate::locations::SourceLocation;
use crate::namespaces::QName;

use super::builtins::BuiltinType;
use super::facets::Facet;
use super::particles::Particle;
use super::{DeclId, SymbolSpace};

/// Synthetic identity of an anonymous or local component.
///
/// `scope` is the local name of the enclosing top-level declaration and
/// `path` locates the component inside it (e.g. `item.detail`, `@lang`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnonymousId {
    /// Name of the enclosing top-level declaration
    pub scope: String,
    /// Path of the component inside the scope
    pub path: String,
}

impl fmt::Display for AnonymousId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.scope)
        } else {
            write!(f, "{}.{}", self.scope, self.path)
        }
    }
}

/// Identity of a declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// A top-level declaration with a qualified name
    Named(QName),
    /// A nested declaration
    Anonymous(AnonymousId),
}

impl Identity {
    /// Shorthand for an anonymous identity
    pub fn anonymous(scope: impl Into<String>, path: impl Into<String>) -> Self {
        Identity::Anonymous(AnonymousId {
            scope: scope.into(),
            path: path.into(),
        })
    }
}

/// A reference by qualified name, bound to a declaration by the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The referenced name
    pub name: QName,
    /// The bound declaration (None until resolution)
    pub target: Option<DeclId>,
}

impl Reference {
    /// Create an unbound reference
    pub fn new(name: QName) -> Self {
        Self { name, target: None }
    }
}

/// Reference to a simple or complex type
#[derive(Debug, Clone)]
pub enum TypeRef {
    /// A built-in XSD datatype
    Builtin(BuiltinType),
    /// A named type
    Named(Reference),
    /// An anonymous type declared in place (before hoisting)
    Inline(Box<Declaration>),
    /// A hoisted anonymous type
    Local(DeclId),
}

impl TypeRef {
    /// The declaration this reference designates, once resolved
    pub fn decl_id(&self) -> Option<DeclId> {
        match self {
            TypeRef::Named(r) => r.target,
            TypeRef::Local(id) => Some(*id),
            TypeRef::Builtin(_) | TypeRef::Inline(_) => None,
        }
    }
}

/// Reference to an element or attribute declaration
#[derive(Debug, Clone)]
pub enum DeclRef {
    /// A global declaration referenced with `ref`
    Named(Reference),
    /// A local declaration (before hoisting)
    Inline(Box<Declaration>),
    /// A hoisted local declaration
    Local(DeclId),
}

impl DeclRef {
    /// The declaration this reference designates, once resolved
    pub fn decl_id(&self) -> Option<DeclId> {
        match self {
            DeclRef::Named(r) => r.target,
            DeclRef::Local(id) => Some(*id),
            DeclRef::Inline(_) => None,
        }
    }
}

/// Variety of a simple type definition
#[derive(Debug, Clone)]
pub enum SimpleTypeDef {
    /// Restriction of a base type by facets
    Restriction {
        /// Base type
        base: TypeRef,
        /// Facets declared by this step, in document order
        facets: Vec<Facet>,
    },
    /// Whitespace separated list of an item type
    List {
        /// Item type
        item: TypeRef,
    },
    /// Union of member types
    Union {
        /// Member types, `memberTypes` first then inline members
        members: Vec<TypeRef>,
    },
}

/// Derivation method of complex content or simple content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationMethod {
    /// xs:extension
    Extension,
    /// xs:restriction
    Restriction,
}

impl DerivationMethod {
    /// Lowercase XSD name
    pub fn as_str(&self) -> &'static str {
        match self {
            DerivationMethod::Extension => "extension",
            DerivationMethod::Restriction => "restriction",
        }
    }
}

/// Base type and method of a complex content derivation
#[derive(Debug, Clone)]
pub struct Derivation {
    /// Base type
    pub base: TypeRef,
    /// Extension or restriction
    pub method: DerivationMethod,
}

/// Content model of a complex type
#[derive(Debug, Clone)]
pub enum ContentModel {
    /// No element content and no derivation
    Empty,
    /// Simple content (text value plus attributes)
    Simple {
        /// Base type
        base: TypeRef,
        /// Extension or restriction
        derivation: DerivationMethod,
        /// Facets applying to the value (restriction only)
        facets: Vec<Facet>,
    },
    /// Element content, optionally derived from a base type
    Complex(Option<Derivation>),
}

/// How an attribute use is constrained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeUseKind {
    /// use="required"
    Required,
    /// use="optional" (default)
    Optional,
    /// use="prohibited"
    Prohibited,
}

/// The use of an attribute declaration in a complex type or attribute group
#[derive(Debug, Clone)]
pub struct AttributeUse {
    /// The attribute
    pub decl: DeclRef,
    /// Required, optional or prohibited
    pub use_kind: AttributeUseKind,
    /// Default value overriding the declaration's
    pub default: Option<String>,
    /// Fixed value overriding the declaration's
    pub fixed: Option<String>,
}

/// An attribute wildcard (xs:anyAttribute)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeWildcard {
    /// The `namespace` constraint as written
    pub namespace: String,
    /// Where the wildcard was declared
    pub location: SourceLocation,
}

/// Attribute uses, attribute group references and wildcard of a component
#[derive(Debug, Clone, Default)]
pub struct AttributeUses {
    /// Local attribute uses in document order
    pub uses: Vec<AttributeUse>,
    /// Referenced attribute groups in document order
    pub groups: Vec<Reference>,
    /// Attribute wildcard
    pub wildcard: Option<AttributeWildcard>,
}

impl AttributeUses {
    /// Whether nothing is declared
    pub fn is_empty(&self) -> bool {
        self.uses.is_empty() && self.groups.is_empty() && self.wildcard.is_none()
    }
}

/// A complex type definition
#[derive(Debug, Clone)]
pub struct ComplexTypeDef {
    /// Content model
    pub content: ContentModel,
    /// The type's own particle
    pub particle: Option<Particle>,
    /// The type's own attributes
    pub attributes: AttributeUses,
    /// abstract="true"
    pub is_abstract: bool,
    /// mixed="true"
    pub mixed: bool,
}

/// An element declaration, global or local
#[derive(Debug, Clone)]
pub struct ElementDecl {
    /// Element name (namespace per form for local elements)
    pub name: QName,
    /// Declared type; None means inherited from the substitution head or anyType
    pub type_ref: Option<TypeRef>,
    /// nillable="true"
    pub nillable: bool,
    /// Default value
    pub default: Option<String>,
    /// Fixed value
    pub fixed: Option<String>,
    /// abstract="true"
    pub is_abstract: bool,
    /// Head of the substitution group this element belongs to
    pub substitution_group: Option<Reference>,
    /// block includes "substitution"
    pub block_substitution: bool,
}

/// An attribute declaration, global or local
#[derive(Debug, Clone)]
pub struct AttributeDecl {
    /// Attribute name
    pub name: QName,
    /// Declared simple type; None means anySimpleType
    pub type_ref: Option<TypeRef>,
    /// Default value
    pub default: Option<String>,
    /// Fixed value
    pub fixed: Option<String>,
}

/// A named model group definition
#[derive(Debug, Clone)]
pub struct GroupDef {
    /// The group's sequence, choice or all
    pub particle: Particle,
}

/// A named attribute group definition
#[derive(Debug, Clone)]
pub struct AttributeGroupDef {
    /// The group's attributes
    pub attributes: AttributeUses,
}

/// Kind-specific content of a declaration
#[derive(Debug, Clone)]
pub enum DeclContent {
    /// xs:simpleType
    SimpleType(SimpleTypeDef),
    /// xs:complexType
    ComplexType(ComplexTypeDef),
    /// xs:element
    Element(ElementDecl),
    /// xs:attribute
    Attribute(AttributeDecl),
    /// xs:group
    Group(GroupDef),
    /// xs:attributeGroup
    AttributeGroup(AttributeGroupDef),
}

/// A schema component declaration
#[derive(Debug, Clone)]
pub struct Declaration {
    /// Name or synthetic identity
    pub identity: Identity,
    /// Where the declaration was found
    pub location: SourceLocation,
    /// Text of xs:annotation/xs:documentation
    pub documentation: Option<String>,
    /// Kind-specific content
    pub content: DeclContent,
}

impl Declaration {
    /// Symbol space the declaration lives in
    pub fn space(&self) -> SymbolSpace {
        match self.content {
            DeclContent::SimpleType(_) | DeclContent::ComplexType(_) => SymbolSpace::Type,
            DeclContent::Element(_) => SymbolSpace::Element,
            DeclContent::Attribute(_) => SymbolSpace::Attribute,
            DeclContent::Group(_) => SymbolSpace::Group,
            DeclContent::AttributeGroup(_) => SymbolSpace::AttributeGroup,
        }
    }

    /// Qualified name of a top-level declaration
    pub fn name(&self) -> Option<&QName> {
        match &self.identity {
            Identity::Named(name) => Some(name),
            Identity::Anonymous(_) => None,
        }
    }

    /// Whether this is a top-level named declaration
    pub fn is_named(&self) -> bool {
        matches!(self.identity, Identity::Named(_))
    }

    /// Short name for diagnostics: the local name or the anonymous path
    pub fn display_name(&self) -> String {
        match &self.identity {
            Identity::Named(name) => name.local_name.clone(),
            Identity::Anonymous(id) => match &self.content {
                DeclContent::Element(e) => format!("{} (in {})", e.name.local_name, id.scope),
                DeclContent::Attribute(a) => format!("@{} (in {})", a.name.local_name, id.scope),
                _ => format!("anonymous type {}", id),
            },
        }
    }

    /// Kind and name, e.g. `element 'order'`
    pub fn describe(&self) -> String {
        let kind = match &self.content {
            DeclContent::SimpleType(_) => "simple type",
            DeclContent::ComplexType(_) => "complex type",
            _ => self.space().as_str(),
        };
        format!("{} '{}'", kind, self.display_name())
    }

    /// Visit every reference held by this declaration, including the ones
    /// inside nested declarations that have not been hoisted yet.
    pub fn visit_references_mut(
        &mut self,
        f: &mut dyn FnMut(SymbolSpace, &mut Reference) -> Result<()>,
    ) -> Result<()> {
        match &mut self.content {
            DeclContent::SimpleType(def) => match def {
                SimpleTypeDef::Restriction { base, .. } => visit_type_ref(base, f),
                SimpleTypeDef::List { item } => visit_type_ref(item, f),
                SimpleTypeDef::Union { members } => {
                    for member in members {
                        visit_type_ref(member, f)?;
                    }
                    Ok(())
                }
            },
            DeclContent::ComplexType(def) => {
                match &mut def.content {
                    ContentModel::Empty | ContentModel::Complex(None) => {}
                    ContentModel::Simple { base, .. } => visit_type_ref(base, f)?,
                    ContentModel::Complex(Some(derivation)) => {
                        visit_type_ref(&mut derivation.base, f)?
                    }
                }
                if let Some(particle) = &mut def.particle {
                    visit_particle(particle, f)?;
                }
                visit_attribute_uses(&mut def.attributes, f)
            }
            DeclContent::Element(decl) => {
                if let Some(type_ref) = &mut decl.type_ref {
                    visit_type_ref(type_ref, f)?;
                }
                if let Some(head) = &mut decl.substitution_group {
                    f(SymbolSpace::Element, head)?;
                }
                Ok(())
            }
            DeclContent::Attribute(decl) => match &mut decl.type_ref {
                Some(type_ref) => visit_type_ref(type_ref, f),
                None => Ok(()),
            },
            DeclContent::Group(def) => visit_particle(&mut def.particle, f),
            DeclContent::AttributeGroup(def) => visit_attribute_uses(&mut def.attributes, f),
        }
    }

    /// Replace every nested `Inline` declaration by a `Local` handle.
    ///
    /// `hoist` receives each nested declaration (outermost first) and
    /// returns the handle it was stored under.
    pub fn hoist_inlines(
        &mut self,
        hoist: &mut dyn FnMut(Declaration) -> Result<DeclId>,
    ) -> Result<()> {
        match &mut self.content {
            DeclContent::SimpleType(def) => match def {
                SimpleTypeDef::Restriction { base, .. } => hoist_type_ref(base, hoist),
                SimpleTypeDef::List { item } => hoist_type_ref(item, hoist),
                SimpleTypeDef::Union { members } => {
                    for member in members {
                        hoist_type_ref(member, hoist)?;
                    }
                    Ok(())
                }
            },
            DeclContent::ComplexType(def) => {
                match &mut def.content {
                    ContentModel::Empty | ContentModel::Complex(None) => {}
                    ContentModel::Simple { base, .. } => hoist_type_ref(base, hoist)?,
                    ContentModel::Complex(Some(derivation)) => {
                        hoist_type_ref(&mut derivation.base, hoist)?
                    }
                }
                if let Some(particle) = &mut def.particle {
                    hoist_particle(particle, hoist)?;
                }
                hoist_attribute_uses(&mut def.attributes, hoist)
            }
            DeclContent::Element(decl) => match &mut decl.type_ref {
                Some(type_ref) => hoist_type_ref(type_ref, hoist),
                None => Ok(()),
            },
            DeclContent::Attribute(decl) => match &mut decl.type_ref {
                Some(type_ref) => hoist_type_ref(type_ref, hoist),
                None => Ok(()),
            },
            DeclContent::Group(def) => hoist_particle(&mut def.particle, hoist),
            DeclContent::AttributeGroup(def) => hoist_attribute_uses(&mut def.attributes, hoist),
        }
    }

    /// Place an unqualified top-level declaration into `namespace`, together
    /// with every unqualified reference it holds (chameleon include).
    pub fn adopt_namespace(&mut self, namespace: &str) -> Result<()> {
        if let Identity::Named(name) = &mut self.identity {
            if name.namespace.is_none() {
                name.namespace = Some(namespace.to_string());
            }
        }
        if self.is_named() {
            match &mut self.content {
                DeclContent::Element(decl) if decl.name.namespace.is_none() => {
                    decl.name.namespace = Some(namespace.to_string());
                }
                DeclContent::Attribute(decl) if decl.name.namespace.is_none() => {
                    decl.name.namespace = Some(namespace.to_string());
                }
                _ => {}
            }
        }
        self.visit_references_mut(&mut |_, reference| {
            if reference.name.namespace.is_none() {
                reference.name.namespace = Some(namespace.to_string());
            }
            Ok(())
        })
    }
}

// =============================================================================
// Traversal helpers
// =============================================================================

fn visit_type_ref(
    type_ref: &mut TypeRef,
    f: &mut dyn FnMut(SymbolSpace, &mut Reference) -> Result<()>,
) -> Result<()> {
    match type_ref {
        TypeRef::Named(reference) => f(SymbolSpace::Type, reference),
        TypeRef::Inline(decl) => decl.visit_references_mut(f),
        TypeRef::Builtin(_) | TypeRef::Local(_) => Ok(()),
    }
}

fn visit_decl_ref(
    space: SymbolSpace,
    decl_ref: &mut DeclRef,
    f: &mut dyn FnMut(SymbolSpace, &mut Reference) -> Result<()>,
) -> Result<()> {
    match decl_ref {
        DeclRef::Named(reference) => f(space, reference),
        DeclRef::Inline(decl) => decl.visit_references_mut(f),
        DeclRef::Local(_) => Ok(()),
    }
}

fn visit_particle(
    particle: &mut Particle,
    f: &mut dyn FnMut(SymbolSpace, &mut Reference) -> Result<()>,
) -> Result<()> {
    match particle {
        Particle::Element { decl, .. } => visit_decl_ref(SymbolSpace::Element, decl, f),
        Particle::Group { target, .. } => f(SymbolSpace::Group, target),
        Particle::Sequence { children, .. }
        | Particle::Choice { children, .. }
        | Particle::All { children, .. } => {
            for child in children {
                visit_particle(child, f)?;
            }
            Ok(())
        }
        Particle::Any { .. } => Ok(()),
    }
}

fn visit_attribute_uses(
    attributes: &mut AttributeUses,
    f: &mut dyn FnMut(SymbolSpace, &mut Reference) -> Result<()>,
) -> Result<()> {
    for attribute_use in &mut attributes.uses {
        visit_decl_ref(SymbolSpace::Attribute, &mut attribute_use.decl, f)?;
    }
    for group in &mut attributes.groups {
        f(SymbolSpace::AttributeGroup, group)?;
    }
    Ok(())
}

fn hoist_type_ref(
    type_ref: &mut TypeRef,
    hoist: &mut dyn FnMut(Declaration) -> Result<DeclId>,
) -> Result<()> {
    if matches!(type_ref, TypeRef::Inline(_)) {
        let taken = std::mem::replace(type_ref, TypeRef::Builtin(BuiltinType::AnyType));
        if let TypeRef::Inline(decl) = taken {
            *type_ref = TypeRef::Local(hoist(*decl)?);
        }
    }
    Ok(())
}

fn hoist_decl_ref(
    decl_ref: &mut DeclRef,
    hoist: &mut dyn FnMut(Declaration) -> Result<DeclId>,
) -> Result<()> {
    if matches!(decl_ref, DeclRef::Inline(_)) {
        let taken = std::mem::replace(decl_ref, DeclRef::Local(DeclId(usize::MAX)));
        if let DeclRef::Inline(decl) = taken {
            *decl_ref = DeclRef::Local(hoist(*decl)?);
        }
    }
    Ok(())
}

fn hoist_particle(
    particle: &mut Particle,
    hoist: &mut dyn FnMut(Declaration) -> Result<DeclId>,
) -> Result<()> {
    match particle {
        Particle::Element { decl, .. } => hoist_decl_ref(decl, hoist),
        Particle::Sequence { children, .. }
        | Particle::Choice { children, .. }
        | Particle::All { children, .. } => {
            for child in children {
                hoist_particle(child, hoist)?;
            }
            Ok(())
        }
        Particle::Group { .. } | Particle::Any { .. } => Ok(()),
    }
}

fn hoist_attribute_uses(
    attributes: &mut AttributeUses,
    hoist: &mut dyn FnMut(Declaration) -> Result<DeclId>,
) -> Result<()> {
    for attribute_use in &mut attributes.uses {
        hoist_decl_ref(&mut attribute_use.decl, hoist)?;
    }
    Ok(())
}

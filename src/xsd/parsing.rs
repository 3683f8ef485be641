//! XSD document parsing
//!
//! Turns the element tree of one schema document into a [`SchemaDocument`].
//! Parsing is structural: every QName-valued attribute is resolved against
//! the namespace bindings in scope, but nothing is looked up across
//! documents here.

use tracing::trace;

use crate::documents::{Document, Element};
use crate::error::{Error, ParseError, Result};
use crate::limits::Limits;
use crate::locations::SourceLocation;
use crate::names::{is_valid_ncname, is_valid_qname};
use crate::namespaces::{QName, XSD_NAMESPACE};

use super::builtins::BuiltinType;
use super::components::{
    AttributeDecl, AttributeGroupDef, AttributeUse, AttributeUseKind, AttributeUses,
    AttributeWildcard, ComplexTypeDef, ContentModel, DeclContent, DeclRef, Declaration,
    Derivation, DerivationMethod, ElementDecl, GroupDef, Identity, Reference, SimpleTypeDef,
    TypeRef,
};
use super::facets::Facet;
use super::particles::{parse_occurs, Compositor, Occurs, Particle};
use super::schemas::{DocumentReference, ReferenceKind, SchemaDocument};

/// XSD element local names
mod xsd_elements {
    pub const SCHEMA: &str = "schema";
    pub const ELEMENT: &str = "element";
    pub const COMPLEX_TYPE: &str = "complexType";
    pub const SIMPLE_TYPE: &str = "simpleType";
    pub const ATTRIBUTE: &str = "attribute";
    pub const ATTRIBUTE_GROUP: &str = "attributeGroup";
    pub const GROUP: &str = "group";
    pub const SEQUENCE: &str = "sequence";
    pub const CHOICE: &str = "choice";
    pub const ALL: &str = "all";
    pub const ANNOTATION: &str = "annotation";
    pub const DOCUMENTATION: &str = "documentation";
    pub const IMPORT: &str = "import";
    pub const INCLUDE: &str = "include";
    pub const REDEFINE: &str = "redefine";
    pub const OVERRIDE: &str = "override";
    pub const RESTRICTION: &str = "restriction";
    pub const EXTENSION: &str = "extension";
    pub const LIST: &str = "list";
    pub const UNION: &str = "union";
    pub const COMPLEX_CONTENT: &str = "complexContent";
    pub const SIMPLE_CONTENT: &str = "simpleContent";
    pub const ANY: &str = "any";
    pub const ANY_ATTRIBUTE: &str = "anyAttribute";
    pub const NOTATION: &str = "notation";
    pub const KEY: &str = "key";
    pub const KEYREF: &str = "keyref";
    pub const UNIQUE: &str = "unique";
    pub const ALTERNATIVE: &str = "alternative";
    pub const ASSERT: &str = "assert";
    pub const ASSERTION: &str = "assertion";
    pub const OPEN_CONTENT: &str = "openContent";
    pub const DEFAULT_OPEN_CONTENT: &str = "defaultOpenContent";
    pub const EXPLICIT_TIMEZONE: &str = "explicitTimezone";
}

/// XSD attribute names
mod xsd_attrs {
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const REF: &str = "ref";
    pub const TARGET_NAMESPACE: &str = "targetNamespace";
    pub const ELEMENT_FORM_DEFAULT: &str = "elementFormDefault";
    pub const ATTRIBUTE_FORM_DEFAULT: &str = "attributeFormDefault";
    pub const BLOCK_DEFAULT: &str = "blockDefault";
    pub const BLOCK: &str = "block";
    pub const FORM: &str = "form";
    pub const NILLABLE: &str = "nillable";
    pub const DEFAULT: &str = "default";
    pub const FIXED: &str = "fixed";
    pub const BASE: &str = "base";
    pub const VALUE: &str = "value";
    pub const MIXED: &str = "mixed";
    pub const ABSTRACT: &str = "abstract";
    pub const SUBSTITUTION_GROUP: &str = "substitutionGroup";
    pub const NAMESPACE: &str = "namespace";
    pub const SCHEMA_LOCATION: &str = "schemaLocation";
    pub const ITEM_TYPE: &str = "itemType";
    pub const MEMBER_TYPES: &str = "memberTypes";
    pub const MIN_OCCURS: &str = "minOccurs";
    pub const MAX_OCCURS: &str = "maxOccurs";
    pub const USE: &str = "use";
}

use xsd_attrs as attrs;
use xsd_elements as elems;

/// Parse one XSD document.
///
/// `id` is the canonical identifier of the document; it is used to resolve
/// relative schema locations and in every diagnostic.
pub fn parse_document(id: &str, text: &str, limits: &Limits) -> Result<SchemaDocument> {
    let document = Document::parse(id, text, limits)?;
    let root = document.root();

    if !(root.namespace() == Some(XSD_NAMESPACE) && root.local_name() == elems::SCHEMA) {
        return Err(ParseError::new(format!(
            "Expected xs:schema root element, found {}",
            root.qname
        ))
        .at(id, root.position)
        .into());
    }

    let block_default = root.get_attribute(attrs::BLOCK_DEFAULT).unwrap_or("");
    let parser = SchemaParser {
        document: id,
        target_namespace: root
            .get_attribute(attrs::TARGET_NAMESPACE)
            .filter(|ns| !ns.is_empty())
            .map(str::to_string),
        element_qualified: root.get_attribute(attrs::ELEMENT_FORM_DEFAULT) == Some("qualified"),
        attribute_qualified: root.get_attribute(attrs::ATTRIBUTE_FORM_DEFAULT)
            == Some("qualified"),
        block_substitution_default: blocks_substitution(block_default),
    };

    let mut references = Vec::new();
    let mut declarations = Vec::new();

    for child in xsd_children(root) {
        match child.local_name() {
            elems::INCLUDE => {
                let location = parser.required_attribute(child, attrs::SCHEMA_LOCATION)?;
                references.push(DocumentReference {
                    kind: ReferenceKind::Include,
                    namespace: None,
                    location: Some(location.to_string()),
                    position: child.position,
                });
            }
            elems::IMPORT => {
                references.push(DocumentReference {
                    kind: ReferenceKind::Import,
                    namespace: child
                        .get_attribute(attrs::NAMESPACE)
                        .filter(|ns| !ns.is_empty())
                        .map(str::to_string),
                    location: child.get_attribute(attrs::SCHEMA_LOCATION).map(str::to_string),
                    position: child.position,
                });
            }
            elems::REDEFINE | elems::OVERRIDE | elems::DEFAULT_OPEN_CONTENT => {
                let construct = format!("xs:{}", child.local_name());
                return Err(parser.unsupported(child, construct, "schema"));
            }
            elems::SIMPLE_TYPE => {
                let (identity, scope) = parser.global_identity(child)?;
                declarations.push(parser.parse_simple_type(child, identity, &scope)?);
            }
            elems::COMPLEX_TYPE => {
                let (identity, scope) = parser.global_identity(child)?;
                declarations.push(parser.parse_complex_type(child, identity, &scope)?);
            }
            elems::ELEMENT => {
                let (name, scope) = parser.global_name(child)?;
                let identity = Identity::Named(name.clone());
                declarations.push(parser.parse_element_body(child, name, identity, &scope)?);
            }
            elems::ATTRIBUTE => {
                let (name, scope) = parser.global_name(child)?;
                declarations.push(parser.parse_global_attribute(child, name, &scope)?);
            }
            elems::GROUP => {
                let (identity, scope) = parser.global_identity(child)?;
                declarations.push(parser.parse_group(child, identity, &scope)?);
            }
            elems::ATTRIBUTE_GROUP => {
                let (identity, scope) = parser.global_identity(child)?;
                let attributes = parser.parse_attribute_uses(child, &scope)?;
                declarations.push(Declaration {
                    identity,
                    location: parser.location(child),
                    documentation: documentation(child),
                    content: DeclContent::AttributeGroup(AttributeGroupDef { attributes }),
                });
            }
            elems::NOTATION => {}
            other => {
                return Err(parser.malformed(
                    child,
                    format!("Unexpected top-level element xs:{}", other),
                ))
            }
        }
    }

    trace!(
        document = id,
        declarations = declarations.len(),
        references = references.len(),
        "parsed schema document"
    );

    Ok(SchemaDocument {
        id: id.to_string(),
        target_namespace: parser.target_namespace.clone(),
        namespaces: root.namespaces.clone(),
        references,
        declarations,
    })
}

/// Naming scope for nested anonymous components
#[derive(Debug, Clone)]
struct Scope {
    name: String,
    path: String,
}

impl Scope {
    fn top(name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: String::new(),
        }
    }

    fn child(&self, segment: &str) -> Self {
        let path = if self.path.is_empty() {
            segment.to_string()
        } else {
            format!("{}.{}", self.path, segment)
        };
        Self {
            name: self.name.clone(),
            path,
        }
    }

    fn identity(&self) -> Identity {
        Identity::anonymous(self.name.clone(), self.path.clone())
    }
}

struct SchemaParser<'a> {
    document: &'a str,
    target_namespace: Option<String>,
    element_qualified: bool,
    attribute_qualified: bool,
    block_substitution_default: bool,
}

impl<'a> SchemaParser<'a> {
    // =========================================================================
    // Diagnostics
    // =========================================================================

    fn location(&self, el: &Element) -> SourceLocation {
        SourceLocation::new(self.document, el.position)
    }

    fn malformed(&self, el: &Element, message: impl Into<String>) -> Error {
        ParseError::new(message).at(self.document, el.position).into()
    }

    fn unsupported(&self, el: &Element, construct: impl Into<String>, declaration: &str) -> Error {
        Error::unsupported(construct, declaration, self.location(el))
    }

    // =========================================================================
    // Attribute helpers
    // =========================================================================

    fn required_attribute<'e>(&self, el: &'e Element, name: &str) -> Result<&'e str> {
        el.get_attribute(name).ok_or_else(|| {
            self.malformed(
                el,
                format!(
                    "Missing required attribute '{}' on xs:{}",
                    name,
                    el.local_name()
                ),
            )
        })
    }

    fn name_attribute<'e>(&self, el: &'e Element) -> Result<&'e str> {
        let name = self.required_attribute(el, attrs::NAME)?.trim();
        if !is_valid_ncname(name) {
            return Err(self.malformed(el, format!("Invalid name '{}'", name)));
        }
        Ok(name)
    }

    fn resolve_qname(&self, el: &Element, value: &str) -> Result<QName> {
        let value = value.trim();
        if !is_valid_qname(value) {
            return Err(self.malformed(el, format!("Invalid QName '{}'", value)));
        }
        el.namespaces.resolve(value).ok_or_else(|| {
            self.malformed(el, format!("Unbound namespace prefix in '{}'", value))
        })
    }

    fn qname_attribute(&self, el: &Element, name: &str) -> Result<Option<QName>> {
        el.get_attribute(name)
            .map(|value| self.resolve_qname(el, value))
            .transpose()
    }

    fn bool_attribute(&self, el: &Element, name: &str) -> Result<bool> {
        match el.get_attribute(name).map(str::trim) {
            None | Some("false") | Some("0") => Ok(false),
            Some("true") | Some("1") => Ok(true),
            Some(other) => Err(self.malformed(
                el,
                format!("Attribute '{}' must be a boolean, found '{}'", name, other),
            )),
        }
    }

    fn occurs(&self, el: &Element) -> Result<Occurs> {
        parse_occurs(
            el.get_attribute(attrs::MIN_OCCURS),
            el.get_attribute(attrs::MAX_OCCURS),
        )
        .map_err(|e| e.at(self.document, el.position).into())
    }

    fn type_ref(&self, el: &Element, name: QName) -> Result<TypeRef> {
        if name.is_in(XSD_NAMESPACE) {
            return BuiltinType::from_local_name(&name.local_name)
                .map(TypeRef::Builtin)
                .ok_or_else(|| {
                    self.malformed(el, format!("Unknown built-in type xs:{}", name.local_name))
                });
        }
        Ok(TypeRef::Named(Reference::new(name)))
    }

    fn global_name(&self, el: &Element) -> Result<(QName, Scope)> {
        let name = self.name_attribute(el)?;
        Ok((
            QName::new(self.target_namespace.clone(), name),
            Scope::top(name),
        ))
    }

    fn global_identity(&self, el: &Element) -> Result<(Identity, Scope)> {
        let (name, scope) = self.global_name(el)?;
        Ok((Identity::Named(name), scope))
    }

    fn local_name(&self, el: &Element, name: &str, qualified_default: bool) -> QName {
        let qualified = match el.get_attribute(attrs::FORM) {
            Some("qualified") => true,
            Some("unqualified") => false,
            _ => qualified_default,
        };
        if qualified {
            QName::new(self.target_namespace.clone(), name)
        } else {
            QName::local(name)
        }
    }

    // =========================================================================
    // Simple types
    // =========================================================================

    fn parse_simple_type(
        &self,
        el: &Element,
        identity: Identity,
        scope: &Scope,
    ) -> Result<Declaration> {
        let variety = xsd_children(el).next().ok_or_else(|| {
            self.malformed(el, "xs:simpleType must contain restriction, list or union")
        })?;

        let def = match variety.local_name() {
            elems::RESTRICTION => {
                let base = self.base_type(variety, scope)?;
                let facets = self.parse_facets(variety, &[elems::SIMPLE_TYPE], scope)?;
                SimpleTypeDef::Restriction { base, facets }
            }
            elems::LIST => {
                let item = match self.qname_attribute(variety, attrs::ITEM_TYPE)? {
                    Some(name) => self.type_ref(variety, name)?,
                    None => {
                        let inline = self.inline_simple_type(variety, &scope.child("item"))?;
                        inline.ok_or_else(|| {
                            self.malformed(variety, "xs:list needs an itemType or a simpleType")
                        })?
                    }
                };
                SimpleTypeDef::List { item }
            }
            elems::UNION => {
                let mut members = Vec::new();
                if let Some(member_types) = variety.get_attribute(attrs::MEMBER_TYPES) {
                    for member in member_types.split_whitespace() {
                        let name = self.resolve_qname(variety, member)?;
                        members.push(self.type_ref(variety, name)?);
                    }
                }
                let inline_members = xsd_children(variety)
                    .filter(|c| c.local_name() == elems::SIMPLE_TYPE)
                    .enumerate();
                for (i, member) in inline_members {
                    let member_scope = scope.child(&format!("member{}", i + 1));
                    let decl =
                        self.parse_simple_type(member, member_scope.identity(), &member_scope)?;
                    members.push(TypeRef::Inline(Box::new(decl)));
                }
                if members.is_empty() {
                    return Err(self.malformed(variety, "xs:union has no member types"));
                }
                SimpleTypeDef::Union { members }
            }
            other => {
                return Err(self.malformed(
                    variety,
                    format!("Unexpected xs:{} in xs:simpleType", other),
                ))
            }
        };

        Ok(Declaration {
            identity,
            location: self.location(el),
            documentation: documentation(el),
            content: DeclContent::SimpleType(def),
        })
    }

    /// `base` attribute or inline xs:simpleType of a simple restriction
    fn base_type(&self, restriction: &Element, scope: &Scope) -> Result<TypeRef> {
        if let Some(name) = self.qname_attribute(restriction, attrs::BASE)? {
            return self.type_ref(restriction, name);
        }
        self.inline_simple_type(restriction, &scope.child("base"))?
            .ok_or_else(|| {
                self.malformed(restriction, "xs:restriction needs a base or a simpleType")
            })
    }

    fn inline_simple_type(&self, parent: &Element, scope: &Scope) -> Result<Option<TypeRef>> {
        match xsd_children(parent).find(|c| c.local_name() == elems::SIMPLE_TYPE) {
            Some(child) => {
                let decl = self.parse_simple_type(child, scope.identity(), scope)?;
                Ok(Some(TypeRef::Inline(Box::new(decl))))
            }
            None => Ok(None),
        }
    }

    /// Facet children of a restriction, skipping the element kinds in `skip`
    fn parse_facets(
        &self,
        restriction: &Element,
        skip: &[&str],
        scope: &Scope,
    ) -> Result<Vec<Facet>> {
        let mut facets = Vec::new();
        for child in xsd_children(restriction) {
            let local = child.local_name();
            if skip.contains(&local) {
                continue;
            }
            if local == elems::ASSERTION || local == elems::EXPLICIT_TIMEZONE {
                return Err(self.unsupported(child, format!("xs:{}", local), &scope.name));
            }
            let value = self.required_attribute(child, attrs::VALUE)?;
            match Facet::parse(local, value) {
                Ok(Some(facet)) => facets.push(facet),
                Ok(None) => {
                    return Err(self.malformed(
                        child,
                        format!("Unexpected xs:{} in xs:restriction", local),
                    ))
                }
                Err(message) => return Err(self.malformed(child, message)),
            }
        }
        Ok(facets)
    }

    // =========================================================================
    // Complex types
    // =========================================================================

    fn parse_complex_type(
        &self,
        el: &Element,
        identity: Identity,
        scope: &Scope,
    ) -> Result<Declaration> {
        let is_abstract = self.bool_attribute(el, attrs::ABSTRACT)?;
        let mut mixed = self.bool_attribute(el, attrs::MIXED)?;

        for child in xsd_children(el) {
            if matches!(child.local_name(), elems::OPEN_CONTENT | elems::ASSERT) {
                let construct = format!("xs:{}", child.local_name());
                return Err(self.unsupported(child, construct, &scope.name));
            }
        }

        let simple_content = xsd_children(el).find(|c| c.local_name() == elems::SIMPLE_CONTENT);
        let complex_content = xsd_children(el).find(|c| c.local_name() == elems::COMPLEX_CONTENT);

        let (content, particle, attributes) = if let Some(sc) = simple_content {
            let (derivation_el, method) = self.derivation(sc)?;
            let base_name = self.required_attribute(derivation_el, attrs::BASE)?;
            let base = self.type_ref(derivation_el, self.resolve_qname(derivation_el, base_name)?)?;
            if method == DerivationMethod::Restriction
                && xsd_children(derivation_el).any(|c| c.local_name() == elems::SIMPLE_TYPE)
            {
                return Err(self.unsupported(
                    derivation_el,
                    "xs:simpleType inside a simpleContent restriction",
                    &scope.name,
                ));
            }
            let facets = match method {
                DerivationMethod::Restriction => self.parse_facets(
                    derivation_el,
                    &[
                        elems::ATTRIBUTE,
                        elems::ATTRIBUTE_GROUP,
                        elems::ANY_ATTRIBUTE,
                        elems::SIMPLE_TYPE,
                    ],
                    scope,
                )?,
                DerivationMethod::Extension => Vec::new(),
            };
            let attributes = self.parse_attribute_uses(derivation_el, scope)?;
            (
                ContentModel::Simple {
                    base,
                    derivation: method,
                    facets,
                },
                None,
                attributes,
            )
        } else if let Some(cc) = complex_content {
            if cc.get_attribute(attrs::MIXED).is_some() {
                mixed = self.bool_attribute(cc, attrs::MIXED)?;
            }
            let (derivation_el, method) = self.derivation(cc)?;
            let base_name = self.required_attribute(derivation_el, attrs::BASE)?;
            let base = self.type_ref(derivation_el, self.resolve_qname(derivation_el, base_name)?)?;
            let particle = self.content_particle(derivation_el, scope)?;
            let attributes = self.parse_attribute_uses(derivation_el, scope)?;
            (
                ContentModel::Complex(Some(Derivation { base, method })),
                particle,
                attributes,
            )
        } else {
            let particle = self.content_particle(el, scope)?;
            let attributes = self.parse_attribute_uses(el, scope)?;
            let content = if particle.is_some() {
                ContentModel::Complex(None)
            } else {
                ContentModel::Empty
            };
            (content, particle, attributes)
        };

        Ok(Declaration {
            identity,
            location: self.location(el),
            documentation: documentation(el),
            content: DeclContent::ComplexType(ComplexTypeDef {
                content,
                particle,
                attributes,
                is_abstract,
                mixed,
            }),
        })
    }

    fn derivation<'e>(&self, content: &'e Element) -> Result<(&'e Element, DerivationMethod)> {
        for child in xsd_children(content) {
            match child.local_name() {
                elems::EXTENSION => return Ok((child, DerivationMethod::Extension)),
                elems::RESTRICTION => return Ok((child, DerivationMethod::Restriction)),
                _ => {}
            }
        }
        Err(self.malformed(
            content,
            format!("xs:{} needs an extension or a restriction", content.local_name()),
        ))
    }

    /// The single model group or group reference among the children
    fn content_particle(&self, parent: &Element, scope: &Scope) -> Result<Option<Particle>> {
        for child in xsd_children(parent) {
            match child.local_name() {
                elems::SEQUENCE => {
                    return self.parse_model_group(child, Compositor::Sequence, scope).map(Some)
                }
                elems::CHOICE => {
                    return self.parse_model_group(child, Compositor::Choice, scope).map(Some)
                }
                elems::ALL => {
                    return self.parse_model_group(child, Compositor::All, scope).map(Some)
                }
                elems::GROUP => return self.parse_group_ref(child).map(Some),
                _ => {}
            }
        }
        Ok(None)
    }

    fn parse_model_group(
        &self,
        el: &Element,
        compositor: Compositor,
        scope: &Scope,
    ) -> Result<Particle> {
        let occurs = self.occurs(el)?;
        let mut children = Vec::new();

        for child in xsd_children(el) {
            let particle = match child.local_name() {
                elems::ELEMENT => self.parse_local_element(child, scope)?,
                elems::GROUP => self.parse_group_ref(child)?,
                elems::SEQUENCE => self.parse_model_group(child, Compositor::Sequence, scope)?,
                elems::CHOICE => self.parse_model_group(child, Compositor::Choice, scope)?,
                elems::ALL => self.parse_model_group(child, Compositor::All, scope)?,
                elems::ANY => Particle::Any {
                    occurs: self.occurs(child)?,
                    location: self.location(child),
                },
                other => {
                    return Err(self.malformed(
                        child,
                        format!("Unexpected xs:{} in xs:{}", other, compositor.as_str()),
                    ))
                }
            };
            children.push(particle);
        }

        Ok(Particle::model_group(compositor, children, occurs))
    }

    fn parse_group_ref(&self, el: &Element) -> Result<Particle> {
        let name = self.required_attribute(el, attrs::REF)?;
        Ok(Particle::Group {
            target: Reference::new(self.resolve_qname(el, name)?),
            occurs: self.occurs(el)?,
        })
    }

    // =========================================================================
    // Elements
    // =========================================================================

    fn parse_local_element(&self, el: &Element, scope: &Scope) -> Result<Particle> {
        let occurs = self.occurs(el)?;

        if let Some(reference) = self.qname_attribute(el, attrs::REF)? {
            return Ok(Particle::Element {
                decl: DeclRef::Named(Reference::new(reference)),
                occurs,
            });
        }

        let name = self.name_attribute(el)?;
        let element_scope = scope.child(name);
        let qname = self.local_name(el, name, self.element_qualified);
        let decl = self.parse_element_body(el, qname, element_scope.identity(), &element_scope)?;

        Ok(Particle::Element {
            decl: DeclRef::Inline(Box::new(decl)),
            occurs,
        })
    }

    /// Shared part of global and local element declarations
    fn parse_element_body(
        &self,
        el: &Element,
        name: QName,
        identity: Identity,
        scope: &Scope,
    ) -> Result<Declaration> {
        let mut type_ref = match self.qname_attribute(el, attrs::TYPE)? {
            Some(type_name) => Some(self.type_ref(el, type_name)?),
            None => None,
        };

        for child in xsd_children(el) {
            let inline = match child.local_name() {
                elems::SIMPLE_TYPE => self.parse_simple_type(child, scope.identity(), scope)?,
                elems::COMPLEX_TYPE => self.parse_complex_type(child, scope.identity(), scope)?,
                elems::ALTERNATIVE => {
                    return Err(self.unsupported(child, "xs:alternative", &name.local_name))
                }
                elems::KEY | elems::KEYREF | elems::UNIQUE => continue,
                other => {
                    let message = format!("Unexpected xs:{} in xs:element", other);
                    return Err(self.malformed(child, message));
                }
            };
            if type_ref.is_some() {
                return Err(self.malformed(
                    el,
                    format!(
                        "Element '{}' has both a type attribute and an inline type",
                        name.local_name
                    ),
                ));
            }
            type_ref = Some(TypeRef::Inline(Box::new(inline)));
        }

        let default = el.get_attribute(attrs::DEFAULT).map(str::to_string);
        let fixed = el.get_attribute(attrs::FIXED).map(str::to_string);
        if default.is_some() && fixed.is_some() {
            return Err(self.malformed(
                el,
                format!("Element '{}' has both default and fixed", name.local_name),
            ));
        }

        let block_substitution = match el.get_attribute(attrs::BLOCK) {
            Some(block) => blocks_substitution(block),
            None => self.block_substitution_default,
        };

        Ok(Declaration {
            identity,
            location: self.location(el),
            documentation: documentation(el),
            content: DeclContent::Element(ElementDecl {
                name,
                type_ref,
                nillable: self.bool_attribute(el, attrs::NILLABLE)?,
                default,
                fixed,
                is_abstract: self.bool_attribute(el, attrs::ABSTRACT)?,
                substitution_group: self
                    .qname_attribute(el, attrs::SUBSTITUTION_GROUP)?
                    .map(Reference::new),
                block_substitution,
            }),
        })
    }

    // =========================================================================
    // Attributes and groups
    // =========================================================================

    fn parse_global_attribute(
        &self,
        el: &Element,
        name: QName,
        scope: &Scope,
    ) -> Result<Declaration> {
        let identity = Identity::Named(name.clone());
        let decl = self.parse_attribute_decl(el, name, scope)?;
        Ok(Declaration {
            identity,
            location: self.location(el),
            documentation: documentation(el),
            content: DeclContent::Attribute(decl),
        })
    }

    fn parse_attribute_decl(
        &self,
        el: &Element,
        name: QName,
        scope: &Scope,
    ) -> Result<AttributeDecl> {
        let mut type_ref = match self.qname_attribute(el, attrs::TYPE)? {
            Some(type_name) => Some(self.type_ref(el, type_name)?),
            None => None,
        };
        if let Some(inline) = self.inline_simple_type(el, scope)? {
            if type_ref.is_some() {
                return Err(self.malformed(
                    el,
                    format!(
                        "Attribute '{}' has both a type attribute and an inline type",
                        name.local_name
                    ),
                ));
            }
            type_ref = Some(inline);
        }

        let default = el.get_attribute(attrs::DEFAULT).map(str::to_string);
        let fixed = el.get_attribute(attrs::FIXED).map(str::to_string);
        if default.is_some() && fixed.is_some() {
            return Err(self.malformed(
                el,
                format!("Attribute '{}' has both default and fixed", name.local_name),
            ));
        }

        Ok(AttributeDecl {
            name,
            type_ref,
            default,
            fixed,
        })
    }

    fn parse_attribute_uses(&self, parent: &Element, scope: &Scope) -> Result<AttributeUses> {
        let mut uses = AttributeUses::default();

        for child in xsd_children(parent) {
            match child.local_name() {
                elems::ATTRIBUTE => uses.uses.push(self.parse_attribute_use(child, scope)?),
                elems::ATTRIBUTE_GROUP => {
                    let name = self.required_attribute(child, attrs::REF)?;
                    uses.groups.push(Reference::new(self.resolve_qname(child, name)?));
                }
                elems::ANY_ATTRIBUTE => {
                    uses.wildcard = Some(AttributeWildcard {
                        namespace: child
                            .get_attribute(attrs::NAMESPACE)
                            .unwrap_or("##any")
                            .to_string(),
                        location: self.location(child),
                    });
                }
                _ => {}
            }
        }

        Ok(uses)
    }

    fn parse_attribute_use(&self, el: &Element, scope: &Scope) -> Result<AttributeUse> {
        let use_kind = match el.get_attribute(attrs::USE).map(str::trim) {
            None | Some("optional") => AttributeUseKind::Optional,
            Some("required") => AttributeUseKind::Required,
            Some("prohibited") => AttributeUseKind::Prohibited,
            Some(other) => {
                return Err(self.malformed(el, format!("Invalid attribute use '{}'", other)))
            }
        };

        if let Some(reference) = self.qname_attribute(el, attrs::REF)? {
            let default = el.get_attribute(attrs::DEFAULT).map(str::to_string);
            let fixed = el.get_attribute(attrs::FIXED).map(str::to_string);
            return Ok(AttributeUse {
                decl: DeclRef::Named(Reference::new(reference)),
                use_kind,
                default,
                fixed,
            });
        }

        let name = self.name_attribute(el)?;
        let attribute_scope = scope.child(&format!("@{}", name));
        let qname = self.local_name(el, name, self.attribute_qualified);
        let decl = self.parse_attribute_decl(el, qname, &attribute_scope)?;

        Ok(AttributeUse {
            decl: DeclRef::Inline(Box::new(Declaration {
                identity: attribute_scope.identity(),
                location: self.location(el),
                documentation: documentation(el),
                content: DeclContent::Attribute(decl),
            })),
            use_kind,
            default: None,
            fixed: None,
        })
    }

    fn parse_group(&self, el: &Element, identity: Identity, scope: &Scope) -> Result<Declaration> {
        let particle = match self.content_particle(el, scope)? {
            Some(particle @ (Particle::Sequence { .. }
            | Particle::Choice { .. }
            | Particle::All { .. })) => particle,
            _ => {
                return Err(self.malformed(
                    el,
                    "xs:group must contain a sequence, choice or all",
                ))
            }
        };

        Ok(Declaration {
            identity,
            location: self.location(el),
            documentation: documentation(el),
            content: DeclContent::Group(GroupDef { particle }),
        })
    }
}

/// Children in the XSD namespace, without annotations
fn xsd_children(el: &Element) -> impl Iterator<Item = &Element> {
    el.children
        .iter()
        .filter(|c| c.namespace() == Some(XSD_NAMESPACE) && c.local_name() != elems::ANNOTATION)
}

/// Text of the xs:annotation/xs:documentation children, joined by blank lines
fn documentation(el: &Element) -> Option<String> {
    let texts: Vec<String> = el
        .find_children(XSD_NAMESPACE, elems::ANNOTATION)
        .flat_map(|annotation| annotation.find_children(XSD_NAMESPACE, elems::DOCUMENTATION))
        .filter_map(|doc| doc.text.as_deref())
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
        .collect();

    if texts.is_empty() {
        None
    } else {
        Some(texts.join("\n\n"))
    }
}

fn blocks_substitution(block: &str) -> bool {
    block
        .split_whitespace()
        .any(|token| token == "substitution" || token == "#all")
}

//! Type translation
//!
//! Walks a resolved [`SymbolTable`] and produces the [`JsonSchemaDocument`]
//! model. Named types and global elements own one definitions entry each;
//! every use of them is a `$ref`. Definitions are reserved before their body
//! is translated, so recursive content models terminate on a reference to
//! the unfinished entry.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, ParseError, Result};
use crate::locations::SourceLocation;
use crate::xsd::{
    expand_particle, AttributeDecl, AttributeUse, AttributeUseKind, AttributeUses, BuiltinType,
    Compositor, ComplexTypeDef, ContentModel, ContentParticle, DeclContent, DeclId, DeclRef,
    Declaration, Derivation, DerivationMethod, Facet, FacetSet, Identity, Occurs, Particle,
    SimpleTypeDef, SymbolSpace, SymbolTable, TypeRef, ValueKind,
};

use super::config::{ConversionOptions, MixedContent, UnionStyle};
use super::nodes::{
    decimal_value, JsonSchemaDocument, NodeKind, ObjectNode, ScalarNode, ScalarType, SchemaNode,
};

/// Translate a resolved symbol table into a JSON Schema model
pub fn translate(
    table: &SymbolTable,
    options: &ConversionOptions,
    title: Option<String>,
) -> Result<JsonSchemaDocument> {
    let mut translator = Translator::new(table, options)?;

    for (id, _) in table.iter() {
        if translator.keys.contains_key(&id) {
            translator.ensure(id)?;
        }
    }
    let root = translator.root_node()?;

    let definitions: IndexMap<String, SchemaNode> = translator
        .slots
        .into_iter()
        .filter_map(|(key, node)| node.map(|node| (key, node)))
        .collect();
    info!(definitions = definitions.len(), "translated schema");

    Ok(JsonSchemaDocument {
        title,
        root,
        definitions,
    })
}

/// Where a simple value's derivation chain starts
#[derive(Debug, Clone, Copy)]
enum Cursor {
    Builtin(BuiltinType),
    Decl(DeclId),
}

/// Where a simple value's derivation chain ends
#[derive(Debug, Clone, Copy)]
enum ValueRoot {
    Builtin(BuiltinType),
    List(DeclId),
    Union(DeclId),
}

/// Object under construction, remembering the bounds behind each element
/// property so a repeated name can be widened.
#[derive(Debug, Default)]
struct Shape {
    object: ObjectNode,
    occurs: HashMap<String, Occurs>,
}

struct Translator<'a> {
    table: &'a SymbolTable,
    options: &'a ConversionOptions,
    keys: HashMap<DeclId, String>,
    slots: IndexMap<String, Option<SchemaNode>>,
    started: HashSet<DeclId>,
}

impl<'a> Translator<'a> {
    fn new(table: &'a SymbolTable, options: &'a ConversionOptions) -> Result<Self> {
        let promoted = promoted_types(table)?;

        let mut keys = HashMap::new();
        let mut slots = IndexMap::new();
        let mut used = HashSet::new();

        for (id, decl) in table.iter() {
            if table.is_builtin(id) {
                continue;
            }
            let (base, suffix) = match (&decl.identity, decl.space()) {
                (Identity::Named(name), SymbolSpace::Type) => (name.local_name.clone(), "type"),
                (Identity::Named(name), SymbolSpace::Element) => {
                    (name.local_name.clone(), "element")
                }
                (Identity::Anonymous(anonymous), SymbolSpace::Type) if promoted.contains(&id) => {
                    (anonymous.to_string(), "type")
                }
                _ => continue,
            };
            let key = unique_key(&mut used, base, suffix);
            slots.insert(key.clone(), None);
            keys.insert(id, key);
        }

        Ok(Self {
            table,
            options,
            keys,
            slots,
            started: HashSet::new(),
        })
    }

    // =========================================================================
    // Definitions
    // =========================================================================

    fn ensure(&mut self, id: DeclId) -> Result<()> {
        if !self.started.insert(id) {
            return Ok(());
        }
        let Some(key) = self.keys.get(&id).cloned() else {
            return Ok(());
        };
        trace!(key = %key, "translating definition");

        let node = match self.table.get(id).space() {
            SymbolSpace::Element => self.element_body(id)?,
            _ => self.type_body(id)?,
        };
        self.slots.insert(key, Some(node));
        Ok(())
    }

    fn reference_to(&mut self, id: DeclId) -> Result<SchemaNode> {
        self.ensure(id)?;
        match self.keys.get(&id) {
            Some(key) => Ok(SchemaNode::reference(key.clone())),
            None => Err(self.table.kind_mismatch(id, "a definition")),
        }
    }

    fn root_node(&mut self) -> Result<SchemaNode> {
        let table = self.table;
        let mut object = ObjectNode::default();

        match self.options.root_element() {
            Some(root) => {
                let (id, decl) = table
                    .named()
                    .filter(|(_, decl)| decl.space() == SymbolSpace::Element)
                    .find(|(_, decl)| {
                        decl.name()
                            .map_or(false, |n| n.local_name == root || n.to_string() == root)
                    })
                    .ok_or_else(|| {
                        Error::InvalidOption(format!("root element '{}' is not declared", root))
                    })?;
                let name = decl.display_name();
                object.insert(name, self.reference_to(id)?, true);
            }
            None => {
                for (id, decl) in table.named() {
                    if decl.space() != SymbolSpace::Element || table.element(id)?.is_abstract {
                        continue;
                    }
                    let mut name = decl.display_name();
                    if object.properties.contains_key(&name) {
                        name = self.keys.get(&id).cloned().unwrap_or(name);
                    }
                    object.insert(name, self.reference_to(id)?, false);
                }
                if !object.properties.is_empty() {
                    object.min_properties = Some(1);
                    object.max_properties = Some(1);
                }
            }
        }

        Ok(SchemaNode::new(NodeKind::Object(object)))
    }

    fn describe(&self, mut node: SchemaNode, decl: &Declaration) -> SchemaNode {
        if self.options.include_documentation()
            && node.annotations.description.is_none()
            && !matches!(node.kind, NodeKind::Never)
        {
            node.annotations.description = decl.documentation.clone();
        }
        node
    }

    // =========================================================================
    // Types
    // =========================================================================

    fn type_node(&mut self, type_ref: &TypeRef) -> Result<SchemaNode> {
        match type_ref {
            TypeRef::Builtin(builtin) => self.value_node(Cursor::Builtin(*builtin), None),
            TypeRef::Named(reference) => {
                let id = self.table.target(reference, SymbolSpace::Type)?;
                self.reference_to(id)
            }
            TypeRef::Local(id) if self.keys.contains_key(id) => self.reference_to(*id),
            TypeRef::Local(id) => self.type_body(*id),
            TypeRef::Inline(decl) => Err(unhoisted(decl)),
        }
    }

    fn type_body(&mut self, id: DeclId) -> Result<SchemaNode> {
        let table = self.table;
        let decl = table.get(id);
        let node = match &decl.content {
            DeclContent::SimpleType(_) => self.value_node(Cursor::Decl(id), Some(id))?,
            DeclContent::ComplexType(def) => self.complex_type_node(id, def)?,
            _ => return Err(table.kind_mismatch(id, "a type")),
        };
        Ok(self.describe(node, decl))
    }

    // =========================================================================
    // Simple values
    // =========================================================================

    /// Follow restrictions (and simple content derivations) down to a
    /// built-in, list or union. Facet steps are returned most derived first.
    fn value_chain(&self, start: Cursor) -> Result<(ValueRoot, Vec<&'a [Facet]>)> {
        let table = self.table;
        let mut steps = Vec::new();
        let mut cursor = start;

        loop {
            let id = match cursor {
                Cursor::Builtin(builtin) => return Ok((ValueRoot::Builtin(builtin), steps)),
                Cursor::Decl(id) => id,
            };
            let decl = table.get(id);
            match &decl.content {
                DeclContent::SimpleType(SimpleTypeDef::Restriction { base, facets }) => {
                    steps.push(facets.as_slice());
                    cursor = type_cursor(table, base)?;
                }
                DeclContent::SimpleType(SimpleTypeDef::List { .. }) => {
                    return Ok((ValueRoot::List(id), steps))
                }
                DeclContent::SimpleType(SimpleTypeDef::Union { .. }) => {
                    return Ok((ValueRoot::Union(id), steps))
                }
                DeclContent::ComplexType(ComplexTypeDef {
                    content: ContentModel::Simple { base, facets, .. },
                    ..
                }) => {
                    steps.push(facets.as_slice());
                    cursor = type_cursor(table, base)?;
                }
                DeclContent::ComplexType(_) => {
                    return Err(Error::unsupported(
                        "simple content derived from a type with element content",
                        decl.describe(),
                        decl.location.clone(),
                    ))
                }
                _ => return Err(table.kind_mismatch(id, "a type")),
            }
        }
    }

    fn value_node(&mut self, start: Cursor, owner: Option<DeclId>) -> Result<SchemaNode> {
        let table = self.table;
        let (root, steps) = self.value_chain(start)?;
        let facets = FacetSet::from_steps(steps.iter().rev().copied());

        match root {
            ValueRoot::Builtin(builtin) => match builtin.list_item() {
                Some(item) => {
                    let item = self.scalar_node(item, FacetSet::new(), None)?;
                    self.list_node(item, facets, owner)
                }
                None => self.scalar_node(builtin, facets, owner),
            },
            ValueRoot::List(id) => {
                let DeclContent::SimpleType(SimpleTypeDef::List { item }) = &table.get(id).content
                else {
                    return Err(table.kind_mismatch(id, "a list type"));
                };
                let item = self.type_node(item)?;
                self.list_node(item, facets, owner)
            }
            ValueRoot::Union(id) => {
                let DeclContent::SimpleType(SimpleTypeDef::Union { members }) =
                    &table.get(id).content
                else {
                    return Err(table.kind_mismatch(id, "a union type"));
                };
                self.union_node(members, facets, owner)
            }
        }
    }

    /// JSON value kind of a simple value, when it has exactly one
    fn value_kind(&self, start: Cursor) -> Result<Option<ValueKind>> {
        let (root, _) = self.value_chain(start)?;
        match root {
            ValueRoot::Builtin(builtin) if builtin.is_any() || builtin.is_list() => Ok(None),
            ValueRoot::Builtin(builtin) => Ok(Some(builtin.value_kind())),
            ValueRoot::List(_) => Ok(None),
            ValueRoot::Union(id) => match &self.table.get(id).content {
                DeclContent::SimpleType(SimpleTypeDef::Union { members }) => {
                    self.union_value_kind(members)
                }
                _ => Ok(None),
            },
        }
    }

    fn union_value_kind(&self, members: &[TypeRef]) -> Result<Option<ValueKind>> {
        let mut kind = None;
        for member in members {
            let Some(member_kind) = self.value_kind(type_cursor(self.table, member)?)? else {
                return Ok(None);
            };
            match kind {
                None => kind = Some(member_kind),
                Some(previous) if previous != member_kind => return Ok(None),
                Some(_) => {}
            }
        }
        Ok(kind)
    }

    fn scalar_node(
        &mut self,
        builtin: BuiltinType,
        mut facets: FacetSet,
        owner: Option<DeclId>,
    ) -> Result<SchemaNode> {
        let present = facets.present();

        if builtin.is_any() {
            if present.is_empty() {
                return Ok(SchemaNode::new(if builtin == BuiltinType::AnyType {
                    NodeKind::Any
                } else {
                    NodeKind::AnyScalar
                }));
            }
            if present == ["enumeration"] {
                let values = facets
                    .enumeration
                    .unwrap_or_default()
                    .into_iter()
                    .map(Value::String)
                    .collect();
                return Ok(SchemaNode::new(NodeKind::Enum(values)));
            }
        }

        let kind = if builtin.is_any() {
            ValueKind::String
        } else {
            builtin.value_kind()
        };
        let allowed: &[&str] = match kind {
            ValueKind::String => &["pattern", "enumeration", "length", "minLength", "maxLength"],
            ValueKind::Number | ValueKind::Integer => &[
                "enumeration",
                "minInclusive",
                "maxInclusive",
                "minExclusive",
                "maxExclusive",
                "totalDigits",
                "fractionDigits",
            ],
            ValueKind::Boolean => &["enumeration"],
        };
        for name in present {
            if !allowed.contains(&name) {
                self.reject_facet(&mut facets, name, &builtin.to_string(), owner)?;
            }
        }

        let mut node = ScalarNode::new(scalar_type(kind));
        node.format = builtin.format().map(str::to_string);
        match facets.combined_pattern() {
            Ok(pattern) => node.pattern = pattern,
            Err(unsupported) => {
                let target = format!("{} ({})", builtin, unsupported);
                self.reject_facet(&mut facets, "pattern", &target, owner)?;
            }
        }
        if let Some(values) = &facets.enumeration {
            node.enumeration = Some(
                values
                    .iter()
                    .map(|v| {
                        typed_value(Some(kind), v).ok_or_else(|| {
                            self.malformed(
                                owner,
                                format!("enumeration value '{}' is not a valid {}", v, builtin),
                            )
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
            );
        }
        let (min_length, max_length) = facets.length_range();
        node.min_length = min_length;
        node.max_length = max_length;

        if matches!(kind, ValueKind::Number | ValueKind::Integer) {
            self.numeric_bounds(builtin, &facets, owner, &mut node)?;
            if kind == ValueKind::Number {
                node.multiple_of = facets
                    .fraction_digits
                    .filter(|n| *n <= 28)
                    .map(|n| Decimal::new(1, n));
            }
        }

        Ok(SchemaNode::new(NodeKind::Scalar(node)))
    }

    fn numeric_bounds(
        &self,
        builtin: BuiltinType,
        facets: &FacetSet,
        owner: Option<DeclId>,
        node: &mut ScalarNode,
    ) -> Result<()> {
        let mut range = Range::default();

        let (low, high) = builtin.implied_bounds();
        if let Some(low) = low {
            range.raise_lower(Bound::inclusive(Decimal::from_i128_with_scale(low, 0)));
        }
        if let Some(high) = high {
            range.lower_upper(Bound::inclusive(Decimal::from_i128_with_scale(high, 0)));
        }

        if let Some(v) = &facets.min_inclusive {
            if let Some(d) = self.parse_decimal("minInclusive", v, owner)? {
                range.raise_lower(Bound::inclusive(d));
            }
        }
        if let Some(v) = &facets.min_exclusive {
            if let Some(d) = self.parse_decimal("minExclusive", v, owner)? {
                range.raise_lower(Bound::exclusive(d));
            }
        }
        if let Some(v) = &facets.max_inclusive {
            if let Some(d) = self.parse_decimal("maxInclusive", v, owner)? {
                range.lower_upper(Bound::inclusive(d));
            }
        }
        if let Some(v) = &facets.max_exclusive {
            if let Some(d) = self.parse_decimal("maxExclusive", v, owner)? {
                range.lower_upper(Bound::exclusive(d));
            }
        }
        if let Some(limit) = facets.total_digits.and_then(power_of_ten) {
            range.raise_lower(Bound::exclusive(-limit));
            range.lower_upper(Bound::exclusive(limit));
        }

        range.apply(node);
        Ok(())
    }

    fn list_node(
        &mut self,
        item: SchemaNode,
        mut facets: FacetSet,
        owner: Option<DeclId>,
    ) -> Result<SchemaNode> {
        for name in facets.present() {
            if !matches!(name, "length" | "minLength" | "maxLength") {
                self.reject_facet(&mut facets, name, "a list type", owner)?;
            }
        }
        let (min, max) = facets.length_range();
        Ok(SchemaNode::array(
            item,
            min.map_or(0, saturate),
            max.map(saturate),
        ))
    }

    fn union_node(
        &mut self,
        members: &'a [TypeRef],
        mut facets: FacetSet,
        owner: Option<DeclId>,
    ) -> Result<SchemaNode> {
        for name in facets.present() {
            if name != "enumeration" {
                self.reject_facet(&mut facets, name, "a union type", owner)?;
            }
        }

        if let Some(values) = facets.enumeration.take() {
            if let Some(kind) = self.union_value_kind(members)? {
                let typed: Option<Vec<Value>> =
                    values.iter().map(|v| typed_value(Some(kind), v)).collect();
                if let Some(typed) = typed {
                    let mut node = ScalarNode::new(scalar_type(kind));
                    node.enumeration = Some(typed);
                    return Ok(SchemaNode::new(NodeKind::Scalar(node)));
                }
            }
            return Ok(SchemaNode::new(NodeKind::Enum(
                values.into_iter().map(Value::String).collect(),
            )));
        }

        let mut nodes = Vec::with_capacity(members.len());
        for member in members {
            nodes.push(self.type_node(member)?);
        }
        if nodes.len() == 1 {
            return Ok(nodes.remove(0));
        }
        Ok(SchemaNode::new(match self.options.union_style() {
            UnionStyle::OneOf => NodeKind::OneOf(nodes),
            UnionStyle::AnyOf => NodeKind::AnyOf(nodes),
        }))
    }

    fn reject_facet(
        &self,
        facets: &mut FacetSet,
        name: &str,
        target: &str,
        owner: Option<DeclId>,
    ) -> Result<()> {
        let (declaration, location) = match owner {
            Some(id) => {
                let decl = self.table.get(id);
                (decl.describe(), decl.location.clone())
            }
            None => (target.to_string(), SourceLocation::document("")),
        };
        if self.options.lenient_facets() {
            warn!(
                facet = name,
                %declaration,
                "dropping {} facet not applicable to {}",
                name,
                target
            );
            clear_facet(facets, name);
            Ok(())
        } else {
            Err(Error::unsupported(
                format!("{} facet on {}", name, target),
                declaration,
                location,
            ))
        }
    }

    fn parse_decimal(
        &self,
        facet: &str,
        value: &str,
        owner: Option<DeclId>,
    ) -> Result<Option<Decimal>> {
        let value = value.trim();
        if matches!(value, "INF" | "+INF" | "-INF" | "NaN") {
            return Ok(None);
        }
        Decimal::from_str(value)
            .or_else(|_| Decimal::from_scientific(value))
            .map(Some)
            .map_err(|_| {
                self.malformed(owner, format!("{} value '{}' is not a number", facet, value))
            })
    }

    fn malformed(&self, owner: Option<DeclId>, message: String) -> Error {
        let error = ParseError::new(message);
        match owner {
            Some(id) => error.with_location(self.table.get(id).location.clone()).into(),
            None => error.into(),
        }
    }

    // =========================================================================
    // Complex types
    // =========================================================================

    fn complex_type_node(&mut self, id: DeclId, def: &'a ComplexTypeDef) -> Result<SchemaNode> {
        if !matches!(def.content, ContentModel::Simple { .. }) {
            return Ok(SchemaNode::new(NodeKind::Object(self.complex_shape(id)?)));
        }

        let value = self.value_node(Cursor::Decl(id), Some(id))?;
        let mut attributes = ObjectNode::default();
        self.collect_attributes(id, &mut attributes)?;
        if attributes.properties.is_empty() && !attributes.additional_properties {
            return Ok(value);
        }

        let mut object = ObjectNode::default();
        object.insert(self.options.text_key(), value, true);
        object.merge(attributes);
        Ok(SchemaNode::new(NodeKind::Object(object)))
    }

    fn complex_shape(&mut self, id: DeclId) -> Result<ObjectNode> {
        let table = self.table;
        let decl = table.get(id);
        let DeclContent::ComplexType(def) = &decl.content else {
            return Err(table.kind_mismatch(id, "a complex type"));
        };

        let mut shape = Shape::default();
        match &def.content {
            ContentModel::Complex(Some(Derivation {
                base,
                method: DerivationMethod::Extension,
            })) => {
                match type_cursor(table, base)? {
                    Cursor::Builtin(BuiltinType::AnyType) => {
                        shape.object.additional_properties = true
                    }
                    Cursor::Builtin(builtin) => {
                        return Err(Error::unsupported(
                            format!("complex content extension of {}", builtin),
                            decl.describe(),
                            decl.location.clone(),
                        ))
                    }
                    Cursor::Decl(base_id) => shape.object = self.complex_shape(base_id)?,
                }
                self.add_content(&mut shape, def.particle.as_ref(), id)?;
                self.apply_attribute_uses(&def.attributes, &mut shape.object)?;
            }
            ContentModel::Complex(Some(Derivation {
                base,
                method: DerivationMethod::Restriction,
            })) => {
                self.add_content(&mut shape, def.particle.as_ref(), id)?;
                if let Some(base_id) = complex_base(table, base)? {
                    self.collect_attributes(base_id, &mut shape.object)?;
                }
                self.apply_attribute_uses(&def.attributes, &mut shape.object)?;
            }
            ContentModel::Complex(None) | ContentModel::Empty => {
                self.add_content(&mut shape, def.particle.as_ref(), id)?;
                self.apply_attribute_uses(&def.attributes, &mut shape.object)?;
            }
            ContentModel::Simple { .. } => {
                return Err(Error::unsupported(
                    "element content derived from simple content",
                    decl.describe(),
                    decl.location.clone(),
                ))
            }
        }

        if def.mixed {
            match self.options.mixed_content() {
                MixedContent::Reject => {
                    return Err(Error::unsupported(
                        "mixed content",
                        decl.describe(),
                        decl.location.clone(),
                    ))
                }
                MixedContent::TextProperty => {
                    let key = self.options.text_key();
                    if !shape.object.properties.contains_key(key) {
                        shape
                            .object
                            .insert(key, SchemaNode::scalar(ScalarType::String), false);
                    }
                }
            }
        }

        Ok(shape.object)
    }

    /// Attributes of a complex type including the ones inherited from its
    /// base types
    fn collect_attributes(&mut self, id: DeclId, object: &mut ObjectNode) -> Result<()> {
        let table = self.table;
        let DeclContent::ComplexType(def) = &table.get(id).content else {
            return Ok(());
        };
        let base = match &def.content {
            ContentModel::Simple { base, .. } => complex_base(table, base)?,
            ContentModel::Complex(Some(derivation)) => complex_base(table, &derivation.base)?,
            ContentModel::Complex(None) | ContentModel::Empty => None,
        };
        if let Some(base) = base {
            self.collect_attributes(base, object)?;
        }
        self.apply_attribute_uses(&def.attributes, object)
    }

    fn apply_attribute_uses(
        &mut self,
        uses: &'a AttributeUses,
        object: &mut ObjectNode,
    ) -> Result<()> {
        let table = self.table;

        for attribute_use in &uses.uses {
            let id = decl_ref_id(table, &attribute_use.decl, SymbolSpace::Attribute)?;
            let decl = table.get(id);
            let DeclContent::Attribute(attribute) = &decl.content else {
                return Err(table.kind_mismatch(id, "an attribute"));
            };
            let name = format!(
                "{}{}",
                self.options.attribute_prefix(),
                attribute.name.local_name
            );
            if attribute_use.use_kind == AttributeUseKind::Prohibited {
                object.remove(&name);
                continue;
            }
            let node = self.attribute_node(decl, attribute, attribute_use)?;
            object.insert(
                name,
                node,
                attribute_use.use_kind == AttributeUseKind::Required,
            );
        }

        for group in &uses.groups {
            let id = table.target(group, SymbolSpace::AttributeGroup)?;
            let DeclContent::AttributeGroup(def) = &table.get(id).content else {
                return Err(table.kind_mismatch(id, "an attribute group"));
            };
            self.apply_attribute_uses(&def.attributes, object)?;
        }

        if uses.wildcard.is_some() {
            object.additional_properties = true;
        }
        Ok(())
    }

    fn attribute_node(
        &mut self,
        decl: &'a Declaration,
        attribute: &'a AttributeDecl,
        attribute_use: &'a AttributeUse,
    ) -> Result<SchemaNode> {
        let (mut node, kind) = match &attribute.type_ref {
            Some(type_ref) => (
                self.type_node(type_ref)?,
                self.value_kind(type_cursor(self.table, type_ref)?)?,
            ),
            None => (SchemaNode::new(NodeKind::AnyScalar), None),
        };

        if let Some(fixed) = attribute_use.fixed.as_ref().or(attribute.fixed.as_ref()) {
            node.annotations.const_value = Some(value_or_string(kind, fixed));
        } else if let Some(default) =
            attribute_use.default.as_ref().or(attribute.default.as_ref())
        {
            node.annotations.default = Some(value_or_string(kind, default));
        }
        Ok(self.describe(node, decl))
    }

    // =========================================================================
    // Content models
    // =========================================================================

    fn add_content(
        &mut self,
        shape: &mut Shape,
        particle: Option<&'a Particle>,
        owner: DeclId,
    ) -> Result<()> {
        let Some(particle) = particle else {
            return Ok(());
        };
        match expand_particle(self.table, particle)? {
            Some(content) => self.add_particle(shape, &content, false, owner),
            None => Ok(()),
        }
    }

    fn add_particle(
        &mut self,
        shape: &mut Shape,
        particle: &ContentParticle,
        optional: bool,
        owner: DeclId,
    ) -> Result<()> {
        match particle {
            ContentParticle::Element { decl, occurs } => {
                self.add_element(shape, *decl, *occurs, optional)
            }
            ContentParticle::Wildcard { location, .. } => {
                if self.options.allow_wildcards() {
                    shape.object.additional_properties = true;
                    Ok(())
                } else {
                    Err(Error::unsupported(
                        "element wildcard (xs:any)",
                        self.table.get(owner).describe(),
                        location.clone(),
                    ))
                }
            }
            ContentParticle::Compositor {
                kind,
                occurs,
                children,
                origin,
            } => {
                if !occurs.is_multiple() {
                    return self.add_group(
                        shape,
                        *kind,
                        children,
                        optional || occurs.is_emptiable(),
                        owner,
                    );
                }

                let mut items = Shape::default();
                self.add_group(&mut items, *kind, children, false, owner)?;
                let base = origin
                    .as_ref()
                    .map(|name| name.local_name.clone())
                    .unwrap_or_else(|| kind.as_str().to_string());
                let key = unique_property(&shape.object, base);
                let min = if optional { 0 } else { occurs.min };
                let node = SchemaNode::array(
                    SchemaNode::new(NodeKind::Object(items.object)),
                    min,
                    occurs.max,
                );
                shape.object.insert(key, node, min > 0);
                Ok(())
            }
        }
    }

    fn add_group(
        &mut self,
        shape: &mut Shape,
        kind: Compositor,
        children: &[ContentParticle],
        optional: bool,
        owner: DeclId,
    ) -> Result<()> {
        match kind {
            Compositor::Sequence | Compositor::All => {
                for child in children {
                    self.add_particle(shape, child, optional, owner)?;
                }
                Ok(())
            }
            Compositor::Choice => self.add_choice(shape, children, optional, owner),
        }
    }

    fn add_choice(
        &mut self,
        shape: &mut Shape,
        children: &[ContentParticle],
        optional: bool,
        owner: DeclId,
    ) -> Result<()> {
        if children.is_empty() {
            return Ok(());
        }

        let optional_elements = children.iter().all(|c| {
            matches!(c, ContentParticle::Element { occurs, .. } if occurs.is_emptiable())
        });
        if optional_elements {
            for child in children {
                if let ContentParticle::Element { decl, occurs } = child {
                    self.add_element(shape, *decl, *occurs, true)?;
                }
            }
            return Ok(());
        }

        let mut branches = Vec::with_capacity(children.len());
        for child in children {
            let mut branch = Shape::default();
            self.add_particle(&mut branch, child, false, owner)?;
            branches.push(branch.object);
        }

        let mut names: Vec<String> = Vec::new();
        for branch in &branches {
            for name in branch.properties.keys() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }

        for name in &names {
            let mut declared: Option<&SchemaNode> = None;
            let mut agree = true;
            for branch in &branches {
                if let Some(node) = branch.properties.get(name) {
                    match declared {
                        None => declared = Some(node),
                        Some(previous) if previous != node => agree = false,
                        Some(_) => {}
                    }
                }
            }
            let node = match declared {
                Some(node) if agree => node.clone(),
                _ => SchemaNode::any(),
            };
            if !shape.object.properties.contains_key(name) {
                shape.object.insert(name.clone(), node, false);
            }
        }

        if branches.iter().any(|b| b.additional_properties) {
            shape.object.additional_properties = true;
        }

        let mut alternatives: Vec<SchemaNode> = branches
            .into_iter()
            .map(|mut branch| {
                for name in &names {
                    if !branch.properties.contains_key(name) {
                        branch.insert(name.clone(), SchemaNode::never(), false);
                    }
                }
                branch.additional_properties = true;
                SchemaNode::new(NodeKind::Object(branch))
            })
            .collect();

        if optional && !children.iter().any(ContentParticle::is_emptiable) {
            let mut none = ObjectNode {
                additional_properties: true,
                ..ObjectNode::default()
            };
            for name in &names {
                none.insert(name.clone(), SchemaNode::never(), false);
            }
            alternatives.push(SchemaNode::new(NodeKind::Object(none)));
        }

        shape.object.alternatives.push(alternatives);
        Ok(())
    }

    fn add_element(
        &mut self,
        shape: &mut Shape,
        decl: DeclId,
        occurs: Occurs,
        optional: bool,
    ) -> Result<()> {
        let name = self.table.element(decl)?.name.local_name.clone();
        let node = self.element_node(decl)?;
        let effective = if optional { occurs.relaxed() } else { occurs };
        insert_element(shape, name, node, effective, occurs.is_multiple());
        Ok(())
    }

    // =========================================================================
    // Elements
    // =========================================================================

    fn element_node(&mut self, id: DeclId) -> Result<SchemaNode> {
        if self.table.get(id).is_named() {
            self.reference_to(id)
        } else {
            self.element_body(id)
        }
    }

    fn element_body(&mut self, id: DeclId) -> Result<SchemaNode> {
        let table = self.table;
        let decl = table.get(id);
        let element = table.element(id)?;
        let type_ref = self.element_type(id)?;

        let mut node = match type_ref {
            Some(type_ref) => self.type_node(type_ref)?,
            None => SchemaNode::any(),
        };

        if element.fixed.is_some() || element.default.is_some() {
            match type_ref {
                Some(type_ref) if is_value_type(table, type_ref) => {
                    let kind = self.value_kind(type_cursor(table, type_ref)?)?;
                    if let Some(fixed) = &element.fixed {
                        node.annotations.const_value = Some(value_or_string(kind, fixed));
                    } else if let Some(default) = &element.default {
                        node.annotations.default = Some(value_or_string(kind, default));
                    }
                }
                None => {
                    let value = element.fixed.as_ref().or(element.default.as_ref());
                    if let Some(value) = value {
                        let value = Value::String(value.clone());
                        if element.fixed.is_some() {
                            node.annotations.const_value = Some(value);
                        } else {
                            node.annotations.default = Some(value);
                        }
                    }
                }
                Some(_) => debug!(
                    element = %decl.display_name(),
                    "ignoring default/fixed value of an element with complex type"
                ),
            }
        }

        if element.nillable {
            node = SchemaNode::new(NodeKind::OneOf(vec![
                node,
                SchemaNode::scalar(ScalarType::Null),
            ]));
        }

        Ok(self.describe(node, decl))
    }

    /// Declared type, or the type of the nearest substitution head that has one
    fn element_type(&self, id: DeclId) -> Result<Option<&'a TypeRef>> {
        let table = self.table;
        let mut current = id;
        let mut seen = HashSet::new();
        loop {
            let element = table.element(current)?;
            if let Some(type_ref) = &element.type_ref {
                return Ok(Some(type_ref));
            }
            match &element.substitution_group {
                Some(head) if seen.insert(current) => {
                    current = table.target(head, SymbolSpace::Element)?;
                }
                _ => return Ok(None),
            }
        }
    }
}

// =============================================================================
// Anonymous type promotion
// =============================================================================

/// Anonymous types whose owning local element or attribute appears more
/// than once across the expanded content models
fn promoted_types(table: &SymbolTable) -> Result<HashSet<DeclId>> {
    let mut counts: HashMap<DeclId, usize> = HashMap::new();
    for (id, decl) in table.iter() {
        if matches!(decl.content, DeclContent::ComplexType(_)) {
            count_particles(table, id, &mut counts)?;
            count_attributes(table, id, &mut counts)?;
        }
    }

    let mut promoted = HashSet::new();
    for (id, decl) in table.iter() {
        let type_ref = match &decl.content {
            DeclContent::Element(element) => element.type_ref.as_ref(),
            DeclContent::Attribute(attribute) => attribute.type_ref.as_ref(),
            _ => None,
        };
        if let Some(TypeRef::Local(anonymous)) = type_ref {
            if !decl.is_named() && counts.get(&id).copied().unwrap_or(0) > 1 {
                debug!(owner = %decl.display_name(), "promoting anonymous type to a definition");
                promoted.insert(*anonymous);
            }
        }
    }
    Ok(promoted)
}

fn count_particles(
    table: &SymbolTable,
    id: DeclId,
    counts: &mut HashMap<DeclId, usize>,
) -> Result<()> {
    let DeclContent::ComplexType(def) = &table.get(id).content else {
        return Ok(());
    };
    if let ContentModel::Complex(Some(Derivation {
        base,
        method: DerivationMethod::Extension,
    })) = &def.content
    {
        if let Some(base) = complex_base(table, base)? {
            count_particles(table, base, counts)?;
        }
    }
    if let Some(particle) = &def.particle {
        if let Some(content) = expand_particle(table, particle)? {
            count_content(table, &content, counts);
        }
    }
    Ok(())
}

fn count_content(
    table: &SymbolTable,
    content: &ContentParticle,
    counts: &mut HashMap<DeclId, usize>,
) {
    match content {
        ContentParticle::Element { decl, .. } => {
            if !table.get(*decl).is_named() {
                *counts.entry(*decl).or_insert(0) += 1;
            }
        }
        ContentParticle::Compositor { children, .. } => {
            for child in children {
                count_content(table, child, counts);
            }
        }
        ContentParticle::Wildcard { .. } => {}
    }
}

fn count_attributes(
    table: &SymbolTable,
    id: DeclId,
    counts: &mut HashMap<DeclId, usize>,
) -> Result<()> {
    let DeclContent::ComplexType(def) = &table.get(id).content else {
        return Ok(());
    };
    let base = match &def.content {
        ContentModel::Simple { base, .. } => complex_base(table, base)?,
        ContentModel::Complex(Some(derivation)) => complex_base(table, &derivation.base)?,
        ContentModel::Complex(None) | ContentModel::Empty => None,
    };
    if let Some(base) = base {
        count_attributes(table, base, counts)?;
    }
    count_attribute_uses(table, &def.attributes, counts)
}

fn count_attribute_uses(
    table: &SymbolTable,
    uses: &AttributeUses,
    counts: &mut HashMap<DeclId, usize>,
) -> Result<()> {
    for attribute_use in &uses.uses {
        if let DeclRef::Local(id) = &attribute_use.decl {
            *counts.entry(*id).or_insert(0) += 1;
        }
    }
    for group in &uses.groups {
        let id = table.target(group, SymbolSpace::AttributeGroup)?;
        if let DeclContent::AttributeGroup(def) = &table.get(id).content {
            count_attribute_uses(table, &def.attributes, counts)?;
        }
    }
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn type_cursor(table: &SymbolTable, type_ref: &TypeRef) -> Result<Cursor> {
    match type_ref {
        TypeRef::Builtin(builtin) => Ok(Cursor::Builtin(*builtin)),
        TypeRef::Named(reference) => Ok(Cursor::Decl(table.target(reference, SymbolSpace::Type)?)),
        TypeRef::Local(id) => Ok(Cursor::Decl(*id)),
        TypeRef::Inline(decl) => Err(unhoisted(decl)),
    }
}

/// Base type of a derivation when it is a complex type
fn complex_base(table: &SymbolTable, base: &TypeRef) -> Result<Option<DeclId>> {
    Ok(match type_cursor(table, base)? {
        Cursor::Decl(id) if matches!(table.get(id).content, DeclContent::ComplexType(_)) => {
            Some(id)
        }
        _ => None,
    })
}

fn decl_ref_id(table: &SymbolTable, decl_ref: &DeclRef, space: SymbolSpace) -> Result<DeclId> {
    match decl_ref {
        DeclRef::Named(reference) => table.target(reference, space),
        DeclRef::Local(id) => Ok(*id),
        DeclRef::Inline(decl) => Err(unhoisted(decl)),
    }
}

fn unhoisted(decl: &Declaration) -> Error {
    ParseError::new(format!(
        "{} was not registered in the symbol table",
        decl.describe()
    ))
    .with_location(decl.location.clone())
    .into()
}

/// Whether values of the type are plain scalars (so default/fixed apply)
fn is_value_type(table: &SymbolTable, type_ref: &TypeRef) -> bool {
    match type_ref {
        TypeRef::Builtin(builtin) => *builtin != BuiltinType::AnyType,
        TypeRef::Named(reference) => reference
            .target
            .map_or(false, |id| matches!(table.get(id).content, DeclContent::SimpleType(_))),
        TypeRef::Local(id) => matches!(table.get(*id).content, DeclContent::SimpleType(_)),
        TypeRef::Inline(_) => false,
    }
}

fn insert_element(shape: &mut Shape, name: String, node: SchemaNode, occurs: Occurs, array: bool) {
    let previous = shape
        .occurs
        .get(&name)
        .copied()
        .filter(|_| shape.object.properties.contains_key(&name));
    let (occurs, array) = match previous {
        Some(previous) => (previous.add(occurs), true),
        None => (occurs, array),
    };

    let value = if array {
        SchemaNode::array(node, occurs.min, occurs.max)
    } else {
        node
    };
    shape.object.insert(name.clone(), value, occurs.min > 0);
    shape.occurs.insert(name, occurs);
}

fn unique_key(used: &mut HashSet<String>, base: String, suffix: &str) -> String {
    let key = if !used.contains(&base) {
        base
    } else {
        let qualified = format!("{}_{}", base, suffix);
        if !used.contains(&qualified) {
            qualified
        } else {
            (2..)
                .map(|n| format!("{}_{}", qualified, n))
                .find(|candidate| !used.contains(candidate))
                .unwrap_or(qualified)
        }
    };
    used.insert(key.clone());
    key
}

fn unique_property(object: &ObjectNode, base: String) -> String {
    if !object.properties.contains_key(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !object.properties.contains_key(candidate))
        .unwrap_or(base)
}

fn scalar_type(kind: ValueKind) -> ScalarType {
    match kind {
        ValueKind::String => ScalarType::String,
        ValueKind::Number => ScalarType::Number,
        ValueKind::Integer => ScalarType::Integer,
        ValueKind::Boolean => ScalarType::Boolean,
    }
}

/// A lexical value as JSON, typed by the value kind of its simple type
fn typed_value(kind: Option<ValueKind>, text: &str) -> Option<Value> {
    let trimmed = text.trim();
    match kind {
        None | Some(ValueKind::String) => Some(Value::String(text.to_string())),
        Some(ValueKind::Boolean) => match trimmed {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        Some(ValueKind::Integer) => Decimal::from_str(trimmed)
            .ok()
            .filter(|d| d.fract().is_zero())
            .map(decimal_value),
        Some(ValueKind::Number) => Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .ok()
            .map(decimal_value),
    }
}

fn value_or_string(kind: Option<ValueKind>, text: &str) -> Value {
    typed_value(kind, text).unwrap_or_else(|| Value::String(text.to_string()))
}

fn clear_facet(facets: &mut FacetSet, name: &str) {
    match name {
        "pattern" => facets.pattern_steps.clear(),
        "enumeration" => facets.enumeration = None,
        "minInclusive" => facets.min_inclusive = None,
        "maxInclusive" => facets.max_inclusive = None,
        "minExclusive" => facets.min_exclusive = None,
        "maxExclusive" => facets.max_exclusive = None,
        "length" => facets.length = None,
        "minLength" => facets.min_length = None,
        "maxLength" => facets.max_length = None,
        "totalDigits" => facets.total_digits = None,
        "fractionDigits" => facets.fraction_digits = None,
        _ => {}
    }
}

fn power_of_ten(exponent: u32) -> Option<Decimal> {
    let mut value = Decimal::ONE;
    for _ in 0..exponent {
        value = value.checked_mul(Decimal::TEN)?;
    }
    Some(value)
}

fn saturate(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

// =============================================================================
// Numeric ranges
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct Bound {
    value: Decimal,
    exclusive: bool,
}

impl Bound {
    fn inclusive(value: Decimal) -> Self {
        Self {
            value,
            exclusive: false,
        }
    }

    fn exclusive(value: Decimal) -> Self {
        Self {
            value,
            exclusive: true,
        }
    }
}

/// Lower and upper bound, each keeping the tighter of the candidates
#[derive(Debug, Default)]
struct Range {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

impl Range {
    fn raise_lower(&mut self, bound: Bound) {
        let tighter = match self.lower {
            None => true,
            Some(current) => {
                bound.value > current.value || (bound.value == current.value && bound.exclusive)
            }
        };
        if tighter {
            self.lower = Some(bound);
        }
    }

    fn lower_upper(&mut self, bound: Bound) {
        let tighter = match self.upper {
            None => true,
            Some(current) => {
                bound.value < current.value || (bound.value == current.value && bound.exclusive)
            }
        };
        if tighter {
            self.upper = Some(bound);
        }
    }

    fn apply(&self, node: &mut ScalarNode) {
        if let Some(lower) = self.lower {
            if lower.exclusive {
                node.exclusive_minimum = Some(lower.value);
            } else {
                node.minimum = Some(lower.value);
            }
        }
        if let Some(upper) = self.upper {
            if upper.exclusive {
                node.exclusive_maximum = Some(upper.value);
            } else {
                node.maximum = Some(upper.value);
            }
        }
    }
}

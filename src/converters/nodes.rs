//! JSON Schema model
//!
//! Draft-neutral tree produced by the translator and serialized by the
//! [`Emitter`](super::Emitter).

use indexmap::IndexMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Number, Value};

/// Annotations attached to any node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    /// `description`
    pub description: Option<String>,
    /// `default`
    pub default: Option<Value>,
    /// `const`
    pub const_value: Option<Value>,
}

impl Annotations {
    /// Whether no annotation is set
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.default.is_none() && self.const_value.is_none()
    }
}

/// A JSON Schema node
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    /// Shape of the node
    pub kind: NodeKind,
    /// Annotations
    pub annotations: Annotations,
}

impl SchemaNode {
    /// A node without annotations
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            annotations: Annotations::default(),
        }
    }

    /// Accept any value
    pub fn any() -> Self {
        Self::new(NodeKind::Any)
    }

    /// Accept nothing
    pub fn never() -> Self {
        Self::new(NodeKind::Never)
    }

    /// Reference to a definitions entry
    pub fn reference(key: impl Into<String>) -> Self {
        Self::new(NodeKind::Ref(key.into()))
    }

    /// A scalar of the given type with no constraints
    pub fn scalar(scalar_type: ScalarType) -> Self {
        Self::new(NodeKind::Scalar(ScalarNode::new(scalar_type)))
    }

    /// An array of `items`
    pub fn array(items: SchemaNode, min_items: u32, max_items: Option<u32>) -> Self {
        Self::new(NodeKind::Array(ArrayNode {
            items: Box::new(items),
            min_items,
            max_items,
        }))
    }

    /// Set the description
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.annotations.description = description;
        self
    }

    /// Whether the node is the unconstrained `{}`
    pub fn is_any(&self) -> bool {
        matches!(self.kind, NodeKind::Any) && self.annotations.is_empty()
    }
}

/// Shape of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// `type: object`
    Object(ObjectNode),
    /// `type: array`
    Array(ArrayNode),
    /// A string, number, integer, boolean or null
    Scalar(ScalarNode),
    /// Any string, number or boolean
    AnyScalar,
    /// A bare enumeration of values of mixed type
    Enum(Vec<Value>),
    /// `oneOf`
    OneOf(Vec<SchemaNode>),
    /// `anyOf`
    AnyOf(Vec<SchemaNode>),
    /// `$ref` to a definitions key
    Ref(String),
    /// `{}`
    Any,
    /// `false`
    Never,
}

/// An object shape
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectNode {
    /// Properties in declaration order
    pub properties: IndexMap<String, SchemaNode>,
    /// Required property names
    pub required: Vec<String>,
    /// Whether undeclared properties are allowed
    pub additional_properties: bool,
    /// `minProperties`
    pub min_properties: Option<u32>,
    /// `maxProperties`
    pub max_properties: Option<u32>,
    /// Groups of alternatives; the object must match one branch of every group
    pub alternatives: Vec<Vec<SchemaNode>>,
}

impl ObjectNode {
    /// Add a property, replacing an existing one of the same name
    pub fn insert(&mut self, name: impl Into<String>, node: SchemaNode, required: bool) {
        let name = name.into();
        self.required.retain(|r| r != &name);
        if required {
            self.required.push(name.clone());
        }
        self.properties.insert(name, node);
    }

    /// Remove a property
    pub fn remove(&mut self, name: &str) {
        self.properties.shift_remove(name);
        self.required.retain(|r| r != name);
    }

    /// Whether the property is required
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Overlay `other` onto this object; properties of `other` win
    pub fn merge(&mut self, other: ObjectNode) {
        let ObjectNode {
            properties,
            required,
            additional_properties,
            min_properties: _,
            max_properties: _,
            alternatives,
        } = other;
        for (name, node) in properties {
            let is_required = required.contains(&name);
            self.insert(name, node, is_required);
        }
        self.additional_properties |= additional_properties;
        self.alternatives.extend(alternatives);
    }
}

/// An array shape
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayNode {
    /// Schema of every item
    pub items: Box<SchemaNode>,
    /// `minItems`
    pub min_items: u32,
    /// `maxItems`; None is unbounded
    pub max_items: Option<u32>,
}

/// JSON primitive type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// `string`
    String,
    /// `number`
    Number,
    /// `integer`
    Integer,
    /// `boolean`
    Boolean,
    /// `null`
    Null,
}

impl ScalarType {
    /// JSON Schema type name
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Number => "number",
            ScalarType::Integer => "integer",
            ScalarType::Boolean => "boolean",
            ScalarType::Null => "null",
        }
    }
}

/// A scalar shape with its constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarNode {
    /// Primitive type
    pub scalar_type: ScalarType,
    /// `format`
    pub format: Option<String>,
    /// `pattern`
    pub pattern: Option<String>,
    /// `enum`
    pub enumeration: Option<Vec<Value>>,
    /// `minimum`
    pub minimum: Option<Decimal>,
    /// `maximum`
    pub maximum: Option<Decimal>,
    /// `exclusiveMinimum`
    pub exclusive_minimum: Option<Decimal>,
    /// `exclusiveMaximum`
    pub exclusive_maximum: Option<Decimal>,
    /// `minLength`
    pub min_length: Option<u64>,
    /// `maxLength`
    pub max_length: Option<u64>,
    /// `multipleOf`
    pub multiple_of: Option<Decimal>,
}

impl ScalarNode {
    /// An unconstrained scalar
    pub fn new(scalar_type: ScalarType) -> Self {
        Self {
            scalar_type,
            format: None,
            pattern: None,
            enumeration: None,
            minimum: None,
            maximum: None,
            exclusive_minimum: None,
            exclusive_maximum: None,
            min_length: None,
            max_length: None,
            multiple_of: None,
        }
    }
}

/// A complete translated schema
#[derive(Debug, Clone, PartialEq)]
pub struct JsonSchemaDocument {
    /// Document title
    pub title: Option<String>,
    /// The root object
    pub root: SchemaNode,
    /// Definitions by key, in symbol table order
    pub definitions: IndexMap<String, SchemaNode>,
}

/// JSON number for a decimal, integral when the value has no fraction
pub fn decimal_value(value: Decimal) -> Value {
    let value = value.normalize();
    if value.scale() == 0 {
        if let Some(i) = value.to_i64() {
            return Value::from(i);
        }
        if let Some(u) = value.to_u64() {
            return Value::from(u);
        }
    }
    value
        .to_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_value() {
        assert_eq!(decimal_value(Decimal::new(2550, 1)), Value::from(255));
        assert_eq!(decimal_value(Decimal::new(-5, 0)), Value::from(-5));
        assert_eq!(decimal_value(Decimal::new(1, 2)), serde_json::json!(0.01));
        assert_eq!(
            decimal_value(Decimal::from(u64::MAX)),
            Value::from(u64::MAX)
        );
    }

    #[test]
    fn test_insert_replaces_and_tracks_required() {
        let mut object = ObjectNode::default();
        object.insert("a", SchemaNode::scalar(ScalarType::String), true);
        object.insert("a", SchemaNode::scalar(ScalarType::Integer), false);

        assert_eq!(object.properties.len(), 1);
        assert!(!object.is_required("a"));
        assert_eq!(object.properties["a"], SchemaNode::scalar(ScalarType::Integer));
    }

    #[test]
    fn test_merge_keeps_base_order() {
        let mut base = ObjectNode::default();
        base.insert("a", SchemaNode::any(), true);
        base.insert("b", SchemaNode::any(), false);

        let mut own = ObjectNode::default();
        own.insert("c", SchemaNode::any(), true);
        own.insert("b", SchemaNode::scalar(ScalarType::Boolean), true);
        base.merge(own);

        let names: Vec<_> = base.properties.keys().cloned().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(base.required, vec!["a", "c", "b"]);
    }
}

//! JSON Schema emitter
//!
//! Serializes a [`JsonSchemaDocument`] for one JSON Schema draft. Keyword
//! order is fixed so that the same model always produces the same text.

use serde_json::{json, Map, Value};

use crate::error::Result;

use super::config::{ConversionOptions, Draft};
use super::nodes::{
    decimal_value, Annotations, ArrayNode, JsonSchemaDocument, NodeKind, ObjectNode, ScalarNode,
    SchemaNode,
};

/// Serializer for translated schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emitter {
    draft: Draft,
    pretty: bool,
}

impl Emitter {
    /// Create an emitter producing indented output
    pub fn new(draft: Draft) -> Self {
        Self {
            draft,
            pretty: true,
        }
    }

    /// Emitter configured from conversion options
    pub fn from_options(options: &ConversionOptions) -> Self {
        Self::new(options.draft()).with_pretty(options.pretty())
    }

    /// Set indented or compact output
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Target draft
    pub fn draft(&self) -> Draft {
        self.draft
    }

    /// Build the schema as a JSON value
    pub fn to_value(&self, document: &JsonSchemaDocument) -> Value {
        let mut out = Map::new();
        out.insert("$schema".into(), Value::from(self.draft.schema_uri()));
        if let Some(title) = &document.title {
            out.insert("title".into(), Value::from(title.as_str()));
        }

        match self.node(&document.root) {
            Value::Object(root) => out.extend(root),
            other => {
                out.insert("allOf".into(), Value::Array(vec![other]));
            }
        }

        if !document.definitions.is_empty() {
            let definitions: Map<String, Value> = document
                .definitions
                .iter()
                .map(|(key, node)| (key.clone(), self.node(node)))
                .collect();
            out.insert(
                self.draft.definitions_keyword().into(),
                Value::Object(definitions),
            );
        }

        Value::Object(out)
    }

    /// Serialize the schema to text
    pub fn to_string(&self, document: &JsonSchemaDocument) -> Result<String> {
        let value = self.to_value(document);
        let mut text = if self.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        text.push('\n');
        Ok(text)
    }

    fn node(&self, node: &SchemaNode) -> Value {
        let mut out = match &node.kind {
            NodeKind::Never => return Value::Bool(false),
            NodeKind::Any => Map::new(),
            NodeKind::Ref(key) => {
                let reference = json!({ "$ref": self.pointer(key) });
                if self.draft == Draft::Draft07 && !node.annotations.is_empty() {
                    let mut out = Map::new();
                    out.insert("allOf".into(), Value::Array(vec![reference]));
                    out
                } else {
                    match reference {
                        Value::Object(map) => map,
                        _ => Map::new(),
                    }
                }
            }
            NodeKind::Object(object) => self.object(object),
            NodeKind::Array(array) => self.array(array),
            NodeKind::Scalar(scalar) => scalar_keywords(scalar),
            NodeKind::AnyScalar => {
                let mut out = Map::new();
                out.insert("type".into(), json!(["string", "number", "boolean"]));
                out
            }
            NodeKind::Enum(values) => {
                let mut out = Map::new();
                out.insert("enum".into(), Value::Array(values.clone()));
                out
            }
            NodeKind::OneOf(nodes) => self.combinator("oneOf", nodes),
            NodeKind::AnyOf(nodes) => self.combinator("anyOf", nodes),
        };
        annotate(&mut out, &node.annotations);
        Value::Object(out)
    }

    fn pointer(&self, key: &str) -> String {
        let escaped = key.replace('~', "~0").replace('/', "~1");
        format!("#/{}/{}", self.draft.definitions_keyword(), escaped)
    }

    fn combinator(&self, keyword: &str, nodes: &[SchemaNode]) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert(
            keyword.into(),
            Value::Array(nodes.iter().map(|n| self.node(n)).collect()),
        );
        out
    }

    fn object(&self, object: &ObjectNode) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("type".into(), Value::from("object"));

        let properties: Map<String, Value> = object
            .properties
            .iter()
            .map(|(name, node)| (name.clone(), self.node(node)))
            .collect();
        out.insert("properties".into(), Value::Object(properties));

        if !object.required.is_empty() {
            out.insert("required".into(), json!(object.required));
        }
        if !object.additional_properties {
            out.insert("additionalProperties".into(), Value::Bool(false));
        }
        if let Some(min) = object.min_properties {
            out.insert("minProperties".into(), Value::from(min));
        }
        if let Some(max) = object.max_properties {
            out.insert("maxProperties".into(), Value::from(max));
        }

        match object.alternatives.as_slice() {
            [] => {}
            [single] => {
                out.extend(self.combinator("oneOf", single));
            }
            groups => {
                let all: Vec<Value> = groups
                    .iter()
                    .map(|group| Value::Object(self.combinator("oneOf", group)))
                    .collect();
                out.insert("allOf".into(), Value::Array(all));
            }
        }
        out
    }

    fn array(&self, array: &ArrayNode) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("type".into(), Value::from("array"));
        out.insert("items".into(), self.node(&array.items));
        if array.min_items > 0 {
            out.insert("minItems".into(), Value::from(array.min_items));
        }
        if let Some(max) = array.max_items {
            out.insert("maxItems".into(), Value::from(max));
        }
        out
    }
}

fn scalar_keywords(scalar: &ScalarNode) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert("type".into(), Value::from(scalar.scalar_type.as_str()));
    if let Some(format) = &scalar.format {
        out.insert("format".into(), Value::from(format.as_str()));
    }
    if let Some(pattern) = &scalar.pattern {
        out.insert("pattern".into(), Value::from(pattern.as_str()));
    }
    if let Some(values) = &scalar.enumeration {
        out.insert("enum".into(), Value::Array(values.clone()));
    }

    let numbers = [
        ("minimum", scalar.minimum),
        ("exclusiveMinimum", scalar.exclusive_minimum),
        ("maximum", scalar.maximum),
        ("exclusiveMaximum", scalar.exclusive_maximum),
        ("multipleOf", scalar.multiple_of),
    ];
    for (keyword, value) in numbers {
        if let Some(value) = value {
            out.insert(keyword.into(), decimal_value(value));
        }
    }

    if let Some(min) = scalar.min_length {
        out.insert("minLength".into(), Value::from(min));
    }
    if let Some(max) = scalar.max_length {
        out.insert("maxLength".into(), Value::from(max));
    }
    out
}

fn annotate(out: &mut Map<String, Value>, annotations: &Annotations) {
    if let Some(description) = &annotations.description {
        out.insert("description".into(), Value::from(description.as_str()));
    }
    if let Some(default) = &annotations.default {
        out.insert("default".into(), default.clone());
    }
    if let Some(value) = &annotations.const_value {
        out.insert("const".into(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::nodes::ScalarType;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn document(definitions: Vec<(&str, SchemaNode)>) -> JsonSchemaDocument {
        let mut root = ObjectNode::default();
        root.insert("order", SchemaNode::reference("order"), true);
        JsonSchemaDocument {
            title: Some("orders".to_string()),
            root: SchemaNode::new(NodeKind::Object(root)),
            definitions: definitions
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<IndexMap<_, _>>(),
        }
    }

    #[test]
    fn test_draft07_layout() {
        let doc = document(vec![("order", SchemaNode::scalar(ScalarType::String))]);
        let value = Emitter::new(Draft::Draft07).to_value(&doc);
        assert_eq!(
            value,
            json!({
                "$schema": "http://json-schema.org/draft-07/schema#",
                "title": "orders",
                "type": "object",
                "properties": {"order": {"$ref": "#/definitions/order"}},
                "required": ["order"],
                "additionalProperties": false,
                "definitions": {"order": {"type": "string"}}
            })
        );
    }

    #[test]
    fn test_draft202012_uses_defs() {
        let doc = document(vec![("order", SchemaNode::any())]);
        let value = Emitter::new(Draft::Draft202012).to_value(&doc);
        assert_eq!(
            value["$schema"],
            "https://json-schema.org/draft/2020-12/schema"
        );
        assert_eq!(value["properties"]["order"]["$ref"], "#/$defs/order");
        assert_eq!(value["$defs"]["order"], json!({}));
    }

    #[test]
    fn test_annotated_ref() {
        let node = SchemaNode::reference("a/b~c").with_description(Some("doc".into()));
        let draft07 = Emitter::new(Draft::Draft07).node(&node);
        assert_eq!(
            draft07,
            json!({"allOf": [{"$ref": "#/definitions/a~1b~0c"}], "description": "doc"})
        );
        let draft2020 = Emitter::new(Draft::Draft202012).node(&node);
        assert_eq!(
            draft2020,
            json!({"$ref": "#/$defs/a~1b~0c", "description": "doc"})
        );
    }

    #[test]
    fn test_array_and_scalar_keywords() {
        let mut scalar = ScalarNode::new(ScalarType::Integer);
        scalar.minimum = Some(Decimal::from(0));
        scalar.exclusive_maximum = Some(Decimal::from(100));
        let node = SchemaNode::array(SchemaNode::new(NodeKind::Scalar(scalar)), 0, Some(5));
        let value = Emitter::new(Draft::Draft07).node(&node);
        assert_eq!(
            value,
            json!({
                "type": "array",
                "items": {"type": "integer", "minimum": 0, "exclusiveMaximum": 100},
                "maxItems": 5
            })
        );
    }

    #[test]
    fn test_alternatives() {
        let mut object = ObjectNode::default();
        object.alternatives.push(vec![SchemaNode::any(), SchemaNode::never()]);
        let node = SchemaNode::new(NodeKind::Object(object.clone()));
        let value = Emitter::new(Draft::Draft07).node(&node);
        assert_eq!(value["oneOf"], json!([{}, false]));

        object.alternatives.push(vec![SchemaNode::never()]);
        let value = Emitter::new(Draft::Draft07).node(&SchemaNode::new(NodeKind::Object(object)));
        assert_eq!(value["allOf"], json!([{"oneOf": [{}, false]}, {"oneOf": [false]}]));
    }

    #[test]
    fn test_compact_output() {
        let doc = document(vec![("order", SchemaNode::any())]);
        let text = Emitter::new(Draft::Draft07)
            .with_pretty(false)
            .to_string(&doc)
            .unwrap();
        assert!(!text.trim_end().contains('\n'));
        assert!(text.starts_with("{\"$schema\""));
    }
}

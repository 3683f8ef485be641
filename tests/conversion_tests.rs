//! End-to-end conversion tests
//!
//! These tests run the whole pipeline (loading, parsing, resolution,
//! translation and emission) on the schemas under `tests/fixtures` and on
//! small in-memory document sets.

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};

use xsd2jsonschema::{
    ConversionOptions, Converter, Draft, Error, MixedContent, SourceDocument,
};

fn fixtures_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path
}

fn convert_fixture(name: &str, options: ConversionOptions) -> Value {
    let converter = Converter::new(options);
    let conversion = converter
        .convert_file(fixtures_dir().join(name))
        .expect("fixture converts");
    converter.to_value(&conversion)
}

fn schema(attrs: &str, body: &str) -> String {
    format!(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" {}>{}</xs:schema>"#,
        attrs, body
    )
}

fn convert_str(body: &str) -> xsd2jsonschema::Result<Value> {
    let converter = Converter::default();
    let conversion = converter.convert_str(&schema("", body))?;
    Ok(converter.to_value(&conversion))
}

// ============================================================================
// Fixture schemas
// ============================================================================

#[test]
fn test_order_schema_layout() {
    let value = convert_fixture("order.xsd", ConversionOptions::default());

    assert_eq!(value["$schema"], "http://json-schema.org/draft-07/schema#");
    assert_eq!(value["title"], "order");
    assert_eq!(
        value["properties"],
        json!({
            "order": {"$ref": "#/definitions/order"},
            "note": {"$ref": "#/definitions/note"}
        })
    );
    assert_eq!(value["minProperties"], 1);
    assert_eq!(value["maxProperties"], 1);

    let definitions = value["definitions"].as_object().unwrap();
    for key in ["Color", "Quantity", "Item", "Party", "Customer", "Address", "order", "note"] {
        assert!(definitions.contains_key(key), "missing definition {key}");
    }
}

#[test]
fn test_order_element_content() {
    let value = convert_fixture("order.xsd", ConversionOptions::default());
    let order = &value["definitions"]["order"];

    assert_eq!(order["required"], json!(["customer", "item", "number"]));
    assert_eq!(order["properties"]["customer"], json!({"$ref": "#/definitions/Customer"}));
    assert_eq!(
        order["properties"]["item"],
        json!({"type": "array", "items": {"$ref": "#/definitions/Item"}, "minItems": 1})
    );
    assert_eq!(
        order["properties"]["number"],
        json!({"type": "integer", "minimum": 1})
    );
    assert_eq!(
        order["oneOf"][0]["properties"]["delivery"],
        json!(false)
    );
    assert_eq!(order["oneOf"][0]["required"], json!(["pickup"]));
    assert_eq!(order["oneOf"][1]["required"], json!(["delivery"]));
    assert_eq!(
        order["properties"]["pickup"],
        json!({"type": "string", "format": "date"})
    );
}

#[test]
fn test_extension_accumulates_base_content() {
    let value = convert_fixture("order.xsd", ConversionOptions::default());
    let customer = &value["definitions"]["Customer"];

    let names: Vec<&str> = customer["properties"]
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(names, vec!["name", "address", "email", "vip"]);
    assert_eq!(customer["required"], json!(["name", "address"]));
    assert_eq!(
        customer["properties"]["vip"],
        json!({"type": "boolean", "default": false})
    );
    assert_eq!(customer["description"], "A party placing orders.");
}

#[test]
fn test_simple_types_from_included_document() {
    let value = convert_fixture("order.xsd", ConversionOptions::default());
    let definitions = &value["definitions"];

    assert_eq!(
        definitions["Color"],
        json!({"type": "string", "enum": ["RED", "GREEN", "BLUE"]})
    );
    assert_eq!(
        definitions["Quantity"],
        json!({"type": "integer", "minimum": 1, "maximum": 999})
    );
    assert_eq!(definitions["Item"]["required"], json!(["sku", "quantity", "id"]));
}

#[test]
fn test_draft_2020_12() {
    let value = convert_fixture(
        "order.xsd",
        ConversionOptions::default().with_draft(Draft::Draft202012),
    );
    assert_eq!(value["$schema"], "https://json-schema.org/draft/2020-12/schema");
    assert!(value.get("definitions").is_none());
    assert_eq!(
        value["$defs"]["Customer"]["properties"]["address"],
        json!({"$ref": "#/$defs/Address"})
    );
}

#[test]
fn test_root_element_option() {
    let value = convert_fixture(
        "order.xsd",
        ConversionOptions::default().with_root_element("order"),
    );
    assert_eq!(value["properties"], json!({"order": {"$ref": "#/definitions/order"}}));
    assert_eq!(value["required"], json!(["order"]));
}

#[test]
fn test_cyclic_types_terminate() {
    let value = convert_fixture("tree.xsd", ConversionOptions::default());
    let definitions = &value["definitions"];

    assert_eq!(
        definitions["Folder"]["properties"]["entry"]["items"],
        json!({"$ref": "#/definitions/Entry"})
    );
    assert_eq!(
        definitions["Entry"]["properties"]["folder"],
        json!({"$ref": "#/definitions/Folder"})
    );
    assert_eq!(definitions["root"], json!({"$ref": "#/definitions/Folder"}));
}

#[test]
fn test_output_is_deterministic() {
    let converter = Converter::default();
    let path = fixtures_dir().join("order.xsd");
    let first = converter.emit(&converter.convert_file(&path).unwrap()).unwrap();
    let second = converter.emit(&converter.convert_file(&path).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_resolution_report() {
    let report = Converter::default()
        .inspect_file(fixtures_dir().join("order.xsd"))
        .unwrap();
    assert_eq!(report.documents.len(), 3);
    assert!(report.documents[0].ends_with("order.xsd"));
    assert!(report.unreachable.is_empty());
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unresolved_reference() {
    let err = Converter::default()
        .convert_file(fixtures_dir().join("unresolved.xsd"))
        .unwrap_err();
    match err {
        Error::UnresolvedReference { name, .. } => assert_eq!(name, "Foo"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_conflicting_declarations() {
    let err = Converter::default()
        .convert_file(fixtures_dir().join("conflict").join("main.xsd"))
        .unwrap_err();
    match err {
        Error::ConflictingDeclaration {
            name,
            first,
            second,
            ..
        } => {
            assert_eq!(name, "{urn:x}Item");
            assert!(first.ends_with("a.xsd"));
            assert!(second.ends_with("b.xsd"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_missing_document_in_memory() {
    let documents = [SourceDocument::new(
        "main.xsd",
        schema("", r#"<xs:include schemaLocation="absent.xsd"/>"#),
    )];
    let err = Converter::default().convert(&documents, "main.xsd").unwrap_err();
    assert!(matches!(err, Error::MissingDocument { .. }));
}

#[test]
fn test_cyclic_inheritance() {
    let err = convert_str(
        r#"<xs:complexType name="A"><xs:complexContent><xs:extension base="B"/></xs:complexContent></xs:complexType>
           <xs:complexType name="B"><xs:complexContent><xs:extension base="A"/></xs:complexContent></xs:complexType>"#,
    )
    .unwrap_err();
    assert!(matches!(err, Error::CyclicInheritance { .. }));
}

#[test]
fn test_circular_union_is_rejected() {
    let err = convert_str(
        r#"<xs:simpleType name="U"><xs:union memberTypes="S xs:int"/></xs:simpleType>
           <xs:simpleType name="S"><xs:restriction base="U"/></xs:simpleType>
           <xs:element name="e"><xs:complexType>
             <xs:attribute name="a" type="S" default="1"/>
           </xs:complexType></xs:element>"#,
    )
    .unwrap_err();
    assert!(matches!(err, Error::CyclicInheritance { .. }));
}

#[test]
fn test_mixed_content_is_unsupported_by_default() {
    let body = r#"<xs:element name="p"><xs:complexType mixed="true"><xs:sequence>
                    <xs:element name="b" type="xs:string" minOccurs="0"/>
                  </xs:sequence></xs:complexType></xs:element>"#;
    let err = convert_str(body).unwrap_err();
    assert!(err.to_string().contains("mixed content"));

    let converter =
        Converter::new(ConversionOptions::default().with_mixed_content(MixedContent::TextProperty));
    let conversion = converter.convert_str(&schema("", body)).unwrap();
    let value = converter.to_value(&conversion);
    assert_eq!(value["definitions"]["p"]["properties"]["$"], json!({"type": "string"}));
}

// ============================================================================
// In-memory document sets
// ============================================================================

#[test]
fn test_chameleon_include() {
    let documents = [
        SourceDocument::new(
            "main.xsd",
            schema(
                r#"xmlns:c="urn:c" targetNamespace="urn:c""#,
                r#"<xs:include schemaLocation="codes.xsd"/>
                   <xs:element name="code" type="c:Code"/>"#,
            ),
        ),
        SourceDocument::new(
            "codes.xsd",
            schema(
                "",
                r#"<xs:simpleType name="Code"><xs:restriction base="xs:string">
                     <xs:pattern value="[A-Z]{3}"/>
                   </xs:restriction></xs:simpleType>"#,
            ),
        ),
    ];
    let converter = Converter::default();
    let conversion = converter.convert(&documents, "main.xsd").unwrap();
    let value = converter.to_value(&conversion);
    assert_eq!(value["definitions"]["code"], json!({"$ref": "#/definitions/Code"}));
    assert_eq!(
        value["definitions"]["Code"],
        json!({"type": "string", "pattern": "^(?:[A-Z]{3})$"})
    );
}

#[test]
fn test_substitution_group_alternatives() {
    let value = convert_str(
        r#"<xs:element name="shape" abstract="true" type="xs:string"/>
           <xs:element name="circle" substitutionGroup="shape"/>
           <xs:element name="square" substitutionGroup="shape"/>
           <xs:element name="drawing"><xs:complexType><xs:sequence>
             <xs:element ref="shape" maxOccurs="unbounded"/>
           </xs:sequence></xs:complexType></xs:element>"#,
    )
    .unwrap();

    let drawing = &value["definitions"]["drawing"];
    assert!(drawing["properties"].get("circle").is_none());
    assert_eq!(drawing["required"], json!(["shape"]));

    let shapes = &drawing["properties"]["shape"];
    assert_eq!(shapes["type"], "array");
    assert_eq!(shapes["minItems"], 1);
    assert!(shapes.get("maxItems").is_none());
    let branches = shapes["items"]["oneOf"].as_array().unwrap();
    assert_eq!(branches.len(), 2);
    assert_eq!(branches[0]["required"], json!(["circle"]));
    assert_eq!(branches[0]["properties"]["square"], json!(false));
    assert!(value["properties"].get("shape").is_none());
}

#[test]
fn test_attribute_prefix_and_simple_content() {
    let converter = Converter::new(ConversionOptions::default().with_attribute_prefix("@"));
    let conversion = converter
        .convert_str(&schema(
            "",
            r#"<xs:element name="price"><xs:complexType><xs:simpleContent>
                 <xs:extension base="xs:decimal">
                   <xs:attribute name="currency" type="xs:string" fixed="EUR"/>
                 </xs:extension>
               </xs:simpleContent></xs:complexType></xs:element>"#,
        ))
        .unwrap();
    let value = converter.to_value(&conversion);
    assert_eq!(
        value["definitions"]["price"],
        json!({
            "type": "object",
            "properties": {
                "$": {"type": "number"},
                "@currency": {"type": "string", "const": "EUR"}
            },
            "required": ["$"],
            "additionalProperties": false
        })
    );
}

// ============================================================================
// Occurrence bounds
// ============================================================================

proptest! {
    #[test]
    fn test_occurrence_bounds(min in 0u32..5, extra in 0u32..5, bounded in any::<bool>()) {
        let max = (min + extra).max(1);
        let max_attr = if bounded { max.to_string() } else { "unbounded".to_string() };
        let value = convert_str(&format!(
            r#"<xs:complexType name="T"><xs:sequence>
                 <xs:element name="v" type="xs:string" minOccurs="{}" maxOccurs="{}"/>
               </xs:sequence></xs:complexType>"#,
            min, max_attr
        ))
        .unwrap();

        let t = &value["definitions"]["T"];
        let property = &t["properties"]["v"];
        let required = t["required"]
            .as_array()
            .map_or(false, |r| r.contains(&json!("v")));
        prop_assert_eq!(required, min > 0);

        if bounded && max == 1 {
            prop_assert_eq!(property, &json!({"type": "string"}));
        } else {
            prop_assert_eq!(&property["type"], &json!("array"));
            if min > 0 {
                prop_assert_eq!(&property["minItems"], &json!(min));
            } else {
                prop_assert!(property.get("minItems").is_none());
            }
            if bounded {
                prop_assert_eq!(&property["maxItems"], &json!(max));
            } else {
                prop_assert!(property.get("maxItems").is_none());
            }
        }
    }
}

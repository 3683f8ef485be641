//! XSD built-in types
//!
//! The built-in datatypes of the XML Schema namespace, their JSON value
//! kind, formats and implied bounds, plus the attributes predeclared in the
//! XML namespace (`xml:lang`, `xml:space`, `xml:base`, `xml:id`).

use std::fmt;

use crate::locations::SourceLocation;
use crate::namespaces::{QName, XML_NAMESPACE};

use super::facets::Facet;
use super::{AttributeDecl, DeclContent, Declaration, Identity, SimpleTypeDef, TypeRef};

/// Document identifier used for the predeclared XML-namespace attributes
pub const XML_NAMESPACE_DOCUMENT: &str = "<xml namespace>";

/// JSON value kind of a simple type's value space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Character data
    String,
    /// Decimal or floating point number
    Number,
    /// Integral number
    Integer,
    /// true/false
    Boolean,
}

/// A built-in datatype of the XSD namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    /// xs:anyType (the ur-type)
    AnyType,
    /// xs:anySimpleType
    AnySimpleType,
    /// xs:anyAtomicType (XSD 1.1)
    AnyAtomicType,
    /// xs:string
    String,
    /// xs:normalizedString
    NormalizedString,
    /// xs:token
    Token,
    /// xs:language
    Language,
    /// xs:Name
    Name,
    /// xs:NCName
    NCName,
    /// xs:ID
    Id,
    /// xs:IDREF
    IdRef,
    /// xs:IDREFS
    IdRefs,
    /// xs:ENTITY
    Entity,
    /// xs:ENTITIES
    Entities,
    /// xs:NMTOKEN
    NmToken,
    /// xs:NMTOKENS
    NmTokens,
    /// xs:QName
    QName,
    /// xs:NOTATION
    Notation,
    /// xs:anyURI
    AnyUri,
    /// xs:boolean
    Boolean,
    /// xs:decimal
    Decimal,
    /// xs:float
    Float,
    /// xs:double
    Double,
    /// xs:integer
    Integer,
    /// xs:nonPositiveInteger
    NonPositiveInteger,
    /// xs:negativeInteger
    NegativeInteger,
    /// xs:long
    Long,
    /// xs:int
    Int,
    /// xs:short
    Short,
    /// xs:byte
    Byte,
    /// xs:nonNegativeInteger
    NonNegativeInteger,
    /// xs:unsignedLong
    UnsignedLong,
    /// xs:unsignedInt
    UnsignedInt,
    /// xs:unsignedShort
    UnsignedShort,
    /// xs:unsignedByte
    UnsignedByte,
    /// xs:positiveInteger
    PositiveInteger,
    /// xs:duration
    Duration,
    /// xs:yearMonthDuration (XSD 1.1)
    YearMonthDuration,
    /// xs:dayTimeDuration (XSD 1.1)
    DayTimeDuration,
    /// xs:dateTime
    DateTime,
    /// xs:dateTimeStamp (XSD 1.1)
    DateTimeStamp,
    /// xs:time
    Time,
    /// xs:date
    Date,
    /// xs:gYearMonth
    GYearMonth,
    /// xs:gYear
    GYear,
    /// xs:gMonthDay
    GMonthDay,
    /// xs:gDay
    GDay,
    /// xs:gMonth
    GMonth,
    /// xs:hexBinary
    HexBinary,
    /// xs:base64Binary
    Base64Binary,
}

// =============================================================================
// Name table
// =============================================================================

const BUILTIN_NAMES: &[(&str, BuiltinType)] = &[
    ("anyType", BuiltinType::AnyType),
    ("anySimpleType", BuiltinType::AnySimpleType),
    ("anyAtomicType", BuiltinType::AnyAtomicType),
    ("string", BuiltinType::String),
    ("normalizedString", BuiltinType::NormalizedString),
    ("token", BuiltinType::Token),
    ("language", BuiltinType::Language),
    ("Name", BuiltinType::Name),
    ("NCName", BuiltinType::NCName),
    ("ID", BuiltinType::Id),
    ("IDREF", BuiltinType::IdRef),
    ("IDREFS", BuiltinType::IdRefs),
    ("ENTITY", BuiltinType::Entity),
    ("ENTITIES", BuiltinType::Entities),
    ("NMTOKEN", BuiltinType::NmToken),
    ("NMTOKENS", BuiltinType::NmTokens),
    ("QName", BuiltinType::QName),
    ("NOTATION", BuiltinType::Notation),
    ("anyURI", BuiltinType::AnyUri),
    ("boolean", BuiltinType::Boolean),
    ("decimal", BuiltinType::Decimal),
    ("float", BuiltinType::Float),
    ("double", BuiltinType::Double),
    ("integer", BuiltinType::Integer),
    ("nonPositiveInteger", BuiltinType::NonPositiveInteger),
    ("negativeInteger", BuiltinType::NegativeInteger),
    ("long", BuiltinType::Long),
    ("int", BuiltinType::Int),
    ("short", BuiltinType::Short),
    ("byte", BuiltinType::Byte),
    ("nonNegativeInteger", BuiltinType::NonNegativeInteger),
    ("unsignedLong", BuiltinType::UnsignedLong),
    ("unsignedInt", BuiltinType::UnsignedInt),
    ("unsignedShort", BuiltinType::UnsignedShort),
    ("unsignedByte", BuiltinType::UnsignedByte),
    ("positiveInteger", BuiltinType::PositiveInteger),
    ("duration", BuiltinType::Duration),
    ("yearMonthDuration", BuiltinType::YearMonthDuration),
    ("dayTimeDuration", BuiltinType::DayTimeDuration),
    ("dateTime", BuiltinType::DateTime),
    ("dateTimeStamp", BuiltinType::DateTimeStamp),
    ("time", BuiltinType::Time),
    ("date", BuiltinType::Date),
    ("gYearMonth", BuiltinType::GYearMonth),
    ("gYear", BuiltinType::GYear),
    ("gMonthDay", BuiltinType::GMonthDay),
    ("gDay", BuiltinType::GDay),
    ("gMonth", BuiltinType::GMonth),
    ("hexBinary", BuiltinType::HexBinary),
    ("base64Binary", BuiltinType::Base64Binary),
];

impl BuiltinType {
    /// Look up a built-in type by its local name in the XSD namespace
    pub fn from_local_name(name: &str) -> Option<Self> {
        BUILTIN_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, t)| *t)
    }

    /// Local name of the type in the XSD namespace
    pub fn name(&self) -> &'static str {
        BUILTIN_NAMES
            .iter()
            .find(|(_, t)| t == self)
            .map(|(n, _)| *n)
            .unwrap_or("anyType")
    }

    /// JSON value kind of the type's value space
    pub fn value_kind(&self) -> ValueKind {
        use BuiltinType::*;
        match self {
            Boolean => ValueKind::Boolean,
            Decimal | Float | Double => ValueKind::Number,
            Integer | NonPositiveInteger | NegativeInteger | Long | Int | Short | Byte
            | NonNegativeInteger | UnsignedLong | UnsignedInt | UnsignedShort | UnsignedByte
            | PositiveInteger => ValueKind::Integer,
            _ => ValueKind::String,
        }
    }

    /// JSON Schema `format` for the type, if one exists
    pub fn format(&self) -> Option<&'static str> {
        use BuiltinType::*;
        match self {
            DateTime | DateTimeStamp => Some("date-time"),
            Date => Some("date"),
            Time => Some("time"),
            Duration | YearMonthDuration | DayTimeDuration => Some("duration"),
            AnyUri => Some("uri"),
            _ => None,
        }
    }

    /// Inclusive value bounds implied by an integer type
    pub fn implied_bounds(&self) -> (Option<i128>, Option<i128>) {
        use BuiltinType::*;
        match self {
            NonPositiveInteger => (None, Some(0)),
            NegativeInteger => (None, Some(-1)),
            Long => (Some(i64::MIN as i128), Some(i64::MAX as i128)),
            Int => (Some(i32::MIN as i128), Some(i32::MAX as i128)),
            Short => (Some(i16::MIN as i128), Some(i16::MAX as i128)),
            Byte => (Some(i8::MIN as i128), Some(i8::MAX as i128)),
            NonNegativeInteger => (Some(0), None),
            UnsignedLong => (Some(0), Some(u64::MAX as i128)),
            UnsignedInt => (Some(0), Some(u32::MAX as i128)),
            UnsignedShort => (Some(0), Some(u16::MAX as i128)),
            UnsignedByte => (Some(0), Some(u8::MAX as i128)),
            PositiveInteger => (Some(1), None),
            _ => (None, None),
        }
    }

    /// Whether the type is a built-in list type (whitespace separated tokens)
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            BuiltinType::IdRefs | BuiltinType::Entities | BuiltinType::NmTokens
        )
    }

    /// Item type of a built-in list type
    pub fn list_item(&self) -> Option<BuiltinType> {
        match self {
            BuiltinType::IdRefs => Some(BuiltinType::IdRef),
            BuiltinType::Entities => Some(BuiltinType::Entity),
            BuiltinType::NmTokens => Some(BuiltinType::NmToken),
            _ => None,
        }
    }

    /// Whether the type is one of the ur-types without a fixed value space
    pub fn is_any(&self) -> bool {
        matches!(
            self,
            BuiltinType::AnyType | BuiltinType::AnySimpleType | BuiltinType::AnyAtomicType
        )
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xs:{}", self.name())
    }
}

// =============================================================================
// XML namespace attributes
// =============================================================================

/// Declarations of the attributes predeclared in the XML namespace.
///
/// These stand in for `xml.xsd` so that `ref="xml:lang"` resolves without
/// the document being supplied.
pub fn xml_attribute_declarations() -> Vec<Declaration> {
    let location = SourceLocation::document(XML_NAMESPACE_DOCUMENT);
    let attribute = |name: &str, type_ref: TypeRef, documentation: &str| Declaration {
        identity: Identity::Named(QName::namespaced(XML_NAMESPACE, name)),
        location: location.clone(),
        documentation: Some(documentation.to_string()),
        content: DeclContent::Attribute(AttributeDecl {
            name: QName::namespaced(XML_NAMESPACE, name),
            type_ref: Some(type_ref),
            default: None,
            fixed: None,
        }),
    };

    let space_type = Declaration {
        identity: Identity::anonymous("space", "@space"),
        location: location.clone(),
        documentation: None,
        content: DeclContent::SimpleType(SimpleTypeDef::Restriction {
            base: TypeRef::Builtin(BuiltinType::NCName),
            facets: vec![
                Facet::Enumeration("default".to_string()),
                Facet::Enumeration("preserve".to_string()),
            ],
        }),
    };

    vec![
        attribute(
            "lang",
            TypeRef::Builtin(BuiltinType::Language),
            "Natural or formal language of the element's content",
        ),
        attribute(
            "space",
            TypeRef::Inline(Box::new(space_type)),
            "White space handling of the element's content",
        ),
        attribute(
            "base",
            TypeRef::Builtin(BuiltinType::AnyUri),
            "Base URI of the element",
        ),
        attribute("id", TypeRef::Builtin(BuiltinType::Id), "Identifier of the element"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(BuiltinType::from_local_name("string"), Some(BuiltinType::String));
        assert_eq!(
            BuiltinType::from_local_name("unsignedByte"),
            Some(BuiltinType::UnsignedByte)
        );
        assert_eq!(BuiltinType::from_local_name("String"), None);
        assert_eq!(BuiltinType::DateTime.name(), "dateTime");
    }

    #[test]
    fn test_every_name_round_trips() {
        for (name, builtin) in BUILTIN_NAMES {
            assert_eq!(builtin.name(), *name);
        }
    }

    #[test]
    fn test_value_kinds() {
        assert_eq!(BuiltinType::Int.value_kind(), ValueKind::Integer);
        assert_eq!(BuiltinType::Double.value_kind(), ValueKind::Number);
        assert_eq!(BuiltinType::Boolean.value_kind(), ValueKind::Boolean);
        assert_eq!(BuiltinType::Date.value_kind(), ValueKind::String);
        assert_eq!(BuiltinType::QName.value_kind(), ValueKind::String);
    }

    #[test]
    fn test_formats() {
        assert_eq!(BuiltinType::DateTime.format(), Some("date-time"));
        assert_eq!(BuiltinType::Date.format(), Some("date"));
        assert_eq!(BuiltinType::Time.format(), Some("time"));
        assert_eq!(BuiltinType::Duration.format(), Some("duration"));
        assert_eq!(BuiltinType::AnyUri.format(), Some("uri"));
        assert_eq!(BuiltinType::GYear.format(), None);
    }

    #[test]
    fn test_implied_bounds() {
        assert_eq!(BuiltinType::UnsignedByte.implied_bounds(), (Some(0), Some(255)));
        assert_eq!(BuiltinType::PositiveInteger.implied_bounds(), (Some(1), None));
        assert_eq!(BuiltinType::Integer.implied_bounds(), (None, None));
    }

    #[test]
    fn test_list_types() {
        assert!(BuiltinType::NmTokens.is_list());
        assert_eq!(BuiltinType::IdRefs.list_item(), Some(BuiltinType::IdRef));
        assert!(!BuiltinType::NmToken.is_list());
    }

    #[test]
    fn test_xml_attributes() {
        let decls = xml_attribute_declarations();
        let names: Vec<_> = decls
            .iter()
            .filter_map(|d| d.name().map(|n| n.local_name.clone()))
            .collect();
        assert_eq!(names, vec!["lang", "space", "base", "id"]);
        assert!(decls
            .iter()
            .all(|d| d.name().is_some_and(|n| n.is_in(XML_NAMESPACE))));
    }
}

//! Conversion options
//!
//! Every knob of a conversion run. Options can be built in code with the
//! `with_*` methods or read from a JSON options file.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::Error;
use crate::limits::Limits;

/// JSON Schema dialect of the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Draft {
    /// Draft 7 (`definitions`)
    #[default]
    #[serde(rename = "draft-07", alias = "7")]
    Draft07,
    /// Draft 2020-12 (`$defs`)
    #[serde(rename = "2020-12")]
    Draft202012,
}

impl Draft {
    /// Value of the `$schema` keyword
    pub fn schema_uri(&self) -> &'static str {
        match self {
            Draft::Draft07 => "http://json-schema.org/draft-07/schema#",
            Draft::Draft202012 => "https://json-schema.org/draft/2020-12/schema",
        }
    }

    /// Keyword holding the definitions
    pub fn definitions_keyword(&self) -> &'static str {
        match self {
            Draft::Draft07 => "definitions",
            Draft::Draft202012 => "$defs",
        }
    }
}

impl fmt::Display for Draft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Draft::Draft07 => f.write_str("draft-07"),
            Draft::Draft202012 => f.write_str("2020-12"),
        }
    }
}

impl FromStr for Draft {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "7" | "07" | "draft-07" | "draft7" => Ok(Draft::Draft07),
            "2020-12" | "draft-2020-12" => Ok(Draft::Draft202012),
            other => Err(Error::InvalidOption(format!(
                "unknown JSON Schema draft '{}', expected 7 or 2020-12",
                other
            ))),
        }
    }
}

/// Handling of mixed content (`mixed="true"`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixedContent {
    /// Mixed content is an unsupported construct
    #[default]
    Reject,
    /// Character data becomes an optional string property under the text key
    TextProperty,
}

/// Combinator used for simple type unions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnionStyle {
    /// `oneOf`
    #[default]
    OneOf,
    /// `anyOf`
    AnyOf,
}

/// Options of a conversion run
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    draft: Draft,
    root_element: Option<String>,
    title: Option<String>,
    text_key: String,
    attribute_prefix: String,
    allow_wildcards: bool,
    mixed_content: MixedContent,
    union_style: UnionStyle,
    lenient_facets: bool,
    include_documentation: bool,
    pretty: bool,
    catalogs: Vec<PathBuf>,
    limits: Limits,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            draft: Draft::default(),
            root_element: None,
            title: None,
            text_key: "$".to_string(),
            attribute_prefix: String::new(),
            allow_wildcards: false,
            mixed_content: MixedContent::default(),
            union_style: UnionStyle::default(),
            lenient_facets: false,
            include_documentation: true,
            pretty: true,
            catalogs: Vec::new(),
            limits: Limits::default(),
        }
    }
}

impl ConversionOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Read options from a JSON document
    pub fn from_json(text: &str) -> crate::error::Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::InvalidOption(format!("invalid options file: {}", e)))
    }

    /// Output dialect
    pub fn draft(&self) -> Draft {
        self.draft
    }

    /// Local name of the element to use as the document root
    pub fn root_element(&self) -> Option<&str> {
        self.root_element.as_deref()
    }

    /// Title of the output document
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Property name of simple and mixed content text
    pub fn text_key(&self) -> &str {
        &self.text_key
    }

    /// Prefix prepended to attribute property names
    pub fn attribute_prefix(&self) -> &str {
        &self.attribute_prefix
    }

    /// Whether element wildcards open the object instead of failing
    pub fn allow_wildcards(&self) -> bool {
        self.allow_wildcards
    }

    /// Mixed content handling
    pub fn mixed_content(&self) -> MixedContent {
        self.mixed_content
    }

    /// Union combinator
    pub fn union_style(&self) -> UnionStyle {
        self.union_style
    }

    /// Whether inapplicable facets are dropped with a warning
    pub fn lenient_facets(&self) -> bool {
        self.lenient_facets
    }

    /// Whether documentation becomes `description`
    pub fn include_documentation(&self) -> bool {
        self.include_documentation
    }

    /// Whether emitted JSON is indented
    pub fn pretty(&self) -> bool {
        self.pretty
    }

    /// XML catalog files consulted by the loader
    pub fn catalogs(&self) -> &[PathBuf] {
        &self.catalogs
    }

    /// Resource limits
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Set the output dialect
    pub fn with_draft(mut self, draft: Draft) -> Self {
        self.draft = draft;
        self
    }

    /// Set the root element
    pub fn with_root_element(mut self, name: impl Into<String>) -> Self {
        self.root_element = Some(name.into());
        self
    }

    /// Set the document title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the text key
    pub fn with_text_key(mut self, key: impl Into<String>) -> Self {
        self.text_key = key.into();
        self
    }

    /// Set the attribute prefix
    pub fn with_attribute_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.attribute_prefix = prefix.into();
        self
    }

    /// Allow element wildcards
    pub fn with_allow_wildcards(mut self, allow: bool) -> Self {
        self.allow_wildcards = allow;
        self
    }

    /// Set mixed content handling
    pub fn with_mixed_content(mut self, mode: MixedContent) -> Self {
        self.mixed_content = mode;
        self
    }

    /// Set the union combinator
    pub fn with_union_style(mut self, style: UnionStyle) -> Self {
        self.union_style = style;
        self
    }

    /// Drop inapplicable facets instead of failing
    pub fn with_lenient_facets(mut self, lenient: bool) -> Self {
        self.lenient_facets = lenient;
        self
    }

    /// Emit documentation as `description`
    pub fn with_include_documentation(mut self, include: bool) -> Self {
        self.include_documentation = include;
        self
    }

    /// Indent emitted JSON
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Add an XML catalog file
    pub fn with_catalog(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalogs.push(path.into());
        self
    }

    /// Set resource limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ConversionOptions::default();
        assert_eq!(options.draft(), Draft::Draft07);
        assert_eq!(options.text_key(), "$");
        assert_eq!(options.attribute_prefix(), "");
        assert!(options.include_documentation());
        assert!(!options.allow_wildcards());
        assert_eq!(options.mixed_content(), MixedContent::Reject);
    }

    #[test]
    fn test_builder() {
        let options = ConversionOptions::new()
            .with_draft(Draft::Draft202012)
            .with_root_element("order")
            .with_attribute_prefix("@")
            .with_union_style(UnionStyle::AnyOf);
        assert_eq!(options.draft(), Draft::Draft202012);
        assert_eq!(options.root_element(), Some("order"));
        assert_eq!(options.attribute_prefix(), "@");
        assert_eq!(options.union_style(), UnionStyle::AnyOf);
    }

    #[test]
    fn test_from_json() {
        let options = ConversionOptions::from_json(
            r#"{"draft": "2020-12", "mixed_content": "text_property", "limits": {"max_documents": 5}}"#,
        )
        .unwrap();
        assert_eq!(options.draft(), Draft::Draft202012);
        assert_eq!(options.mixed_content(), MixedContent::TextProperty);
        assert_eq!(options.limits().max_documents, 5);
        assert_eq!(options.text_key(), "$");
    }

    #[test]
    fn test_from_json_rejects_unknown_draft() {
        let err = ConversionOptions::from_json(r#"{"draft": "4"}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidOption(_)));
    }

    #[test]
    fn test_draft_from_str() {
        assert_eq!("7".parse::<Draft>().unwrap(), Draft::Draft07);
        assert_eq!("2020-12".parse::<Draft>().unwrap(), Draft::Draft202012);
        assert!("2019-09".parse::<Draft>().is_err());
        assert_eq!(Draft::Draft202012.definitions_keyword(), "$defs");
    }
}

//! XSD constraining facets
//!
//! Facets as declared on simple type restrictions, and the merged view of a
//! whole derivation chain that the translator maps onto JSON Schema keywords.

use std::fmt;

use super::patterns::{to_ecma, UnsupportedPattern};

/// White space handling modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhiteSpace {
    /// Preserve all white space
    Preserve,
    /// Replace tabs and newlines with spaces
    Replace,
    /// Replace and collapse multiple spaces
    Collapse,
}

impl WhiteSpace {
    /// Parse from string value
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "preserve" => Some(WhiteSpace::Preserve),
            "replace" => Some(WhiteSpace::Replace),
            "collapse" => Some(WhiteSpace::Collapse),
            _ => None,
        }
    }
}

/// A constraining facet of a simple type restriction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Facet {
    /// xs:pattern (XSD regular expression, implicitly anchored)
    Pattern(String),
    /// xs:enumeration
    Enumeration(String),
    /// xs:minInclusive
    MinInclusive(String),
    /// xs:maxInclusive
    MaxInclusive(String),
    /// xs:minExclusive
    MinExclusive(String),
    /// xs:maxExclusive
    MaxExclusive(String),
    /// xs:length
    Length(u64),
    /// xs:minLength
    MinLength(u64),
    /// xs:maxLength
    MaxLength(u64),
    /// xs:totalDigits
    TotalDigits(u32),
    /// xs:fractionDigits
    FractionDigits(u32),
    /// xs:whiteSpace
    WhiteSpace(WhiteSpace),
}

impl Facet {
    /// Parse a facet element by local name and `value` attribute.
    ///
    /// Returns `Ok(None)` when the local name is not a facet.
    pub fn parse(local_name: &str, value: &str) -> std::result::Result<Option<Facet>, String> {
        let facet = match local_name {
            "pattern" => Facet::Pattern(value.to_string()),
            "enumeration" => Facet::Enumeration(value.to_string()),
            "minInclusive" => Facet::MinInclusive(value.trim().to_string()),
            "maxInclusive" => Facet::MaxInclusive(value.trim().to_string()),
            "minExclusive" => Facet::MinExclusive(value.trim().to_string()),
            "maxExclusive" => Facet::MaxExclusive(value.trim().to_string()),
            "length" => Facet::Length(parse_count(local_name, value)?),
            "minLength" => Facet::MinLength(parse_count(local_name, value)?),
            "maxLength" => Facet::MaxLength(parse_count(local_name, value)?),
            "totalDigits" => {
                let digits = parse_count(local_name, value)?;
                if digits == 0 {
                    return Err("totalDigits must be a positive integer".to_string());
                }
                Facet::TotalDigits(digits.min(u32::MAX as u64) as u32)
            }
            "fractionDigits" => {
                Facet::FractionDigits(parse_count(local_name, value)?.min(u32::MAX as u64) as u32)
            }
            "whiteSpace" => Facet::WhiteSpace(WhiteSpace::parse(value.trim()).ok_or_else(|| {
                format!(
                    "Invalid whiteSpace value: '{}'. Must be 'preserve', 'replace', or 'collapse'",
                    value
                )
            })?),
            _ => return Ok(None),
        };
        Ok(Some(facet))
    }

    /// XSD name of the facet
    pub fn name(&self) -> &'static str {
        match self {
            Facet::Pattern(_) => "pattern",
            Facet::Enumeration(_) => "enumeration",
            Facet::MinInclusive(_) => "minInclusive",
            Facet::MaxInclusive(_) => "maxInclusive",
            Facet::MinExclusive(_) => "minExclusive",
            Facet::MaxExclusive(_) => "maxExclusive",
            Facet::Length(_) => "length",
            Facet::MinLength(_) => "minLength",
            Facet::MaxLength(_) => "maxLength",
            Facet::TotalDigits(_) => "totalDigits",
            Facet::FractionDigits(_) => "fractionDigits",
            Facet::WhiteSpace(_) => "whiteSpace",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xs:{}", self.name())
    }
}

fn parse_count(facet: &str, value: &str) -> std::result::Result<u64, String> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("{} value '{}' is not a non-negative integer", facet, value))
}

/// Facets merged along a derivation chain, base first.
///
/// A later step overrides a facet of the same kind set by an earlier one,
/// except patterns: every step's patterns must hold at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetSet {
    /// Pattern alternatives, one entry per derivation step that has any
    pub pattern_steps: Vec<Vec<String>>,
    /// Enumerated values of the most derived step that has any
    pub enumeration: Option<Vec<String>>,
    /// xs:minInclusive
    pub min_inclusive: Option<String>,
    /// xs:maxInclusive
    pub max_inclusive: Option<String>,
    /// xs:minExclusive
    pub min_exclusive: Option<String>,
    /// xs:maxExclusive
    pub max_exclusive: Option<String>,
    /// xs:length
    pub length: Option<u64>,
    /// xs:minLength
    pub min_length: Option<u64>,
    /// xs:maxLength
    pub max_length: Option<u64>,
    /// xs:totalDigits
    pub total_digits: Option<u32>,
    /// xs:fractionDigits
    pub fraction_digits: Option<u32>,
    /// xs:whiteSpace
    pub white_space: Option<WhiteSpace>,
}

impl FacetSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a chain of steps, base first
    pub fn from_steps<'a>(steps: impl IntoIterator<Item = &'a [Facet]>) -> Self {
        let mut set = Self::new();
        for step in steps {
            set.apply_step(step);
        }
        set
    }

    /// Apply the facets of one derivation step on top of the current set
    pub fn apply_step(&mut self, facets: &[Facet]) {
        let mut patterns = Vec::new();
        let mut enumeration = Vec::new();

        for facet in facets {
            match facet {
                Facet::Pattern(p) => patterns.push(p.clone()),
                Facet::Enumeration(v) => enumeration.push(v.clone()),
                Facet::MinInclusive(v) => {
                    self.min_inclusive = Some(v.clone());
                    self.min_exclusive = None;
                }
                Facet::MaxInclusive(v) => {
                    self.max_inclusive = Some(v.clone());
                    self.max_exclusive = None;
                }
                Facet::MinExclusive(v) => {
                    self.min_exclusive = Some(v.clone());
                    self.min_inclusive = None;
                }
                Facet::MaxExclusive(v) => {
                    self.max_exclusive = Some(v.clone());
                    self.max_inclusive = None;
                }
                Facet::Length(n) => self.length = Some(*n),
                Facet::MinLength(n) => self.min_length = Some(*n),
                Facet::MaxLength(n) => self.max_length = Some(*n),
                Facet::TotalDigits(n) => self.total_digits = Some(*n),
                Facet::FractionDigits(n) => self.fraction_digits = Some(*n),
                Facet::WhiteSpace(ws) => self.white_space = Some(*ws),
            }
        }

        if !patterns.is_empty() {
            self.pattern_steps.push(patterns);
        }
        if !enumeration.is_empty() {
            self.enumeration = Some(enumeration);
        }
    }

    /// Names of the facets present, in declaration-kind order
    pub fn present(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if !self.pattern_steps.is_empty() {
            names.push("pattern");
        }
        if self.enumeration.is_some() {
            names.push("enumeration");
        }
        if self.min_inclusive.is_some() {
            names.push("minInclusive");
        }
        if self.max_inclusive.is_some() {
            names.push("maxInclusive");
        }
        if self.min_exclusive.is_some() {
            names.push("minExclusive");
        }
        if self.max_exclusive.is_some() {
            names.push("maxExclusive");
        }
        if self.length.is_some() {
            names.push("length");
        }
        if self.min_length.is_some() {
            names.push("minLength");
        }
        if self.max_length.is_some() {
            names.push("maxLength");
        }
        if self.total_digits.is_some() {
            names.push("totalDigits");
        }
        if self.fraction_digits.is_some() {
            names.push("fractionDigits");
        }
        names
    }

    /// Effective (minLength, maxLength), with xs:length fixing both
    pub fn length_range(&self) -> (Option<u64>, Option<u64>) {
        match self.length {
            Some(n) => (Some(n), Some(n)),
            None => (self.min_length, self.max_length),
        }
    }

    /// Combined anchored ECMA-262 pattern.
    ///
    /// Alternatives of one step are joined with `|`; each earlier step
    /// becomes a lookahead so that all steps must match the whole value.
    pub fn combined_pattern(&self) -> Result<Option<String>, UnsupportedPattern> {
        let Some((last, earlier)) = self.pattern_steps.split_last() else {
            return Ok(None);
        };
        let mut pattern = String::from("^");
        for step in earlier {
            pattern.push_str("(?=");
            pattern.push_str(&alternation(step)?);
            pattern.push_str("$)");
        }
        pattern.push_str(&alternation(last)?);
        pattern.push('$');
        Ok(Some(pattern))
    }
}

fn alternation(patterns: &[String]) -> Result<String, UnsupportedPattern> {
    let parts = patterns
        .iter()
        .map(|p| to_ecma(p).map(|p| format!("(?:{})", p)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(if parts.len() == 1 {
        parts.concat()
    } else {
        format!("(?:{})", parts.join("|"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_facets() {
        assert_eq!(
            Facet::parse("pattern", "[a-z]+").unwrap(),
            Some(Facet::Pattern("[a-z]+".into()))
        );
        assert_eq!(Facet::parse("maxLength", " 10 ").unwrap(), Some(Facet::MaxLength(10)));
        assert_eq!(
            Facet::parse("whiteSpace", "collapse").unwrap(),
            Some(Facet::WhiteSpace(WhiteSpace::Collapse))
        );
        assert_eq!(Facet::parse("annotation", "").unwrap(), None);
    }

    #[test]
    fn test_parse_facet_errors() {
        assert!(Facet::parse("length", "-1").is_err());
        assert!(Facet::parse("totalDigits", "0").is_err());
        assert!(Facet::parse("whiteSpace", "squash").is_err());
    }

    #[test]
    fn test_derived_step_overrides() {
        let base = vec![Facet::MaxLength(20), Facet::MinInclusive("0".into())];
        let derived = vec![Facet::MaxLength(10), Facet::MinExclusive("5".into())];
        let set = FacetSet::from_steps([base.as_slice(), derived.as_slice()]);

        assert_eq!(set.max_length, Some(10));
        assert_eq!(set.min_inclusive, None);
        assert_eq!(set.min_exclusive.as_deref(), Some("5"));
    }

    #[test]
    fn test_enumeration_of_most_derived_step() {
        let base = vec![
            Facet::Enumeration("A".into()),
            Facet::Enumeration("B".into()),
            Facet::Enumeration("C".into()),
        ];
        let derived = vec![Facet::Enumeration("A".into())];
        let set = FacetSet::from_steps([base.as_slice(), derived.as_slice()]);
        assert_eq!(set.enumeration, Some(vec!["A".to_string()]));
    }

    #[test]
    fn test_single_pattern_is_anchored() {
        let set = FacetSet::from_steps([[Facet::Pattern("[A-Z]{3}".into())].as_slice()]);
        assert_eq!(set.combined_pattern().unwrap().as_deref(), Some("^(?:[A-Z]{3})$"));
    }

    #[test]
    fn test_patterns_of_one_step_alternate() {
        let step = vec![Facet::Pattern("a+".into()), Facet::Pattern("b+".into())];
        let set = FacetSet::from_steps([step.as_slice()]);
        assert_eq!(set.combined_pattern().unwrap().as_deref(), Some("^(?:(?:a+)|(?:b+))$"));
    }

    #[test]
    fn test_patterns_of_steps_conjoin() {
        let base = vec![Facet::Pattern("[a-z]+".into())];
        let derived = vec![Facet::Pattern(".{3}".into())];
        let set = FacetSet::from_steps([base.as_slice(), derived.as_slice()]);
        assert_eq!(
            set.combined_pattern().unwrap().as_deref(),
            Some("^(?=(?:[a-z]+)$)(?:.{3})$")
        );
    }

    #[test]
    fn test_pattern_uses_ecma_syntax() {
        let set = FacetSet::from_steps([[Facet::Pattern("$[0-9]+".into())].as_slice()]);
        assert_eq!(
            set.combined_pattern().unwrap().as_deref(),
            Some(r"^(?:\$[0-9]+)$")
        );

        let set = FacetSet::from_steps([[Facet::Pattern("[a-z-[aeiou]]+".into())].as_slice()]);
        assert!(set.combined_pattern().is_err());
    }

    #[test]
    fn test_length_range() {
        let set = FacetSet::from_steps([[Facet::Length(4)].as_slice()]);
        assert_eq!(set.length_range(), (Some(4), Some(4)));
        assert_eq!(set.present(), vec!["length"]);
    }
}

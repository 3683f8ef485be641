//! XSD regular expressions to ECMA-262
//!
//! XSD patterns are close to ECMA-262 but not the same language. The
//! differences handled here:
//!
//! - `^` and `$` are plain characters in XSD, anchors in ECMA-262
//! - `\i`, `\c` and their complements expand to XML name character classes
//! - class subtraction (`[a-z-[aeiou]]`) and Unicode block escapes
//!   (`\p{IsBasicLatin}`) have no ECMA-262 form and are rejected

use thiserror::Error;

/// XML initial name characters (`\i`), as ECMA-262 class contents
const NAME_START: &str = ":A-Z_a-z\\u00C0-\\u00D6\\u00D8-\\u00F6\\u00F8-\\u02FF\\u0370-\\u037D\
\\u037F-\\u1FFF\\u200C-\\u200D\\u2070-\\u218F\\u2C00-\\u2FEF\\u3001-\\uD7FF\\uF900-\\uFDCF\
\\uFDF0-\\uFFFD";

/// XML name characters (`\c`) beyond the initial ones
const NAME_REST: &str = "\\-.0-9\\u00B7\\u0300-\\u036F\\u203F-\\u2040";

/// An XSD regex construct with no ECMA-262 equivalent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{construct} in pattern '{pattern}'")]
pub struct UnsupportedPattern {
    /// The construct
    pub construct: &'static str,
    /// The XSD pattern it appeared in
    pub pattern: String,
}

/// Translate one XSD pattern into ECMA-262 syntax
pub fn to_ecma(pattern: &str) -> Result<String, UnsupportedPattern> {
    let unsupported = |construct| UnsupportedPattern {
        construct,
        pattern: pattern.to_string(),
    };

    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars.next().ok_or_else(|| unsupported("trailing backslash"))?;
                match escaped {
                    'i' | 'c' => {
                        let set = name_class(escaped == 'c');
                        if in_class {
                            out.push_str(&set);
                        } else {
                            out.push('[');
                            out.push_str(&set);
                            out.push(']');
                        }
                    }
                    'I' | 'C' => {
                        if in_class {
                            return Err(unsupported(
                                "negated name escape inside a character class",
                            ));
                        }
                        out.push_str("[^");
                        out.push_str(&name_class(escaped == 'C'));
                        out.push(']');
                    }
                    'p' | 'P' => {
                        if chars.next() != Some('{') {
                            return Err(unsupported("malformed category escape"));
                        }
                        let mut name = String::new();
                        loop {
                            match chars.next() {
                                Some('}') => break,
                                Some(ch) => name.push(ch),
                                None => return Err(unsupported("malformed category escape")),
                            }
                        }
                        if name.starts_with("Is") {
                            return Err(unsupported("Unicode block escape"));
                        }
                        out.push('\\');
                        out.push(escaped);
                        out.push('{');
                        out.push_str(&name);
                        out.push('}');
                    }
                    '-' if !in_class => out.push('-'),
                    other => {
                        out.push('\\');
                        out.push(other);
                    }
                }
            }
            '[' if in_class => return Err(unsupported("character class subtraction")),
            '[' => {
                in_class = true;
                out.push('[');
                if chars.peek() == Some(&'^') {
                    chars.next();
                    out.push('^');
                }
            }
            '-' if in_class && chars.peek() == Some(&'[') => {
                return Err(unsupported("character class subtraction"));
            }
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            '^' | '$' if !in_class => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

fn name_class(rest: bool) -> String {
    if rest {
        format!("{}{}", NAME_START, NAME_REST)
    } else {
        NAME_START.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_patterns_pass_through() {
        assert_eq!(to_ecma("[A-Z]{2}[0-9]+").unwrap(), "[A-Z]{2}[0-9]+");
        assert_eq!(to_ecma(r"\d{3}-\d{4}").unwrap(), r"\d{3}-\d{4}");
        assert_eq!(to_ecma(r"[^\s]+").unwrap(), r"[^\s]+");
        assert_eq!(to_ecma(r"\p{Lu}\P{N}").unwrap(), r"\p{Lu}\P{N}");
    }

    #[test]
    fn test_anchors_are_literal() {
        assert_eq!(to_ecma("^a$").unwrap(), r"\^a\$");
        assert_eq!(to_ecma("[^$]").unwrap(), "[^$]");
        assert_eq!(to_ecma(r"a\-b").unwrap(), "a-b");
    }

    #[test]
    fn test_name_escapes_expand() {
        let start = to_ecma(r"\i").unwrap();
        assert!(start.starts_with("[:A-Z_a-z"));
        assert!(start.ends_with(']'));

        let name = to_ecma(r"\i\c*").unwrap();
        assert!(name.contains(r"\-.0-9"));
        assert!(name.ends_with("]*"));

        let in_class = to_ecma(r"[\c ]").unwrap();
        assert!(in_class.starts_with("[:A-Z_a-z"));
        assert!(in_class.ends_with(" ]"));

        assert!(to_ecma(r"\I").unwrap().starts_with("[^:A-Z"));
    }

    #[test]
    fn test_inexpressible_constructs() {
        let err = to_ecma("[a-z-[aeiou]]").unwrap_err();
        assert_eq!(err.construct, "character class subtraction");
        assert_eq!(err.pattern, "[a-z-[aeiou]]");

        assert_eq!(
            to_ecma(r"\p{IsBasicLatin}+").unwrap_err().construct,
            "Unicode block escape"
        );
        assert!(to_ecma(r"[\I]").is_err());
        assert!(to_ecma(r"\p{L").is_err());
        assert!(to_ecma("ab\\").is_err());
    }
}

//! XSD particles
//!
//! Occurrence bounds and the particle tree of complex type content models.
//!
//! Reference: https://www.w3.org/TR/xmlschema-1/#cParticles

use std::fmt;

use crate::error::ParseError;
use crate::locations::SourceLocation;

use super::{DeclRef, Reference};

/// Occurrence bounds for a particle (minOccurs, maxOccurs)
/// None for max means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Occurs {
    /// Minimum number of occurrences (default 1)
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded, default 1)
    pub max: Option<u32>,
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Default occurrence (1, 1)
    pub fn once() -> Self {
        Self {
            min: 1,
            max: Some(1),
        }
    }

    /// Optional occurrence (0, 1)
    pub fn optional() -> Self {
        Self {
            min: 0,
            max: Some(1),
        }
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// Check if this particle can be absent (minOccurs == 0)
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// Check if this particle never occurs (maxOccurs == 0)
    pub fn is_empty(&self) -> bool {
        self.max == Some(0)
    }

    /// Check if particle has maxOccurs == 1
    pub fn is_single(&self) -> bool {
        self.max == Some(1)
    }

    /// Check if particle can have multiple occurrences
    pub fn is_multiple(&self) -> bool {
        !self.is_empty() && !self.is_single()
    }

    /// Sum of two bounds, for a name repeated inside one sequence
    pub fn add(self, other: Occurs) -> Occurs {
        let max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.saturating_add(b)),
            _ => None,
        };
        Occurs::new(self.min.saturating_add(other.min), max)
    }

    /// Product of two bounds, for a particle nested in a repeated group
    pub fn multiply(self, other: Occurs) -> Occurs {
        let max = match (self.max, other.max) {
            (Some(0), _) | (_, Some(0)) => Some(0),
            (Some(a), Some(b)) => Some(a.saturating_mul(b)),
            _ => None,
        };
        Occurs::new(self.min.saturating_mul(other.min), max)
    }

    /// The same bounds with the minimum relaxed to zero
    pub fn relaxed(self) -> Occurs {
        Occurs::new(0, self.max)
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

impl fmt::Display for Occurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "{}..unbounded", self.min),
        }
    }
}

/// Parse minOccurs/maxOccurs from XML attribute values
pub fn parse_occurs(
    min_occurs: Option<&str>,
    max_occurs: Option<&str>,
) -> std::result::Result<Occurs, ParseError> {
    let mut occurs = Occurs::once();

    if let Some(min_str) = min_occurs {
        occurs.min = min_str.trim().parse::<u32>().map_err(|_| {
            ParseError::new(format!(
                "minOccurs value '{}' is not a valid non-negative integer",
                min_str
            ))
        })?;
    }

    if let Some(max_str) = max_occurs {
        let max_str = max_str.trim();
        if max_str == "unbounded" {
            occurs.max = None;
        } else {
            let max = max_str.parse::<u32>().map_err(|_| {
                ParseError::new(format!(
                    "maxOccurs value '{}' must be a non-negative integer or 'unbounded'",
                    max_str
                ))
            })?;
            occurs.max = Some(max);
        }
    }

    if let Some(max) = occurs.max {
        if occurs.min > max {
            return Err(ParseError::new(format!(
                "minOccurs ({}) is greater than maxOccurs ({})",
                occurs.min, max
            )));
        }
    }

    Ok(occurs)
}

/// Model group compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compositor {
    /// xs:sequence
    Sequence,
    /// xs:choice
    Choice,
    /// xs:all
    All,
}

impl Compositor {
    /// Lowercase XSD name of the compositor
    pub fn as_str(&self) -> &'static str {
        match self {
            Compositor::Sequence => "sequence",
            Compositor::Choice => "choice",
            Compositor::All => "all",
        }
    }
}

/// A particle of a complex type's content model, as declared
#[derive(Debug, Clone)]
pub enum Particle {
    /// Local element declaration or reference to a global element
    Element {
        /// The element
        decl: DeclRef,
        /// Occurrence bounds
        occurs: Occurs,
    },
    /// Reference to a named model group
    Group {
        /// The referenced group
        target: Reference,
        /// Occurrence bounds of the reference
        occurs: Occurs,
    },
    /// xs:sequence
    Sequence {
        /// Child particles
        children: Vec<Particle>,
        /// Occurrence bounds
        occurs: Occurs,
    },
    /// xs:choice
    Choice {
        /// Child particles
        children: Vec<Particle>,
        /// Occurrence bounds
        occurs: Occurs,
    },
    /// xs:all
    All {
        /// Child particles
        children: Vec<Particle>,
        /// Occurrence bounds
        occurs: Occurs,
    },
    /// Element wildcard (xs:any)
    Any {
        /// Occurrence bounds
        occurs: Occurs,
        /// Where the wildcard was declared
        location: SourceLocation,
    },
}

impl Particle {
    /// Build a model group particle from its compositor
    pub fn model_group(compositor: Compositor, children: Vec<Particle>, occurs: Occurs) -> Self {
        match compositor {
            Compositor::Sequence => Particle::Sequence { children, occurs },
            Compositor::Choice => Particle::Choice { children, occurs },
            Compositor::All => Particle::All { children, occurs },
        }
    }

    /// Get the occurrence bounds
    pub fn occurs(&self) -> Occurs {
        match self {
            Particle::Element { occurs, .. }
            | Particle::Group { occurs, .. }
            | Particle::Sequence { occurs, .. }
            | Particle::Choice { occurs, .. }
            | Particle::All { occurs, .. }
            | Particle::Any { occurs, .. } => *occurs,
        }
    }

    /// Compositor and children when this is a model group
    pub fn as_model_group(&self) -> Option<(Compositor, &[Particle])> {
        match self {
            Particle::Sequence { children, .. } => Some((Compositor::Sequence, children)),
            Particle::Choice { children, .. } => Some((Compositor::Choice, children)),
            Particle::All { children, .. } => Some((Compositor::All, children)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occurs_presets() {
        assert_eq!(Occurs::default(), Occurs::new(1, Some(1)));
        assert_eq!(Occurs::optional(), Occurs::new(0, Some(1)));
        assert_eq!(Occurs::zero_or_more(), Occurs::new(0, None));
    }

    #[test]
    fn test_occurs_predicates() {
        let optional = Occurs::optional();
        assert!(optional.is_emptiable());
        assert!(!optional.is_empty());
        assert!(optional.is_single());
        assert!(!optional.is_multiple());

        let unbounded = Occurs::zero_or_more();
        assert!(unbounded.is_multiple());
        assert!(Occurs::new(0, Some(0)).is_empty());
        assert!(!Occurs::new(0, Some(0)).is_multiple());
    }

    #[test]
    fn test_occurs_arithmetic() {
        assert_eq!(
            Occurs::new(1, Some(2)).add(Occurs::new(0, Some(3))),
            Occurs::new(1, Some(5))
        );
        assert_eq!(
            Occurs::new(1, Some(2)).add(Occurs::zero_or_more()),
            Occurs::new(1, None)
        );
        assert_eq!(
            Occurs::new(2, Some(3)).multiply(Occurs::new(1, Some(4))),
            Occurs::new(2, Some(12))
        );
        assert_eq!(
            Occurs::zero_or_more().multiply(Occurs::new(0, Some(0))),
            Occurs::new(0, Some(0))
        );
    }

    #[test]
    fn test_parse_occurs() {
        assert_eq!(parse_occurs(None, None).unwrap(), Occurs::once());
        assert_eq!(
            parse_occurs(Some("0"), Some("unbounded")).unwrap(),
            Occurs::zero_or_more()
        );
        assert_eq!(
            parse_occurs(Some("2"), Some("5")).unwrap(),
            Occurs::new(2, Some(5))
        );
        assert_eq!(parse_occurs(Some("0"), Some("0")).unwrap(), Occurs::new(0, Some(0)));
    }

    #[test]
    fn test_parse_occurs_errors() {
        assert!(parse_occurs(Some("-1"), None).is_err());
        assert!(parse_occurs(Some("x"), None).is_err());
        assert!(parse_occurs(None, Some("many")).is_err());
        assert!(parse_occurs(Some("3"), Some("2")).is_err());
        // default maxOccurs is 1
        assert!(parse_occurs(Some("2"), None).is_err());
    }

    #[test]
    fn test_occurs_display() {
        assert_eq!(Occurs::new(2, Some(5)).to_string(), "2..5");
        assert_eq!(Occurs::zero_or_more().to_string(), "0..unbounded");
    }
}

//! Content expansion
//!
//! Turns a resolved particle tree into a [`ContentParticle`] tree with no
//! group references left: named groups are copied in by value and
//! substitution group heads become choices over their members.

use std::collections::{HashSet, VecDeque};

use crate::error::{ParseError, Result};
use crate::locations::SourceLocation;
use crate::namespaces::QName;

use super::components::{DeclContent, DeclRef};
use super::particles::{Compositor, Occurs, Particle};
use super::symbols::SymbolTable;
use super::{DeclId, SymbolSpace};

/// A particle after group and substitution expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentParticle {
    /// An element declaration
    Element {
        /// The element
        decl: DeclId,
        /// Occurrence bounds
        occurs: Occurs,
    },
    /// A sequence, choice or all
    Compositor {
        /// Which compositor
        kind: Compositor,
        /// Occurrence bounds
        occurs: Occurs,
        /// Expanded children
        children: Vec<ContentParticle>,
        /// Name of the group or substitution head the compositor came from
        origin: Option<QName>,
    },
    /// Element wildcard
    Wildcard {
        /// Occurrence bounds
        occurs: Occurs,
        /// Where the wildcard was declared
        location: SourceLocation,
    },
}

impl ContentParticle {
    /// Occurrence bounds
    pub fn occurs(&self) -> Occurs {
        match self {
            ContentParticle::Element { occurs, .. }
            | ContentParticle::Compositor { occurs, .. }
            | ContentParticle::Wildcard { occurs, .. } => *occurs,
        }
    }

    /// Whether the particle can match nothing at all
    pub fn is_emptiable(&self) -> bool {
        if self.occurs().is_emptiable() {
            return true;
        }
        match self {
            ContentParticle::Compositor {
                kind: Compositor::Choice,
                children,
                ..
            } => children.is_empty() || children.iter().any(ContentParticle::is_emptiable),
            ContentParticle::Compositor { children, .. } => {
                children.iter().all(ContentParticle::is_emptiable)
            }
            ContentParticle::Element { .. } | ContentParticle::Wildcard { .. } => false,
        }
    }
}

/// Expand a particle tree; `None` when the particle can never occur
pub fn expand_particle(
    table: &SymbolTable,
    particle: &Particle,
) -> Result<Option<ContentParticle>> {
    if particle.occurs().is_empty() {
        return Ok(None);
    }

    match particle {
        Particle::Element { decl, occurs } => {
            let id = element_id(table, decl)?;
            expand_element(table, id, *occurs)
        }
        Particle::Group { target, occurs } => {
            let group_id = table.target(target, SymbolSpace::Group)?;
            let DeclContent::Group(group) = &table.get(group_id).content else {
                return Err(table.kind_mismatch(group_id, "a model group"));
            };
            let Some((kind, children)) = group.particle.as_model_group() else {
                return Err(table.kind_mismatch(group_id, "a model group"));
            };
            let occurs = occurs.multiply(group.particle.occurs());
            if occurs.is_empty() {
                return Ok(None);
            }
            Ok(Some(ContentParticle::Compositor {
                kind,
                occurs,
                children: expand_children(table, children)?,
                origin: Some(target.name.clone()),
            }))
        }
        Particle::Sequence { children, occurs }
        | Particle::Choice { children, occurs }
        | Particle::All { children, occurs } => {
            let kind = match particle {
                Particle::Choice { .. } => Compositor::Choice,
                Particle::All { .. } => Compositor::All,
                _ => Compositor::Sequence,
            };
            Ok(Some(ContentParticle::Compositor {
                kind,
                occurs: *occurs,
                children: expand_children(table, children)?,
                origin: None,
            }))
        }
        Particle::Any { occurs, location } => Ok(Some(ContentParticle::Wildcard {
            occurs: *occurs,
            location: location.clone(),
        })),
    }
}

fn expand_children(table: &SymbolTable, children: &[Particle]) -> Result<Vec<ContentParticle>> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        if let Some(expanded) = expand_particle(table, child)? {
            out.push(expanded);
        }
    }
    Ok(out)
}

fn element_id(table: &SymbolTable, decl: &DeclRef) -> Result<DeclId> {
    match decl {
        DeclRef::Named(reference) => table.target(reference, SymbolSpace::Element),
        DeclRef::Local(id) => Ok(*id),
        DeclRef::Inline(inline) => Err(ParseError::new(format!(
            "{} was not registered in the symbol table",
            inline.describe()
        ))
        .with_location(inline.location.clone())
        .into()),
    }
}

fn expand_element(
    table: &SymbolTable,
    id: DeclId,
    occurs: Occurs,
) -> Result<Option<ContentParticle>> {
    let head = table.element(id)?;
    if head.block_substitution || table.substitution_members(id).is_empty() {
        if head.is_abstract {
            return Ok(None);
        }
        return Ok(Some(ContentParticle::Element { decl: id, occurs }));
    }

    let mut alternatives = Vec::new();
    if !head.is_abstract {
        alternatives.push(id);
    }

    let mut visited: HashSet<DeclId> = HashSet::from([id]);
    let mut queue: VecDeque<DeclId> = table.substitution_members(id).iter().copied().collect();
    while let Some(member) = queue.pop_front() {
        if !visited.insert(member) {
            continue;
        }
        if !table.element(member)?.is_abstract {
            alternatives.push(member);
        }
        queue.extend(table.substitution_members(member).iter().copied());
    }

    Ok(match alternatives.as_slice() {
        [] => None,
        [single] => Some(ContentParticle::Element {
            decl: *single,
            occurs,
        }),
        _ => Some(ContentParticle::Compositor {
            kind: Compositor::Choice,
            occurs,
            children: alternatives
                .into_iter()
                .map(|decl| ContentParticle::Element {
                    decl,
                    occurs: Occurs::once(),
                })
                .collect(),
            origin: Some(head.name.clone()),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::Limits;
    use crate::xsd::components::ComplexTypeDef;
    use crate::xsd::parsing::parse_document;
    use crate::xsd::resolver::resolve;

    fn table(body: &str) -> SymbolTable {
        let text = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">{}</xs:schema>"#,
            body
        );
        let doc = parse_document("test.xsd", &text, &Limits::default()).unwrap();
        resolve(&[doc], "test.xsd", &Limits::default()).unwrap().0
    }

    fn content_of(table: &SymbolTable, type_name: &str) -> Option<ContentParticle> {
        let id = table
            .lookup(SymbolSpace::Type, &QName::local(type_name))
            .unwrap();
        let DeclContent::ComplexType(ComplexTypeDef {
            particle: Some(particle),
            ..
        }) = &table.get(id).content
        else {
            panic!("{type_name} has no particle");
        };
        expand_particle(table, particle).unwrap()
    }

    fn element_name(table: &SymbolTable, particle: &ContentParticle) -> String {
        match particle {
            ContentParticle::Element { decl, .. } => {
                table.element(*decl).unwrap().name.local_name.clone()
            }
            other => panic!("not an element: {other:?}"),
        }
    }

    #[test]
    fn test_group_reference_is_spliced() {
        let t = table(
            r#"<xs:group name="Address"><xs:sequence>
                 <xs:element name="street" type="xs:string"/>
                 <xs:element name="city" type="xs:string"/>
               </xs:sequence></xs:group>
               <xs:complexType name="Person"><xs:sequence>
                 <xs:element name="name" type="xs:string"/>
                 <xs:group ref="Address" maxOccurs="3"/>
               </xs:sequence></xs:complexType>"#,
        );
        let Some(ContentParticle::Compositor { children, .. }) = content_of(&t, "Person") else {
            panic!("expected a compositor");
        };
        assert_eq!(children.len(), 2);
        match &children[1] {
            ContentParticle::Compositor {
                kind,
                occurs,
                children,
                origin,
            } => {
                assert_eq!(*kind, Compositor::Sequence);
                assert_eq!(*occurs, Occurs::new(1, Some(3)));
                assert_eq!(origin.as_ref().unwrap().local_name, "Address");
                assert_eq!(element_name(&t, &children[0]), "street");
            }
            other => panic!("unexpected particle: {other:?}"),
        }
    }

    #[test]
    fn test_zero_max_occurs_is_dropped() {
        let t = table(
            r#"<xs:complexType name="T"><xs:sequence>
                 <xs:element name="a" type="xs:string"/>
                 <xs:element name="b" type="xs:string" minOccurs="0" maxOccurs="0"/>
               </xs:sequence></xs:complexType>"#,
        );
        let Some(ContentParticle::Compositor { children, .. }) = content_of(&t, "T") else {
            panic!("expected a compositor");
        };
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn test_substitution_head_becomes_choice() {
        let t = table(
            r#"<xs:element name="shape" type="xs:string" abstract="true"/>
               <xs:element name="circle" substitutionGroup="shape"/>
               <xs:element name="polygon" substitutionGroup="shape" abstract="true"/>
               <xs:element name="square" substitutionGroup="polygon"/>
               <xs:complexType name="Drawing"><xs:sequence>
                 <xs:element ref="shape" maxOccurs="unbounded"/>
               </xs:sequence></xs:complexType>"#,
        );
        let Some(ContentParticle::Compositor { children, .. }) = content_of(&t, "Drawing") else {
            panic!("expected a compositor");
        };
        match &children[0] {
            ContentParticle::Compositor {
                kind: Compositor::Choice,
                occurs,
                children,
                origin,
            } => {
                assert_eq!(*occurs, Occurs::new(1, None));
                assert_eq!(origin.as_ref().unwrap().local_name, "shape");
                let names: Vec<_> = children.iter().map(|c| element_name(&t, c)).collect();
                assert_eq!(names, vec!["circle", "square"]);
            }
            other => panic!("unexpected particle: {other:?}"),
        }
    }

    #[test]
    fn test_blocked_substitution_keeps_head() {
        let t = table(
            r#"<xs:element name="note" type="xs:string" block="substitution"/>
               <xs:element name="memo" substitutionGroup="note"/>
               <xs:complexType name="T"><xs:sequence><xs:element ref="note"/></xs:sequence></xs:complexType>"#,
        );
        let Some(ContentParticle::Compositor { children, .. }) = content_of(&t, "T") else {
            panic!("expected a compositor");
        };
        assert_eq!(element_name(&t, &children[0]), "note");
    }

    #[test]
    fn test_emptiable() {
        let element = |min| ContentParticle::Element {
            decl: DeclId(0),
            occurs: Occurs::new(min, Some(1)),
        };
        let sequence = ContentParticle::Compositor {
            kind: Compositor::Sequence,
            occurs: Occurs::once(),
            children: vec![element(0), element(1)],
            origin: None,
        };
        assert!(!sequence.is_emptiable());

        let choice = ContentParticle::Compositor {
            kind: Compositor::Choice,
            occurs: Occurs::once(),
            children: vec![element(0), element(1)],
            origin: None,
        };
        assert!(choice.is_emptiable());
    }
}

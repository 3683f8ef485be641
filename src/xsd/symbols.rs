//! Symbol table
//!
//! Arena of every declaration of a conversion run, addressed by [`DeclId`],
//! plus the `(SymbolSpace, QName)` index of the top-level ones and the
//! substitution group membership. Read-only once the resolver returns it.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{Error, ParseError, Result};
use crate::namespaces::QName;

use super::components::{DeclContent, Declaration, ElementDecl, Reference};
use super::{DeclId, SymbolSpace};

/// Resolved declarations of a schema set
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    declarations: Vec<Declaration>,
    index: HashMap<(SymbolSpace, QName), DeclId>,
    substitution_groups: IndexMap<DeclId, Vec<DeclId>>,
    builtin_count: usize,
}

impl SymbolTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of declarations in the arena
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Whether the arena is empty
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Get a declaration by handle
    pub fn get(&self, id: DeclId) -> &Declaration {
        &self.declarations[id.0]
    }

    /// Look up a top-level declaration
    pub fn lookup(&self, space: SymbolSpace, name: &QName) -> Option<DeclId> {
        self.index.get(&(space, name.clone())).copied()
    }

    /// Iterate over all declarations in arena order
    pub fn iter(&self) -> impl Iterator<Item = (DeclId, &Declaration)> {
        self.declarations
            .iter()
            .enumerate()
            .map(|(i, decl)| (DeclId(i), decl))
    }

    /// Iterate over the top-level declarations that came from schema documents
    pub fn named(&self) -> impl Iterator<Item = (DeclId, &Declaration)> {
        self.iter()
            .skip(self.builtin_count)
            .filter(|(_, decl)| decl.is_named())
    }

    /// Whether the declaration is one of the predeclared built-ins
    pub fn is_builtin(&self, id: DeclId) -> bool {
        id.0 < self.builtin_count
    }

    /// Direct members of a substitution group head, in declaration order
    pub fn substitution_members(&self, head: DeclId) -> &[DeclId] {
        self.substitution_groups
            .get(&head)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All substitution groups, heads in declaration order
    pub fn substitution_groups(&self) -> impl Iterator<Item = (DeclId, &[DeclId])> {
        self.substitution_groups
            .iter()
            .map(|(head, members)| (*head, members.as_slice()))
    }

    /// The element declaration behind a handle
    pub fn element(&self, id: DeclId) -> Result<&ElementDecl> {
        match &self.get(id).content {
            DeclContent::Element(decl) => Ok(decl),
            _ => Err(self.kind_mismatch(id, "an element")),
        }
    }

    /// Target of a bound reference
    pub fn target(&self, reference: &Reference, space: SymbolSpace) -> Result<DeclId> {
        reference.target.ok_or_else(|| Error::UnresolvedReference {
            space,
            name: reference.name.to_string(),
            referrer: "unbound reference".to_string(),
            document: String::new(),
        })
    }

    pub(crate) fn kind_mismatch(&self, id: DeclId, expected: &str) -> Error {
        let decl = self.get(id);
        ParseError::new(format!("{} is not {}", decl.describe(), expected))
            .with_location(decl.location.clone())
            .into()
    }

    // =========================================================================
    // Construction (resolver only)
    // =========================================================================

    pub(crate) fn push(&mut self, decl: Declaration) -> DeclId {
        let id = DeclId(self.declarations.len());
        self.declarations.push(decl);
        id
    }

    pub(crate) fn push_builtin(&mut self, decl: Declaration) -> DeclId {
        let id = self.push(decl);
        self.builtin_count = self.declarations.len();
        id
    }

    pub(crate) fn register(&mut self, space: SymbolSpace, name: QName, id: DeclId) {
        self.index.insert((space, name), id);
    }

    pub(crate) fn add_substitution_member(&mut self, head: DeclId, member: DeclId) {
        self.substitution_groups.entry(head).or_default().push(member);
    }

    pub(crate) fn parts_mut(
        &mut self,
    ) -> (&mut Vec<Declaration>, &HashMap<(SymbolSpace, QName), DeclId>) {
        (&mut self.declarations, &self.index)
    }
}

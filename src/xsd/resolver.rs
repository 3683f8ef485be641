//! Reference resolution
//!
//! Merges every schema document reachable from the root into one
//! [`SymbolTable`]: follows include/import edges, applies chameleon
//! namespaces, detects duplicate declarations, binds every reference and
//! rejects inheritance and group cycles. Resolution either fully succeeds
//! or fails with the first error found.

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, ParseError, Result};
use crate::limits::Limits;
use crate::locations::resolve_reference;
use crate::namespaces::XML_NAMESPACE;

use super::builtins::xml_attribute_declarations;
use super::components::{ContentModel, DeclContent, Declaration, SimpleTypeDef, TypeRef};
use super::particles::Particle;
use super::schemas::{ReferenceKind, SchemaDocument};
use super::symbols::SymbolTable;
use super::{DeclId, SymbolSpace};

/// Summary of a resolution run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    /// Identifiers of the documents used, in load order
    pub documents: Vec<String>,
    /// Supplied documents not reachable from the root
    pub unreachable: Vec<String>,
    /// Number of top-level declarations per symbol space
    pub declarations: IndexMap<SymbolSpace, usize>,
    /// Number of anonymous and local declarations
    pub anonymous: usize,
    /// Substitution group members by head name
    pub substitution_groups: IndexMap<String, Vec<String>>,
}

/// A document instantiated in one effective target namespace.
///
/// A chameleon document included from two namespaces yields two nodes.
#[derive(Debug)]
struct Node {
    doc: usize,
    namespace: Option<String>,
    chameleon: bool,
}

/// Resolve a set of parsed documents starting at `root_id`
pub fn resolve(
    documents: &[SchemaDocument],
    root_id: &str,
    limits: &Limits,
) -> Result<(SymbolTable, ResolutionReport)> {
    limits.check_documents(documents.len())?;

    let nodes_and_edges = reachable_nodes(documents, root_id)?;
    let (nodes, include_edges) = nodes_and_edges;
    let families = include_families(nodes.len(), &include_edges);

    let mut table = SymbolTable::new();
    for builtin in xml_attribute_declarations() {
        let space = builtin.space();
        let name = builtin.name().cloned();
        let id = store(&mut table, builtin, true)?;
        if let Some(name) = name {
            table.register(space, name, id);
        }
    }

    merge(documents, &nodes, &families, &mut table)?;
    limits.check_declarations(table.len())?;

    bind_references(&mut table)?;
    collect_substitution_groups(&mut table)?;
    check_inheritance_cycles(&table)?;
    check_group_cycles(&table)?;

    let report = build_report(documents, &nodes, &table);
    info!(
        documents = report.documents.len(),
        declarations = table.len(),
        "resolved schema set"
    );

    Ok((table, report))
}

// =============================================================================
// Reachability
// =============================================================================

fn reachable_nodes(
    documents: &[SchemaDocument],
    root_id: &str,
) -> Result<(Vec<Node>, Vec<(usize, usize)>)> {
    let by_id: HashMap<&str, usize> = documents
        .iter()
        .enumerate()
        .map(|(i, doc)| (doc.id.as_str(), i))
        .collect();

    let root = *by_id.get(root_id).ok_or_else(|| Error::MissingDocument {
        location: root_id.to_string(),
        referrer: "(root)".to_string(),
    })?;

    let mut nodes = vec![Node {
        doc: root,
        namespace: documents[root].target_namespace.clone(),
        chameleon: false,
    }];
    let mut node_index: HashMap<(usize, Option<String>), usize> = HashMap::new();
    node_index.insert((root, documents[root].target_namespace.clone()), 0);

    let mut include_edges = Vec::new();
    let mut queue = VecDeque::from([0usize]);

    while let Some(current) = queue.pop_front() {
        let doc = &documents[nodes[current].doc];
        let namespace = nodes[current].namespace.clone();

        for reference in &doc.references {
            let targets: Vec<usize> = match &reference.location {
                Some(hint) => {
                    let target_id = resolve_reference(&doc.id, hint);
                    match by_id.get(target_id.as_str()) {
                        Some(&target) => vec![target],
                        None if reference.kind == ReferenceKind::Import
                            && reference.namespace.as_deref() == Some(XML_NAMESPACE) =>
                        {
                            debug!(document = %doc.id, "using built-in XML namespace attributes");
                            Vec::new()
                        }
                        None => {
                            return Err(Error::MissingDocument {
                                location: target_id,
                                referrer: doc.id.clone(),
                            })
                        }
                    }
                }
                None => documents
                    .iter()
                    .enumerate()
                    .filter(|(_, d)| d.target_namespace == reference.namespace)
                    .map(|(i, _)| i)
                    .collect(),
            };

            for target in targets {
                let target_doc = &documents[target];
                let (effective, chameleon) = match reference.kind {
                    ReferenceKind::Include => match &target_doc.target_namespace {
                        None => (namespace.clone(), namespace.is_some()),
                        Some(ns) if Some(ns) == namespace.as_ref() => (namespace.clone(), false),
                        Some(ns) => {
                            return Err(ParseError::new(format!(
                                "Included document '{}' has target namespace '{}', expected {}",
                                target_doc.id,
                                ns,
                                describe_namespace(namespace.as_deref())
                            ))
                            .at(&doc.id, reference.position)
                            .into())
                        }
                    },
                    ReferenceKind::Import => {
                        if target_doc.target_namespace != reference.namespace {
                            return Err(ParseError::new(format!(
                                "Imported document '{}' has target namespace {}, expected {}",
                                target_doc.id,
                                describe_namespace(target_doc.target_namespace.as_deref()),
                                describe_namespace(reference.namespace.as_deref())
                            ))
                            .at(&doc.id, reference.position)
                            .into());
                        }
                        (target_doc.target_namespace.clone(), false)
                    }
                };

                let key = (target, effective.clone());
                let node = match node_index.get(&key) {
                    Some(&node) => node,
                    None => {
                        let node = nodes.len();
                        debug!(
                            document = %target_doc.id,
                            referrer = %doc.id,
                            chameleon,
                            "following schema reference"
                        );
                        nodes.push(Node {
                            doc: target,
                            namespace: effective,
                            chameleon,
                        });
                        node_index.insert(key, node);
                        queue.push_back(node);
                        node
                    }
                };

                if reference.kind == ReferenceKind::Include {
                    include_edges.push((current, node));
                }
            }
        }
    }

    Ok((nodes, include_edges))
}

fn describe_namespace(namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) => format!("'{}'", ns),
        None => "no namespace".to_string(),
    }
}

/// Family representative of every node: nodes connected by include edges,
/// in either direction, share one.
fn include_families(count: usize, edges: &[(usize, usize)]) -> Vec<usize> {
    let mut parent: Vec<usize> = (0..count).collect();

    fn find(parent: &mut [usize], mut node: usize) -> usize {
        while parent[node] != node {
            parent[node] = parent[parent[node]];
            node = parent[node];
        }
        node
    }

    for &(a, b) in edges {
        let ra = find(&mut parent, a);
        let rb = find(&mut parent, b);
        if ra != rb {
            parent[ra.max(rb)] = ra.min(rb);
        }
    }

    (0..count).map(|node| find(&mut parent, node)).collect()
}

// =============================================================================
// Merge
// =============================================================================

/// Hoist nested declarations, then store the declaration itself
fn store(table: &mut SymbolTable, mut decl: Declaration, builtin: bool) -> Result<DeclId> {
    decl.hoist_inlines(&mut |nested| store(table, nested, false))?;
    Ok(if builtin {
        table.push_builtin(decl)
    } else {
        table.push(decl)
    })
}

fn merge(
    documents: &[SchemaDocument],
    nodes: &[Node],
    families: &[usize],
    table: &mut SymbolTable,
) -> Result<()> {
    let mut origin: HashMap<DeclId, usize> = HashMap::new();

    for (n, node) in nodes.iter().enumerate() {
        let doc = &documents[node.doc];

        for decl in &doc.declarations {
            let mut decl = decl.clone();
            if node.chameleon {
                if let Some(ns) = &node.namespace {
                    decl.adopt_namespace(ns)?;
                }
            }

            let space = decl.space();
            let Some(name) = decl.name().cloned() else {
                continue;
            };

            if let Some(existing) = table.lookup(space, &name) {
                if table.is_builtin(existing) {
                    debug!(%name, "keeping built-in declaration");
                    continue;
                }
                let first = origin.get(&existing).copied().unwrap_or(n);
                if first != n && families[first] == families[n] {
                    debug!(
                        %name,
                        %space,
                        document = %doc.id,
                        "duplicate within include family, keeping first"
                    );
                    continue;
                }
                return Err(Error::ConflictingDeclaration {
                    space,
                    name: name.to_string(),
                    first: documents[nodes[first].doc].id.clone(),
                    second: doc.id.clone(),
                });
            }

            let id = store(table, decl, false)?;
            table.register(space, name, id);
            origin.insert(id, n);
        }
    }

    Ok(())
}

// =============================================================================
// Binding
// =============================================================================

fn bind_references(table: &mut SymbolTable) -> Result<()> {
    let (declarations, index) = table.parts_mut();

    for decl in declarations.iter_mut() {
        let referrer = decl.describe();
        let document = decl.location.document.clone();

        decl.visit_references_mut(&mut |space, reference| {
            match index.get(&(space, reference.name.clone())) {
                Some(&id) => {
                    reference.target = Some(id);
                    Ok(())
                }
                None => Err(Error::UnresolvedReference {
                    space,
                    name: reference.name.to_string(),
                    referrer: referrer.clone(),
                    document: document.clone(),
                }),
            }
        })?;
    }

    Ok(())
}

fn collect_substitution_groups(table: &mut SymbolTable) -> Result<()> {
    let mut memberships = Vec::new();
    for (id, decl) in table.iter() {
        if let DeclContent::Element(element) = &decl.content {
            if let Some(head) = &element.substitution_group {
                memberships.push((table.target(head, SymbolSpace::Element)?, id));
            }
        }
    }

    for (head, member) in memberships {
        table.add_substitution_member(head, member);
    }
    Ok(())
}

// =============================================================================
// Cycle detection
// =============================================================================

/// Types a type declaration is defined in terms of: its base type, list
/// item type or union member types
fn type_dependencies(decl: &Declaration) -> Vec<DeclId> {
    match &decl.content {
        DeclContent::SimpleType(SimpleTypeDef::Restriction { base, .. }) => {
            base.decl_id().into_iter().collect()
        }
        DeclContent::SimpleType(SimpleTypeDef::List { item }) => {
            item.decl_id().into_iter().collect()
        }
        DeclContent::SimpleType(SimpleTypeDef::Union { members }) => {
            members.iter().filter_map(TypeRef::decl_id).collect()
        }
        DeclContent::ComplexType(def) => match &def.content {
            ContentModel::Simple { base, .. } => base.decl_id().into_iter().collect(),
            ContentModel::Complex(Some(derivation)) => {
                derivation.base.decl_id().into_iter().collect()
            }
            ContentModel::Complex(None) | ContentModel::Empty => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn check_inheritance_cycles(table: &SymbolTable) -> Result<()> {
    let mut done: HashSet<DeclId> = HashSet::new();

    fn visit(
        table: &SymbolTable,
        id: DeclId,
        path: &mut Vec<DeclId>,
        done: &mut HashSet<DeclId>,
    ) -> Result<()> {
        if done.contains(&id) {
            return Ok(());
        }
        if let Some(start) = path.iter().position(|&p| p == id) {
            let mut chain: Vec<String> = path[start..]
                .iter()
                .map(|&p| table.get(p).display_name())
                .collect();
            chain.push(table.get(id).display_name());
            return Err(Error::CyclicInheritance {
                chain,
                document: table.get(path[start]).location.document.clone(),
            });
        }

        path.push(id);
        for dependency in type_dependencies(table.get(id)) {
            visit(table, dependency, path, done)?;
        }
        path.pop();
        done.insert(id);
        Ok(())
    }

    for (id, decl) in table.iter() {
        if decl.space() == SymbolSpace::Type {
            visit(table, id, &mut Vec::new(), &mut done)?;
        }
    }

    Ok(())
}

fn group_children(decl: &Declaration) -> Vec<DeclId> {
    fn walk(particle: &Particle, out: &mut Vec<DeclId>) {
        match particle {
            Particle::Group { target, .. } => out.extend(target.target),
            Particle::Sequence { children, .. }
            | Particle::Choice { children, .. }
            | Particle::All { children, .. } => {
                for child in children {
                    walk(child, out);
                }
            }
            Particle::Element { .. } | Particle::Any { .. } => {}
        }
    }

    let mut out = Vec::new();
    match &decl.content {
        DeclContent::Group(def) => walk(&def.particle, &mut out),
        DeclContent::AttributeGroup(def) => {
            out.extend(def.attributes.groups.iter().filter_map(|g| g.target))
        }
        _ => {}
    }
    out
}

fn check_group_cycles(table: &SymbolTable) -> Result<()> {
    let mut done: HashSet<DeclId> = HashSet::new();

    fn visit(
        table: &SymbolTable,
        id: DeclId,
        path: &mut Vec<DeclId>,
        done: &mut HashSet<DeclId>,
    ) -> Result<()> {
        if done.contains(&id) {
            return Ok(());
        }
        if let Some(start) = path.iter().position(|&p| p == id) {
            let mut chain: Vec<String> = path[start..]
                .iter()
                .map(|&p| table.get(p).display_name())
                .collect();
            chain.push(table.get(id).display_name());
            let first = table.get(path[start]);
            return Err(Error::CyclicGroup {
                space: first.space(),
                chain,
                document: first.location.document.clone(),
            });
        }

        path.push(id);
        for child in group_children(table.get(id)) {
            visit(table, child, path, done)?;
        }
        path.pop();
        done.insert(id);
        Ok(())
    }

    for (id, decl) in table.iter() {
        if matches!(
            decl.space(),
            SymbolSpace::Group | SymbolSpace::AttributeGroup
        ) {
            visit(table, id, &mut Vec::new(), &mut done)?;
        }
    }

    Ok(())
}

// =============================================================================
// Report
// =============================================================================

fn build_report(
    documents: &[SchemaDocument],
    nodes: &[Node],
    table: &SymbolTable,
) -> ResolutionReport {
    let mut report = ResolutionReport::default();

    for node in nodes {
        let id = &documents[node.doc].id;
        if !report.documents.contains(id) {
            report.documents.push(id.clone());
        }
    }
    report.unreachable = documents
        .iter()
        .filter(|doc| !report.documents.contains(&doc.id))
        .map(|doc| doc.id.clone())
        .collect();
    for doc in &report.unreachable {
        debug!(document = %doc, "document not reachable from the root");
    }

    for space in SymbolSpace::ALL {
        report.declarations.insert(space, 0);
    }
    for (_, decl) in table.named() {
        *report.declarations.entry(decl.space()).or_insert(0) += 1;
    }
    report.anonymous = table
        .iter()
        .filter(|(id, decl)| !table.is_builtin(*id) && !decl.is_named())
        .count();

    for (head, members) in table.substitution_groups() {
        let head_name = table.get(head).display_name();
        let member_names = members
            .iter()
            .map(|&m| table.get(m).display_name())
            .collect();
        report.substitution_groups.insert(head_name, member_names);
    }

    report
}

//! A single consent tree
//!
//! All consents sharing one root, with parent-to-child edges rebuilt from
//! their dependency paths.

use crate::consents::matcher;
use crate::consents::record::{ConsentId, ConsentRecord};
use crate::error::ConsentForestError;
use crate::scopes::ScopeNode;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Consents rooted at one top-level consent
#[derive(Debug, Clone)]
pub struct ConsentTree {
    root: ConsentRecord,
    edges: HashMap<ConsentId, BTreeSet<ConsentId>>,
    nodes: HashMap<ConsentId, ConsentRecord>,
    max_depth: usize,
}

impl ConsentTree {
    /// Build the tree rooted at `root_id` from its member consents
    ///
    /// `records` must contain the root itself. Every other record's
    /// immediate parent must be among `records` and its dependency path must
    /// extend its parent's path.
    pub fn new(
        root_id: ConsentId,
        records: impl IntoIterator<Item = ConsentRecord>,
    ) -> Result<Self, ConsentForestError> {
        let records: Vec<ConsentRecord> = records.into_iter().collect();

        let mut nodes: HashMap<ConsentId, ConsentRecord> = HashMap::with_capacity(records.len());
        let mut order: Vec<ConsentId> = Vec::with_capacity(records.len());
        for record in records {
            record.validate()?;
            if record.root_id() != Some(root_id) {
                return Err(ConsentForestError::InvalidDependencyPath {
                    consent: record.id,
                    reason: format!("path does not start at root {}", root_id),
                });
            }
            let id = record.id;
            if nodes.insert(id, record).is_some() {
                return Err(ConsentForestError::DuplicateConsent(id));
            }
            order.push(id);
        }

        let Some(root) = nodes.get(&root_id).cloned() else {
            let orphan = order.first().copied().unwrap_or(root_id);
            return Err(ConsentForestError::MissingParent {
                consent: orphan,
                parent: root_id,
            });
        };

        let mut edges: HashMap<ConsentId, BTreeSet<ConsentId>> =
            order.iter().map(|id| (*id, BTreeSet::new())).collect();
        let mut max_depth = 0;

        for id in &order {
            let record = &nodes[id];
            max_depth = max_depth.max(record.depth());

            let Some(parent_id) = record.parent_id() else {
                continue;
            };
            let parent = nodes
                .get(&parent_id)
                .ok_or(ConsentForestError::MissingParent {
                    consent: record.id,
                    parent: parent_id,
                })?;
            check_extends_parent(record, parent)?;

            edges.entry(parent_id).or_default().insert(record.id);
        }

        Ok(Self {
            root,
            edges,
            nodes,
            max_depth,
        })
    }

    pub fn root(&self) -> &ConsentRecord {
        &self.root
    }

    pub fn root_id(&self) -> ConsentId {
        self.root.id
    }

    pub fn get_node(&self, id: ConsentId) -> Option<&ConsentRecord> {
        self.nodes.get(&id)
    }

    /// Direct children of `id`, ordered by id
    pub fn children(&self, id: ConsentId) -> impl Iterator<Item = &ConsentRecord> + '_ {
        self.edges
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|child| self.nodes.get(child))
    }

    pub fn edges(&self) -> &HashMap<ConsentId, BTreeSet<ConsentId>> {
        &self.edges
    }

    pub fn nodes(&self) -> &HashMap<ConsentId, ConsentRecord> {
        &self.nodes
    }

    /// Longest root-to-leaf path, counted in consents
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Consents in depth-first order starting at the root
    pub fn iter(&self) -> impl Iterator<Item = &ConsentRecord> + '_ {
        self.walk().into_iter().map(|(record, _)| record)
    }

    /// Does this tree alone satisfy `required`?
    pub fn meets_scope_requirement(&self, required: &ScopeNode) -> bool {
        matcher::tree_meets_requirement(self, required)
    }

    /// Depth-first (record, depth) pairs, children in id order
    fn walk(&self) -> Vec<(&ConsentRecord, usize)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(&self.root, 1usize)];
        while let Some((record, depth)) = stack.pop() {
            out.push((record, depth));
            let children: Vec<&ConsentRecord> = self.children(record.id).collect();
            stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
        }
        out
    }
}

pub(crate) fn check_extends_parent(
    record: &ConsentRecord,
    parent: &ConsentRecord,
) -> Result<(), ConsentForestError> {
    let own = &record.dependency_path;
    if parent.dependency_path.as_slice() != &own[..own.len() - 1] {
        return Err(ConsentForestError::InvalidDependencyPath {
            consent: record.id,
            reason: format!("path does not extend the path of parent {}", parent.id),
        });
    }
    Ok(())
}

impl fmt::Display for ConsentTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (record, depth) in self.walk() {
            writeln!(f, "{}{}", "  ".repeat(depth - 1), record)?;
        }
        Ok(())
    }
}

//! Consent forest
//!
//! Reconstructs every consent tree from a flat consent list and answers
//! whether the held consents meet a scope requirement.

use crate::consents::matcher;
use crate::consents::record::{ConsentId, ConsentRecord};
use crate::consents::tree::{ConsentTree, check_extends_parent};
use crate::error::{ConsentForestError, ScopeResult};
use crate::scopes::{IntoScopes, ScopeCache, ScopeNode};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

/// All consent trees held by one identity, ordered by root id
#[derive(Debug, Clone, Default)]
pub struct ConsentForest {
    trees: Vec<ConsentTree>,
}

impl ConsentForest {
    /// Group `records` into trees
    ///
    /// Fails without producing a partial forest if any record has a
    /// malformed dependency path, repeats an id, or names a parent that is
    /// not in the list.
    pub fn build(
        records: impl IntoIterator<Item = ConsentRecord>,
    ) -> Result<Self, ConsentForestError> {
        let mut by_id: HashMap<ConsentId, ConsentRecord> = HashMap::new();
        let mut order: Vec<ConsentId> = Vec::new();

        for record in records {
            record.validate()?;
            let id = record.id;
            if by_id.insert(id, record).is_some() {
                return Err(ConsentForestError::DuplicateConsent(id));
            }
            order.push(id);
        }

        for id in &order {
            let record = &by_id[id];
            let Some(parent_id) = record.parent_id() else {
                continue;
            };
            let Some(parent) = by_id.get(&parent_id) else {
                return Err(ConsentForestError::MissingParent {
                    consent: record.id,
                    parent: parent_id,
                });
            };
            check_extends_parent(record, parent)?;
        }

        let mut groups: BTreeMap<ConsentId, Vec<ConsentRecord>> = BTreeMap::new();
        for id in order {
            if let Some(record) = by_id.remove(&id)
                && let Some(root) = record.root_id()
            {
                groups.entry(root).or_default().push(record);
            }
        }

        let trees = groups
            .into_iter()
            .map(|(root, members)| ConsentTree::new(root, members))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            trees = trees.len(),
            consents = trees.iter().map(ConsentTree::len).sum::<usize>(),
            "Built consent forest"
        );

        Ok(Self { trees })
    }

    pub fn trees(&self) -> &[ConsentTree] {
        &self.trees
    }

    /// Look up a consent in whichever tree holds it
    pub fn get_node(&self, id: ConsentId) -> Option<&ConsentRecord> {
        self.trees.iter().find_map(|tree| tree.get_node(id))
    }

    /// Tree whose root is `root`
    pub fn get_tree(&self, root: ConsentId) -> Option<&ConsentTree> {
        self.trees
            .binary_search_by_key(&root, ConsentTree::root_id)
            .ok()
            .map(|index| &self.trees[index])
    }

    /// Number of trees
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Total consents across all trees
    pub fn consent_count(&self) -> usize {
        self.trees.iter().map(ConsentTree::len).sum()
    }

    /// Does some single tree meet `required`?
    pub fn meets_scope_requirement(&self, required: &ScopeNode) -> bool {
        matcher::forest_meets_requirement(self, required)
    }

    /// Are all of `required` met?
    ///
    /// Accepts a scope string, a single [`ScopeNode`], or a list of them.
    /// An empty requirement list is met by any forest.
    pub fn meets_scope_requirements<R: IntoScopes>(&self, required: R) -> ScopeResult<bool> {
        let required = required.into_scopes()?;
        debug!(
            requirements = required.len(),
            trees = self.trees.len(),
            "Checking scope requirements"
        );
        Ok(matcher::forest_meets_requirements(self, &required))
    }

    /// Like [`meets_scope_requirements`](Self::meets_scope_requirements) for
    /// a scope string, reusing parses held in `cache`
    pub fn meets_scope_requirements_cached(
        &self,
        cache: &ScopeCache,
        required: &str,
    ) -> ScopeResult<bool> {
        let required = cache.parse(required)?;
        Ok(matcher::forest_meets_requirements(self, &required))
    }
}

impl fmt::Display for ConsentForest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tree in &self.trees {
            write!(f, "{}", tree)?;
        }
        Ok(())
    }
}

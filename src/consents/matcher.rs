//! Requirement matching against consent trees
//!
//! A requirement `A[B[C]]` is met only by an actual `A -> B -> C` path of
//! consents inside one tree. Same-valued consents in other trees are never
//! joined into a combined path, so a forest holding `A -> B` and a separate
//! `B -> C` does not meet `A[B[C]]`.
//!
//! Optional markers in the requirement are not consulted, and neither is
//! the consents' `atomically_revocable` flag: holding the plain form of a
//! dependency counts for its optional form.

use crate::consents::forest::ConsentForest;
use crate::consents::record::ConsentId;
use crate::consents::tree::ConsentTree;
use crate::scopes::ScopeNode;
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Does any tree in `forest` meet `required`?
pub fn forest_meets_requirement(forest: &ConsentForest, required: &ScopeNode) -> bool {
    let met = forest
        .trees()
        .iter()
        .any(|tree| tree_meets_requirement(tree, required));
    trace!(scope = required.value(), met, "Checked scope requirement");
    met
}

/// Does every requirement have a satisfying tree?
pub fn forest_meets_requirements(forest: &ConsentForest, required: &[ScopeNode]) -> bool {
    required
        .iter()
        .all(|scope| forest_meets_requirement(forest, scope))
}

/// Does `tree`, starting at its root, meet `required`?
pub fn tree_meets_requirement(tree: &ConsentTree, required: &ScopeNode) -> bool {
    if tree.root().scope_value != required.value() {
        return false;
    }
    matching_consents(tree, required)
        .first()
        .is_some_and(|met| met.contains(&tree.root_id()))
}

/// For every requirement node, in pre-order, the consents that meet it
///
/// A consent meets a requirement node when it carries the node's value and,
/// for each dependency, one of its direct children meets that dependency.
/// Requirement nodes are settled from the leaves up, so neither tree may be
/// deep enough to exhaust the call stack.
fn matching_consents(tree: &ConsentTree, required: &ScopeNode) -> Vec<HashSet<ConsentId>> {
    let mut by_value: HashMap<&str, Vec<ConsentId>> = HashMap::new();
    for record in tree.nodes().values() {
        by_value
            .entry(record.scope_value.as_str())
            .or_default()
            .push(record.id);
    }

    // requirement nodes in pre-order with the positions of their dependencies
    let mut order: Vec<(&ScopeNode, Vec<usize>)> = Vec::new();
    let mut pending: Vec<(&ScopeNode, Option<usize>)> = vec![(required, None)];
    while let Some((node, parent)) = pending.pop() {
        let at = order.len();
        if let Some(parent) = parent {
            order[parent].1.push(at);
        }
        order.push((node, Vec::new()));
        pending.extend(node.dependencies().iter().map(|d| (d, Some(at))));
    }

    let mut met: Vec<HashSet<ConsentId>> = vec![HashSet::new(); order.len()];
    for (at, (node, dependencies)) in order.iter().enumerate().rev() {
        let Some(candidates) = by_value.get(node.value()) else {
            continue;
        };
        let matching: HashSet<ConsentId> = candidates
            .iter()
            .copied()
            .filter(|&consent| {
                dependencies.iter().all(|&dependency| {
                    tree.children(consent)
                        .any(|child| met[dependency].contains(&child.id))
                })
            })
            .collect();
        met[at] = matching;
    }
    met
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consents::ConsentRecord;

    fn node(s: &str) -> ScopeNode {
        s.parse().unwrap()
    }

    fn tree(records: Vec<ConsentRecord>) -> ConsentTree {
        let root = records[0].id;
        ConsentTree::new(root, records).unwrap()
    }

    #[test]
    fn test_root_value_must_match() {
        let t = tree(vec![ConsentRecord::new(1, "c", "A", [1])]);
        assert!(tree_meets_requirement(&t, &node("A")));
        assert!(!tree_meets_requirement(&t, &node("B")));
    }

    #[test]
    fn test_requires_direct_children() {
        let t = tree(vec![
            ConsentRecord::new(1, "c", "A", [1]),
            ConsentRecord::new(2, "c", "B", [1, 2]),
            ConsentRecord::new(3, "c", "C", [1, 2, 3]),
        ]);
        assert!(tree_meets_requirement(&t, &node("A[B]")));
        assert!(tree_meets_requirement(&t, &node("A[B[C]]")));
        assert!(!tree_meets_requirement(&t, &node("A[C]")));
    }

    #[test]
    fn test_sibling_requirements_may_share_a_branch() {
        let t = tree(vec![
            ConsentRecord::new(1, "c", "A", [1]),
            ConsentRecord::new(2, "c", "B", [1, 2]),
            ConsentRecord::new(3, "c", "C", [1, 2, 3]),
            ConsentRecord::new(4, "c", "D", [1, 2, 4]),
        ]);
        assert!(tree_meets_requirement(&t, &node("A[B[C] B[D]]")));
        assert!(tree_meets_requirement(&t, &node("A[B[C D]]")));
    }

    #[test]
    fn test_backtracks_across_same_valued_children() {
        // two B children, only the second one has C beneath it
        let t = tree(vec![
            ConsentRecord::new(1, "c", "A", [1]),
            ConsentRecord::new(2, "c", "B", [1, 2]),
            ConsentRecord::new(3, "c", "B", [1, 3]),
            ConsentRecord::new(4, "c", "C", [1, 3, 4]),
        ]);
        assert!(tree_meets_requirement(&t, &node("A[B[C]]")));
    }

    #[test]
    fn test_optional_markers_ignored() {
        let t = tree(vec![
            ConsentRecord::new(1, "c", "A", [1]),
            ConsentRecord::new(2, "c", "B", [1, 2]).with_atomically_revocable(false),
        ]);
        assert!(tree_meets_requirement(&t, &node("A[*B]")));
        assert!(tree_meets_requirement(&t, &node("*A[B]")));
        assert!(!tree_meets_requirement(&t, &node("A[*C]")));
    }

    fn chain_requirement(depth: u64) -> ScopeNode {
        let mut input = String::new();
        for id in 1..depth {
            input.push_str(&format!("s{id}["));
        }
        input.push_str(&format!("s{depth}"));
        input.push_str(&"]".repeat(depth as usize - 1));
        node(&input)
    }

    #[test]
    fn test_deep_requirements_are_matched_without_recursion() {
        let depth = 2_000u64;
        let records: Vec<ConsentRecord> = (1..=depth)
            .map(|id| ConsentRecord::new(id, "c", format!("s{id}"), 1..=id))
            .collect();
        let t = tree(records);

        assert!(tree_meets_requirement(&t, &chain_requirement(depth)));
        assert!(tree_meets_requirement(&t, &chain_requirement(depth / 2)));
        assert!(!tree_meets_requirement(&t, &chain_requirement(50_000)));
        assert!(!tree_meets_requirement(&t, &node("s1[s3]")));
    }
}

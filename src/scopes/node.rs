//! Scope tree nodes
//!
//! A [`ScopeNode`] is one scope value plus the dependent scopes nested under
//! it. Nodes are built by the parser or through the builder methods here;
//! both paths refuse dependency chains that revisit an ancestor's value and
//! keep sibling values unique.
//!
//! Nesting depth is only bounded by the input, so every walk over a tree
//! (including drop, clone and formatting) uses an explicit stack.

use crate::error::{ParseErrorKind, ScopeCycleError, ScopeError, ScopeParseError, ScopeResult};
use crate::scopes::parser;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Characters that belong to the scope grammar and never to a scope value
pub(crate) const RESERVED_CHARS: &[char] = &['*', '[', ']'];

pub(crate) fn is_reserved(c: char) -> bool {
    c.is_whitespace() || RESERVED_CHARS.contains(&c)
}

/// A parsed scope with its (possibly optional) dependent scopes
///
/// Equality is structural and ignores dependency order: two nodes are equal
/// when their values and optional flags match and their dependency sets are
/// equal.
pub struct ScopeNode {
    value: String,
    optional: bool,
    /// Never holds two nodes with the same value
    dependencies: Vec<ScopeNode>,
}

impl ScopeNode {
    /// Create a required scope with no dependencies
    pub fn new(value: impl Into<String>) -> ScopeResult<Self> {
        let value = value.into();
        validate_value(&value)?;
        Ok(Self::from_token(value, false))
    }

    /// Create an optional scope with no dependencies
    pub fn optional(value: impl Into<String>) -> ScopeResult<Self> {
        Ok(Self::new(value)?.with_optional(true))
    }

    /// Build a node from a token the lexer already validated
    pub(crate) fn from_token(value: String, optional: bool) -> Self {
        Self {
            value,
            optional,
            dependencies: Vec::new(),
        }
    }

    /// Set the optional marker
    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Add a dependency, consuming and returning the node
    pub fn with_dependency(mut self, dependency: ScopeNode) -> ScopeResult<Self> {
        self.add_dependency(dependency)?;
        Ok(self)
    }

    /// Add several dependencies
    ///
    /// Nothing is added if any of them would create a cycle.
    pub fn with_dependencies(
        mut self,
        dependencies: impl IntoIterator<Item = ScopeNode>,
    ) -> ScopeResult<Self> {
        let incoming: Vec<ScopeNode> = dependencies.into_iter().collect();
        for dependency in &incoming {
            self.reject_cycle(dependency)?;
        }

        self.dependencies.extend(incoming);
        self.dependencies = normalize(std::mem::take(&mut self.dependencies));
        Ok(self)
    }

    /// Add a dependency in place
    ///
    /// Only meant for incremental construction. Fails with a cycle error if
    /// the dependency's subtree contains this node's value. A dependency whose
    /// value is already present is merged into the existing one.
    pub fn add_dependency(&mut self, mut dependency: ScopeNode) -> ScopeResult<()> {
        self.reject_cycle(&dependency)?;

        let existing = self
            .dependencies
            .iter_mut()
            .find(|existing| existing.value == dependency.value);
        match existing {
            Some(existing) => {
                existing.optional &= dependency.optional;
                if !dependency.dependencies.is_empty() {
                    existing.dependencies.append(&mut dependency.dependencies);
                    existing.dependencies = normalize(std::mem::take(&mut existing.dependencies));
                }
            }
            None => self.dependencies.push(dependency),
        }
        Ok(())
    }

    fn reject_cycle(&self, dependency: &ScopeNode) -> ScopeResult<()> {
        match dependency.path_to(&self.value) {
            Some(path) => {
                let mut chain = Vec::with_capacity(path.len() + 1);
                chain.push(self.value.clone());
                chain.extend(path);
                Err(ScopeCycleError {
                    value: self.value.clone(),
                    path: chain,
                }
                .into())
            }
            None => Ok(()),
        }
    }

    pub(crate) fn set_dependencies(&mut self, dependencies: Vec<ScopeNode>) {
        self.dependencies = dependencies;
    }

    /// The scope value
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn dependencies(&self) -> &[ScopeNode] {
        &self.dependencies
    }

    /// Number of levels in this tree (a node without dependencies is 1)
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(node.dependencies.iter().map(|d| (d, depth + 1)));
        }
        deepest
    }

    /// Does this (available) scope satisfy `required`?
    ///
    /// Values must match exactly. Optional markers never prevent a match in
    /// either direction. Each dependency of `required` must be satisfied by
    /// some dependency of `self`, at any position and recursively.
    pub fn satisfies(&self, required: &ScopeNode) -> bool {
        let mut stack = vec![(self, required)];
        while let Some((available, required)) = stack.pop() {
            if available.value != required.value {
                return false;
            }
            if required.dependencies.is_empty() {
                continue;
            }

            // sibling values are unique, so the same-valued dependency is the only candidate
            let by_value: HashMap<&str, &ScopeNode> = available
                .dependencies
                .iter()
                .map(|d| (d.value.as_str(), d))
                .collect();
            for needed in &required.dependencies {
                match by_value.get(needed.value.as_str()) {
                    Some(candidate) => stack.push((*candidate, needed)),
                    None => return false,
                }
            }
        }
        true
    }

    /// Inverse of [`ScopeNode::satisfies`]
    pub fn is_satisfied_by(&self, available: &ScopeNode) -> bool {
        available.satisfies(self)
    }

    /// Parse `required` and check whether this scope satisfies it
    pub fn contains(&self, required: &str) -> ScopeResult<bool> {
        let required = parser::deserialize(required)?;
        Ok(self.satisfies(&required))
    }

    /// Serialize to the canonical scope-expression form
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    /// Values from this node down to the first descendant carrying `value`
    fn path_to(&self, value: &str) -> Option<Vec<String>> {
        let mut stack: Vec<(&ScopeNode, usize)> = vec![(self, 0)];
        let mut chain: Vec<&str> = Vec::new();
        while let Some((node, depth)) = stack.pop() {
            chain.truncate(depth);
            chain.push(&node.value);
            if node.value == value {
                return Some(chain.iter().map(|s| s.to_string()).collect());
            }
            stack.extend(node.dependencies.iter().map(|d| (d, depth + 1)));
        }
        None
    }

    /// Dependencies ordered by value, the order they are written in
    fn sorted_dependencies(&self) -> Vec<&ScopeNode> {
        let mut sorted: Vec<&ScopeNode> = self.dependencies.iter().collect();
        sorted.sort_unstable_by(|a, b| a.value.cmp(&b.value));
        sorted
    }
}

/// Collapse repeated values among siblings
///
/// The first occurrence keeps its position. A required occurrence wins over
/// optional ones and the dependency lists of all occurrences are merged
/// under the same rule.
pub(crate) fn normalize(nodes: Vec<ScopeNode>) -> Vec<ScopeNode> {
    let mut merged = nodes;
    let mut pending: Vec<&mut Vec<ScopeNode>> = vec![&mut merged];
    while let Some(list) = pending.pop() {
        let grown = merge_siblings(list);
        for (node, grown) in list.iter_mut().zip(grown) {
            if grown {
                pending.push(&mut node.dependencies);
            }
        }
    }
    merged
}

/// Merge one sibling list in place; flags the nodes whose dependency lists
/// absorbed another occurrence's and may now hold repeats
fn merge_siblings(list: &mut Vec<ScopeNode>) -> Vec<bool> {
    let nodes = std::mem::take(list);
    let mut index: HashMap<String, usize> = HashMap::with_capacity(nodes.len());
    let mut grown = Vec::with_capacity(nodes.len());

    for mut node in nodes {
        match index.get(node.value.as_str()).copied() {
            Some(at) => {
                let existing = &mut list[at];
                existing.optional &= node.optional;
                if !node.dependencies.is_empty() {
                    existing.dependencies.append(&mut node.dependencies);
                    grown[at] = true;
                }
            }
            None => {
                index.insert(node.value.clone(), list.len());
                list.push(node);
                grown.push(false);
            }
        }
    }
    grown
}

fn validate_value(value: &str) -> ScopeResult<()> {
    if value.is_empty() {
        return Err(ScopeParseError::new(ParseErrorKind::InvalidToken, 0, value).into());
    }
    if let Some((position, _)) = value.char_indices().find(|(_, c)| is_reserved(*c)) {
        return Err(ScopeParseError::new(ParseErrorKind::InvalidToken, position, value).into());
    }
    Ok(())
}

impl Drop for ScopeNode {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.dependencies);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.dependencies);
        }
    }
}

impl Clone for ScopeNode {
    fn clone(&self) -> Self {
        // finished copies of descendants, in post-order
        let mut done: Vec<ScopeNode> = Vec::new();
        let mut stack: Vec<(&ScopeNode, bool)> =
            self.dependencies.iter().rev().map(|d| (d, false)).collect();

        while let Some((node, children_done)) = stack.pop() {
            if children_done {
                let dependencies = done.split_off(done.len() - node.dependencies.len());
                done.push(Self {
                    value: node.value.clone(),
                    optional: node.optional,
                    dependencies,
                });
            } else {
                stack.push((node, true));
                stack.extend(node.dependencies.iter().rev().map(|d| (d, false)));
            }
        }

        Self {
            value: self.value.clone(),
            optional: self.optional,
            dependencies: done,
        }
    }
}

impl PartialEq for ScopeNode {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self, other)];
        while let Some((left, right)) = stack.pop() {
            if left.value != right.value
                || left.optional != right.optional
                || left.dependencies.len() != right.dependencies.len()
            {
                return false;
            }
            stack.extend(
                left.sorted_dependencies()
                    .into_iter()
                    .zip(right.sorted_dependencies()),
            );
        }
        true
    }
}

impl Eq for ScopeNode {}

impl fmt::Debug for ScopeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScopeNode")
            .field(&format_args!("{}", self))
            .finish()
    }
}

enum Piece<'a> {
    Node(&'a ScopeNode),
    Text(&'static str),
}

impl fmt::Display for ScopeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![Piece::Node(self)];
        while let Some(piece) = stack.pop() {
            let node = match piece {
                Piece::Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
                Piece::Node(node) => node,
            };

            if node.optional {
                f.write_str("*")?;
            }
            f.write_str(&node.value)?;

            if !node.dependencies.is_empty() {
                f.write_str("[")?;
                stack.push(Piece::Text("]"));
                for (idx, dep) in node.sorted_dependencies().into_iter().enumerate().rev() {
                    stack.push(Piece::Node(dep));
                    if idx > 0 {
                        stack.push(Piece::Text(" "));
                    }
                }
            }
        }
        Ok(())
    }
}

impl FromStr for ScopeNode {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parser::deserialize(s)
    }
}

impl Serialize for ScopeNode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ScopeNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parser::deserialize(&s).map_err(serde::de::Error::custom)
    }
}

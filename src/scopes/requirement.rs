//! Inputs accepted wherever a scope requirement is expected
//!
//! Callers hold requirements as strings, single trees, or lists of trees.
//! [`IntoScopes`] turns each of those into the list form the matcher walks.

use crate::error::ScopeResult;
use crate::scopes::node::ScopeNode;
use crate::scopes::parser;

/// Conversion into a list of top-level scope requirements
pub trait IntoScopes {
    fn into_scopes(self) -> ScopeResult<Vec<ScopeNode>>;
}

impl IntoScopes for &str {
    fn into_scopes(self) -> ScopeResult<Vec<ScopeNode>> {
        parser::parse(self)
    }
}

impl IntoScopes for String {
    fn into_scopes(self) -> ScopeResult<Vec<ScopeNode>> {
        parser::parse(&self)
    }
}

impl IntoScopes for &String {
    fn into_scopes(self) -> ScopeResult<Vec<ScopeNode>> {
        parser::parse(self)
    }
}

impl IntoScopes for ScopeNode {
    fn into_scopes(self) -> ScopeResult<Vec<ScopeNode>> {
        Ok(vec![self])
    }
}

impl IntoScopes for &ScopeNode {
    fn into_scopes(self) -> ScopeResult<Vec<ScopeNode>> {
        Ok(vec![self.clone()])
    }
}

impl IntoScopes for Vec<ScopeNode> {
    fn into_scopes(self) -> ScopeResult<Vec<ScopeNode>> {
        Ok(self)
    }
}

impl IntoScopes for &[ScopeNode] {
    fn into_scopes(self) -> ScopeResult<Vec<ScopeNode>> {
        Ok(self.to_vec())
    }
}

impl IntoScopes for &Vec<ScopeNode> {
    fn into_scopes(self) -> ScopeResult<Vec<ScopeNode>> {
        Ok(self.clone())
    }
}

//! Scope expression parser
//!
//! Grammar:
//!
//! ```text
//! expr             := scope_term (WS scope_term)*
//! scope_term       := '*'? TOKEN dependency_block?
//! dependency_block := '[' WS? scope_term (WS scope_term)* WS? ']'
//! ```
//!
//! The parser is a single pass over the lexer's tokens holding an explicit
//! stack of open dependency blocks, so nesting depth never turns into call
//! depth. The values of the scopes owning the open blocks are mirrored in a
//! hash set, which makes the cycle check for each new token constant time.

use crate::error::{ParseErrorKind, ScopeCycleError, ScopeError, ScopeParseError, ScopeResult};
use crate::scopes::lexer::{Lexer, TokenKind};
use crate::scopes::node::{ScopeNode, normalize};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Scope expression parser with an optional nesting limit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeParser {
    max_depth: Option<usize>,
}

/// An open dependency block
struct Frame {
    /// The scope the block belongs to
    owner: ScopeNode,
    /// Offset of the `[`
    open_position: usize,
    nodes: Vec<ScopeNode>,
}

/// The previous non-space token, or where the scan currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prev {
    Start,
    Space,
    Optional,
    Word,
    Open,
    Close,
}

impl ScopeParser {
    /// Parser without a nesting limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject expressions nested more than `max_depth` brackets deep
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: Some(max_depth),
        }
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Parse a scope expression into its top-level scopes
    ///
    /// Empty or whitespace-only input yields an empty list.
    pub fn parse(&self, input: &str) -> ScopeResult<Vec<ScopeNode>> {
        let fail = |kind: ParseErrorKind, position: usize| -> ScopeError {
            trace!(?kind, position, "Rejecting scope expression");
            ScopeParseError::new(kind, position, input).into()
        };

        let mut top: Vec<ScopeNode> = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();
        let mut ancestors: HashSet<String> = HashSet::new();

        let mut prev = Prev::Start;
        let mut before_space = Prev::Start;
        let mut optional_at = 0usize;

        for token in Lexer::new(input) {
            let position = token.position;
            match token.kind {
                TokenKind::Optional => match prev {
                    Prev::Word => return Err(fail(ParseErrorKind::DanglingOptional, position)),
                    Prev::Close => return Err(fail(ParseErrorKind::MissingSeparator, position)),
                    Prev::Optional => {
                        return Err(fail(ParseErrorKind::OptionalNotAdjacent, optional_at));
                    }
                    Prev::Start | Prev::Space | Prev::Open => optional_at = position,
                },

                TokenKind::Word => {
                    if prev == Prev::Close {
                        return Err(fail(ParseErrorKind::MissingSeparator, position));
                    }

                    if ancestors.contains(token.text) {
                        let mut path: Vec<String> =
                            stack.iter().map(|f| f.owner.value().to_string()).collect();
                        path.push(token.text.to_string());
                        debug!(value = token.text, depth = stack.len(), "Scope cycle detected");
                        return Err(ScopeCycleError {
                            value: token.text.to_string(),
                            path,
                        }
                        .into());
                    }

                    let node = ScopeNode::from_token(token.text.to_string(), prev == Prev::Optional);
                    current(&mut top, &mut stack).push(node);
                }

                TokenKind::Open => {
                    match prev {
                        Prev::Word => {}
                        Prev::Space if matches!(before_space, Prev::Word | Prev::Close) => {
                            return Err(fail(ParseErrorKind::SpaceBeforeBracket, position));
                        }
                        Prev::Optional => {
                            return Err(fail(ParseErrorKind::OptionalNotAdjacent, optional_at));
                        }
                        _ => return Err(fail(ParseErrorKind::UnattachedBracket, position)),
                    }

                    if let Some(max) = self.max_depth
                        && stack.len() >= max
                    {
                        return Err(fail(ParseErrorKind::TooDeep, position));
                    }

                    let owner = current(&mut top, &mut stack)
                        .pop()
                        .ok_or_else(|| fail(ParseErrorKind::UnattachedBracket, position))?;
                    ancestors.insert(owner.value().to_string());
                    stack.push(Frame {
                        owner,
                        open_position: position,
                        nodes: Vec::new(),
                    });
                }

                TokenKind::Close => {
                    if prev == Prev::Optional {
                        return Err(fail(ParseErrorKind::DanglingOptional, optional_at));
                    }

                    let Some(frame) = stack.pop() else {
                        return Err(fail(ParseErrorKind::UnopenedBracket, position));
                    };
                    if frame.nodes.is_empty() {
                        return Err(fail(ParseErrorKind::EmptyBrackets, frame.open_position));
                    }

                    let mut owner = frame.owner;
                    ancestors.remove(owner.value());
                    owner.set_dependencies(normalize(frame.nodes));
                    current(&mut top, &mut stack).push(owner);
                }

                TokenKind::Space => {
                    if prev == Prev::Optional {
                        return Err(fail(ParseErrorKind::OptionalNotAdjacent, optional_at));
                    }
                    before_space = prev;
                }
            }

            prev = match token.kind {
                TokenKind::Optional => Prev::Optional,
                TokenKind::Word => Prev::Word,
                TokenKind::Open => Prev::Open,
                TokenKind::Close => Prev::Close,
                TokenKind::Space => Prev::Space,
            };
        }

        if prev == Prev::Optional {
            return Err(fail(ParseErrorKind::DanglingOptional, optional_at));
        }
        if let Some(frame) = stack.last() {
            return Err(fail(ParseErrorKind::UnclosedBracket, frame.open_position));
        }

        debug!(scopes = top.len(), "Parsed scope expression");
        Ok(top)
    }

    /// Parse an expression that must hold exactly one top-level scope
    pub fn deserialize(&self, input: &str) -> ScopeResult<ScopeNode> {
        if input.trim().is_empty() {
            return Err(ScopeError::Usage(
                "cannot deserialize an empty scope string".to_string(),
            ));
        }

        let scopes = self.parse(input)?;
        let count = scopes.len();
        let mut iter = scopes.into_iter();
        match (iter.next(), iter.next()) {
            (Some(node), None) => Ok(node),
            _ => Err(ScopeError::Usage(format!(
                "expected exactly one top-level scope in '{}', found {}",
                input, count
            ))),
        }
    }
}

fn current<'a>(top: &'a mut Vec<ScopeNode>, stack: &'a mut [Frame]) -> &'a mut Vec<ScopeNode> {
    match stack.last_mut() {
        Some(frame) => &mut frame.nodes,
        None => top,
    }
}

/// Parse a scope expression into its top-level scopes
pub fn parse(input: &str) -> ScopeResult<Vec<ScopeNode>> {
    ScopeParser::new().parse(input)
}

/// Parse a scope expression holding exactly one top-level scope
pub fn deserialize(input: &str) -> ScopeResult<ScopeNode> {
    ScopeParser::new().deserialize(input)
}

/// Canonical string form of a scope tree
pub fn serialize(scope: &ScopeNode) -> String {
    scope.to_string()
}

/// Space-separated canonical form of a scope list, as sent in an OAuth2
/// `scope` parameter
pub fn scopes_to_string(scopes: &[ScopeNode]) -> String {
    scopes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

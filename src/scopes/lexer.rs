//! Scope expression lexer
//!
//! Splits a scope expression into tokens with byte offsets. Runs of
//! whitespace collapse into a single [`TokenKind::Space`].

use crate::scopes::node::is_reserved;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `*`
    Optional,
    /// A scope value
    Word,
    /// `[`
    Open,
    /// `]`
    Close,
    /// One or more whitespace characters
    Space,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset into the input
    pub position: usize,
}

/// Iterator over the tokens of a scope expression
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    fn take_while(&mut self, start: usize, pred: impl Fn(char) -> bool) -> usize {
        let rest = &self.input[start..];
        let len = rest
            .char_indices()
            .find(|(_, c)| !pred(*c))
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        start + len
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.position;
        let c = self.input[start..].chars().next()?;

        let (kind, end) = match c {
            '*' => (TokenKind::Optional, start + 1),
            '[' => (TokenKind::Open, start + 1),
            ']' => (TokenKind::Close, start + 1),
            c if c.is_whitespace() => (TokenKind::Space, self.take_while(start, char::is_whitespace)),
            _ => (TokenKind::Word, self.take_while(start, |c| !is_reserved(c))),
        };

        self.position = end;
        Some(Token {
            kind,
            text: &self.input[start..end],
            position: start,
        })
    }
}

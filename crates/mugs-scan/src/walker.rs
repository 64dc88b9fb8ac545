//! Call-site walker.
//!
//! Walks a token stream and records every invocation expression
//! (`a.b(x)`, `f(g(y))`, chained `a(x).b(y)`) and every object construction
//! (`new A.B(...)`). Invocations nested inside arguments are recorded as
//! sites of their own. Bracket balance is enforced; an unbalanced source is a
//! parse error.

use crate::lexer::{Token, TokenKind};
use crate::ScanError;

/// Kind of call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteKind {
    Invocation,
    Construction,
}

/// One invocation or construction found in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub kind: SiteKind,
    /// Source text of the whole expression.
    pub text: String,
    /// Constructed type name (constructions only).
    pub type_name: Option<String>,
    pub line: usize,
}

/// Identifiers that introduce syntax rather than name a callee.
const KEYWORDS: &[&str] = &[
    "and", "as", "assert", "break", "case", "catch", "continue", "elif", "else", "for",
    "foreach", "if", "in", "is", "lambda", "load", "lock", "not", "or", "pass", "return",
    "switch", "using", "when", "while", "with", "yield",
];

/// Deepest bracket nesting the walker follows before giving up on a file.
pub const MAX_NESTING: usize = 256;

fn closer_for(open: char) -> Option<char> {
    match open {
        '(' => Some(')'),
        '[' => Some(']'),
        '{' => Some('}'),
        _ => None,
    }
}

/// Walks `tokens` (produced from `source`) and returns all call sites.
pub fn walk(source: &str, tokens: &[Token]) -> Result<Vec<CallSite>, ScanError> {
    let mut walker = Walker {
        source,
        tokens,
        pos: 0,
        depth: 0,
        sites: Vec::new(),
    };
    walker.sequence(None)?;
    Ok(walker.sites)
}

struct Walker<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    sites: Vec<CallSite>,
}

impl<'a> Walker<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset)
    }

    fn ident_text(&self, token: &Token) -> Option<&'a str> {
        (token.kind == TokenKind::Ident).then(|| token.text(self.source))
    }

    /// Consumes tokens until `closer` (or end of input when `None`).
    /// Returns the byte offset just past the closer.
    fn sequence(&mut self, closer: Option<(char, usize)>) -> Result<usize, ScanError> {
        let Some((_, line)) = closer else {
            return self.sequence_body(None);
        };
        if self.depth >= MAX_NESTING {
            return Err(ScanError::Parse {
                line,
                message: format!("brackets nested deeper than {} levels", MAX_NESTING),
            });
        }
        self.depth += 1;
        let result = self.sequence_body(closer);
        self.depth -= 1;
        result
    }

    fn sequence_body(&mut self, closer: Option<(char, usize)>) -> Result<usize, ScanError> {
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Punct(c) if Some(c) == closer.map(|(c, _)| c) => {
                    self.pos += 1;
                    return Ok(token.end);
                }
                TokenKind::Punct(c @ (')' | ']' | '}')) => {
                    return Err(ScanError::Parse {
                        line: token.line,
                        message: format!("unexpected '{}'", c),
                    });
                }
                TokenKind::Punct(c) => {
                    self.pos += 1;
                    if let Some(close) = closer_for(c) {
                        self.sequence(Some((close, token.line)))?;
                    }
                }
                TokenKind::Ident => self.identifier(token)?,
                TokenKind::Number | TokenKind::Str => self.pos += 1,
            }
        }

        match closer {
            Some((c, line)) => Err(ScanError::Parse {
                line,
                message: format!("missing '{}'", c),
            }),
            None => Ok(self.source.len()),
        }
    }

    fn identifier(&mut self, token: &'a Token) -> Result<(), ScanError> {
        let text = token.text(self.source);

        if text == "def" {
            // `def name(params)`: the name is a declaration, not a callee.
            self.pos += 1;
            if self.peek().is_some_and(|t| t.kind == TokenKind::Ident) {
                self.pos += 1;
            }
            return Ok(());
        }

        if KEYWORDS.contains(&text) {
            self.pos += 1;
            return Ok(());
        }

        if text == "new" && self.peek_at(1).is_some_and(|t| t.kind == TokenKind::Ident) {
            self.pos += 1;
            let type_name = self.dotted_name();
            if self.peek().is_some_and(|t| t.is_punct('(')) {
                let open_line = self.tokens[self.pos].line;
                self.pos += 1;
                let end = self.sequence(Some((')', open_line)))?;
                self.sites.push(CallSite {
                    kind: SiteKind::Construction,
                    text: self.source[token.start..end].to_string(),
                    type_name: Some(type_name),
                    line: token.line,
                });
                self.postfix(token)?;
            }
            return Ok(());
        }

        self.dotted_name();
        self.postfix(token)
    }

    /// Consumes `ident (. ident)*` and returns its text.
    fn dotted_name(&mut self) -> String {
        let mut parts = Vec::new();
        if let Some(name) = self.peek().and_then(|t| self.ident_text(t)) {
            parts.push(name);
            self.pos += 1;
        }
        while self.peek().is_some_and(|t| t.is_punct('.')) {
            match self.peek_at(1).and_then(|t| self.ident_text(t)) {
                Some(name) => {
                    parts.push(name);
                    self.pos += 2;
                }
                None => break,
            }
        }
        parts.join(".")
    }

    /// Applies call, member, and index suffixes to the chain starting at `start`.
    fn postfix(&mut self, start: &Token) -> Result<(), ScanError> {
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Punct('(') => {
                    self.pos += 1;
                    let end = self.sequence(Some((')', token.line)))?;
                    self.sites.push(CallSite {
                        kind: SiteKind::Invocation,
                        text: self.source[start.start..end].to_string(),
                        type_name: None,
                        line: start.line,
                    });
                }
                TokenKind::Punct('[') => {
                    self.pos += 1;
                    self.sequence(Some((']', token.line)))?;
                }
                TokenKind::Punct('.')
                    if self.peek_at(1).is_some_and(|t| t.kind == TokenKind::Ident) =>
                {
                    self.pos += 2;
                }
                _ => break,
            }
        }
        Ok(())
    }
}

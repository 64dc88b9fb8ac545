//! Tokenizer for extension sources.
//!
//! Produces just enough structure for the call-site walker: identifiers,
//! literals, and punctuation with byte spans. Comments and whitespace are
//! dropped. The grammar is permissive so that sources written for other
//! hosts (C#-style `new` expressions, `//` operators) still tokenize.

use crate::ScanError;

/// Token category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword.
    Ident,
    /// Numeric literal.
    Number,
    /// String literal (any quoting style).
    Str,
    /// Single punctuation character.
    Punct(char),
}

/// A token with its byte span in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    /// 1-based line of the first byte.
    pub line: usize,
}

impl Token {
    /// Returns the token text.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    /// Returns true for the given punctuation character.
    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Splits source text into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ScanError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();
    let mut line = 1;

    while let Some(&(start, c)) = chars.peek() {
        if c == '\n' {
            line += 1;
            chars.next();
            continue;
        }
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        // Line comment.
        if c == '#' {
            while let Some(&(_, c)) = chars.peek() {
                if c == '\n' {
                    break;
                }
                chars.next();
            }
            continue;
        }

        if c == '"' || c == '\'' {
            let start_line = line;
            let triple = bytes.get(start + 1) == Some(&(c as u8))
                && bytes.get(start + 2) == Some(&(c as u8));
            let quote_len = if triple { 3 } else { 1 };
            for _ in 0..quote_len {
                chars.next();
            }

            let mut end = None;
            while let Some((idx, ch)) = chars.next() {
                match ch {
                    '\\' => {
                        if let Some((_, '\n')) = chars.next() {
                            line += 1;
                        }
                    }
                    '\n' if !triple => break,
                    '\n' => line += 1,
                    ch if ch == c => {
                        if !triple {
                            end = Some(idx + 1);
                            break;
                        }
                        if bytes.get(idx + 1) == Some(&(c as u8))
                            && bytes.get(idx + 2) == Some(&(c as u8))
                        {
                            chars.next();
                            chars.next();
                            end = Some(idx + 3);
                            break;
                        }
                    }
                    _ => {}
                }
            }

            let end = end.ok_or_else(|| ScanError::Parse {
                line: start_line,
                message: "unterminated string literal".to_string(),
            })?;
            tokens.push(Token {
                kind: TokenKind::Str,
                start,
                end,
                line: start_line,
            });
            continue;
        }

        if is_ident_start(c) {
            let mut end = start;
            while let Some(&(idx, ch)) = chars.peek() {
                if !is_ident_continue(ch) {
                    break;
                }
                end = idx + ch.len_utf8();
                chars.next();
            }
            tokens.push(Token {
                kind: TokenKind::Ident,
                start,
                end,
                line,
            });
            continue;
        }

        if c.is_ascii_digit() {
            let mut end = start;
            while let Some(&(idx, ch)) = chars.peek() {
                if !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '.') {
                    break;
                }
                end = idx + ch.len_utf8();
                chars.next();
            }
            tokens.push(Token {
                kind: TokenKind::Number,
                start,
                end,
                line,
            });
            continue;
        }

        chars.next();
        tokens.push(Token {
            kind: TokenKind::Punct(c),
            start,
            end: start + c.len_utf8(),
            line,
        });
    }

    Ok(tokens)
}

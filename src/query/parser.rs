//! Query expression parser and tokenizer.
//!
//! Compiles the BFS-style predicate syntax: `attribute OP value`
//! comparisons joined by `&&`, `||` and `!`, with parentheses, quoted
//! values and `*`/`?` wildcards. Syntax failures report the byte
//! position the parser stopped at.

use crate::error::{Result, StorageError};

use super::expression::{Comparison, ComparisonOp, ComparisonValue, QueryExpression};

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct QueryToken {
    kind: QueryTokenKind,
    position: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum QueryTokenKind {
    /// Bare word: attribute name or unquoted value.
    Word(String),
    /// Quoted value; never reinterpreted as a number.
    Phrase(String),
    Op(ComparisonOp),
    And,
    Or,
    Bang,
    LParen,
    RParen,
}

fn syntax_error(message: impl Into<String>, position: usize) -> StorageError {
    StorageError::QuerySyntax {
        message: message.into(),
        position,
    }
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '&' | '|' | '!' | '<' | '>' | '=' | '"' | '\'')
}

fn tokenize(input: &str) -> Result<Vec<QueryToken>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(position, c)) = chars.peek() {
        match c {
            _ if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(QueryToken {
                    kind: QueryTokenKind::LParen,
                    position,
                });
            }
            ')' => {
                chars.next();
                tokens.push(QueryToken {
                    kind: QueryTokenKind::RParen,
                    position,
                });
            }
            '&' | '|' => {
                chars.next();
                if chars.peek().map(|&(_, next)| next) != Some(c) {
                    return Err(syntax_error(format!("expected '{c}{c}'"), position));
                }
                chars.next();
                tokens.push(QueryToken {
                    kind: if c == '&' {
                        QueryTokenKind::And
                    } else {
                        QueryTokenKind::Or
                    },
                    position,
                });
            }
            '!' => {
                chars.next();
                if chars.peek().map(|&(_, next)| next) == Some('=') {
                    chars.next();
                    tokens.push(QueryToken {
                        kind: QueryTokenKind::Op(ComparisonOp::Ne),
                        position,
                    });
                } else {
                    tokens.push(QueryToken {
                        kind: QueryTokenKind::Bang,
                        position,
                    });
                }
            }
            '=' => {
                chars.next();
                if chars.peek().map(|&(_, next)| next) != Some('=') {
                    return Err(syntax_error("expected '=='", position));
                }
                chars.next();
                tokens.push(QueryToken {
                    kind: QueryTokenKind::Op(ComparisonOp::Eq),
                    position,
                });
            }
            '<' | '>' => {
                chars.next();
                let with_equal = chars.peek().map(|&(_, next)| next) == Some('=');
                if with_equal {
                    chars.next();
                }
                let op = match (c, with_equal) {
                    ('<', false) => ComparisonOp::Lt,
                    ('<', true) => ComparisonOp::Le,
                    ('>', false) => ComparisonOp::Gt,
                    (_, true) => ComparisonOp::Ge,
                    _ => unreachable!(),
                };
                tokens.push(QueryToken {
                    kind: QueryTokenKind::Op(op),
                    position,
                });
            }
            '"' | '\'' => {
                chars.next();
                let mut phrase = String::new();
                let mut terminated = false;
                for (_, inner) in chars.by_ref() {
                    if inner == c {
                        terminated = true;
                        break;
                    }
                    phrase.push(inner);
                }
                if !terminated {
                    return Err(syntax_error("unterminated quoted value", position));
                }
                tokens.push(QueryToken {
                    kind: QueryTokenKind::Phrase(phrase),
                    position,
                });
            }
            _ => {
                let mut word = String::new();
                while let Some(&(_, next)) = chars.peek() {
                    if !is_word_char(next) {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                tokens.push(QueryToken {
                    kind: QueryTokenKind::Word(word),
                    position,
                });
            }
        }
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Query parser
// ---------------------------------------------------------------------------

pub struct QueryParser {
    tokens: Vec<QueryToken>,
    index: usize,
}

impl QueryParser {
    /// Compiles a query expression string into its AST.
    pub fn parse(input: &str) -> Result<QueryExpression> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(syntax_error("query must contain at least one comparison", 0));
        }

        let mut parser = Self { tokens, index: 0 };
        let expression = parser.parse_or_expression()?;
        if let Some(token) = parser.peek() {
            return Err(syntax_error("unexpected trailing input", token.position));
        }
        Ok(expression)
    }

    fn parse_or_expression(&mut self) -> Result<QueryExpression> {
        let mut parts = vec![self.parse_and_expression()?];
        while self.consume(&QueryTokenKind::Or) {
            parts.push(self.parse_and_expression()?);
        }
        Ok(collapse(parts, QueryExpression::Or))
    }

    fn parse_and_expression(&mut self) -> Result<QueryExpression> {
        let mut parts = vec![self.parse_unary_expression()?];
        while self.consume(&QueryTokenKind::And) {
            parts.push(self.parse_unary_expression()?);
        }
        Ok(collapse(parts, QueryExpression::And))
    }

    fn parse_unary_expression(&mut self) -> Result<QueryExpression> {
        if self.consume(&QueryTokenKind::Bang) {
            let inner = self.parse_unary_expression()?;
            return Ok(QueryExpression::Not(Box::new(inner)));
        }
        if self.consume(&QueryTokenKind::LParen) {
            let inner = self.parse_or_expression()?;
            let position = self.position();
            if !self.consume(&QueryTokenKind::RParen) {
                return Err(syntax_error("expected ')'", position));
            }
            return Ok(inner);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<QueryExpression> {
        let position = self.position();
        let attribute = match self.next() {
            Some(QueryToken {
                kind: QueryTokenKind::Word(word),
                ..
            }) => word,
            Some(token) => {
                return Err(syntax_error("expected an attribute name", token.position))
            }
            None => return Err(syntax_error("expected an attribute name", position)),
        };

        let position = self.position();
        let op = match self.next() {
            Some(QueryToken {
                kind: QueryTokenKind::Op(op),
                ..
            }) => op,
            Some(token) => {
                return Err(syntax_error(
                    "expected a comparison operator",
                    token.position,
                ))
            }
            None => return Err(syntax_error("expected a comparison operator", position)),
        };

        let position = self.position();
        let value = match self.next() {
            Some(QueryToken {
                kind: QueryTokenKind::Word(word),
                ..
            }) => ComparisonValue::from_word(&word),
            Some(QueryToken {
                kind: QueryTokenKind::Phrase(phrase),
                ..
            }) => ComparisonValue::Text(phrase),
            Some(token) => return Err(syntax_error("expected a value", token.position)),
            None => return Err(syntax_error("expected a value", position)),
        };

        Ok(QueryExpression::Compare(Comparison {
            attribute,
            op,
            value,
        }))
    }

    fn peek(&self) -> Option<&QueryToken> {
        self.tokens.get(self.index)
    }

    fn next(&mut self) -> Option<QueryToken> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn consume(&mut self, kind: &QueryTokenKind) -> bool {
        if self.peek().map(|token| &token.kind) == Some(kind) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// Byte position of the next token, or the end of input.
    fn position(&self) -> usize {
        self.peek()
            .map(|token| token.position)
            .or_else(|| self.tokens.last().map(|token| token.position))
            .unwrap_or(0)
    }
}

fn collapse(
    mut parts: Vec<QueryExpression>,
    combine: fn(Vec<QueryExpression>) -> QueryExpression,
) -> QueryExpression {
    if parts.len() == 1 {
        parts.remove(0)
    } else {
        combine(parts)
    }
}

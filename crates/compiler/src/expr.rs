//! Compile-time constant expressions
//!
//! Recursive descent over the token stream for `+ - * /` with parentheses,
//! operating on integers and `define`d constants:
//!
//! ```text
//! expression := term (('+'|'-') term)*
//! term       := primary (('*'|'/') primary)*
//! primary    := Number | constant name | '(' expression ')'
//! ```
//!
//! Evaluation happens entirely at compile time and emits no code; the
//! result is consumed by the caller as a literal. Division truncates.

use crate::diag::Diagnostics;
use crate::lexer::{Op, Token, TokenKind};
use crate::symbols::ConstTable;

/// Evaluate a constant expression starting at `pos`. Returns the value and
/// the index of the first token past the expression; `None` after a
/// diagnostic has been recorded.
pub fn evaluate(
    tokens: &[Token],
    pos: usize,
    consts: &ConstTable,
    diags: &mut Diagnostics,
) -> (Option<i64>, usize) {
    let mut cursor = Cursor {
        tokens,
        pos,
        consts,
        diags,
    };
    let value = cursor.expression();
    (value, cursor.pos)
}

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
    consts: &'a ConstTable,
    diags: &'a mut Diagnostics,
}

impl Cursor<'_> {
    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn current_op(&self) -> Option<Op> {
        match self.current()?.kind {
            TokenKind::Operator(op) => Some(op),
            _ => None,
        }
    }

    /// Offset for diagnostics when the cursor has run off the end.
    fn here(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or(self.tokens.last())
            .map(|t| t.origin)
            .unwrap_or(0)
    }

    fn unexpected(&mut self) -> Option<i64> {
        let at = self.here();
        self.diags
            .syntax_error(at, "unexpected token, expected a number or operator.");
        None
    }

    fn expression(&mut self) -> Option<i64> {
        let mut left = self.term()?;
        loop {
            match self.current_op() {
                Some(Op::Plus) => {
                    self.pos += 1;
                    left += self.term()?;
                }
                Some(Op::Minus) => {
                    self.pos += 1;
                    left -= self.term()?;
                }
                _ => return Some(left),
            }
        }
    }

    fn term(&mut self) -> Option<i64> {
        let mut left = self.primary()?;
        loop {
            match self.current_op() {
                Some(Op::Star) => {
                    self.pos += 1;
                    left *= self.primary()?;
                }
                Some(Op::Slash) => {
                    self.pos += 1;
                    let at = self.here();
                    let right = self.primary()?;
                    if right == 0 {
                        self.diags
                            .syntax_error(at, "division by zero in constant expression.");
                        return None;
                    }
                    left /= right;
                }
                _ => return Some(left),
            }
        }
    }

    fn primary(&mut self) -> Option<i64> {
        let Some(tok) = self.current() else {
            return self.unexpected();
        };

        match &tok.kind {
            TokenKind::Number(value) => {
                let value = *value;
                self.pos += 1;
                Some(value)
            }
            TokenKind::Identifier => match self.consts.get(&tok.text) {
                Some(value) => {
                    self.pos += 1;
                    Some(value)
                }
                None => self.unexpected(),
            },
            TokenKind::Operator(Op::LParen) => {
                let open = tok.origin;
                self.pos += 1;
                let value = self.expression()?;
                if self.current_op() == Some(Op::RParen) {
                    self.pos += 1;
                    Some(value)
                } else {
                    self.diags.syntax_error(open, "unmatched \"(\".");
                    None
                }
            }
            _ => self.unexpected(),
        }
    }
}

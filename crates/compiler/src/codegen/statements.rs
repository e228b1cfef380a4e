//! Assignment and binary-operation statements
//!
//! `lhs op rhs;` where `lhs` is a variable or an array slot and `rhs` is a
//! variable, an array slot, or a compile-time expression. Array slots ride
//! the ferry: the slot is read into `temp_x`, the operation runs against
//! `temp_x`, and the result is written back through the array shuttle.

use crate::lexer::{Op, TokenKind};
use crate::symbols::VarKind;

use super::CodeGen;
use super::algo::Algo;

/// A resolved left-hand side. For an array slot, `cell` is `temp_x`
/// (already loaded) and the base remembers where to ferry the result.
struct Lhs {
    cell: usize,
    array_base: Option<usize>,
}

impl CodeGen<'_> {
    /// Compile one `lhs op rhs` statement starting at the lhs identifier.
    pub(super) fn operation_statement(&mut self) {
        let Some(lhs_tok) = self.current().cloned() else { return };
        let Some(lhs) = self.parse_lhs() else { return };

        let Some(op_tok) = self.next() else { return };
        let op = match op_tok.kind {
            TokenKind::Operator(op) => op,
            _ => {
                self.diags
                    .syntax_error(op_tok.origin, "expected a valid operator.");
                self.pos += 1;
                return;
            }
        };
        let algo = match op {
            Op::Assign => Algo::Assign,
            Op::Percent => Algo::Mod,
            Op::EqEq => Algo::Equal,
            Op::Plus => Algo::Add,
            Op::Minus => Algo::Sub,
            Op::OrOr => Algo::Or,
            Op::AndAnd => Algo::And,
            Op::Less => Algo::Less,
            Op::Greater => Algo::Greater,
            Op::Slash => Algo::Div,
            Op::Star => Algo::Mul,
            _ => {
                self.diags
                    .syntax_error(op_tok.origin, "unrecognized operator.");
                self.pos += 1;
                return;
            }
        };

        let Some(rhs_tok) = self.next() else { return };

        if rhs_tok.kind == TokenKind::Identifier
            && let Some(rvar) = self.touch_var(&rhs_tok.text)
        {
            let right = match rvar.kind {
                VarKind::Array { .. } => {
                    let temp_y_index = self.layout.temp_y_index;
                    if self.parse_subscript(temp_y_index).is_none() {
                        return;
                    }
                    self.emit_algo(
                        Algo::ArrayRead,
                        self.layout.temp_y,
                        Some(rvar.location),
                        Some(temp_y_index),
                    );
                    self.layout.temp_y
                }
                VarKind::Cell => {
                    if lhs.array_base.is_none() && lhs_tok.text == rhs_tok.text {
                        // lhs and rhs are the same cell; the algorithms'
                        // scratch invariants need a detached copy.
                        let temp_y = self.layout.temp_y;
                        self.emit_algo(Algo::Assign, temp_y, Some(rvar.location), None);
                        temp_y
                    } else {
                        rvar.location
                    }
                }
            };
            self.pos += 1;
            self.emit_algo(algo, lhs.cell, Some(right), None);
            self.ferry_back(&lhs);
            return;
        }

        // Compile-time expression rhs.
        let Some(value) = self.fold_expression() else { return };
        self.expect_current_op(Op::Semicolon, ";");

        match op {
            Op::Plus => self.add_constant(lhs.cell, value, false),
            Op::Minus => self.add_constant(lhs.cell, value, true),
            Op::Assign => self.set_constant(lhs.cell, value.rem_euclid(256) as u8),
            _ => {
                let temp_y = self.layout.temp_y;
                self.set_constant(temp_y, value.rem_euclid(256) as u8);
                self.emit_algo(algo, lhs.cell, Some(temp_y), None);
            }
        }
        self.ferry_back(&lhs);
    }

    /// Resolve the left-hand side at the cursor. Plain variables resolve
    /// to their cell; array slots are loaded into `temp_x`. Leaves the
    /// cursor on the last consumed token.
    fn parse_lhs(&mut self) -> Option<Lhs> {
        let tok = self.current().cloned()?;
        let var = self.touch_var(&tok.text)?;

        match var.kind {
            VarKind::Cell => Some(Lhs {
                cell: var.location,
                array_base: None,
            }),
            VarKind::Array { .. } => {
                let temp_x_index = self.layout.temp_x_index;
                self.parse_subscript(temp_x_index)?;
                self.emit_algo(
                    Algo::ArrayRead,
                    self.layout.temp_x,
                    Some(var.location),
                    Some(temp_x_index),
                );
                Some(Lhs {
                    cell: self.layout.temp_x,
                    array_base: Some(var.location),
                })
            }
        }
    }

    /// Parse `[ index ]` following an array name and leave the index value
    /// in `index_cell`. Entered on the array name; leaves the cursor on
    /// the `]`.
    pub(super) fn parse_subscript(&mut self, index_cell: usize) -> Option<()> {
        self.expect_op(Op::LBracket, "[")?;
        let tok = self.next()?;

        if tok.kind == TokenKind::Identifier
            && let Some(var) = self.touch_var(&tok.text)
        {
            self.emit_algo(Algo::Assign, index_cell, Some(var.location), None);
            self.expect_op(Op::RBracket, "]")?;
        } else {
            let value = self.fold_expression()?;
            self.set_constant(index_cell, value.rem_euclid(256) as u8);
            match self.current().cloned() {
                Some(tok) if tok.is_op(Op::RBracket) => {}
                Some(tok) => {
                    self.diags.syntax_error(
                        tok.origin,
                        format!("unexpected token \"{}\", expected \"]\".", tok.text),
                    );
                }
                None => {
                    let at = self.tokens.last().map(|t| t.origin).unwrap_or(0);
                    self.diags
                        .syntax_error(at, "expected a valid token to follow.");
                    return None;
                }
            }
        }
        Some(())
    }

    /// Write an array-slot result back from `temp_x`.
    fn ferry_back(&mut self, lhs: &Lhs) {
        if let Some(base) = lhs.array_base {
            self.emit_algo(
                Algo::ArrayWrite,
                base,
                Some(self.layout.temp_x_index),
                Some(self.layout.temp_x),
            );
        }
    }
}

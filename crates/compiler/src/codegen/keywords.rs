//! Keyword handlers
//!
//! One handler per keyword, dispatched from the main loop. Handlers own
//! the cursor: each consumes its whole statement and leaves `pos` on the
//! next one. Control flow (`while`/`if`/`end`) and macro machinery live
//! here too, since both are keyword-driven.

use crate::layout::find_matching_end;
use crate::lexer::{Keyword, Op, TokenKind};
use crate::symbols::{Constant, Macro, VarKind, Variable};

use super::algo::Algo;
use super::{CodeGen, Frame};

impl CodeGen<'_> {
    pub(super) fn keyword_statement(&mut self) {
        let Some(keyword) = self.current().and_then(|t| t.keyword()) else {
            self.pos += 1;
            return;
        };

        match keyword {
            Keyword::Var => self.kw_var(),
            Keyword::While => self.kw_while(),
            Keyword::End => self.kw_end(),
            Keyword::Point => self.kw_point(),
            Keyword::If => self.kw_if(),
            Keyword::Not => self.kw_not(),
            Keyword::Print => self.kw_print(),
            Keyword::Array => self.kw_array(),
            Keyword::Bf => self.kw_bf(),
            Keyword::Define => self.kw_define(),
            Keyword::Input => self.kw_input(),
            Keyword::Write => self.kw_write(),
            Keyword::Decimal => self.kw_decimal(),
            Keyword::Macro => self.kw_macro(),
        }
    }

    fn kw_var(&mut self) {
        let Some(tok) = self.next() else { return };

        if tok.keyword().is_some() {
            self.diags
                .error(tok.origin, "variable names must not be keywords.");
            self.pos += 1;
            return;
        }
        if tok.kind != TokenKind::Identifier {
            self.diags.syntax_error(tok.origin, "expected an identifier.");
            self.pos += 1;
            return;
        }

        let location = self.next_cell;
        let declared = self.declare(Variable {
            name: tok.text,
            location,
            kind: VarKind::Cell,
            scope: self.scope,
            context: self.context,
            used: false,
            aliased: false,
            origin: tok.origin,
        });
        if declared {
            self.next_cell += 1;
            // The sizer guarantees the peak fits below the temporaries.
            debug_assert!(self.next_cell <= self.layout.temp_x);
        }
        self.pos += 1;
    }

    fn kw_while(&mut self) {
        let Some(tok) = self.next() else { return };
        let Some(var) = self.touch_var(&tok.text) else {
            self.diags.error(tok.origin, "invalid identifier.");
            self.pos += 1;
            return;
        };
        if var.kind != VarKind::Cell {
            self.diags
                .error(tok.origin, "arguments for while statements must not be arrays.");
            self.pos += 1;
            return;
        }

        self.out.move_to(var.location);
        self.out.raw("[");
        self.push_frame(Frame::While {
            cell: var.location,
            origin: tok.origin,
        });
        self.scope += 1;
        self.pos += 1;
    }

    fn kw_if(&mut self) {
        let Some(tok) = self.next() else { return };
        let Some(var) = self.touch_var(&tok.text) else {
            self.diags.error(tok.origin, "invalid identifier.");
            self.pos += 1;
            return;
        };
        if var.kind != VarKind::Cell {
            self.diags
                .error(tok.origin, "arguments for if statements must not be arrays.");
            self.pos += 1;
            return;
        }

        // The guard is tested on a copy so the variable survives the body.
        let temp_x = self.layout.temp_x;
        self.emit_algo(Algo::Assign, temp_x, Some(var.location), None);
        self.out.move_to(temp_x);
        self.out.raw("[");
        self.push_frame(Frame::If {
            cell: temp_x,
            origin: tok.origin,
        });
        self.scope += 1;
        self.pos += 1;
    }

    fn kw_end(&mut self) {
        let origin = self.tokens[self.pos].origin;
        let Some(frame) = self.frames.pop() else {
            self.diags.syntax_error(origin, "unmatched end statement.");
            self.pos += 1;
            return;
        };
        self.pos += 1;

        match frame {
            Frame::While { cell, .. } => {
                self.out.move_to(cell);
                self.out.raw("]");
            }
            Frame::If { cell, .. } => {
                // Zeroing the copied guard makes the loop single-pass.
                self.out.move_to(cell);
                self.out.raw("[-]]");
            }
            Frame::Macro { return_pos, .. } => {
                self.kill_scope_variables(self.scope);
                self.scope = self.scope.saturating_sub(1);
                self.kill_context_variables(self.context);
                self.context = self.context.saturating_sub(1);
                self.pos = return_pos;
                return;
            }
        }

        self.kill_scope_variables(self.scope);
        self.scope = self.scope.saturating_sub(1);
    }

    fn kw_point(&mut self) {
        let Some(tok) = self.next() else { return };
        match self.touch_var(&tok.text) {
            Some(var) => self.out.move_to(var.location),
            None => self.diags.error(tok.origin, "invalid identifier."),
        }
        self.pos += 1;
    }

    fn kw_not(&mut self) {
        let Some(tok) = self.next() else { return };
        let Some(var) = self.touch_var(&tok.text) else {
            self.diags.error(tok.origin, "invalid identifier.");
            self.pos += 1;
            return;
        };
        if var.kind != VarKind::Cell {
            self.diags
                .error(tok.origin, "arguments for not statements must not be arrays.");
            self.pos += 1;
            return;
        }
        self.emit_algo(Algo::Not, var.location, None, None);
        self.pos += 1;
    }

    fn kw_print(&mut self) {
        let Some(tok) = self.next() else { return };

        if let TokenKind::Str(bytes) = &tok.kind {
            let bytes = bytes.clone();
            self.emit_print_string(&bytes);
            self.pos += 1;
            return;
        }

        if tok.kind == TokenKind::Identifier
            && let Some(var) = self.touch_var(&tok.text)
        {
            let cell = match var.kind {
                VarKind::Array { .. } => {
                    let temp_y_index = self.layout.temp_y_index;
                    if self.parse_subscript(temp_y_index).is_none() {
                        return;
                    }
                    self.emit_algo(
                        Algo::ArrayRead,
                        self.layout.temp_y,
                        Some(var.location),
                        Some(temp_y_index),
                    );
                    self.layout.temp_y
                }
                VarKind::Cell => var.location,
            };
            self.emit_algo(Algo::PrintValue, cell, None, None);
            self.pos += 1;
            return;
        }

        // Number, constant, or parenthesised expression.
        let Some(value) = self.fold_expression() else { return };
        self.expect_current_op(Op::Semicolon, ";");
        let cell = self.materialize_constant(value.rem_euclid(256) as u8);
        self.out.move_to(cell);
        self.out.raw(".");
    }

    fn kw_array(&mut self) {
        let Some(tok) = self.next() else { return };
        if tok.kind != TokenKind::Identifier {
            self.diags.syntax_error(tok.origin, "expected an identifier.");
            self.pos += 1;
            return;
        }
        self.pos += 1;

        let Some(value) = self.fold_expression() else { return };
        self.expect_current_op(Op::Semicolon, ";");
        if value < 1 {
            self.diags.error(tok.origin, "array length must be positive.");
            return;
        }
        let len = value as usize;

        let location = self.layout.arrays + self.used_array_cells;
        let declared = self.declare(Variable {
            name: tok.text,
            location,
            kind: VarKind::Array { len },
            scope: self.scope,
            context: self.context,
            used: false,
            aliased: false,
            origin: tok.origin,
        });
        if declared {
            // Index/value shuttle header plus data plus trailing workspace.
            self.used_array_cells += len + 5;
        }
    }

    fn kw_bf(&mut self) {
        let Some(tok) = self.next() else { return };
        let TokenKind::Str(bytes) = &tok.kind else {
            self.diags
                .syntax_error(tok.origin, "expected a string literal.");
            self.pos += 1;
            return;
        };
        // Verbatim escape hatch. The code must leave the head where it
        // found it; nothing here is tracked.
        for &byte in bytes {
            if byte.is_ascii() {
                self.out.raw_char(byte as char);
            }
        }
        self.pos += 1;
    }

    fn kw_define(&mut self) {
        let Some(tok) = self.next() else { return };
        if tok.kind != TokenKind::Identifier {
            self.diags.syntax_error(tok.origin, "expected an identifier.");
            self.pos += 1;
            return;
        }
        self.pos += 1;

        let Some(value) = self.fold_expression() else { return };
        self.expect_current_op(Op::Semicolon, ";");

        if self.consts.is_full() {
            self.diags
                .error(tok.origin, "too many constant definitions.");
            return;
        }
        self.consts.insert(Constant {
            name: tok.text,
            value,
            origin: tok.origin,
        });
    }

    fn kw_input(&mut self) {
        let Some(tok) = self.next() else { return };
        let Some(var) = self.touch_var(&tok.text) else {
            self.diags.error(tok.origin, "invalid identifier.");
            self.pos += 1;
            return;
        };
        if var.kind != VarKind::Cell {
            self.diags
                .error(tok.origin, "arguments for input statements must not be arrays.");
            self.pos += 1;
            return;
        }
        self.out.move_to(var.location);
        self.out.raw(",");
        self.pos += 1;
    }

    fn kw_write(&mut self) {
        let Some(tok) = self.next() else { return };
        let TokenKind::Str(bytes) = &tok.kind else {
            self.diags.syntax_error(tok.origin, "expected a string.");
            self.pos += 1;
            return;
        };
        let bytes = bytes.clone();
        self.emit_write_string(&bytes);
        self.pos += 1;
    }

    fn kw_decimal(&mut self) {
        let Some(tok) = self.next() else { return };
        if tok.kind != TokenKind::Identifier {
            self.diags.syntax_error(tok.origin, "expected an identifier.");
            self.pos += 1;
            return;
        }
        let Some(var) = self.touch_var(&tok.text) else {
            self.diags.error(tok.origin, "invalid identifier.");
            self.pos += 1;
            return;
        };
        if var.kind != VarKind::Cell {
            self.diags.error(
                tok.origin,
                "arguments for decimal statements must not be arrays.",
            );
            self.pos += 1;
            return;
        }
        self.emit_algo(Algo::ReadDecimal, var.location, None, None);
        self.pos += 1;
    }

    fn kw_macro(&mut self) {
        let Some(name_tok) = self.next() else { return };
        if name_tok.kind != TokenKind::Identifier {
            self.diags
                .syntax_error(name_tok.origin, "expected an identifier.");
        }
        let name = name_tok.text;
        let origin = name_tok.origin;

        if self.expect_op(Op::LParen, "(").is_none() {
            return;
        }
        self.pos += 1;
        let Some(params) = self.parse_name_list() else { return };
        if !self.current().is_some_and(|t| t.is_op(Op::RParen)) {
            let at = self.current().map(|t| t.origin).unwrap_or(origin);
            self.diags.syntax_error(at, "expected \")\".");
        }

        let body = self.pos + 1;
        if self.macros.is_full() {
            self.diags.error(origin, "too many macros.");
        } else {
            self.macros.insert(Macro {
                name,
                params,
                body,
                origin,
            });
        }

        // The body is recorded, not compiled; skip to its end.
        match find_matching_end(self.tokens, body) {
            Some(end_index) => self.pos = end_index + 1,
            None => {
                self.diags.syntax_error(
                    origin,
                    "no terminating end statement to macro definition.",
                );
                self.pos = body;
            }
        }
    }

    /// Expand a macro call at the cursor: bind arguments (existing caller
    /// variables) to parameter names in a fresh context, then redirect the
    /// cursor into the body. The frame remembers where to come back to.
    pub(super) fn expand_macro(&mut self) {
        let Some(name_tok) = self.current().cloned() else { return };
        let Some(id) = self.macros.index_of(&name_tok.text) else {
            self.pos += 1;
            return;
        };

        let recursive = self
            .frames
            .iter()
            .any(|f| matches!(f, Frame::Macro { id: fid, .. } if *fid == id));
        if recursive {
            self.diags
                .error(self.macros.get(id).origin, "recursive macro definition.");
            // Discard the call: skim the arguments and continue after.
            if self.expect_op(Op::LParen, "(").is_none() {
                return;
            }
            self.pos += 1;
            if self.parse_name_list().is_none() {
                return;
            }
            self.pos += 1;
            return;
        }

        if self.expect_op(Op::LParen, "(").is_none() {
            return;
        }
        self.pos += 1;
        let Some(args) = self.parse_name_list() else { return };
        if !self.current().is_some_and(|t| t.is_op(Op::RParen)) {
            let at = self.current().map(|t| t.origin).unwrap_or(name_tok.origin);
            self.diags.syntax_error(at, "expected \")\".");
        }
        let return_pos = self.pos + 1;

        let mac = self.macros.get(id).clone();
        if args.len() != mac.params.len() {
            self.diags
                .error(name_tok.origin, "incorrect number of arguments to macro.");
            self.pos = return_pos;
            return;
        }

        let mut failed = false;
        for (param, arg) in mac.params.iter().zip(&args) {
            match self.touch_var(arg) {
                None => {
                    self.diags
                        .error(name_tok.origin, "unrecognized variable.");
                    failed = true;
                }
                Some(var) => {
                    let bound = self.declare(Variable {
                        name: param.clone(),
                        location: var.location,
                        kind: var.kind,
                        scope: self.scope,
                        context: self.context + 1,
                        used: false,
                        aliased: true,
                        origin: name_tok.origin,
                    });
                    failed = failed || !bound;
                }
            }
        }
        if failed {
            // Roll back any bindings that did go in.
            let _ = self.vars.kill_context(self.context + 1);
            self.pos = return_pos;
            return;
        }

        self.push_frame(Frame::Macro {
            id,
            return_pos,
            origin: name_tok.origin,
        });
        self.scope += 1;
        self.context += 1;
        self.pos = mac.body;
    }

    /// Comma-separated identifier list, entered just past `(`. Leaves the
    /// cursor on the token that ended the list (normally `)`).
    pub(super) fn parse_name_list(&mut self) -> Option<Vec<String>> {
        let mut names = Vec::new();
        loop {
            let Some(tok) = self.current().cloned() else {
                let at = self.tokens.last().map(|t| t.origin).unwrap_or(0);
                self.diags
                    .syntax_error(at, "expected a valid token to follow.");
                return None;
            };
            if tok.is_op(Op::RParen) {
                return Some(names);
            }
            if tok.kind != TokenKind::Identifier {
                self.diags
                    .syntax_error(tok.origin, "malformed argument list.");
                return Some(names);
            }
            names.push(tok.text);

            let sep = self.next()?;
            if sep.is_op(Op::RParen) {
                return Some(names);
            }
            if !sep.is_op(Op::Comma) {
                self.diags.syntax_error(sep.origin, "expected a \",\".");
                return Some(names);
            }
            self.pos += 1;
        }
    }

    /// PRINT a string: one scratch cell, re-pointed per character by the
    /// delta to the previous one.
    fn emit_print_string(&mut self, bytes: &[u8]) {
        let Some(&first) = bytes.first() else { return };
        self.out.move_to(self.layout.scratch);
        self.out.raw("[-]");
        self.out.add(first as i64);
        self.out.raw(".");
        for pair in bytes.windows(2) {
            self.out.add(pair[1] as i64 - pair[0] as i64);
            self.out.raw(".");
        }
    }

    /// WRITE a string: lay the characters across consecutive cells
    /// starting at the current head, duplicating each cell into the next
    /// and adjusting by the delta. Ends back on the starting cell.
    fn emit_write_string(&mut self, bytes: &[u8]) {
        self.out.raw("[-]");
        let Some(&first) = bytes.first() else { return };
        self.out.add(first as i64);

        if bytes.len() > 1 {
            for pair in bytes[..bytes.len() - 1].windows(2) {
                self.out.raw(">[-]>[-]<<[>+>+<<-]>>[<<+>>-]<");
                self.out.add(pair[1] as i64 - pair[0] as i64);
            }
            self.out.raw(">[-]");
            self.out.add(bytes[bytes.len() - 1] as i64);
            for _ in 0..bytes.len() - 1 {
                self.out.raw("<");
            }
        }
    }
}

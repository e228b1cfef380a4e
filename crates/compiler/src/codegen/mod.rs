//! Code generation
//!
//! A state machine over the token stream. Each top-level token dispatches
//! to a keyword handler, an assignment/binary-operation statement, or a
//! macro expansion; everything else is diagnosed and skipped. All compile
//! state lives on the `CodeGen` value: the symbol tables, the control-flow
//! stack, the macro context, tape-cell accounting, the output buffer with
//! its virtual head, and the diagnostics sink.
//!
//! Module layout:
//!
//! - `emit`: output buffer + virtual head
//! - `algo`: algorithm templates + instantiator
//! - `constants`: byte-constant emitter (embedded table)
//! - `keywords`: keyword handlers, control flow, macros
//! - `statements`: `lhs op rhs` statements and the array ferry

mod algo;
mod constants;
mod emit;
mod keywords;
mod statements;

pub use constants::{Generator, generator_for};

use crate::diag::Diagnostics;
use crate::layout::TapeLayout;
use crate::lexer::{Op, Token, TokenKind};
use crate::symbols::{ConstTable, MAX_SYMBOLS, MacroTable, VarKind, VarTable, Variable};

use emit::Emitter;

/// Control-flow stack frames. Every `end` pops exactly one.
#[derive(Debug, Clone, Copy)]
enum Frame {
    While { cell: usize, origin: usize },
    If { cell: usize, origin: usize },
    Macro { id: usize, return_pos: usize, origin: usize },
}

pub struct CodeGen<'a> {
    tokens: &'a [Token],
    pos: usize,
    layout: TapeLayout,
    vars: VarTable,
    consts: ConstTable,
    macros: MacroTable,
    frames: Vec<Frame>,
    /// `while`/`if`/macro nesting depth; lifetime-bounds variables.
    scope: u32,
    /// Macro-instance id; 0 is the top level.
    context: u32,
    /// Next free cell in the user-variable region.
    next_cell: usize,
    /// Cells consumed so far in the array region.
    used_array_cells: usize,
    out: Emitter,
    diags: Diagnostics,
}

impl<'a> CodeGen<'a> {
    pub fn new(tokens: &'a [Token], layout: TapeLayout, diags: Diagnostics) -> Self {
        CodeGen {
            tokens,
            pos: 0,
            layout,
            vars: VarTable::new(),
            consts: ConstTable::new(),
            macros: MacroTable::new(),
            frames: Vec::new(),
            scope: 0,
            context: 0,
            next_cell: 0,
            used_array_cells: 0,
            out: Emitter::new(),
            diags,
        }
    }

    /// Run the dispatcher to the end of the token stream and tear down.
    /// Returns the raw (unsanitized) output and the diagnostics.
    pub fn run(mut self) -> (String, Diagnostics) {
        while self.pos < self.tokens.len() {
            self.dispatch();
        }
        self.finish();
        (self.out.into_code(), self.diags)
    }

    fn dispatch(&mut self) {
        // The token slice outlives `self`; borrowing through the field
        // copy keeps the handlers free to take `&mut self`.
        let tokens = self.tokens;
        let tok = &tokens[self.pos];
        match &tok.kind {
            TokenKind::Keyword(_) => self.keyword_statement(),
            // Statement separators carry no meaning of their own.
            TokenKind::Operator(Op::Semicolon) => self.pos += 1,
            TokenKind::Identifier if self.vars.get(&tok.text, self.context).is_some() => {
                self.operation_statement();
            }
            TokenKind::Identifier if self.macros.index_of(&tok.text).is_some() => {
                self.expand_macro();
            }
            _ => {
                self.diags.syntax_error(tok.origin, "invalid statement.");
                self.pos += 1;
            }
        }
    }

    /// Diagnose unclosed frames, then tear down the top-level scope so
    /// never-read variables get their warnings.
    fn finish(&mut self) {
        while let Some(frame) = self.frames.pop() {
            let (origin, what) = match frame {
                Frame::While { origin, .. } => (origin, "while statement"),
                Frame::If { origin, .. } => (origin, "if statement"),
                Frame::Macro { origin, .. } => (origin, "macro expansion"),
            };
            self.diags
                .error(origin, format!("unterminated {}.", what));
        }

        let killed = self.vars.kill_scope(0);
        self.report_killed(&killed);
    }

    // ----- token cursor helpers -----

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// Advance to the next token, diagnosing a truncated statement at end
    /// of input.
    fn next(&mut self) -> Option<Token> {
        self.pos += 1;
        match self.tokens.get(self.pos) {
            Some(tok) => Some(tok.clone()),
            None => {
                let origin = self.tokens.last().map(|t| t.origin).unwrap_or(0);
                self.diags
                    .syntax_error(origin, "expected a valid token to follow.");
                None
            }
        }
    }

    /// Advance and require an operator. A mismatch is diagnosed but not
    /// fatal to the statement; only end of input returns `None`.
    fn expect_op(&mut self, op: Op, text: &str) -> Option<Token> {
        let tok = self.next()?;
        if !tok.is_op(op) {
            self.diags.syntax_error(
                tok.origin,
                format!("unexpected token \"{}\", expected \"{}\".", tok.text, text),
            );
        }
        Some(tok)
    }

    /// Require the current token to be `op` and consume it. Used after
    /// expression folding, which leaves the cursor past what it ate.
    fn expect_current_op(&mut self, op: Op, text: &str) -> Option<Token> {
        match self.current().cloned() {
            Some(tok) => {
                if !tok.is_op(op) {
                    self.diags.syntax_error(
                        tok.origin,
                        format!("unexpected token \"{}\", expected \"{}\".", tok.text, text),
                    );
                }
                self.pos += 1;
                Some(tok)
            }
            None => {
                let at = self.tokens.last().map(|t| t.origin).unwrap_or(0);
                self.diags
                    .syntax_error(at, "expected a valid token to follow.");
                None
            }
        }
    }

    fn push_frame(&mut self, frame: Frame) {
        if self.frames.len() >= MAX_SYMBOLS {
            let origin = match frame {
                Frame::While { origin, .. }
                | Frame::If { origin, .. }
                | Frame::Macro { origin, .. } => origin,
            };
            self.diags
                .error(origin, "control flow is nested too deeply.");
            return;
        }
        self.frames.push(frame);
    }

    // ----- symbol helpers -----

    /// Look up a variable in the current context and mark it used.
    fn touch_var(&mut self, name: &str) -> Option<Variable> {
        let context = self.context;
        let var = self.vars.get_mut(name, context)?;
        var.used = true;
        Some(var.clone())
    }

    /// Shared declaration path for `var`, `array`, and macro parameters.
    /// Validates collisions and capacity; returns whether the record went
    /// in.
    fn declare(&mut self, var: Variable) -> bool {
        if self.vars.get(&var.name, var.context).is_some() {
            self.diags.error(var.origin, "variable already defined.");
            return false;
        }
        if self.consts.contains(&var.name) {
            self.diags.error(
                var.origin,
                "variable name conflicts with a constant definition.",
            );
            return false;
        }
        if self.vars.is_full() {
            self.diags.error(var.origin, "too many variables.");
            return false;
        }
        self.vars.insert(var);
        true
    }

    /// Kill a scope's variables, free their cells, warn about unused ones.
    fn kill_scope_variables(&mut self, scope: u32) {
        let killed = self.vars.kill_scope(scope);
        self.report_killed(&killed);
    }

    fn kill_context_variables(&mut self, context: u32) {
        let killed = self.vars.kill_context(context);
        self.report_killed(&killed);
    }

    fn report_killed(&mut self, killed: &[Variable]) {
        for var in killed {
            if !var.used {
                self.diags
                    .warning(var.origin, format!("unused variable \"{}\".", var.name));
            }
            if !var.aliased && var.kind == VarKind::Cell {
                self.next_cell -= 1;
            }
        }
    }

    /// Evaluate a constant expression at the cursor, leaving the cursor on
    /// the first token past it.
    fn fold_expression(&mut self) -> Option<i64> {
        let (value, next_pos) =
            crate::expr::evaluate(self.tokens, self.pos, &self.consts, &mut self.diags);
        self.pos = next_pos;
        value
    }
}

//! Tape layout and the pre-pass sizer
//!
//! The target tape is carved into fixed regions, computed once before
//! codegen:
//!
//! ```text
//! [0, V)            user variables, one cell per live scalar
//! [V, V+4)          temp_x, temp_x_index, temp_y, temp_y_index
//! [V+4, V+14)       scratch cells 0-9 used by algorithm templates and
//!                   the constant emitter
//! [V+14, ...)       array blocks, n+5 cells each
//! ```
//!
//! `V` is the peak number of scalars live at once, not the number of `var`
//! statements: scopes free their cells on `end`, so sequentially-ended
//! scopes share tape. The sizer walks the token stream tracking scope
//! depth, measures each macro body once, and adds a macro's peak on top of
//! the caller's live count at every call site. Macro parameters alias
//! caller cells and cost nothing.

use crate::lexer::{Keyword, Op, Token, TokenKind};

/// temp_x, temp_x_index, temp_y, temp_y_index.
pub const NAMED_TEMP_CELLS: usize = 4;

/// Scratch span addressed by template digits 0-9.
pub const SCRATCH_CELLS: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct TapeLayout {
    /// Peak concurrent scalar count; user variables live in `[0, variables)`.
    pub variables: usize,
    pub temp_x: usize,
    pub temp_x_index: usize,
    pub temp_y: usize,
    pub temp_y_index: usize,
    /// First scratch cell; template digit `d` means `scratch + d`.
    pub scratch: usize,
    /// Base of the array region.
    pub arrays: usize,
}

impl TapeLayout {
    pub fn for_peak(peak: usize) -> Self {
        TapeLayout {
            variables: peak,
            temp_x: peak,
            temp_x_index: peak + 1,
            temp_y: peak + 2,
            temp_y_index: peak + 3,
            scratch: peak + NAMED_TEMP_CELLS,
            arrays: peak + NAMED_TEMP_CELLS + SCRATCH_CELLS,
        }
    }
}

/// Find the `end` matching the construct that starts at `start` (the first
/// token inside it). `if`, `while` and `macro` open nested constructs.
pub fn find_matching_end(tokens: &[Token], start: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut i = start;
    while i < tokens.len() {
        match tokens[i].keyword() {
            Some(Keyword::If) | Some(Keyword::While) | Some(Keyword::Macro) => depth += 1,
            Some(Keyword::End) => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Compute the tape layout for a token stream.
pub fn measure(tokens: &[Token]) -> TapeLayout {
    let mut macro_peaks: Vec<(String, usize)> = Vec::new();
    let peak = walk(tokens, 0, tokens.len(), &mut macro_peaks);
    TapeLayout::for_peak(peak)
}

/// Peak live-scalar count of `tokens[start..end]`, registering macro peaks
/// as definitions are passed. Unmatched `end`s are left for codegen to
/// diagnose.
fn walk(
    tokens: &[Token],
    start: usize,
    end: usize,
    macro_peaks: &mut Vec<(String, usize)>,
) -> usize {
    let mut live = 0usize;
    let mut peak = 0usize;
    let mut scope_counts = vec![0usize];
    let mut i = start;

    while i < end {
        match &tokens[i].kind {
            TokenKind::Keyword(Keyword::Var) => {
                live += 1;
                peak = peak.max(live);
                if let Some(count) = scope_counts.last_mut() {
                    *count += 1;
                }
            }
            TokenKind::Keyword(Keyword::While) | TokenKind::Keyword(Keyword::If) => {
                scope_counts.push(0);
            }
            TokenKind::Keyword(Keyword::End) => {
                if scope_counts.len() > 1 {
                    let count = scope_counts.pop().unwrap_or(0);
                    live -= count;
                }
            }
            TokenKind::Keyword(Keyword::Macro) => {
                // Measure the body once; skip it in this walk. Malformed
                // definitions fall through to codegen's diagnostics.
                let name = tokens.get(i + 1).map(|t| t.text.clone());
                let body = tokens[i + 1..end]
                    .iter()
                    .position(|t| t.is_op(Op::RParen))
                    .map(|off| i + 2 + off);
                match (name, body) {
                    (Some(name), Some(body)) => match find_matching_end(tokens, body) {
                        Some(stop) => {
                            let body_peak = walk(tokens, body, stop, macro_peaks);
                            macro_peaks.push((name, body_peak));
                            i = stop;
                        }
                        None => break,
                    },
                    _ => break,
                }
            }
            TokenKind::Identifier => {
                // A macro call stacks the body's scalars on top of ours.
                let is_call = tokens.get(i + 1).is_some_and(|t| t.is_op(Op::LParen));
                if is_call {
                    if let Some(&(_, body_peak)) = macro_peaks
                        .iter()
                        .find(|(name, _)| *name == tokens[i].text)
                    {
                        peak = peak.max(live + body_peak);
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }

    peak
}

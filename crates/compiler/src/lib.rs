//! BFM compiler library
//!
//! Compiles the BFM macro language to plain Brainfuck. The pipeline is
//! strictly sequential:
//!
//! 1. tokenize into a flat token vector;
//! 2. pre-pass sizer fixes the tape layout (peak scalar count, temporary
//!    and array region bases);
//! 3. codegen walks the tokens emitting BF while shadowing the tape head;
//! 4. the peephole sanitizer rewrites the output to a fixed point;
//! 5. the result is wrapped to 80 columns and written out.
//!
//! Diagnostics accumulate across stages; a stage boundary with any error
//! pending stops the run, so one compile surfaces as many problems as it
//! can. Warnings never stop anything.
//!
//! ```no_run
//! let result = bfm::compile_source("print \"Hi\";");
//! assert!(result.code.is_some());
//! ```

pub mod codegen;
pub mod diag;
pub mod expr;
pub mod layout;
pub mod lexer;
pub mod peephole;
pub mod symbols;

pub use codegen::CodeGen;
pub use diag::{Diagnostic, Diagnostics, Severity};
pub use layout::TapeLayout;
pub use lexer::{Token, TokenKind};

use std::fs;
use std::path::Path;

/// Output programs wrap to this many columns.
pub const OUTPUT_COLUMNS: usize = 80;

/// Outcome of compiling one source buffer. `code` is `None` when any
/// error was recorded; warnings leave it intact.
pub struct CompileResult {
    pub code: Option<String>,
    pub diagnostics: Diagnostics,
}

/// Compile a source buffer to sanitized Brainfuck (unwrapped).
pub fn compile_source(source: &str) -> CompileResult {
    let mut diagnostics = Diagnostics::new();

    let tokens = lexer::tokenize(source, &mut diagnostics);
    if diagnostics.has_errors() {
        return CompileResult {
            code: None,
            diagnostics,
        };
    }

    let layout = layout::measure(&tokens);
    let generator = CodeGen::new(&tokens, layout, diagnostics);
    let (code, diagnostics) = generator.run();
    if diagnostics.has_errors() {
        return CompileResult {
            code: None,
            diagnostics,
        };
    }

    CompileResult {
        code: Some(peephole::sanitize(&code)),
        diagnostics,
    }
}

/// Break a program into lines of `width` characters, the output format
/// every revision of the compiler has used.
pub fn wrap_columns(code: &str, width: usize) -> String {
    let mut out = String::with_capacity(code.len() + code.len() / width.max(1) + 1);
    for (i, ch) in code.chars().enumerate() {
        if i != 0 && i % width == 0 {
            out.push('\n');
        }
        out.push(ch);
    }
    out
}

/// Compile `input` and write the wrapped program to `output`. Diagnostics
/// render to stderr; any error aborts before the output file is touched.
pub fn compile_file(input: &Path, output: &Path, verbose: bool) -> Result<(), String> {
    let source = fs::read_to_string(input)
        .map_err(|e| format!("failed to read {}: {}", input.display(), e))?;

    let result = compile_source(&source);

    let path = input.display().to_string();
    let listing = result.diagnostics.render(&path, &source, verbose);
    if !listing.is_empty() {
        eprint!("{}", listing);
    }

    match result.code {
        Some(code) => {
            fs::write(output, wrap_columns(&code, OUTPUT_COLUMNS))
                .map_err(|e| format!("failed to write {}: {}", output.display(), e))?;
            Ok(())
        }
        None => Err(format!(
            "compilation failed with {} error(s).",
            result.diagnostics.error_count()
        )),
    }
}

//! Diagnostics for BFM compilation
//!
//! Every problem found during a run is recorded as a finished message plus a
//! byte offset into the source, a severity, and a suppressible flag, then
//! rendered in one batch at the end:
//!
//! ```text
//! examples.bfm:3:9: error: variable already defined.
//!     var x
//!         ^
//! ```
//!
//! Suppressible reports (lexical and syntactic errors, warnings) after the
//! first on a source line are folded into one unless verbose mode is on;
//! semantic errors always print. Line and column numbers are 1-based.

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// A single report. The message is formatted at the call site; rendering
/// only adds location and the caret line.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Byte offset into the source, if the report points at source text.
    pub offset: Option<usize>,
    pub severity: Severity,
    /// Folded with same-line reports when not in verbose mode.
    pub suppressible: bool,
    pub message: String,
}

/// The per-run diagnostic sink.
#[derive(Debug, Default)]
pub struct Diagnostics {
    list: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    /// A semantic error. Never folded.
    pub fn error(&mut self, offset: usize, message: impl Into<String>) {
        self.list.push(Diagnostic {
            offset: Some(offset),
            severity: Severity::Error,
            suppressible: false,
            message: message.into(),
        });
    }

    /// A lexical or syntactic error. Folded per line unless verbose.
    pub fn syntax_error(&mut self, offset: usize, message: impl Into<String>) {
        self.list.push(Diagnostic {
            offset: Some(offset),
            severity: Severity::Error,
            suppressible: true,
            message: message.into(),
        });
    }

    pub fn warning(&mut self, offset: usize, message: impl Into<String>) {
        self.list.push(Diagnostic {
            offset: Some(offset),
            severity: Severity::Warning,
            suppressible: true,
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.list.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.list
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn reports(&self) -> &[Diagnostic] {
        &self.list
    }

    /// Render every report against the source it came from. `path` prefixes
    /// each location. With `verbose` off, suppressible reports on a line
    /// that already produced one are counted instead of printed, and a
    /// closing note states the count.
    pub fn render(&self, path: &str, source: &str, verbose: bool) -> String {
        let mut out = String::new();
        let mut suppressed = 0usize;
        let mut prev_line: Option<usize> = None;

        for diag in &self.list {
            let line = diag.offset.map(|o| line_number(source, o));

            if !verbose && diag.suppressible && line.is_some() && line == prev_line {
                suppressed += 1;
                continue;
            }
            if line.is_some() {
                prev_line = line;
            }

            match diag.offset {
                Some(offset) => {
                    out.push_str(&format!(
                        "{}:{}:{}: {}: {}\n",
                        path,
                        line_number(source, offset) + 1,
                        column_number(source, offset) + 1,
                        diag.severity.label(),
                        diag.message
                    ));
                    render_location(&mut out, source, offset);
                }
                None => {
                    out.push_str(&format!("{}: {}\n", diag.severity.label(), diag.message));
                }
            }
        }

        if !verbose && suppressed > 0 {
            out.push_str(&format!(
                "\tnote: only one report is printed per line, {} were suppressed.\n",
                suppressed
            ));
        }

        out
    }
}

/// 0-based line number of a byte offset.
pub fn line_number(source: &str, offset: usize) -> usize {
    source.as_bytes()[..offset.min(source.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
}

/// 0-based column number of a byte offset.
pub fn column_number(source: &str, offset: usize) -> usize {
    let upto = &source.as_bytes()[..offset.min(source.len())];
    match upto.iter().rposition(|&b| b == b'\n') {
        Some(nl) => upto.len() - nl - 1,
        None => upto.len(),
    }
}

/// The full line containing `offset`, without its newline.
fn line_at(source: &str, offset: usize) -> &str {
    let offset = offset.min(source.len());
    let start = source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = source[offset..]
        .find('\n')
        .map(|i| offset + i)
        .unwrap_or(source.len());
    &source[start..end]
}

/// Print the offending line (leading whitespace trimmed, tabs widened to
/// four spaces) and a caret under the offending column.
fn render_location(out: &mut String, source: &str, offset: usize) {
    let line = line_at(source, offset);
    let trimmed = line.trim_start();
    let leading = line.len() - trimmed.len();

    out.push('\t');
    for ch in trimmed.chars() {
        if ch == '\t' {
            out.push_str("    ");
        } else {
            out.push(ch);
        }
    }
    out.push_str("\n\t");

    let column = column_number(source, offset);
    for _ in 0..column.saturating_sub(leading) {
        out.push(' ');
    }
    out.push_str("^\n");
}

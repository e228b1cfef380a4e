//! Tokenizer for BFM source
//!
//! Scans a byte buffer into a flat token vector. Two cursors inchworm along
//! the input: `start` marks the beginning of the token in progress, a lookahead
//! walks to its end. Whitespace separates tokens and is never tokenized;
//! `//` line comments and nested `/* */` block comments are skipped here.
//!
//! Each token keeps the byte offset it came from so diagnostics anywhere in
//! the pipeline can point back into the source.

use crate::diag::Diagnostics;

/// Keywords, in the order of the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Var,
    While,
    End,
    Point,
    If,
    Not,
    Print,
    Array,
    Bf,
    Define,
    Input,
    Write,
    Decimal,
    Macro,
}

const KEYWORDS: [(&str, Keyword); 14] = [
    ("var", Keyword::Var),
    ("while", Keyword::While),
    ("end", Keyword::End),
    ("point", Keyword::Point),
    ("if", Keyword::If),
    ("not", Keyword::Not),
    ("print", Keyword::Print),
    ("array", Keyword::Array),
    ("fuck", Keyword::Bf),
    ("define", Keyword::Define),
    ("input", Keyword::Input),
    ("write", Keyword::Write),
    ("decimal", Keyword::Decimal),
    ("macro", Keyword::Macro),
];

pub fn keyword_for(text: &str) -> Option<Keyword> {
    KEYWORDS
        .iter()
        .find(|(name, _)| *name == text)
        .map(|&(_, kw)| kw)
}

/// Operators recognised by the tokenizer. Codegen only accepts a subset;
/// the rest produce "unrecognized operator" there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    PlusPlus,
    MinusMinus,
    GreaterEq,
    LessEq,
    Plus,
    Minus,
    Bang,
    Less,
    Greater,
    Percent,
    Assign,
    Star,
    Slash,
    LParen,
    RParen,
    Semicolon,
    LBracket,
    RBracket,
    Comma,
}

/// Longest match first, so `==` wins over `=` and `++` over `+`.
const OPERATORS: [(&str, Op); 28] = [
    ("==", Op::EqEq),
    ("!=", Op::NotEq),
    ("&&", Op::AndAnd),
    ("||", Op::OrOr),
    ("+=", Op::PlusEq),
    ("-=", Op::MinusEq),
    ("*=", Op::StarEq),
    ("/=", Op::SlashEq),
    ("%=", Op::PercentEq),
    ("++", Op::PlusPlus),
    ("--", Op::MinusMinus),
    (">=", Op::GreaterEq),
    ("<=", Op::LessEq),
    ("+", Op::Plus),
    ("-", Op::Minus),
    ("!", Op::Bang),
    ("<", Op::Less),
    (">", Op::Greater),
    ("%", Op::Percent),
    ("=", Op::Assign),
    ("*", Op::Star),
    ("/", Op::Slash),
    ("(", Op::LParen),
    (")", Op::RParen),
    (";", Op::Semicolon),
    ("[", Op::LBracket),
    ("]", Op::RBracket),
    (",", Op::Comma),
];

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier,
    /// Numeric literal, including character literals.
    Number(i64),
    /// String literal after escape expansion. Escapes such as `\xFF` can
    /// produce arbitrary bytes, so this is not a `String`.
    Str(Vec<u8>),
    Operator(Op),
    Keyword(Keyword),
    /// A byte the tokenizer has no rule for; rejected downstream.
    Symbol,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token in the source file.
    pub origin: usize,
    /// The token's source text (unexpanded, for strings).
    pub text: String,
}

impl Token {
    pub fn is_op(&self, op: Op) -> bool {
        self.kind == TokenKind::Operator(op)
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self.kind {
            TokenKind::Keyword(kw) => Some(kw),
            _ => None,
        }
    }
}

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Decimal digits, or `0x` followed by hex digits.
fn is_number(text: &str) -> bool {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    if text.starts_with("0x") {
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit())
    } else {
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
    }
}

fn number_value(text: &str) -> i64 {
    match text.strip_prefix("0x") {
        Some(hex) => i64::from_str_radix(hex, 16).unwrap_or(0),
        None => text.parse().unwrap_or(0),
    }
}

fn operator_at(rest: &str) -> Option<(&'static str, Op)> {
    OPERATORS
        .iter()
        .find(|(text, _)| rest.starts_with(text))
        .copied()
}

/// Expand escape sequences in a string or char literal body. `origin` is
/// the offset of the body's first byte, for escape diagnostics.
fn expand_escapes(raw: &str, origin: usize, diags: &mut Diagnostics) -> Vec<u8> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        i += 1;
        match bytes.get(i) {
            Some(b't') => out.push(b'\t'),
            Some(b'n') => out.push(b'\n'),
            Some(b'b') => out.push(8),
            Some(b'f') => out.push(12),
            Some(b'r') => out.push(b'\r'),
            Some(b'x') => {
                let hex = raw.get(i + 1..i + 3).filter(|h| {
                    h.len() == 2 && h.bytes().all(|b| b.is_ascii_hexdigit())
                });
                match hex {
                    Some(hex) => {
                        out.push(u8::from_str_radix(hex, 16).unwrap_or(0));
                        i += 2;
                    }
                    None => diags.syntax_error(origin + i, "malformed escape sequence."),
                }
            }
            Some(&other) => out.push(other),
            None => diags.syntax_error(origin + i, "malformed escape sequence."),
        }
        i += 1;
    }

    out
}

/// Scan a quoted literal starting at the opening quote. Returns the body
/// range and the index past the closing quote, or None when the literal is
/// unterminated (reported here).
fn scan_quoted(
    source: &str,
    open: usize,
    quote: u8,
    diags: &mut Diagnostics,
) -> Option<(usize, usize)> {
    let bytes = source.as_bytes();
    let mut i = open + 1;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => break,
            b'\\' if i + 1 < bytes.len() => i += 2,
            b if b == quote => return Some((open + 1, i)),
            _ => i += 1,
        }
    }

    diags.syntax_error(open, format!("unmatched {} character.", quote as char));
    None
}

/// Tokenize a whole source buffer. Lexical problems are recorded in
/// `diags`; scanning continues so one pass reports everything it can.
pub fn tokenize(source: &str, diags: &mut Diagnostics) -> Vec<Token> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let rest = &source[i..];

        if rest.starts_with("*/") {
            diags.syntax_error(i, "comment terminator has no initializer.");
            i += 2;
            continue;
        }

        if rest.starts_with("/*") {
            // Comments nest; track the depth to find the real terminator.
            let mut depth = 1;
            let mut j = i + 2;
            while j < bytes.len() && depth > 0 {
                if source[j..].starts_with("/*") {
                    depth += 1;
                    j += 2;
                } else if source[j..].starts_with("*/") {
                    depth -= 1;
                    j += 2;
                } else {
                    j += 1;
                }
            }
            if depth > 0 {
                diags.syntax_error(i, "unterminated comment.");
            }
            i = j;
            continue;
        }

        if rest.starts_with("//") {
            i += source[i..].find('\n').unwrap_or(rest.len());
            continue;
        }

        let origin = i;

        if let Some((text, op)) = operator_at(rest) {
            tokens.push(Token {
                kind: TokenKind::Operator(op),
                origin,
                text: text.to_string(),
            });
            i += text.len();
        } else if is_identifier_byte(bytes[i]) {
            let mut j = i;
            while j < bytes.len() && is_identifier_byte(bytes[j]) {
                j += 1;
            }
            let text = &source[i..j];
            let kind = if is_number(text) {
                TokenKind::Number(number_value(text))
            } else if let Some(kw) = keyword_for(text) {
                TokenKind::Keyword(kw)
            } else {
                TokenKind::Identifier
            };
            tokens.push(Token {
                kind,
                origin,
                text: text.to_string(),
            });
            i = j;
        } else if bytes[i] == b'"' {
            match scan_quoted(source, i, b'"', diags) {
                Some((body_start, body_end)) => {
                    let raw = &source[body_start..body_end];
                    let expanded = expand_escapes(raw, body_start, diags);
                    tokens.push(Token {
                        kind: TokenKind::Str(expanded),
                        origin,
                        text: raw.to_string(),
                    });
                    i = body_end + 1;
                }
                None => i += 1,
            }
        } else if bytes[i] == b'\'' {
            match scan_quoted(source, i, b'\'', diags) {
                Some((body_start, body_end)) => {
                    let raw = &source[body_start..body_end];
                    let expanded = expand_escapes(raw, body_start, diags);
                    if expanded.len() != 1 {
                        diags.syntax_error(origin, "multi-character chars are not permitted.");
                    }
                    tokens.push(Token {
                        kind: TokenKind::Number(
                            expanded.first().copied().unwrap_or(0) as i64
                        ),
                        origin,
                        text: raw.to_string(),
                    });
                    i = body_end + 1;
                }
                None => i += 1,
            }
        } else {
            // Unknown byte; kept as a token so the parser can point at it.
            // Advance a whole character, not a byte, or slicing breaks on
            // multibyte input.
            let ch = rest.chars().next().unwrap_or('\u{FFFD}');
            tokens.push(Token {
                kind: TokenKind::Symbol,
                origin,
                text: ch.to_string(),
            });
            i += ch.len_utf8().max(1);
        }
    }

    tokens
}

//! Lexer module
//!
//! Turns raw source text into a flat stream of [`RawToken`]s. The scanner
//! is line-oriented and restartable: when input stops inside a vertical-bar
//! quote, after a backslash, or after a trailing `~`, it reports
//! [`Lexed::Incomplete`] instead of erroring, and the caller re-tokenizes
//! once more text has arrived.
//!
//! Splitting rules:
//! - whitespace and the four list/array brackets always terminate a word;
//! - outside brackets, grouping parentheses and the infix operators split
//!   words too (`a-5` is three tokens), with `<=` `>=` `<>` resolved by
//!   one character of lookahead and `1e-5` kept whole;
//! - inside `[` `]` / `{` `}` only whitespace and brackets delimit, so list
//!   data keeps compound words until `parse_block` re-tokenizes them;
//! - `|…|` and `\` protect characters and record them in the token's mask;
//! - `;` starts a comment, a trailing `~` continues the logical line.

pub mod tokens;

pub use tokens::{Lexed, Op, RawKind, RawToken};

use crate::util::span::{EscapeOffset, MaskRange, SrcRef};
use smallvec::SmallVec;

/// Tokenize a chunk of source text
///
/// `source_index` identifies the source buffer in every emitted position.
pub fn tokenize(source: &str, source_index: u32) -> Lexed {
    let mut s = Scanner::new(source, source_index);
    loop {
        let Some(c) = s.peek() else { break };
        match c {
            '\n' => {
                s.flush();
                s.bump_newline();
                s.logical += 1;
            }
            ' ' | '\t' | '\r' => {
                s.flush();
                s.bump();
            }
            '~' => match s.peek_at(1) {
                Some('\n') => {
                    s.bump();
                    s.bump_newline();
                }
                Some('\r') if s.peek_at(2) == Some('\n') => {
                    s.bump();
                    s.bump();
                    s.bump_newline();
                }
                None => return Lexed::Incomplete,
                _ => s.word_char('~'),
            },
            ';' => {
                s.flush();
                if !s.consume_comment() {
                    return Lexed::Incomplete;
                }
            }
            '[' => s.structural(RawKind::LBracket),
            ']' => s.structural(RawKind::RBracket),
            '{' => s.structural(RawKind::LBrace),
            '}' => s.structural(RawKind::RBrace),
            '(' if s.depth == 0 => s.structural(RawKind::LParen),
            ')' if s.depth == 0 => s.structural(RawKind::RParen),
            '|' => {
                if !s.bar_quote() {
                    return Lexed::Incomplete;
                }
            }
            '\\' => {
                if !s.escape_char() {
                    return Lexed::Incomplete;
                }
            }
            '"' if s.builder.is_none() => s.start_quoted(),
            '-' if s.depth == 0
                && s.builder.is_none()
                && s.no_operand_before()
                && s.peek_at(1).is_some_and(|d| d.is_ascii_digit() || d == '.') =>
            {
                // leading minus with no operand before it: glue it onto the
                // number so `-5` stays one (unary) literal
                s.word_char('-');
            }
            c if s.depth == 0 && is_operator_char(c) && !s.in_quoted_word() => {
                if s.sci_continues(c) {
                    s.word_char(c);
                } else {
                    s.operator();
                }
            }
            c => s.word_char(c),
        }
    }
    s.flush();
    Lexed::Complete(s.out)
}

fn is_operator_char(c: char) -> bool {
    matches!(c, '+' | '-' | '*' | '/' | '=' | '<' | '>')
}

struct WordBuilder {
    text: String,
    at: SrcRef,
    logical: u32,
    mask: SmallVec<[MaskRange; 1]>,
    escapes: SmallVec<[EscapeOffset; 2]>,
    quoted: bool,
}

struct Scanner {
    chars: Vec<char>,
    i: usize,
    source: u32,
    line: u32,
    col: u32,
    logical: u32,
    /// List/array bracket nesting; operators only split at depth 0
    depth: u32,
    out: Vec<RawToken>,
    builder: Option<WordBuilder>,
}

impl Scanner {
    fn new(source_text: &str, source: u32) -> Self {
        Self {
            chars: source_text.chars().collect(),
            i: 0,
            source,
            line: 1,
            col: 1,
            logical: 1,
            depth: 0,
            out: Vec::new(),
            builder: None,
        }
    }

    fn here(&self) -> SrcRef {
        SrcRef::new(self.source, self.line, self.col)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.i).copied()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.i + n).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.i += 1;
        self.col += 1;
        Some(c)
    }

    fn bump_newline(&mut self) {
        self.i += 1;
        self.line += 1;
        self.col = 1;
    }

    /// Append a character to the word in progress, tracking line breaks
    /// produced by escapes and bar quotes
    fn append(&mut self, c: char) {
        if c == '\n' {
            self.bump_newline();
        } else {
            self.bump();
        }
        if let Some(b) = &mut self.builder {
            b.text.push(c);
        }
    }

    fn start_builder(&mut self, quoted: bool) {
        if self.builder.is_none() {
            self.builder = Some(WordBuilder {
                text: String::new(),
                at: self.here(),
                logical: self.logical,
                mask: SmallVec::new(),
                escapes: SmallVec::new(),
                quoted,
            });
        }
    }

    fn in_quoted_word(&self) -> bool {
        self.builder.as_ref().is_some_and(|b| b.quoted)
    }

    fn word_char(&mut self, c: char) {
        self.start_builder(false);
        self.bump();
        if let Some(b) = &mut self.builder {
            b.text.push(c);
        }
    }

    fn start_quoted(&mut self) {
        self.start_builder(true);
        self.bump();
        if let Some(b) = &mut self.builder {
            b.text.push('"');
        }
    }

    fn flush(&mut self) {
        if let Some(b) = self.builder.take() {
            self.out.push(RawToken {
                kind: RawKind::Word(b.text),
                at: b.at,
                logical_line: b.logical,
                mask: b.mask,
                escapes: b.escapes,
            });
        }
    }

    fn structural(&mut self, kind: RawKind) {
        self.flush();
        let at = self.here();
        self.bump();
        match kind {
            RawKind::LBracket | RawKind::LBrace => self.depth += 1,
            RawKind::RBracket | RawKind::RBrace => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        self.out.push(RawToken {
            kind,
            at,
            logical_line: self.logical,
            mask: SmallVec::new(),
            escapes: SmallVec::new(),
        });
    }

    /// Is there no operand to the left (start of input, operator, `(`)?
    fn no_operand_before(&self) -> bool {
        matches!(
            self.out.last().map(|t| &t.kind),
            None | Some(RawKind::Operator(_)) | Some(RawKind::LParen)
        )
    }

    /// Does an `e`/`E` exponent continue through this `+`/`-`?
    fn sci_continues(&self, c: char) -> bool {
        if c != '+' && c != '-' {
            return false;
        }
        let Some(b) = &self.builder else {
            return false;
        };
        if b.quoted || b.text.is_empty() {
            return false;
        }
        if !b.text.ends_with(['e', 'E']) {
            return false;
        }
        let mant = &b.text[..b.text.len() - 1];
        let mant = mant.strip_prefix('-').unwrap_or(mant);
        !mant.is_empty()
            && mant.chars().all(|d| d.is_ascii_digit() || d == '.')
            && mant.chars().any(|d| d.is_ascii_digit())
            && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())
    }

    fn operator(&mut self) {
        self.flush();
        let at = self.here();
        let c = self.bump().unwrap_or(' ');
        let op = match c {
            '+' => Op::Sum,
            '-' => Op::Difference,
            '*' => Op::Product,
            '/' => Op::Quotient,
            '=' => Op::Equal,
            '<' => match self.peek() {
                Some('=') => {
                    self.bump();
                    Op::LessEqual
                }
                Some('>') => {
                    self.bump();
                    Op::NotEqual
                }
                _ => Op::Less,
            },
            '>' => {
                if self.peek() == Some('=') {
                    self.bump();
                    Op::GreaterEqual
                } else {
                    Op::Greater
                }
            }
            other => {
                debug_assert!(false, "operator() on non-operator {:?}", other);
                Op::Sum
            }
        };
        self.out.push(RawToken {
            kind: RawKind::Operator(op),
            at,
            logical_line: self.logical,
            mask: SmallVec::new(),
            escapes: SmallVec::new(),
        });
    }

    /// Scan a `|…|` quote into the word in progress; false means the input
    /// ended before the closing bar
    fn bar_quote(&mut self) -> bool {
        self.start_builder(false);
        self.bump(); // opening bar
        let mut start = 0u16;
        if let Some(b) = &mut self.builder {
            start = b.text.len() as u16;
            b.escapes.push((start, 1));
        }
        loop {
            match self.peek() {
                None => return false,
                Some('|') => {
                    self.bump();
                    if let Some(b) = &mut self.builder {
                        let off = b.text.len() as u16;
                        b.escapes.push((off, 1));
                        b.mask.push((start, off));
                    }
                    return true;
                }
                Some('\\') => {
                    self.bump();
                    match self.peek() {
                        None => return false,
                        Some(c) => {
                            if let Some(b) = &mut self.builder {
                                b.escapes.push((b.text.len() as u16, 1));
                            }
                            self.append(c);
                        }
                    }
                }
                Some(c) => self.append(c),
            }
        }
    }

    /// Scan a `\c` escape into the word in progress; false at end of input
    fn escape_char(&mut self) -> bool {
        self.start_builder(false);
        self.bump(); // backslash
        match self.peek() {
            None => false,
            Some(c) => {
                if let Some(b) = &mut self.builder {
                    let off = b.text.len() as u16;
                    b.escapes.push((off, 1));
                    b.mask.push((off, off + 1));
                }
                self.append(c);
                true
            }
        }
    }

    /// Skip a `;` comment; false means a trailing `~` ran off the input
    fn consume_comment(&mut self) -> bool {
        self.bump(); // ';'
        let mut prev = ' ';
        loop {
            match self.peek() {
                None => return prev != '~',
                Some('\n') => {
                    if prev == '~' {
                        // the comment ends but the logical line continues
                        self.bump_newline();
                    }
                    return true;
                }
                Some(c) => {
                    prev = c;
                    self.bump();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests;

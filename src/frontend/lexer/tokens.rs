//! Raw token types

use crate::util::span::{EscapeOffset, MaskRange, SrcRef};
use smallvec::SmallVec;

/// Infix operator, resolved with one character of lookahead
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Sum,
    Difference,
    Product,
    Quotient,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl Op {
    /// The source spelling of this operator
    pub fn text(self) -> &'static str {
        match self {
            Op::Sum => "+",
            Op::Difference => "-",
            Op::Product => "*",
            Op::Quotient => "/",
            Op::Equal => "=",
            Op::NotEqual => "<>",
            Op::Less => "<",
            Op::LessEqual => "<=",
            Op::Greater => ">",
            Op::GreaterEqual => ">=",
        }
    }

    /// Look up an operator by spelling
    pub fn from_text(text: &str) -> Option<Self> {
        match text {
            "+" => Some(Op::Sum),
            "-" => Some(Op::Difference),
            "*" => Some(Op::Product),
            "/" => Some(Op::Quotient),
            "=" => Some(Op::Equal),
            "<>" => Some(Op::NotEqual),
            "<" => Some(Op::Less),
            "<=" => Some(Op::LessEqual),
            ">" => Some(Op::Greater),
            ">=" => Some(Op::GreaterEqual),
        _ => None,
        }
    }

    /// Binding strength: multiplicative over additive over comparison
    pub fn precedence(self) -> u8 {
        match self {
            Op::Product | Op::Quotient => 3,
            Op::Sum | Op::Difference => 2,
            _ => 1,
        }
    }
}

/// Raw token kind
#[derive(Debug, Clone, PartialEq)]
pub enum RawKind {
    /// A word: identifier, number, `"quoted`, `:variable`, …
    Word(String),
    /// An infix operator (only emitted outside list/array brackets)
    Operator(Op),
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `(` (only emitted outside list/array brackets)
    LParen,
    /// `)` (only emitted outside list/array brackets)
    RParen,
}

/// A raw token with its source metadata
#[derive(Debug, Clone, PartialEq)]
pub struct RawToken {
    pub kind: RawKind,
    /// Start position
    pub at: SrcRef,
    /// Logical line (lines joined by `~` share one)
    pub logical_line: u32,
    /// Protected character ranges within a word's text
    pub mask: SmallVec<[MaskRange; 1]>,
    /// Extra source characters consumed per text offset
    pub escapes: SmallVec<[EscapeOffset; 2]>,
}

impl RawToken {
    /// The word text, if this token is a word
    pub fn word(&self) -> Option<&str> {
        match &self.kind {
            RawKind::Word(w) => Some(w),
            _ => None,
        }
    }

    /// Case-insensitive keyword check for an unmasked word
    pub fn is_keyword(&self, kw: &str) -> bool {
        self.mask.is_empty() && self.word().is_some_and(|w| w.eq_ignore_ascii_case(kw))
    }
}

/// Result of tokenizing a chunk of source text
#[derive(Debug, Clone, PartialEq)]
pub enum Lexed {
    /// All quoting closed; tokens ready for assembly
    Complete(Vec<RawToken>),
    /// Input ends inside a `|…|` quote, after a `\`, or after a trailing
    /// `~`: not an error, more input is needed
    Incomplete,
}

//! Source location tracking
//!
//! Token streams carry a parallel source map so runtime errors can point
//! back into the text the user actually typed, including positions inside
//! list literals. A `TokenSrc` additionally records which character ranges
//! of a word were produced by vertical-bar quoting or backslash escapes,
//! so that later re-tokenization leaves them intact.

use smallvec::SmallVec;
use std::fmt;

/// Source position: which source buffer, and line/column inside it (1-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SrcRef {
    /// Index of the source buffer this token came from
    pub source: u32,
    /// Line number (1-indexed)
    pub line: u32,
    /// Column number (1-indexed)
    pub col: u32,
}

impl SrcRef {
    /// Create a new source reference
    #[inline]
    pub fn new(source: u32, line: u32, col: u32) -> Self {
        Self { source, line, col }
    }

    /// Create a dummy reference (line 0 marks "no position")
    #[inline]
    pub fn dummy() -> Self {
        Self {
            source: 0,
            line: 0,
            col: 0,
        }
    }

    /// Check if this is a dummy reference
    #[inline]
    pub fn is_dummy(&self) -> bool {
        self.line == 0
    }
}

impl fmt::Display for SrcRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Character range inside a word's text (start inclusive, end exclusive)
pub type MaskRange = (u16, u16);

/// Extra source characters consumed before a text offset
/// (a `\+` escape is one text character but two source characters)
pub type EscapeOffset = (u16, u16);

/// Per-token source metadata
///
/// `mask` lists the protected character ranges of the word (text produced
/// by `|...|` quoting or `\` escapes); `escapes` maps text offsets back to
/// the extra source characters swallowed while producing them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenSrc {
    /// Where the token starts
    pub at: SrcRef,
    /// Protected (literal) character ranges, in text offsets
    pub mask: SmallVec<[MaskRange; 1]>,
    /// (text offset, extra source chars consumed at that offset)
    pub escapes: SmallVec<[EscapeOffset; 2]>,
}

impl TokenSrc {
    /// Metadata for a token with no literal escapes
    #[inline]
    pub fn plain(at: SrcRef) -> Self {
        Self {
            at,
            mask: SmallVec::new(),
            escapes: SmallVec::new(),
        }
    }

    /// Check whether a text offset falls inside a protected range
    #[inline]
    pub fn is_masked(&self, offset: usize) -> bool {
        let offset = offset as u16;
        self.mask.iter().any(|&(s, e)| s <= offset && offset < e)
    }

    /// Source column of a text offset within this token
    ///
    /// Accounts for escape characters that occupy more source columns
    /// than text characters.
    pub fn col_of(&self, offset: usize) -> u32 {
        let extra: u32 = self
            .escapes
            .iter()
            .filter(|&&(at, _)| (at as usize) < offset)
            .map(|&(_, n)| n as u32)
            .sum();
        self.at.col + offset as u32 + extra
    }

    /// Source reference of a text offset within this token
    pub fn ref_of(&self, offset: usize) -> SrcRef {
        SrcRef {
            source: self.at.source,
            line: self.at.line,
            col: self.col_of(offset),
        }
    }
}

/// Parallel source map for a token list
///
/// Invariant: when present, a srcmap has exactly one entry per token.
pub type Srcmap = Vec<TokenSrc>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_col_of_counts_escapes() {
        let mut src = TokenSrc::plain(SrcRef::new(0, 1, 5));
        // text "a b" came from source "a\ b": the escape at text offset 1
        // consumed one extra source character
        src.escapes.push((1, 1));
        assert_eq!(src.col_of(0), 5);
        assert_eq!(src.col_of(1), 7);
        assert_eq!(src.col_of(2), 8);
    }

    #[test]
    fn test_mask_lookup() {
        let mut src = TokenSrc::plain(SrcRef::new(0, 1, 1));
        src.mask.push((2, 5));
        assert!(!src.is_masked(1));
        assert!(src.is_masked(2));
        assert!(src.is_masked(4));
        assert!(!src.is_masked(5));
    }

    #[test]
    fn test_dummy_ref() {
        assert!(SrcRef::dummy().is_dummy());
        assert!(!SrcRef::new(0, 1, 1).is_dummy());
    }
}

//! Bar quoting, escapes and quoted-word tests

use crate::frontend::lexer::{tokenize, Lexed, RawKind, RawToken};

fn complete(source: &str) -> Vec<RawToken> {
    match tokenize(source, 0) {
        Lexed::Complete(tokens) => tokens,
        Lexed::Incomplete => panic!("unexpected incomplete for {:?}", source),
    }
}

#[test]
fn test_bars_protect_delimiters() {
    let tokens = complete("|a b|");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].word(), Some("a b"));
    assert_eq!(tokens[0].mask.as_slice(), &[(0, 3)]);
}

#[test]
fn test_bars_protect_brackets_and_semicolons() {
    let tokens = complete("|a;[b]|");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].word(), Some("a;[b]"));
}

#[test]
fn test_bars_glue_into_surrounding_word() {
    let tokens = complete("foo|bar baz|qux");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].word(), Some("foobar bazqux"));
    assert_eq!(tokens[0].mask.as_slice(), &[(3, 10)]);
}

#[test]
fn test_backslash_escapes_one_character() {
    let tokens = complete(r"a\ b");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].word(), Some("a b"));
    assert_eq!(tokens[0].mask.as_slice(), &[(1, 2)]);
    // the escape consumed one extra source character
    assert_eq!(tokens[0].escapes.as_slice(), &[(1, 1)]);
}

#[test]
fn test_escaped_operator_does_not_split() {
    let tokens = complete(r"a\+b");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].word(), Some("a+b"));
}

#[test]
fn test_quoted_word_swallows_operators() {
    let tokens = complete("\"a+b");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].word(), Some("\"a+b"));
}

#[test]
fn test_quoted_word_ends_at_bracket() {
    let tokens = complete("\"hi]");
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].word(), Some("\"hi"));
    assert_eq!(tokens[1].kind, RawKind::RBracket);
}

#[test]
fn test_unterminated_bar_is_incomplete() {
    assert_eq!(tokenize("print |a b", 0), Lexed::Incomplete);
    assert_eq!(tokenize("print \\", 0), Lexed::Incomplete);
}

#[test]
fn test_bar_positions_account_for_extra_columns() {
    // source: x |a| y — the y starts at column 6
    let tokens = complete("x |a| y");
    assert_eq!(tokens[1].word(), Some("a"));
    assert_eq!(tokens[1].escapes.len(), 2);
    assert_eq!((tokens[2].at.line, tokens[2].at.col), (1, 7));
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Bar-quoted text survives tokenization exactly
        #[test]
        fn bar_quoted_round_trip(content in "[a-z ]{1,20}") {
            let source = format!("|{}|", content);
            let tokens = complete(&source);
            prop_assert_eq!(tokens.len(), 1);
            prop_assert_eq!(tokens[0].word(), Some(content.as_str()));
        }

        /// Plain words never lose characters
        #[test]
        fn plain_words_round_trip(words in proptest::collection::vec("[a-z]{1,8}", 1..6)) {
            let source = words.join(" ");
            let tokens = complete(&source);
            let texts: Vec<_> = tokens.iter().filter_map(|t| t.word()).collect();
            prop_assert_eq!(texts, words);
        }
    }
}

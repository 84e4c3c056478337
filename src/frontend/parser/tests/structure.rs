//! Structure assembly tests

use crate::frontend::lexer::{tokenize, Lexed};
use crate::frontend::parser::{parse, Parsed};
use crate::runtime::except::ErrorCode;
use crate::runtime::value::{List, Value};
use crate::runtime::workspace::Workspace;
use std::rc::Rc;

pub fn parse_text(source: &str, ws: &mut Workspace) -> Result<Parsed, crate::runtime::except::LogoError> {
    match tokenize(source, 0) {
        Lexed::Complete(tokens) => parse(&tokens, ws),
        Lexed::Incomplete => Ok(Parsed::Incomplete),
    }
}

pub fn stream(source: &str) -> Rc<List> {
    let mut ws = Workspace::new(false);
    match parse_text(source, &mut ws) {
        Ok(Parsed::Complete(stream)) => stream,
        other => panic!("expected complete parse for {:?}, got {:?}", source, other),
    }
}

#[test]
fn test_flat_words() {
    let s = stream("print 1 2");
    assert_eq!(s.len(), 3);
    assert!(s.items[0].equals(&Value::word("print")));
}

#[test]
fn test_nested_lists_with_srcmap() {
    let s = stream("print [a [b c]]");
    assert_eq!(s.len(), 2);
    let outer = s.items[1].as_list("test").unwrap();
    assert_eq!(outer.len(), 2);
    let inner = outer.items[1].as_list("test").unwrap();
    assert_eq!(inner.len(), 2);
    // srcmap parallels items at every level
    assert_eq!(outer.srcmap.as_ref().unwrap().len(), outer.len());
    assert_eq!(inner.srcmap.as_ref().unwrap().len(), inner.len());
}

#[test]
fn test_array_literal_with_origin() {
    let s = stream("show {1 2 3}@0");
    let arr = s.items[1].as_array("test").unwrap();
    assert_eq!(arr.len(), 3);
    assert_eq!(arr.origin, 0);

    let s = stream("show {1 2}");
    assert_eq!(s.items[1].as_array("test").unwrap().origin, 1);
}

#[test]
fn test_mismatched_closer_is_immediate_error() {
    let mut ws = Workspace::new(false);
    let err = match parse_text("print 1]", &mut ws) {
        Err(e) => e,
        other => panic!("expected error, got {:?}", other),
    };
    assert_eq!(err.code, ErrorCode::UnexpectedToken);
    assert!(err.at.is_some());

    assert!(parse_text("print [a}", &mut ws).is_err());
    assert!(parse_text("print )", &mut ws).is_err());
}

#[test]
fn test_open_bracket_is_incomplete_not_error() {
    let mut ws = Workspace::new(false);
    assert!(matches!(
        parse_text("print [a b", &mut ws),
        Ok(Parsed::Incomplete)
    ));
    assert!(matches!(
        parse_text("print (sum 1", &mut ws),
        Ok(Parsed::Incomplete)
    ));
}

#[test]
fn test_incomplete_then_complete_spans_lines() {
    let mut ws = Workspace::new(false);
    assert!(matches!(
        parse_text("print [a\n", &mut ws),
        Ok(Parsed::Incomplete)
    ));
    // the caller re-feeds the whole buffer once more input arrives
    let s = match parse_text("print [a\nb]", &mut ws) {
        Ok(Parsed::Complete(s)) => s,
        other => panic!("expected complete, got {:?}", other),
    };
    let list = s.items[1].as_list("test").unwrap();
    assert_eq!(list.len(), 2);
    let map = list.srcmap.as_ref().unwrap();
    assert_eq!(map[0].at.line, 1);
    assert_eq!(map[1].at.line, 2);
}

#[test]
fn test_parens_stay_inline() {
    let s = stream("(sum 1 2)");
    assert!(s.items[0].equals(&Value::word("(")));
    assert!(s.items[4].equals(&Value::word(")")));
}

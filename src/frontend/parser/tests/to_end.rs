//! Procedure extraction tests

use super::structure::parse_text;
use crate::frontend::parser::Parsed;
use crate::runtime::except::ErrorCode;
use crate::runtime::value::Value;
use crate::runtime::workspace::Workspace;

#[test]
fn test_to_end_replaced_by_procedure_value() {
    let mut ws = Workspace::new(false);
    let s = match parse_text("to f :x\noutput :x + 1\nend\nprint 1", &mut ws) {
        Ok(Parsed::Complete(s)) => s,
        other => panic!("expected complete, got {:?}", other),
    };
    // the whole region collapsed to one Procedure token
    assert!(matches!(s.items[0], Value::Procedure(_)));
    assert!(s.items[1].equals(&Value::word("print")));

    let proc = match &s.items[0] {
        Value::Procedure(p) => p.clone(),
        _ => unreachable!(),
    };
    assert_eq!(proc.name, "f");
    assert_eq!(proc.formals.len(), 1);
    assert_eq!(proc.formals[0].name, "x");
    assert_eq!(proc.default_arity, 1);
    assert_eq!(proc.body.len(), 4);
}

#[test]
fn test_signature_registered_during_parse() {
    let mut ws = Workspace::new(false);
    // still incomplete (no end), yet the signature is already visible,
    // which is what lets recursive and forward calls resolve
    assert!(matches!(
        parse_text("to spiral :n\nspiral :n + 1", &mut ws),
        Ok(Parsed::Incomplete)
    ));
    let resolved = ws.resolve("spiral").unwrap();
    assert_eq!(resolved.proc.default_arity, 1);
    assert!(resolved.proc.body.is_empty());
}

#[test]
fn test_optional_rest_and_explicit_arity() {
    let mut ws = Workspace::new(false);
    let parsed = parse_text("to f :a [:b 5] [:r] 1\nend", &mut ws);
    assert!(matches!(parsed, Ok(Parsed::Complete(_))));
    let proc = ws.resolve("f").unwrap().proc;
    assert_eq!(proc.formals.len(), 2);
    assert_eq!(proc.formals[0].name, "a");
    assert!(proc.formals[0].default.is_none());
    assert_eq!(proc.formals[1].name, "b");
    assert!(proc.formals[1].default.is_some());
    assert_eq!(proc.rest.as_deref(), Some("r"));
    assert_eq!(proc.min_arity(), 1);
    assert_eq!(proc.default_arity, 1);
    assert!(proc.max_arity().is_none());
}

#[test]
fn test_macro_flag() {
    let mut ws = Workspace::new(false);
    let parsed = parse_text(".macro m\noutput [print 1]\nend", &mut ws);
    assert!(matches!(parsed, Ok(Parsed::Complete(_))));
    let proc = ws.resolve("m").unwrap().proc;
    assert!(proc.attrs.contains(crate::runtime::value::ProcAttrs::MACRO));
}

#[test]
fn test_open_to_block_is_incomplete() {
    let mut ws = Workspace::new(false);
    assert!(matches!(
        parse_text("to f :x\nprint :x", &mut ws),
        Ok(Parsed::Incomplete)
    ));
}

#[test]
fn test_end_without_to_is_error() {
    let mut ws = Workspace::new(false);
    let err = parse_text("end", &mut ws).unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedToken);
}

#[test]
fn test_nested_to_is_error() {
    let mut ws = Workspace::new(false);
    let err = parse_text("to f\nto g\nend\nend", &mut ws).unwrap_err();
    assert_eq!(err.code, ErrorCode::CantUseHere);
}

#[test]
fn test_to_of_primitive_is_error() {
    let mut ws = Workspace::new(false);
    let err = parse_text("to print\nend", &mut ws).unwrap_err();
    assert_eq!(err.code, ErrorCode::IsPrimitive);
}

#[test]
fn test_to_and_end_are_words_inside_lists() {
    let mut ws = Workspace::new(false);
    let s = match parse_text("print [to f end]", &mut ws) {
        Ok(Parsed::Complete(s)) => s,
        other => panic!("expected complete, got {:?}", other),
    };
    let list = s.items[1].as_list("test").unwrap();
    assert_eq!(list.len(), 3);
    assert!(ws.resolve("f").is_none());
}

#[test]
fn test_redefinition_gets_fresh_stamp() {
    let mut ws = Workspace::new(false);
    parse_text("to f\nprint 1\nend", &mut ws).unwrap();
    let first = ws.resolve("f").unwrap().proc.stamp;
    parse_text("to f\nprint 2\nend", &mut ws).unwrap();
    let second = ws.resolve("f").unwrap().proc.stamp;
    assert_ne!(first, second);
}

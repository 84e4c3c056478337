//! Word coercion tests

use crate::runtime::value::*;

#[test]
fn test_text_to_number() {
    assert_eq!(parse_number("42"), Some(42.0));
    assert_eq!(parse_number("3.14"), Some(3.14));
    assert_eq!(parse_number("-2.5"), Some(-2.5));
    assert_eq!(parse_number("1e3"), Some(1000.0));
    assert_eq!(parse_number("1.5e-2"), Some(0.015));
    assert_eq!(parse_number(".5"), Some(0.5));
    assert_eq!(parse_number("abc"), None);
    assert_eq!(parse_number(""), None);
    assert_eq!(parse_number("inf"), None);
    assert_eq!(parse_number("nan"), None);
}

#[test]
fn test_boolean_coercion() {
    assert_eq!(Word::Text("TRUE".into()).to_boolean(), Some(true));
    assert_eq!(Word::Text("false".into()).to_boolean(), Some(false));
    assert_eq!(Word::Text("yes".into()).to_boolean(), None);
    assert_eq!(Word::Bool(true).to_boolean(), Some(true));
    assert_eq!(Word::Num(1.0).to_boolean(), None);
}

#[test]
fn test_validated_accessors_reject() {
    let list = Value::empty_list();
    assert!(list.as_number("first").is_err());
    assert!(Value::word("abc").as_number("sum").is_err());
    assert!(Value::num(1.5).as_integer("item").is_err());
    assert!(Value::word("5").as_integer("item").is_ok());
}

#[test]
fn test_accessor_error_names_caller() {
    let err = Value::word("abc").as_number("sum").unwrap_err();
    match err {
        crate::runtime::except::Flow::Err(e) => {
            assert_eq!(e.code, crate::runtime::except::ErrorCode::InvalidInput);
            assert_eq!(e.args[0], "sum");
            assert_eq!(e.args[1], "abc");
        }
        other => panic!("expected error flow, got {:?}", other),
    }
}

#[test]
fn test_array_offsets() {
    let arr = LogoArray::new(3, 1);
    assert_eq!(arr.offset_of(1), Some(0));
    assert_eq!(arr.offset_of(3), Some(2));
    assert_eq!(arr.offset_of(0), None);
    assert_eq!(arr.offset_of(4), None);

    let zero = LogoArray::new(3, 0);
    assert_eq!(zero.offset_of(0), Some(0));
    assert_eq!(zero.offset_of(2), Some(2));
    assert_eq!(zero.offset_of(3), None);
}

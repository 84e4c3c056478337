//! Structural equality tests

use crate::runtime::value::*;

#[test]
fn test_numeric_words_coerce() {
    assert!(Value::word("5").equals(&Value::num(5.0)));
    assert!(Value::word("5.0").equals(&Value::word("5")));
    assert!(!Value::word("5").equals(&Value::num(6.0)));
}

#[test]
fn test_boolean_words_coerce() {
    assert!(Value::word("TRUE").equals(&Value::bool(true)));
    assert!(!Value::word("false").equals(&Value::bool(true)));
}

#[test]
fn test_words_case_insensitive() {
    assert!(Value::word("Hello").equals(&Value::word("hello")));
    assert!(!Value::word("hello").equals(&Value::word("world")));
}

#[test]
fn test_lists_element_wise() {
    let a = Value::List(List::from_values(vec![
        Value::word("a"),
        Value::word("5"),
    ]));
    let b = Value::List(List::from_values(vec![
        Value::word("A"),
        Value::num(5.0),
    ]));
    assert!(a.equals(&b));

    let short = Value::List(List::from_values(vec![Value::word("a")]));
    assert!(!a.equals(&short));
}

#[test]
fn test_arrays_by_identity() {
    let a = LogoArray::new(2, 1);
    let b = LogoArray::new(2, 1);
    assert!(Value::Array(a.clone()).equals(&Value::Array(a.clone())));
    assert!(!Value::Array(a).equals(&Value::Array(b)));
}

#[test]
fn test_mixed_types_unequal() {
    assert!(!Value::word("5").equals(&Value::empty_list()));
    assert!(!Value::empty_list().equals(&Value::word("")));
}

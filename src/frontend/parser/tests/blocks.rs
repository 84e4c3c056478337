//! parse_block re-tokenization tests

use super::structure::stream;
use crate::frontend::parser::parse_block;
use crate::runtime::value::Value;
use std::rc::Rc;

#[test]
fn test_compound_words_split() {
    let s = stream("run [2+3*4]");
    let list = s.items[1].as_list("test").unwrap();
    assert_eq!(list.len(), 1);
    let parsed = parse_block(&list);
    let texts: Vec<String> = parsed.items.iter().map(Value::show_string).collect();
    assert_eq!(texts, ["2", "+", "3", "*", "4"]);
}

#[test]
fn test_split_positions_offset_into_word() {
    let s = stream("run [ 10<=20 ]");
    let list = s.items[1].as_list("t").unwrap();
    let parsed = parse_block(&list);
    let map = parsed.srcmap.as_ref().unwrap();
    // "10<=20" starts at column 7: "run [ 10<=20 ]"
    assert_eq!(map[0].at.col, 7);
    assert_eq!(map[1].at.col, 9);
    assert_eq!(map[2].at.col, 11);
}

#[test]
fn test_masked_ranges_never_split() {
    let s = stream("run [ |a+b| ]");
    let list = s.items[1].as_list("t").unwrap();
    let parsed = parse_block(&list);
    assert_eq!(parsed.len(), 1);
    assert!(parsed.items[0].equals(&Value::word("a+b")));
}

#[test]
fn test_quoted_words_stay_whole() {
    let s = stream("run [ \"a+b ]");
    let list = s.items[1].as_list("t").unwrap();
    let parsed = parse_block(&list);
    assert_eq!(parsed.len(), 1);
}

#[test]
fn test_if_else_folds_to_ifelse() {
    let s = stream("run [if :x [print 1] else [print 2]]");
    let list = s.items[1].as_list("t").unwrap();
    let parsed = parse_block(&list);
    let texts: Vec<String> = parsed
        .items
        .iter()
        .map(|v| match v {
            Value::Word(w) => w.text().to_string(),
            other => other.show_string(),
        })
        .collect();
    assert_eq!(texts[0], "ifelse");
    // the else word itself is gone, both branch lists remain
    assert_eq!(parsed.len(), 4);
    assert_eq!(
        parsed.srcmap.as_ref().unwrap().len(),
        parsed.items.len()
    );
}

#[test]
fn test_parse_block_is_cached() {
    let s = stream("run [1+2]");
    let list = s.items[1].as_list("t").unwrap();
    let first = parse_block(&list);
    let second = parse_block(&list);
    assert!(Rc::ptr_eq(&first, &second));
}

#[test]
fn test_negative_literal_in_data() {
    let s = stream("run [-5]");
    let list = s.items[1].as_list("t").unwrap();
    let parsed = parse_block(&list);
    assert_eq!(parsed.len(), 1);
    assert!(parsed.items[0].equals(&Value::num(-5.0)));
}

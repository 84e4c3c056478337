//! Workspace tests

use crate::runtime::value::{List, ProcAttrs, Procedure, Value};
use crate::runtime::workspace::*;
use std::rc::Rc;

fn proc_named(ws: &mut Workspace, name: &str) -> Rc<Procedure> {
    Rc::new(Procedure {
        name: name.to_string(),
        formals: Vec::new(),
        rest: None,
        default_arity: 0,
        body: List::empty(),
        formal_srcmap: None,
        attrs: ProcAttrs::empty(),
        stamp: ws.next_stamp(),
    })
}

#[test]
fn test_make_binds_global_when_unbound() {
    let mut ws = Workspace::new(false);
    ws.push_scope();
    ws.make("x", Value::num(1.0));
    ws.pop_scope();
    // the binding was created in the global scope, not the popped one
    assert!(ws.get("x").unwrap().equals(&Value::num(1.0)));
}

#[test]
fn test_make_prefers_nearest_existing_binding() {
    let mut ws = Workspace::new(false);
    ws.make("x", Value::num(1.0));
    ws.push_scope();
    ws.local("x");
    ws.make("x", Value::num(2.0));
    assert!(ws.get("x").unwrap().equals(&Value::num(2.0)));
    ws.pop_scope();
    assert!(ws.get("x").unwrap().equals(&Value::num(1.0)));
}

#[test]
fn test_local_is_unbound_until_set() {
    let mut ws = Workspace::new(false);
    ws.push_scope();
    ws.local("y");
    assert!(ws.get("y").is_none());
    assert!(ws.get_or_err("y").is_err());
    ws.local_make("y", Value::word("hi"));
    assert!(ws.get("y").is_some());
}

#[test]
fn test_lookup_walks_outward() {
    let mut ws = Workspace::new(false);
    ws.make("x", Value::num(1.0));
    ws.push_scope();
    assert!(ws.get("x").unwrap().equals(&Value::num(1.0)));
    ws.local_make("x", Value::num(9.0));
    assert!(ws.get("x").unwrap().equals(&Value::num(9.0)));
}

#[test]
fn test_names_case_insensitive() {
    let mut ws = Workspace::new(false);
    ws.make("Counter", Value::num(3.0));
    assert!(ws.get("COUNTER").is_some());
    assert!(ws.get("counter").is_some());
}

#[test]
fn test_snapshot_restore_locals() {
    let mut ws = Workspace::new(false);
    ws.push_scope();
    ws.local_make("i", Value::num(1.0));
    let saved = ws.snapshot_locals();
    ws.local_make("i", Value::num(99.0));
    ws.local_make("extra", Value::num(0.0));
    ws.restore_locals(saved);
    assert!(ws.get("i").unwrap().equals(&Value::num(1.0)));
    assert!(ws.get("extra").is_none());
}

#[test]
fn test_redefinition_replaces() {
    let mut ws = Workspace::new(false);
    let first = proc_named(&mut ws, "f");
    let second = proc_named(&mut ws, "f");
    assert_ne!(first.stamp, second.stamp);
    ws.define(first);
    ws.define(second.clone());
    let got = ws.resolve("f").unwrap();
    assert_eq!(got.proc.stamp, second.stamp);
}

#[test]
fn test_module_dispatch_with_isa_fallback() {
    let mut ws = Workspace::new(false);
    ws.begin_module("animal", true, None).unwrap();
    let speak = proc_named(&mut ws, "speak");
    ws.define(speak);
    ws.export(&["speak".to_string()]).unwrap();
    ws.end_module().unwrap();

    ws.begin_module("dog", true, Some("animal".to_string())).unwrap();
    ws.end_module().unwrap();

    // dog has no speak of its own; dispatch falls back to animal
    let found = ws.resolve_method("dog", "speak").unwrap();
    assert_eq!(found.class.as_deref(), Some("animal"));
}

#[test]
fn test_import_respects_exports() {
    let mut ws = Workspace::new(false);
    ws.begin_module("m", false, None).unwrap();
    let visible = proc_named(&mut ws, "visible");
    ws.define(visible);
    let hidden = proc_named(&mut ws, "hidden");
    ws.define(hidden);
    ws.export(&["visible".to_string()]).unwrap();
    ws.end_module().unwrap();

    assert!(ws.import("m", Some(&["hidden".to_string()])).is_err());
    ws.import("m", None).unwrap();
    assert!(ws.resolve("visible").is_some());
    assert!(ws.resolve("hidden").is_none());
}

#[test]
fn test_plists_global() {
    let mut ws = Workspace::new(false);
    ws.put_prop("turtle", "color", Value::word("red"));
    assert!(ws.get_prop("TURTLE", "COLOR").equals(&Value::word("red")));
    ws.rem_prop("turtle", "color");
    assert!(ws.get_prop("turtle", "color").equals(&Value::empty_list()));
}

#[test]
fn test_plists_scoped_to_class() {
    let mut ws = Workspace::new(true);
    ws.begin_module("dog", true, None).unwrap();
    ws.put_prop("traits", "sound", Value::word("woof"));
    ws.end_module().unwrap();
    // outside the class the same plist name is empty
    assert!(ws.get_prop("traits", "sound").equals(&Value::empty_list()));
}

#[test]
fn test_call_stack_trace_and_overflow() {
    let mut ws = Workspace::new(false);
    ws.push_frame("outer", None).unwrap();
    ws.push_frame("inner", None).unwrap();
    let trace = ws.trace();
    assert_eq!(trace[0], "inner");
    assert_eq!(trace[1], "outer");
    ws.pop_frame();
    ws.pop_frame();

    for i in 0..MAX_CALL_DEPTH {
        assert!(ws.push_frame(&format!("f{}", i), None).is_ok());
    }
    assert!(ws.push_frame("too-deep", None).is_err());
}

#[test]
fn test_reset_reestablishes_global_scope() {
    let mut ws = Workspace::new(false);
    ws.make("x", Value::num(1.0));
    let f = proc_named(&mut ws, "f");
    ws.define(f);
    ws.push_scope();
    ws.reset();
    assert_eq!(ws.scope_depth(), 1);
    assert!(ws.get("x").is_none());
    assert!(ws.resolve("f").is_none());
    ws.make("y", Value::num(2.0));
    assert!(ws.get("y").is_some());
}

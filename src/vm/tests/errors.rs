//! Error propagation and reporting, checked through both paths

use super::{run_both, run_mode};
use crate::util::config::ExecMode;

async fn expect_err(source: &str, fragment: &str) {
    let (_, err) = run_both(source).await;
    assert!(
        err.contains(fragment),
        "expected {:?} in stderr for {:?}, got {:?}",
        fragment,
        source,
        err
    );
}

#[tokio::test]
async fn test_unknown_procedure() {
    expect_err("frobnicate 1", "I don't know how to frobnicate").await;
}

#[tokio::test]
async fn test_unbound_variable() {
    expect_err("print :nosuch", "nosuch has no value").await;
}

#[tokio::test]
async fn test_invalid_input_names_procedure_and_value() {
    expect_err("print first []", "first doesn't like [] as input").await;
    expect_err("print sum 1 \"abc", "sum doesn't like abc as input").await;
}

#[tokio::test]
async fn test_unused_value_is_reported() {
    expect_err("repeat 1 [5]", "You don't say what to do with 5").await;
    expect_err("1 + 2 print 3", "You don't say what to do with 3").await;
}

#[tokio::test]
async fn test_command_in_value_position() {
    expect_err("print print 1", "didn't output to print").await;
    expect_err("print 1 + print 2", "didn't output to +").await;
}

#[tokio::test]
async fn test_division_by_zero() {
    expect_err("print 1 / 0", "division by zero").await;
}

#[tokio::test]
async fn test_uncaught_throw_and_toplevel_signals() {
    expect_err("throw \"nowhere", "Can't find catch tag for nowhere").await;
    expect_err("stop", "Can only use stop inside a procedure").await;
    expect_err("output 5", "Can only use output inside a procedure").await;
}

#[tokio::test]
async fn test_error_trace_names_call_chain() {
    let (_, err) = run_both(
        "to inner\nprint first []\nend\nto outer\ninner\nend\nouter",
    )
    .await;
    assert!(err.contains("first doesn't like [] as input"), "got {}", err);
    assert!(err.contains("in inner"), "got {}", err);
    assert!(err.contains("in outer"), "got {}", err);
}

#[tokio::test]
async fn test_session_survives_errors() {
    let (out, err) = run_both("print first []\nprint \"still-here").await;
    // the first statement fails the whole top-level form, but the session
    // accepts the next one
    assert!(err.contains("doesn't like"));
    assert_eq!(out, "", "first form aborted: {}", out);

    let (out2, _) = run_both("print \"still-here").await;
    assert_eq!(out2, "still-here\n");
}

#[tokio::test]
async fn test_error_prim_reads_last_caught() {
    let (out, err) = run_mode(
        ExecMode::Compile,
        "catch \"error [print first []]\nshow error",
    )
    .await;
    assert_eq!(err, "");
    assert!(out.contains("first doesn't like"), "got {}", out);
}

#[tokio::test]
async fn test_deep_recursion_overflows_cleanly() {
    expect_err(
        "to f :n\noutput 1 + f :n + 1\nend\nprint f 1",
        "call stack too deep",
    )
    .await;
}

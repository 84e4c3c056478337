//! Execution core tests

mod errors;
mod eval;
mod suspend;

use crate::util::config::{EngineConfig, ExecMode};
use crate::vm::{ExecOutcome, Session};

/// Run a program on a sandboxed session, returning (stdout, stderr)
pub async fn run_mode(mode: ExecMode, source: &str) -> (String, String) {
    let mut config = EngineConfig::default();
    config.exec.mode = mode;
    let (mut session, handles) = Session::sandbox(config);
    let outcome = session.execute(source).await;
    assert_ne!(outcome, ExecOutcome::Incomplete, "program did not close: {}", source);
    (handles.io.out(), handles.io.err())
}

/// Run a program through both execution paths and insist they agree
pub async fn run_both(source: &str) -> (String, String) {
    let interpreted = run_mode(ExecMode::Interpret, source).await;
    let compiled = run_mode(ExecMode::Compile, source).await;
    assert_eq!(
        interpreted, compiled,
        "interpreter and compiled path disagree on: {}",
        source
    );
    interpreted
}

/// Expect clean output on both paths
pub async fn expect_out(source: &str, expected: &str) {
    let (out, err) = run_both(source).await;
    assert_eq!(err, "", "unexpected errors for {}", source);
    assert_eq!(out, expected, "wrong output for {}", source);
}

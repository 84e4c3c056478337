//! Multi-line input flow, as the REPL drives it

use haigui::util::config::EngineConfig;
use haigui::vm::{ExecOutcome, Session};

#[tokio::test]
async fn test_open_bracket_reports_incomplete_then_completes() {
    let (mut session, handles) = Session::sandbox(EngineConfig::default());

    // no error is emitted for the open bracket
    assert_eq!(session.execute("print [a").await, ExecOutcome::Incomplete);
    assert!(session.has_pending());
    assert_eq!(handles.io.err(), "");

    // supplying the closer completes one form spanning both lines
    assert_eq!(session.execute("b]").await, ExecOutcome::Done);
    assert!(!session.has_pending());
    assert_eq!(handles.io.out(), "a b\n");
}

#[tokio::test]
async fn test_to_block_accumulates_lines() {
    let (mut session, handles) = Session::sandbox(EngineConfig::default());
    assert_eq!(session.execute("to square :n").await, ExecOutcome::Incomplete);
    assert_eq!(
        session.execute("repeat 4 [forward :n right 90]").await,
        ExecOutcome::Incomplete
    );
    assert_eq!(session.execute("end").await, ExecOutcome::Done);
    assert_eq!(handles.io.err(), "");

    session.execute("square 10").await;
    let lines = handles
        .draw
        .commands()
        .iter()
        .filter(|c| c.starts_with("[\"line\""))
        .count();
    assert_eq!(lines, 4);
}

#[tokio::test]
async fn test_unterminated_bar_is_incomplete() {
    let (mut session, _handles) = Session::sandbox(EngineConfig::default());
    assert_eq!(session.execute("print \"|a b").await, ExecOutcome::Incomplete);
    assert_eq!(session.execute("c|").await, ExecOutcome::Done);
}

#[tokio::test]
async fn test_structural_error_discards_pending_input() {
    let (mut session, handles) = Session::sandbox(EngineConfig::default());
    assert_eq!(session.execute("print [a").await, ExecOutcome::Incomplete);
    // a mismatched closer is an immediate error and resets the buffer
    assert_eq!(session.execute("b}").await, ExecOutcome::Done);
    assert!(handles.io.err().contains("unexpected"));
    assert!(!session.has_pending());

    session.execute("print \"fresh").await;
    assert_eq!(handles.io.out(), "fresh\n");
}

#[tokio::test]
async fn test_discard_pending_on_interrupt() {
    let (mut session, handles) = Session::sandbox(EngineConfig::default());
    session.execute("print [half").await;
    session.discard_pending();
    session.execute("print \"ok").await;
    assert_eq!(handles.io.out(), "ok\n");
    assert_eq!(handles.io.err(), "");
}

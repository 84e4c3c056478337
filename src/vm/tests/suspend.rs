//! Suspension and cooperative-session tests
//!
//! Blocking input parks a session mid-expression; the partially
//! evaluated operator chain, parameter buffer and scope state must all
//! survive the suspension, and sibling sessions must keep running.

use super::run_both;
use crate::util::config::{EngineConfig, ExecMode};
use crate::vm::{ExecOutcome, Session};
use std::time::Duration;

#[tokio::test]
async fn test_readword_takes_queued_line() {
    let (mut session, handles) = Session::sandbox(EngineConfig::default());
    handles.input.send("hello world");
    let outcome = session.execute("print readword").await;
    assert_eq!(outcome, ExecOutcome::Done);
    assert_eq!(handles.io.out(), "hello world\n");
}

#[tokio::test]
async fn test_suspension_mid_expression() {
    // the session parks inside sum's argument collection; the pending
    // "1 +" chain is resumed once input arrives
    let (mut session, handles) = Session::sandbox(EngineConfig::default());
    let sender = handles.input.clone();
    let (outcome, _) = tokio::join!(session.execute("print 1 + readword"), async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        sender.send("41");
    });
    assert_eq!(outcome, ExecOutcome::Done);
    assert_eq!(handles.io.out(), "42\n");
}

#[tokio::test]
async fn test_suspension_inside_compiled_procedure() {
    let mut config = EngineConfig::default();
    config.exec.mode = ExecMode::Compile;
    let (mut session, handles) = Session::sandbox(config);
    let sender = handles.input.clone();
    let program = "to ask\noutput 10 * readword\nend\nprint 2 + ask";
    let (outcome, _) = tokio::join!(session.execute(program), async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        sender.send("4");
    });
    assert_eq!(outcome, ExecOutcome::Done);
    assert_eq!(handles.io.out(), "42\n");
}

#[tokio::test]
async fn test_sessions_do_not_block_each_other() {
    let (mut s1, h1) = Session::sandbox(EngineConfig::default());
    let (mut s2, h2) = Session::sandbox(EngineConfig::default());
    // only the second session has input; the first parks and must not
    // stop the second from finishing
    h2.input.send("two");
    let sender = h1.input.clone();
    let ((), (), ()) = tokio::join!(
        async {
            s1.execute("print readword").await;
        },
        async {
            s2.execute("print readword").await;
        },
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            sender.send("one");
        },
    );
    assert_eq!(h1.io.out(), "one\n");
    assert_eq!(h2.io.out(), "two\n");
}

#[tokio::test]
async fn test_scope_state_survives_suspension() {
    let (mut session, handles) = Session::sandbox(EngineConfig::default());
    handles.input.send("5");
    let program = "to f :x\nlocalmake \"y 2\noutput (sum :x readword :y)\nend\nprint f 10";
    session.execute(program).await;
    assert_eq!(handles.io.out(), "17\n");
}

#[tokio::test]
async fn test_readlist_parses_structure() {
    let (mut session, handles) = Session::sandbox(EngineConfig::default());
    handles.input.send("1 2 [3 4]");
    session.execute("show readlist").await;
    assert_eq!(handles.io.out(), "[1 2 [3 4]]\n");
}

#[tokio::test]
async fn test_wait_sleeps_cooperatively() {
    let start = std::time::Instant::now();
    // 6 ticks = a tenth of a second
    run_both("wait 6").await;
    assert!(start.elapsed() >= Duration::from_millis(80));
}

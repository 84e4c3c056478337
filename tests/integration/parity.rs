//! Interpreter / code-generator cross-checking
//!
//! For every program here, running through the direct interpreter and
//! through compiled chunks must yield identical observable output: text,
//! draw commands and errors.

use haigui::util::config::{EngineConfig, ExecMode};
use haigui::vm::Session;

async fn observe(mode: ExecMode, source: &str) -> (String, String, Vec<String>) {
    let mut config = EngineConfig::default();
    config.exec.mode = mode;
    let (mut session, handles) = Session::sandbox(config);
    session.execute(source).await;
    (handles.io.out(), handles.io.err(), handles.draw.commands())
}

async fn check_parity(source: &str) {
    let interpreted = observe(ExecMode::Interpret, source).await;
    let compiled = observe(ExecMode::Compile, source).await;
    assert_eq!(interpreted, compiled, "paths disagree on: {}", source);
}

const PROGRAMS: &[&str] = &[
    // arithmetic and precedence
    "print 5 + 3 * 2",
    "print (2 + 3) * -4",
    "print 1 / 3",
    // control structures, literal and computed bodies
    "repeat 3 [print repcount]",
    "repeat 2 run [[print \"dyn]]",
    "for [i 1 5 2] [print :i]",
    "make \"i 0 while [:i < 3] [make \"i :i + 1 print :i]",
    "if 1 = 1 [print \"a] else [print \"b]",
    // procedures: recursion, defaults, rest, redefinition
    "to fact :n\nif :n = 0 [output 1]\noutput :n * fact :n - 1\nend\nprint fact 6",
    "to greet [:who \"world]\nprint :who\nend\ngreet\n(greet \"moon)",
    "to f :x\noutput :x\nend\nprint f 1\nto f :x\noutput :x + 1\nend\nprint f 1",
    // exceptions
    "print catch \"foo [throw \"foo 42]",
    "catch \"error [print first []]\nprint \"after",
    "to f\ncatch \"inner [output 7]\nend\nprint f",
    // dynamic scope emulation around stash primitives
    "to g\noutput :i\nend\nfor [i 1 3] [print g]",
    "to h\nlocalmake \"i 99\nfor [i 1 2] [print :i]\nprint :i\nend\nh",
    // turtle output
    "repeat 4 [forward 50 right 90]",
    // errors must match, including their text
    "print nonexistent",
    "repeat 1 [3]",
    "print 1 / 0",
];

#[tokio::test]
async fn test_interpreted_and_compiled_paths_agree() {
    for program in PROGRAMS {
        check_parity(program).await;
    }
}

#[tokio::test]
async fn test_parity_with_queued_input() {
    for mode in [ExecMode::Interpret, ExecMode::Compile] {
        let mut config = EngineConfig::default();
        config.exec.mode = mode;
        let (mut session, handles) = Session::sandbox(config);
        handles.input.send("21");
        session
            .execute("to ask\noutput 2 * readword\nend\nprint ask")
            .await;
        assert_eq!(handles.io.out(), "42\n");
        assert_eq!(handles.io.err(), "");
    }
}

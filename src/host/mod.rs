//! Host collaborators
//!
//! The engine never touches a screen, a file system or a keyboard
//! directly; it talks to these narrow interfaces. The console and
//! in-memory implementations here are the ones the CLI and the test
//! harness use.

use serde_json::json;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;
use tokio::sync::mpsc;

// ============================================================================
// Text I/O
// ============================================================================

/// Where `print`, `type` and error reports go
pub trait IoChannel {
    /// Write a line to the output stream
    fn stdout(&mut self, text: &str);
    /// Write to the output stream without a trailing newline
    fn stdoutn(&mut self, text: &str);
    /// Write a line to the error stream
    fn stderr(&mut self, text: &str);
    /// Write to the error stream without a trailing newline
    fn stderrn(&mut self, text: &str);
    /// Clear the text screen
    fn cleartext(&mut self);
}

/// Locked standard streams
#[derive(Debug, Default)]
pub struct ConsoleIo;

impl IoChannel for ConsoleIo {
    fn stdout(&mut self, text: &str) {
        println!("{}", text);
    }

    fn stdoutn(&mut self, text: &str) {
        print!("{}", text);
        let _ = std::io::stdout().flush();
    }

    fn stderr(&mut self, text: &str) {
        eprintln!("{}", text);
    }

    fn stderrn(&mut self, text: &str) {
        eprint!("{}", text);
    }

    fn cleartext(&mut self) {
        // ANSI clear + home; harmless on dumb terminals
        print!("\x1b[2J\x1b[H");
        let _ = std::io::stdout().flush();
    }
}

/// Captured output, shared with the test that owns the session
#[derive(Debug, Default)]
pub struct Captured {
    pub out: String,
    pub err: String,
    pub clears: usize,
}

/// Vec-backed channel for tests and cross-checking
#[derive(Debug, Clone, Default)]
pub struct CapturedIo {
    buf: Rc<RefCell<Captured>>,
}

impl CapturedIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written to stdout so far
    pub fn out(&self) -> String {
        self.buf.borrow().out.clone()
    }

    /// Everything written to stderr so far
    pub fn err(&self) -> String {
        self.buf.borrow().err.clone()
    }

    /// Number of `cleartext` calls
    pub fn clears(&self) -> usize {
        self.buf.borrow().clears
    }
}

impl IoChannel for CapturedIo {
    fn stdout(&mut self, text: &str) {
        let mut b = self.buf.borrow_mut();
        b.out.push_str(text);
        b.out.push('\n');
    }

    fn stdoutn(&mut self, text: &str) {
        self.buf.borrow_mut().out.push_str(text);
    }

    fn stderr(&mut self, text: &str) {
        let mut b = self.buf.borrow_mut();
        b.err.push_str(text);
        b.err.push('\n');
    }

    fn stderrn(&mut self, text: &str) {
        self.buf.borrow_mut().err.push_str(text);
    }

    fn cleartext(&mut self) {
        self.buf.borrow_mut().clears += 1;
    }
}

// ============================================================================
// Blocking input
// ============================================================================

/// Push-based line input with a pollable queue
///
/// `take_line` is the engine's suspension point: awaiting it parks the
/// session without blocking other sessions on the same thread.
#[derive(Debug)]
pub struct InputQueue {
    queued: VecDeque<String>,
    rx: Option<mpsc::UnboundedReceiver<String>>,
    console: bool,
}

/// Host-side sender paired with a channel-backed [`InputQueue`]
#[derive(Debug, Clone)]
pub struct InputSender(mpsc::UnboundedSender<String>);

impl InputSender {
    /// Deliver one line of user input
    pub fn send(&self, line: impl Into<String>) {
        let _ = self.0.send(line.into());
    }
}

impl InputQueue {
    /// A queue fed by an async channel (embedding, tests, sandboxes)
    pub fn channel() -> (Self, InputSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                queued: VecDeque::new(),
                rx: Some(rx),
                console: false,
            },
            InputSender(tx),
        )
    }

    /// A queue that falls back to reading the process's stdin
    pub fn console() -> Self {
        Self {
            queued: VecDeque::new(),
            rx: None,
            console: true,
        }
    }

    /// Push a line directly (REPL lookahead, tests)
    pub fn push(&mut self, line: impl Into<String>) {
        self.queued.push_back(line.into());
    }

    fn drain_channel(&mut self) {
        if let Some(rx) = &mut self.rx {
            while let Ok(line) = rx.try_recv() {
                self.queued.push_back(line);
            }
        }
    }

    /// Is a line already available?
    pub fn has_input(&mut self) -> bool {
        self.drain_channel();
        !self.queued.is_empty()
    }

    /// Take a line without waiting
    pub fn try_take(&mut self) -> Option<String> {
        self.drain_channel();
        self.queued.pop_front()
    }

    /// Take the next line, suspending until one arrives
    ///
    /// Returns `None` when the input source is exhausted (channel closed
    /// or stdin at end of file).
    pub async fn take_line(&mut self) -> Option<String> {
        if let Some(line) = self.try_take() {
            return Some(line);
        }
        if let Some(rx) = &mut self.rx {
            return rx.recv().await;
        }
        if self.console {
            let line = tokio::task::spawn_blocking(|| {
                let mut line = String::new();
                match std::io::stdin().read_line(&mut line) {
                    Ok(0) | Err(_) => None,
                    Ok(_) => {
                        while line.ends_with('\n') || line.ends_with('\r') {
                            line.pop();
                        }
                        Some(line)
                    }
                }
            })
            .await;
            return line.ok().flatten();
        }
        None
    }
}

// ============================================================================
// Resource loading
// ============================================================================

/// Read-only file access for `load` and friends
pub trait ResourceLoader {
    /// Read a whole file as text
    fn read_file(&self, path: &str) -> std::io::Result<String>;
}

/// Loader rooted at a directory
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for FsLoader {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ResourceLoader for FsLoader {
    fn read_file(&self, path: &str) -> std::io::Result<String> {
        std::fs::read_to_string(self.root.join(path))
    }
}

/// Loader with nothing in it (sandboxes)
#[derive(Debug, Default)]
pub struct EmptyLoader;

impl ResourceLoader for EmptyLoader {
    fn read_file(&self, path: &str) -> std::io::Result<String> {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            path.to_string(),
        ))
    }
}

// ============================================================================
// Drawing commands
// ============================================================================

/// Version of the opcode table below
pub const DRAW_PROTOCOL_VERSION: u32 = 2;

/// Abstract drawing opcodes with fixed argument counts
///
/// The engine emits these; a renderer on the other side of the channel
/// interprets them. The table is append-only across protocol versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOp {
    /// Draw a line: x1 y1 x2 y2
    Line,
    /// Move without drawing: x y
    MoveTo,
    /// Update the turtle pose: x y heading
    Pose,
    /// Show or hide the turtle: visible(0/1)
    ShowTurtle,
    /// Set pen color (palette index or string form)
    PenColor,
    /// Set pen width: w
    PenSize,
    /// Erase the drawing surface, keep the turtle
    Clean,
    /// Erase everything and home the turtle
    Clear,
}

impl DrawOp {
    /// Number of numeric arguments the renderer expects
    pub fn expected_args(self) -> usize {
        match self {
            DrawOp::Line => 4,
            DrawOp::MoveTo => 2,
            DrawOp::Pose => 3,
            DrawOp::ShowTurtle => 1,
            DrawOp::PenColor => 1,
            DrawOp::PenSize => 1,
            DrawOp::Clean | DrawOp::Clear => 0,
        }
    }

    /// Wire name of the opcode
    pub fn name(self) -> &'static str {
        match self {
            DrawOp::Line => "line",
            DrawOp::MoveTo => "moveto",
            DrawOp::Pose => "pose",
            DrawOp::ShowTurtle => "showturtle",
            DrawOp::PenColor => "pencolor",
            DrawOp::PenSize => "pensize",
            DrawOp::Clean => "clean",
            DrawOp::Clear => "clear",
        }
    }
}

/// Sink for abstract drawing commands
pub trait DrawSink {
    /// Send a command with numeric arguments
    fn send_cmd(&mut self, op: DrawOp, args: &[f64]);
    /// Send a command with stringly arguments (color names and the like)
    fn send_cmd_as_string(&mut self, op: DrawOp, args: &[&str]);
}

/// Sink that drops everything (headless runs)
#[derive(Debug, Default)]
pub struct NullSink;

impl DrawSink for NullSink {
    fn send_cmd(&mut self, op: DrawOp, args: &[f64]) {
        debug_assert_eq!(args.len(), op.expected_args());
    }

    fn send_cmd_as_string(&mut self, _op: DrawOp, _args: &[&str]) {}
}

/// Sink that records commands for tests, as JSON lines
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    cmds: Rc<RefCell<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All commands recorded so far
    pub fn commands(&self) -> Vec<String> {
        self.cmds.borrow().clone()
    }
}

impl DrawSink for RecordingSink {
    fn send_cmd(&mut self, op: DrawOp, args: &[f64]) {
        debug_assert_eq!(args.len(), op.expected_args());
        let line = json!([op.name(), args]).to_string();
        self.cmds.borrow_mut().push(line);
    }

    fn send_cmd_as_string(&mut self, op: DrawOp, args: &[&str]) {
        let line = json!([op.name(), args]).to_string();
        self.cmds.borrow_mut().push(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captured_io_shares_buffer() {
        let io = CapturedIo::new();
        let mut writer = io.clone();
        writer.stdout("hello");
        writer.stdoutn("wor");
        writer.stdoutn("ld");
        assert_eq!(io.out(), "hello\nworld");
    }

    #[test]
    fn test_input_queue_polling() {
        let (mut q, tx) = InputQueue::channel();
        assert!(!q.has_input());
        tx.send("line one");
        assert!(q.has_input());
        assert_eq!(q.try_take().as_deref(), Some("line one"));
        assert!(q.try_take().is_none());
    }

    #[tokio::test]
    async fn test_input_queue_await() {
        let (mut q, tx) = InputQueue::channel();
        tx.send("later");
        assert_eq!(q.take_line().await.as_deref(), Some("later"));
        drop(tx);
        assert_eq!(q.take_line().await, None);
    }

    #[test]
    fn test_recording_sink_encodes_json() {
        let sink = RecordingSink::new();
        let mut s = sink.clone();
        s.send_cmd(DrawOp::MoveTo, &[10.0, -5.0]);
        s.send_cmd_as_string(DrawOp::PenColor, &["red"]);
        let cmds = sink.commands();
        assert_eq!(cmds[0], r#"["moveto",[10.0,-5.0]]"#);
        assert_eq!(cmds[1], r#"["pencolor",["red"]]"#);
    }

    #[test]
    fn test_opcode_arity_table() {
        assert_eq!(DrawOp::Line.expected_args(), 4);
        assert_eq!(DrawOp::Clear.expected_args(), 0);
    }
}

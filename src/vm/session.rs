//! Interpreter session
//!
//! One [`Session`] is one cooperative logical task: a workspace, its host
//! channels, the turtle pose, the compiled-chunk cache, and the buffer of
//! partially entered source. Sessions share no mutable state with each
//! other, so a test harness can drive several side by side on one
//! thread, suspending and resuming them independently.

use crate::frontend::{parse, tokenize, Lexed, Parsed};
use crate::host::{
    CapturedIo, ConsoleIo, DrawSink, EmptyLoader, FsLoader, InputQueue, InputSender, IoChannel,
    NullSink, RecordingSink, ResourceLoader,
};
use crate::runtime::except::{ErrorCode, Flow, LogoError};
use crate::runtime::workspace::Workspace;
use crate::util::config::EngineConfig;
use crate::vm::codegen::Chunk;
use crate::vm::interp::Evaluator;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// Turtle pose and pen state, tracked engine-side so the drawing sink
/// receives resolved absolute commands
#[derive(Debug, Clone)]
pub struct TurtleState {
    pub x: f64,
    pub y: f64,
    /// Degrees, 0 pointing up, clockwise positive
    pub heading: f64,
    pub pen_down: bool,
    pub visible: bool,
    pub pen_size: f64,
}

impl Default for TurtleState {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            heading: 0.0,
            pen_down: true,
            visible: true,
            pen_size: 1.0,
        }
    }
}

/// Result of feeding one chunk of input to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Ran to completion (errors, if any, went to the error channel)
    Done,
    /// A bracket, bar quote or `to` block is still open; feed more input
    Incomplete,
    /// `bye` was called
    Bye,
}

/// One interpreter session
pub struct Session {
    pub ws: Workspace,
    pub io: Box<dyn IoChannel>,
    pub input: InputQueue,
    pub loader: Box<dyn ResourceLoader>,
    pub draw: Box<dyn DrawSink>,
    pub config: EngineConfig,
    pub turtle: TurtleState,
    sources: Vec<String>,
    pending: String,
    chunks: HashMap<u64, Rc<Chunk>>,
    chunks_gen: u64,
    last_error: Option<LogoError>,
}

/// Handles into a sandboxed session's captured channels
pub struct SandboxHandles {
    pub io: CapturedIo,
    pub input: InputSender,
    pub draw: RecordingSink,
}

impl Session {
    /// A session wired to the console and the current directory
    pub fn new(config: EngineConfig) -> Self {
        Self {
            ws: Workspace::new(config.exec.scoped_plists),
            io: Box::new(ConsoleIo),
            input: InputQueue::console(),
            loader: Box::new(FsLoader::default()),
            draw: Box::new(NullSink),
            config,
            turtle: TurtleState::default(),
            sources: Vec::new(),
            pending: String::new(),
            chunks: HashMap::new(),
            chunks_gen: 0,
            last_error: None,
        }
    }

    /// A fully captured session for tests and sandboxes
    pub fn sandbox(config: EngineConfig) -> (Self, SandboxHandles) {
        let io = CapturedIo::new();
        let (queue, sender) = InputQueue::channel();
        let sink = RecordingSink::new();
        let session = Self {
            ws: Workspace::new(config.exec.scoped_plists),
            io: Box::new(io.clone()),
            input: queue,
            loader: Box::new(EmptyLoader),
            draw: Box::new(sink.clone()),
            config,
            turtle: TurtleState::default(),
            sources: Vec::new(),
            pending: String::new(),
            chunks: HashMap::new(),
            chunks_gen: 0,
            last_error: None,
        };
        (
            session,
            SandboxHandles {
                io,
                input: sender,
                draw: sink,
            },
        )
    }

    /// Feed one chunk of input (usually a line)
    ///
    /// Input accumulates across calls while the parser reports it
    /// incomplete; a structural error discards the accumulated buffer and
    /// resets to a fresh state.
    pub async fn execute(&mut self, text: &str) -> ExecOutcome {
        if !self.pending.is_empty() {
            self.pending.push('\n');
        }
        self.pending.push_str(text);

        let source_index = self.sources.len() as u32;
        let tokens = match tokenize(&self.pending, source_index) {
            Lexed::Complete(tokens) => tokens,
            Lexed::Incomplete => return ExecOutcome::Incomplete,
        };
        let stream = match parse(&tokens, &mut self.ws) {
            Ok(Parsed::Complete(stream)) => stream,
            Ok(Parsed::Incomplete) => return ExecOutcome::Incomplete,
            Err(e) => {
                self.pending.clear();
                self.report_flow(Flow::Err(e));
                return ExecOutcome::Done;
            }
        };
        self.sources.push(std::mem::take(&mut self.pending));

        debug!("evaluating {} tokens", stream.len());
        let mut ev = Evaluator::new(self);
        match ev.run_toplevel(&stream).await {
            Ok(()) => ExecOutcome::Done,
            Err(Flow::Bye) => ExecOutcome::Bye,
            Err(flow) => {
                self.report_flow(flow);
                ExecOutcome::Done
            }
        }
    }

    /// Is a multi-line form still open?
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Throw away partially entered input (REPL interrupt)
    pub fn discard_pending(&mut self) {
        self.pending.clear();
    }

    /// Register a source buffer, returning its index for srcmaps
    pub fn add_source(&mut self, text: &str) -> u32 {
        self.sources.push(text.to_string());
        (self.sources.len() - 1) as u32
    }

    /// Compiled chunk for a definition stamp, if still valid
    ///
    /// Any redefinition advances the workspace generation and empties the
    /// cache, so stale arities can never run.
    pub fn chunk_cache(&mut self, stamp: u64) -> Option<Rc<Chunk>> {
        if self.chunks_gen != self.ws.generation() {
            self.chunks.clear();
            self.chunks_gen = self.ws.generation();
        }
        self.chunks.get(&stamp).cloned()
    }

    /// Store a freshly compiled chunk
    pub fn cache_chunk(&mut self, stamp: u64, chunk: Rc<Chunk>) {
        self.chunks_gen = self.ws.generation();
        self.chunks.insert(stamp, chunk);
    }

    /// Record an error swallowed by `catch "error`, for the `error` primitive
    pub fn remember_error(&mut self, e: LogoError) {
        self.last_error = Some(e);
    }

    /// Take the last caught error
    pub fn take_error(&mut self) -> Option<LogoError> {
        self.last_error.take()
    }

    /// Reset the whole session: workspace, caches, turtle, pending input
    pub fn reset(&mut self) {
        self.ws.reset();
        self.chunks.clear();
        self.turtle = TurtleState::default();
        self.pending.clear();
        self.last_error = None;
    }

    /// Report an unwound flow on the error channel and recover
    ///
    /// The call-chain trace comes from the workspace's own bookkeeping
    /// (captured as the error crossed its first procedure boundary); the
    /// session stays usable for the next top-level command.
    pub fn report_flow(&mut self, flow: Flow) {
        let err = match flow {
            Flow::Err(e) => e,
            Flow::Stop => LogoError::new(ErrorCode::NotInsideProcedure, ["stop"]),
            Flow::Output(_) => LogoError::new(ErrorCode::NotInsideProcedure, ["output"]),
            Flow::Throw { tag, .. } => LogoError::new(ErrorCode::NoCatchTag, [tag.to_string()]),
            Flow::Bye => return,
        };
        let mut line = err.render();
        if let Some(name) = &err.proc_name {
            line = format!("{} in {}", line, name);
        }
        if let Some(at) = err.at {
            line = format!("{} at {}", line, at);
        }
        self.io.stderr(&line);
        for frame in &err.chain {
            self.io.stderr(&format!("  in {}", frame));
        }
        self.ws.clear_frames();
    }
}

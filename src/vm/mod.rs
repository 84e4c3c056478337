//! Execution core
//!
//! 两条执行路径，一套语义：解释器直接遍历记号流（`interp`），代码生成器
//! 把过程编译为缓存的后缀指令块（`codegen` + `executor`）。两条路径共享
//! 控制原语实现（`control`），保证可观察行为一致。
//!
//! Suspension (blocking reads, timed waits) rides on async/await: the
//! whole evaluation core is a non-`Send` future driven by a
//! current-thread runtime, so a parked session never blocks its siblings.

pub mod codegen;
pub mod control;
pub mod executor;
pub mod interp;
pub mod repl;
pub mod session;

pub use interp::{Cursor, Evaluator};
pub use session::{ExecOutcome, Session};

use std::future::Future;
use std::pin::Pin;

/// Boxed session-local future (values are `Rc`, so futures are not `Send`)
pub type LocalFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

#[cfg(test)]
mod tests;

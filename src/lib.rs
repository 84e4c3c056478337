//! HaiGui (海龟) Logo Engine
//!
//! A Logo-family language engine for an interactive educational
//! environment: tokenizer, parser, tagged value model, dynamically
//! scoped workspace, tree-walking interpreter and a chunk-compiling
//! code generator, plus turtle-graphics command emission.
//!
//! # Example
//!
//! ```logo
//! to square :n
//!   repeat 4 [forward :n right 90]
//! end
//! square 50
//! ```
//!
//! # Crate Features
//!
//! - `debug`: extra tracing in the execution core

#![doc(html_root_url = "https://docs.rs/haigui")]
#![warn(rust_2018_idioms)]

// Public modules
pub mod frontend;
pub mod host;
pub mod runtime;
pub mod vm;

// Utility modules
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use thiserror::Error;

use tracing::debug;

/// Language version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Language name
pub const NAME: &str = "HaiGui (海龟)";

/// Run Logo source to completion on a console-wired session
///
/// # Example
///
/// ```no_run
/// use haigui::{run, Result};
///
/// fn main() -> Result<()> {
///     run("print [hello world]")?;
///     Ok(())
/// }
/// ```
pub fn run(source: &str) -> Result<()> {
    let config = util::config::load_or_default();
    let mut session = vm::Session::new(config);
    debug!("session start");
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?;
    let outcome = rt.block_on(session.execute(source));
    if outcome == vm::ExecOutcome::Incomplete {
        anyhow::bail!("input ends inside an open bracket, bar quote or to-block");
    }
    debug!("session complete");
    Ok(())
}

use ::std::fs;
use ::std::path::Path;

/// Run a Logo source file
pub fn run_file(path: &Path) -> Result<()> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    debug!("running {}", path.display());
    run(&source)
}

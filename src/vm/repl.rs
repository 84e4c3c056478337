//! Line-based REPL with rustyline
//!
//! The continuation prompt is driven by the parser's incomplete-input
//! signal: while a bracket, bar quote or `to` block stays open the
//! session buffers lines, and an interrupt throws the buffer away.

use crate::util::config::EngineConfig;
use crate::vm::{ExecOutcome, Session};
use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::{Config, EditMode, Editor};

/// Run the interactive prompt until `bye` or end of input
pub fn start(config: EngineConfig) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?;

    let rl_config = Config::builder()
        .history_ignore_space(true)
        .max_history_size(config.repl.history_size)
        .context("Bad history size")?
        .edit_mode(EditMode::Emacs)
        .build();
    let mut editor: Editor<(), FileHistory> =
        Editor::with_config(rl_config).context("Failed to initialize line editor")?;

    let prompt = config.repl.prompt.clone();
    let continuation = config.repl.continuation_prompt.clone();
    let mut session = Session::new(config);

    println!("{} {}", crate::NAME, crate::VERSION);
    loop {
        let shown = if session.has_pending() {
            &continuation
        } else {
            &prompt
        };
        match editor.readline(shown) {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                match rt.block_on(session.execute(&line)) {
                    ExecOutcome::Bye => break,
                    ExecOutcome::Done | ExecOutcome::Incomplete => {}
                }
            }
            Err(ReadlineError::Interrupted) => {
                // drop any partially entered multi-line form
                session.discard_pending();
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err).context("Readline failure"),
        }
    }
    Ok(())
}

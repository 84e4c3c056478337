//! HaiGui Logo Engine - CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use haigui::util::{config, logger};
use haigui::{run, run_file, NAME, VERSION};
use std::path::PathBuf;

/// An educational Logo language engine with turtle graphics
#[derive(Parser, Debug)]
#[command(name = "haigui")]
#[command(author = "HaiGui Team")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a Logo source file
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Evaluate Logo code from the command line
    Eval {
        /// Code to evaluate
        #[arg(value_name = "CODE")]
        code: String,
    },

    /// Start the interactive prompt
    Repl,

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        logger::init_debug();
        eprintln!("HaiGui version: {}", VERSION);
        eprintln!("Host: {}", std::env::consts::OS);
    } else {
        logger::init();
    }

    match args.command.unwrap_or(Commands::Repl) {
        Commands::Run { file } => {
            run_file(&file).with_context(|| format!("Failed to run: {}", file.display()))?;
        }
        Commands::Eval { code } => {
            run(&code).context("Failed to evaluate code")?;
        }
        Commands::Repl => {
            let config = config::load_or_default();
            haigui::vm::repl::start(config)?;
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        }
    }

    Ok(())
}

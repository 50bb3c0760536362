//! Argument model for the `ez` binary.
//!
//! Only `run` and `check` are exposed — the broader scaffolding/doc/watch/
//! self-update surface a full toolchain front-end would carry belongs to a
//! different, outer layer than this interpreter core.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ez")]
#[command(about = "Lexer, parser, type checker, and evaluator for the EZ language", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable ANSI colors regardless of terminal detection.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Increase log verbosity (-v, -vv); overridden by EZ_LOG if set.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Type-check and run an EZ program, calling its `main` function.
    Run {
        /// Path to a `.ez` source file.
        file: PathBuf,
    },
    /// Type-check an EZ program without running it.
    Check {
        /// Path to a `.ez` source file.
        file: PathBuf,

        /// Emit diagnostics as a JSON array instead of rendered text.
        #[arg(long)]
        json: bool,
    },
}

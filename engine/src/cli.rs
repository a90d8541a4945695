//! CLI interface for Evalbot
//!
//! Defines the commands and global flags using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Evalbot snippet evaluation engine
///
/// Evaluates code snippets sent through chat in disposable, per-request
/// toolchain environments.
#[derive(Parser, Debug)]
#[command(name = "evalbot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the chat bot until interrupted
    Serve,

    /// Evaluate one snippet locally and print the response
    Eval {
        /// Package to install before evaluating (repeatable, installed in order)
        #[arg(short, long = "package", value_name = "PACKAGE")]
        packages: Vec<String>,

        /// Import statement (repeatable)
        #[arg(short, long = "import", value_name = "IMPORT")]
        imports: Vec<String>,

        /// Expressions to evaluate; the last one's value is printed
        expressions: Vec<String>,
    },

    /// Delete leftover template and snippet directories
    Sweep,

    /// Check the toolchain and temp root
    Doctor,
}

//! Command-line interface for promptmonitor.
//!
//! This module provides the CLI structure and command handlers for the
//! `pmon` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, DecisionArg, DismissCommand, HistoryCommand, ScanCommand, SendCommand,
    StateCommand,
};

/// pmon - Keep email addresses out of your prompts
///
/// Scans outgoing chat requests for email addresses and asks before they
/// leave the machine. Dismissed addresses are not flagged again for 24 hours.
#[derive(Debug, Parser)]
#[command(name = "pmon")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Find and redact email addresses in a piece of text
    Scan(ScanCommand),

    /// Send a request through the interceptor
    Send(SendCommand),

    /// Show history, suppressions and the last batch of detections
    State(StateCommand),

    /// List recorded detections, most recent first
    History(HistoryCommand),

    /// Stop flagging an email address for 24 hours
    Dismiss(DismissCommand),

    /// Clear detection history (suppressions are kept)
    Clear,

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

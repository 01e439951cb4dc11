//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::consent::ConsentDecision;

/// Scan command arguments.
#[derive(Debug, Args)]
pub struct ScanCommand {
    /// Text to scan for email addresses
    pub text: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Send command arguments.
#[derive(Debug, Args)]
pub struct SendCommand {
    /// Destination URL
    #[arg(short, long)]
    pub url: String,

    /// Read the JSON request body from this file (stdin if neither this nor --prompt is given)
    #[arg(short, long, value_name = "FILE", conflicts_with = "prompt")]
    pub body_file: Option<PathBuf>,

    /// Build a chat request body around this prompt text
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Echo what would be sent instead of contacting the server
    #[arg(long)]
    pub dry_run: bool,

    /// Answer the consent prompt non-interactively (required when the body comes from stdin)
    #[arg(short, long, value_enum, required_unless_present_any = ["prompt", "body_file"])]
    pub decision: Option<DecisionArg>,
}

/// State command arguments.
#[derive(Debug, Args)]
pub struct StateCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// History command arguments.
#[derive(Debug, Args)]
pub struct HistoryCommand {
    /// Maximum number of entries to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Dismiss command arguments.
#[derive(Debug, Args)]
pub struct DismissCommand {
    /// Email address to stop flagging for the next 24 hours
    pub identifier: String,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Consent decision argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DecisionArg {
    /// Redact the addresses, then send
    Anonymize,
    /// Send unchanged
    SendOriginal,
    /// Do not send
    Cancel,
}

impl From<DecisionArg> for ConsentDecision {
    fn from(arg: DecisionArg) -> Self {
        match arg {
            DecisionArg::Anonymize => Self::Anonymize,
            DecisionArg::SendOriginal => Self::SendOriginal,
            DecisionArg::Cancel => Self::Cancel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_arg_conversion() {
        assert_eq!(
            ConsentDecision::from(DecisionArg::Anonymize),
            ConsentDecision::Anonymize
        );
        assert_eq!(
            ConsentDecision::from(DecisionArg::SendOriginal),
            ConsentDecision::SendOriginal
        );
        assert_eq!(
            ConsentDecision::from(DecisionArg::Cancel),
            ConsentDecision::Cancel
        );
    }

    #[test]
    fn test_decision_arg_value_names() {
        let names: Vec<_> = DecisionArg::value_variants()
            .iter()
            .filter_map(|v| v.to_possible_value())
            .map(|v| v.get_name().to_string())
            .collect();
        assert_eq!(names, vec!["anonymize", "send-original", "cancel"]);
    }

    #[test]
    fn test_history_command_debug() {
        let cmd = HistoryCommand {
            limit: 5,
            json: false,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("limit"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}

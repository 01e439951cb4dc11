//! Consent prompt contract and the gate that serializes prompts.
//!
//! A prompt is shown for a non-empty list of identifiers and resolves to
//! exactly one [`ConsentDecision`]. Only one prompt is ever visible: callers
//! go through [`ConsentGate`], which queues them in arrival order.

use std::fmt::Write as _;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, trace};

/// The user's answer to a consent prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsentDecision {
    /// Redact the identifiers, then send.
    Anonymize,
    /// Send the request unchanged.
    SendOriginal,
    /// Do not send the request.
    Cancel,
}

impl std::fmt::Display for ConsentDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymize => write!(f, "anonymize"),
            Self::SendOriginal => write!(f, "send-original"),
            Self::Cancel => write!(f, "cancel"),
        }
    }
}

impl std::str::FromStr for ConsentDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anonymize" => Ok(Self::Anonymize),
            "send-original" => Ok(Self::SendOriginal),
            "cancel" => Ok(Self::Cancel),
            other => Err(format!("unknown consent decision: {other}")),
        }
    }
}

/// Raw user gestures a prompt surface can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptInput {
    /// The anonymize button.
    Anonymize,
    /// The send-original button.
    SendOriginal,
    /// The cancel button.
    Cancel,
    /// A click outside the prompt.
    BackdropDismiss,
    /// The escape key.
    Escape,
}

impl PromptInput {
    /// Parse a line typed at a terminal prompt.
    ///
    /// Returns `None` for input that is not one of the known answers.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.starts_with('\u{1b}') {
            return Some(Self::Escape);
        }
        match trimmed.trim().to_ascii_lowercase().as_str() {
            "a" | "anonymize" => Some(Self::Anonymize),
            "s" | "send" | "send-original" => Some(Self::SendOriginal),
            "c" | "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

impl From<PromptInput> for ConsentDecision {
    fn from(input: PromptInput) -> Self {
        match input {
            PromptInput::Anonymize => Self::Anonymize,
            PromptInput::SendOriginal => Self::SendOriginal,
            PromptInput::Cancel | PromptInput::BackdropDismiss | PromptInput::Escape => {
                Self::Cancel
            }
        }
    }
}

/// A surface that asks the user what to do with detected identifiers.
///
/// Implementations may take arbitrarily long; there is no timeout.
#[async_trait]
pub trait ConsentPrompt: Send + Sync + std::fmt::Debug {
    /// Present `identifiers` (never empty) and wait for a decision.
    async fn ask(&self, identifiers: &[String]) -> ConsentDecision;
}

/// Serializes prompts so at most one is open at a time.
///
/// Waiters are served first come, first served.
#[derive(Debug, Clone)]
pub struct ConsentGate {
    prompt: Arc<dyn ConsentPrompt>,
    turn: Arc<tokio::sync::Mutex<()>>,
}

impl ConsentGate {
    /// Wrap a prompt surface.
    #[must_use]
    pub fn new(prompt: Arc<dyn ConsentPrompt>) -> Self {
        Self {
            prompt,
            turn: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Wait for our turn, then ask.
    pub async fn request(&self, identifiers: &[String]) -> ConsentDecision {
        trace!(count = identifiers.len(), "Waiting for consent prompt");
        let _turn = self.turn.lock().await;
        let decision = self.prompt.ask(identifiers).await;
        debug!(%decision, count = identifiers.len(), "Consent resolved");
        decision
    }
}

/// A prompt that always gives the same answer.
///
/// Used for non-interactive runs; it also records what it was asked.
#[derive(Debug)]
pub struct FixedPrompt {
    decision: ConsentDecision,
    asked: Mutex<Vec<Vec<String>>>,
}

impl FixedPrompt {
    /// Create a prompt answering `decision`.
    #[must_use]
    pub fn new(decision: ConsentDecision) -> Self {
        Self {
            decision,
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Every identifier list this prompt was shown, oldest first.
    #[must_use]
    pub fn asked(&self) -> Vec<Vec<String>> {
        self.asked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ConsentPrompt for FixedPrompt {
    async fn ask(&self, identifiers: &[String]) -> ConsentDecision {
        self.asked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(identifiers.to_vec());
        self.decision
    }
}

/// Interactive prompt on the controlling terminal.
///
/// End of input counts as an escape gesture and resolves to cancel.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    fn render(identifiers: &[String]) -> String {
        let mut text = String::from("\nEmail addresses found in outgoing request:\n");
        for identifier in identifiers {
            let _ = writeln!(text, "  - {identifier}");
        }
        text.push_str("[a]nonymize, [s]end original, [c]ancel: ");
        text
    }
}

#[async_trait]
impl ConsentPrompt for TerminalPrompt {
    async fn ask(&self, identifiers: &[String]) -> ConsentDecision {
        let mut stdout = tokio::io::stdout();
        let mut stdin = BufReader::new(tokio::io::stdin());
        let mut text = Self::render(identifiers);

        loop {
            if stdout.write_all(text.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
                return PromptInput::Escape.into();
            }

            let mut line = String::new();
            match stdin.read_line(&mut line).await {
                Ok(0) | Err(_) => return PromptInput::Escape.into(),
                Ok(_) => {
                    if let Some(input) = PromptInput::parse(&line) {
                        return input.into();
                    }
                    text = "Please answer a, s or c: ".to_string();
                }
            }
        }
    }
}

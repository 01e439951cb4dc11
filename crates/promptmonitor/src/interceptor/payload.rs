//! Locating and rewriting the prompt inside a chat request body.
//!
//! The body is a JSON document with a `messages` array. The prompt is the
//! `content.parts` array of the first message that has one, joined with
//! newlines.

use serde_json::Value;
use thiserror::Error;

/// Why a body could not be inspected.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The body is not JSON.
    #[error("body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document has no `messages` array.
    #[error("body has no messages array")]
    NoMessages,

    /// No message carries a `content.parts` array.
    #[error("no message carries content parts")]
    NoParts,
}

/// A parsed chat request with its prompt located.
#[derive(Debug, Clone)]
pub struct ChatPayload {
    document: Value,
    message_index: usize,
    prompt: String,
}

impl ChatPayload {
    /// Parse `body` and find the prompt.
    ///
    /// Non-string parts are skipped when building the prompt text.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not JSON or has no prompt in the
    /// expected place.
    pub fn parse(body: &str) -> Result<Self, PayloadError> {
        let document: Value = serde_json::from_str(body)?;
        let messages = document
            .get("messages")
            .and_then(Value::as_array)
            .ok_or(PayloadError::NoMessages)?;

        let (message_index, parts) = messages
            .iter()
            .enumerate()
            .find_map(|(i, message)| {
                message
                    .pointer("/content/parts")
                    .and_then(Value::as_array)
                    .map(|parts| (i, parts))
            })
            .ok_or(PayloadError::NoParts)?;

        let prompt = parts
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Self {
            document,
            message_index,
            prompt,
        })
    }

    /// The prompt text.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Serialize the document with the prompt parts replaced by `text`.
    #[must_use]
    pub fn rewrite(mut self, text: &str) -> String {
        if let Some(parts) = self
            .document
            .pointer_mut(&format!("/messages/{}/content/parts", self.message_index))
        {
            *parts = Value::Array(vec![Value::String(text.to_string())]);
        }
        self.document.to_string()
    }
}

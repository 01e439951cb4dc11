//! Core record types for promptmonitor.
//!
//! These are the values the coordinator persists and hands to observers.
//! JSON field names are camelCase and timestamps are Unix milliseconds, the
//! same shape the records have in the persisted store.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// How long a dismissed identifier stays suppressed.
pub const SUPPRESSION_WINDOW: Duration = Duration::hours(24);

/// Suffix appended to a context preview that was cut short.
const PREVIEW_ELLIPSIS: &str = "...";

/// Sub-second digits kept on record timestamps, matching their stored form.
const TIMESTAMP_PRECISION: u16 = 3;

/// Process-wide sequence mixed into detection ids.
static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Normalize an identifier for matching and suppression.
///
/// Matching is case-insensitive everywhere; display keeps the original casing.
#[must_use]
pub fn normalize(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

/// A single identifier found in a forwarded request.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionItem {
    /// Unique id, `<unix-millis>-<7 hex chars>`.
    pub id: String,

    /// The identifier as it appeared in the request (original casing).
    pub identifier: String,

    /// When the request carrying the identifier was processed.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub detected_at: DateTime<Utc>,

    /// URL the request was addressed to.
    pub source_url: String,

    /// Leading slice of the prompt the identifier was found in.
    pub context_preview: String,
}

impl DetectionItem {
    /// Create a detection record stamped at `now`, truncated to milliseconds.
    #[must_use]
    pub fn new(
        identifier: impl Into<String>,
        now: DateTime<Utc>,
        source_url: impl Into<String>,
        context_preview: impl Into<String>,
    ) -> Self {
        let now = now.trunc_subsecs(TIMESTAMP_PRECISION);
        let identifier = identifier.into();
        Self {
            id: Self::generate_id(now, &identifier),
            identifier,
            detected_at: now,
            source_url: source_url.into(),
            context_preview: context_preview.into(),
        }
    }

    /// Generate an id that sorts by creation time and never repeats within a process.
    #[must_use]
    pub fn generate_id(now: DateTime<Utc>, identifier: &str) -> String {
        let millis = now.timestamp_millis();
        let sequence = NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed);

        let mut hasher = blake3::Hasher::new();
        hasher.update(&millis.to_le_bytes());
        hasher.update(&sequence.to_le_bytes());
        hasher.update(identifier.as_bytes());
        let digest = hasher.finalize().to_hex();

        format!("{millis}-{}", &digest[..7])
    }

    /// The identifier in its matching form.
    #[must_use]
    pub fn normalized(&self) -> String {
        normalize(&self.identifier)
    }
}

/// Build the context preview stored with each detection.
///
/// Keeps the first `max_chars` characters and appends `...` when the prompt
/// was longer than that.
#[must_use]
pub fn context_preview(prompt: &str, max_chars: usize) -> String {
    let mut chars = prompt.chars();
    let mut preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        preview.push_str(PREVIEW_ELLIPSIS);
    }
    preview
}

/// A time-boxed acknowledgement that an identifier should not be re-flagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuppressionEntry {
    /// Normalized (lowercase) identifier.
    pub identifier: String,

    /// When the user dismissed the identifier.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub suppressed_at: DateTime<Utc>,

    /// When the suppression lapses. Always after `suppressed_at`.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl SuppressionEntry {
    /// Create an entry that starts at `now` and lasts [`SUPPRESSION_WINDOW`].
    ///
    /// Both timestamps are truncated to milliseconds.
    #[must_use]
    pub fn new(identifier: &str, now: DateTime<Utc>) -> Self {
        let now = now.trunc_subsecs(TIMESTAMP_PRECISION);
        Self {
            identifier: normalize(identifier),
            suppressed_at: now,
            expires_at: now + SUPPRESSION_WINDOW,
        }
    }

    /// Check whether the entry still suppresses at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// Check whether this entry covers `identifier` (case-insensitive).
    #[must_use]
    pub fn covers(&self, identifier: &str) -> bool {
        self.identifier == normalize(identifier)
    }
}

/// Everything the coordinator owns, as returned by `GET_STATE`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// All detections, most recent first.
    pub history: Vec<DetectionItem>,
    /// Active suppressions, most recent first.
    pub suppressions: Vec<SuppressionEntry>,
    /// The batch produced by the most recently processed request.
    pub session_detections: Vec<DetectionItem>,
}

/// The `STATE_UPDATED` notification pushed to observers after a mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdate {
    /// All detections, most recent first.
    pub history: Vec<DetectionItem>,
    /// Active suppressions, most recent first.
    pub suppressions: Vec<SuppressionEntry>,
}

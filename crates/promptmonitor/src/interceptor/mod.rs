//! Outbound request interception.
//!
//! Every request passes through [`Interceptor::dispatch`]. Requests to a
//! protected endpoint have their prompt scanned; if unsuppressed identifiers
//! turn up, the user is asked what to do before anything leaves the machine.
//!
//! ```text
//! IDLE -> MATCHING -> EXTRACTING -> DETECTING -+-> PASSTHROUGH
//!                                              |
//!                                              +-> FILTERING -+-> PASSTHROUGH
//!                                                             |
//!                                                             +-> AWAITING_CONSENT
//!                                                                   anonymize     -> REWRITE -> FORWARD
//!                                                                   send-original -> FORWARD
//!                                                                   cancel        -> SHORT_CIRCUIT
//! ```
//!
//! Anything that goes wrong while locating the prompt sends the request on
//! untouched. Delivery matters more than detection.

mod payload;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, trace};

pub use payload::{ChatPayload, PayloadError};

use crate::clock::Clock;
use crate::config::InterceptionConfig;
use crate::consent::{ConsentDecision, ConsentGate};
use crate::detector::{dedupe, detect, filter_suppressed, redact, redaction_targets};
use crate::error::Result;
use crate::protocol::DetectionEvent;
use crate::relay::Relay;
use crate::transport::{Delivery, OutboundRequest, Transport};

/// Steps of the interception state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// A request arrived.
    Idle,
    /// The URL addresses a protected endpoint.
    Matching,
    /// Locating the prompt in the body.
    Extracting,
    /// Running the detector over the prompt.
    Detecting,
    /// Dropping suppressed identifiers.
    Filtering,
    /// Waiting on the user.
    AwaitingConsent,
    /// Redacting the prompt.
    Rewrite,
    /// Sending, with a detection reported.
    Forward,
    /// Cancelled; nothing is sent.
    ShortCircuit,
    /// Sending unmodified, nothing reported.
    Passthrough,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::Matching => "MATCHING",
            Self::Extracting => "EXTRACTING",
            Self::Detecting => "DETECTING",
            Self::Filtering => "FILTERING",
            Self::AwaitingConsent => "AWAITING_CONSENT",
            Self::Rewrite => "REWRITE",
            Self::Forward => "FORWARD",
            Self::ShortCircuit => "SHORT_CIRCUIT",
            Self::Passthrough => "PASSTHROUGH",
        };
        f.write_str(name)
    }
}

/// Where forwarded detections are reported.
///
/// Reporting is fire-and-forget; implementations must not block.
pub trait DetectionSink: Send + Sync + fmt::Debug {
    /// Report a forwarded request that carried identifiers.
    fn emit(&self, event: DetectionEvent);
}

impl DetectionSink for Relay {
    fn emit(&self, event: DetectionEvent) {
        drop(self.relay_detection(event));
    }
}

/// What the state machine decided for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// Send the request exactly as it was issued.
    Passthrough(OutboundRequest),
    /// Send `request` (rewritten if the user chose to anonymize) and report `event`.
    Forward {
        /// The request to send.
        request: OutboundRequest,
        /// The detection to report.
        event: DetectionEvent,
    },
    /// The user cancelled. Nothing is sent or reported.
    ShortCircuit {
        /// The identifiers the user was shown.
        identifiers: Vec<String>,
    },
}

impl Interception {
    /// The terminal stage this outcome corresponds to.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Passthrough(_) => Stage::Passthrough,
            Self::Forward { .. } => Stage::Forward,
            Self::ShortCircuit { .. } => Stage::ShortCircuit,
        }
    }
}

/// Inspects outbound requests and applies the user's consent decision.
#[derive(Debug, Clone)]
pub struct Interceptor {
    transport: Arc<dyn Transport>,
    gate: ConsentGate,
    sink: Arc<dyn DetectionSink>,
    suppressions: watch::Receiver<HashSet<String>>,
    clock: Arc<dyn Clock>,
    endpoints: Vec<String>,
}

impl Interceptor {
    /// Create an interceptor.
    ///
    /// `suppressions` is the relay's cache of normalized identifiers.
    #[must_use]
    pub fn new(
        config: &InterceptionConfig,
        transport: Arc<dyn Transport>,
        gate: ConsentGate,
        sink: Arc<dyn DetectionSink>,
        suppressions: watch::Receiver<HashSet<String>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transport,
            gate,
            sink,
            suppressions,
            clock,
            endpoints: config.endpoints.clone(),
        }
    }

    /// Check whether `url` addresses a protected endpoint.
    ///
    /// The path must end with one of the configured suffixes exactly; any
    /// query string or fragment is ignored.
    #[must_use]
    pub fn is_protected(&self, url: &str) -> bool {
        let end = url.find(['?', '#']).unwrap_or(url.len());
        let path = &url[..end];
        self.endpoints.iter().any(|suffix| path.ends_with(suffix.as_str()))
    }

    /// Run a request through interception and deliver it.
    ///
    /// A cancelled request never reaches the transport.
    ///
    /// # Errors
    ///
    /// Returns an error only if the transport fails.
    pub async fn dispatch(&self, request: OutboundRequest) -> Result<Delivery> {
        match self.intercept(request).await {
            Interception::Passthrough(request) => {
                self.transport.send(request).await.map(Delivery::Sent)
            }
            Interception::Forward { request, event } => {
                self.sink.emit(event);
                self.transport.send(request).await.map(Delivery::Sent)
            }
            Interception::ShortCircuit { identifiers } => Ok(Delivery::Cancelled { identifiers }),
        }
    }

    /// Decide what to do with a request without delivering it.
    pub async fn intercept(&self, request: OutboundRequest) -> Interception {
        trace!(stage = %Stage::Idle, url = %request.url);

        if !self.is_protected(&request.url) {
            return passthrough(request);
        }
        trace!(stage = %Stage::Matching, "Protected endpoint");

        let Some(body) = request.body.as_deref() else {
            return passthrough(request);
        };

        trace!(stage = %Stage::Extracting);
        let payload = match ChatPayload::parse(body) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(error = %e, "Prompt not found in request body");
                return passthrough(request);
            }
        };

        trace!(stage = %Stage::Detecting);
        let found = dedupe(&detect(payload.prompt()));
        if found.is_empty() {
            return passthrough(request);
        }

        trace!(stage = %Stage::Filtering, found = found.len());
        let remaining = {
            let suppressed = self.suppressions.borrow();
            filter_suppressed(&found, &suppressed)
        };
        if remaining.is_empty() {
            debug!(found = found.len(), "All identifiers suppressed");
            return passthrough(request);
        }

        trace!(stage = %Stage::AwaitingConsent, count = remaining.len());
        let decision = self.gate.request(&remaining).await;
        info!(%decision, count = remaining.len(), "Identifiers in outgoing request");

        let event = DetectionEvent {
            action: decision,
            identifiers: remaining.clone(),
            url: request.url.clone(),
            prompt: payload.prompt().to_string(),
            timestamp: self.clock.now(),
        };

        match decision {
            ConsentDecision::Cancel => {
                trace!(stage = %Stage::ShortCircuit);
                Interception::ShortCircuit {
                    identifiers: remaining,
                }
            }
            ConsentDecision::SendOriginal => {
                trace!(stage = %Stage::Forward);
                Interception::Forward { request, event }
            }
            ConsentDecision::Anonymize => {
                trace!(stage = %Stage::Rewrite);
                let targets = redaction_targets(payload.prompt(), &remaining);
                let redacted = redact(payload.prompt(), &targets);
                let request = request.with_body(payload.rewrite(&redacted));
                trace!(stage = %Stage::Forward);
                Interception::Forward { request, event }
            }
        }
    }
}

fn passthrough(request: OutboundRequest) -> Interception {
    trace!(stage = %Stage::Passthrough);
    Interception::Passthrough(request)
}

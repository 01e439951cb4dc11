//! `promptmonitor` - Keep email addresses out of outgoing prompts
//!
//! This library intercepts outbound chat requests, detects email addresses in
//! the prompt, asks the user whether to anonymize, send or cancel, and keeps a
//! persisted history of detections along with time-boxed suppressions.
//!
//! The moving parts:
//!
//! - [`interceptor::Interceptor`] runs each request through detection and the
//!   consent gate before handing it to a [`transport::Transport`].
//! - [`relay::Relay`] forwards detections to the coordinator and caches the
//!   active suppressions for the interceptor.
//! - [`coordinator::Coordinator`] is the single writer of history and
//!   suppressions, persisted through [`storage::Storage`].

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod clock;
pub mod config;
pub mod consent;
pub mod coordinator;
pub mod detector;
pub mod error;
pub mod interceptor;
pub mod logging;
pub mod model;
pub mod protocol;
pub mod relay;
pub mod storage;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use consent::{ConsentDecision, ConsentGate, ConsentPrompt};
pub use coordinator::{Coordinator, CoordinatorHandle};
pub use error::{Error, Result};
pub use interceptor::{DetectionSink, Interceptor};
pub use logging::init_logging;
pub use model::{DetectionItem, StateSnapshot, SuppressionEntry};
pub use relay::{CoordinatorEndpoint, Relay};
pub use storage::{KeyValueStore, Storage};
pub use transport::{Delivery, InboundResponse, OutboundRequest, Transport};

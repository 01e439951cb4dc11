//! Outbound request dispatch.
//!
//! The interceptor never talks to the network directly: it hands the
//! (possibly rewritten) request to a [`Transport`].

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;

/// An outbound request as seen by the interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    /// Destination URL.
    pub url: String,
    /// Request body. Only string bodies are inspected.
    pub body: Option<String>,
    /// Extra headers, in order.
    pub headers: Vec<(String, String)>,
}

impl OutboundRequest {
    /// A request with a JSON string body.
    #[must_use]
    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: Some(body.into()),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
        }
    }

    /// A request without a body.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    /// The same request with its body replaced.
    #[must_use]
    pub fn with_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }
}

/// The response handed back to whoever issued the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

/// What became of a request after interception.
///
/// A cancelled request never reaches a [`Transport`], so no response a
/// server sends can be mistaken for a cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The request was delivered and this is the server's answer.
    Sent(InboundResponse),
    /// The user cancelled at the consent prompt; nothing left the machine.
    Cancelled {
        /// The identifiers the user was asked about.
        identifiers: Vec<String>,
    },
}

impl Delivery {
    /// Check whether the request was cancelled before sending.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The server's response, if the request was sent.
    #[must_use]
    pub fn response(&self) -> Option<&InboundResponse> {
        match self {
            Self::Sent(response) => Some(response),
            Self::Cancelled { .. } => None,
        }
    }
}

/// Sends requests on to their destination.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Deliver `request` and return the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be delivered.
    async fn send(&self, request: OutboundRequest) -> Result<InboundResponse>;
}

/// Real HTTP delivery over reqwest.
///
/// Requests with a body are sent as `POST`, requests without one as `GET`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a fresh connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pmon/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: OutboundRequest) -> Result<InboundResponse> {
        let mut builder = match request.body {
            Some(body) => self.client.post(&request.url).body(body),
            None => self.client.get(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, bytes = body.len(), "Response received");

        Ok(InboundResponse { status, body })
    }
}

/// Answers every request with `200` and the request body echoed back.
///
/// Lets `pmon send --dry-run` show exactly what would have left the machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoTransport;

#[async_trait]
impl Transport for EchoTransport {
    async fn send(&self, request: OutboundRequest) -> Result<InboundResponse> {
        Ok(InboundResponse {
            status: 200,
            body: request.body.unwrap_or_default(),
        })
    }
}

//! Traits and type definitions for provider adapters.
//!
//! Each provider (e.g., Google Gemini or a Coze workflow deployment) has its own
//! request/response contract, authentication scheme and error payloads. The
//! interface for all of them is the [`ProviderAdapter`] trait, a pure translation
//! unit between the provider-agnostic call (a model, a list of [`Message`]s and
//! [`CallOptions`]) and one provider's wire format:
//! - Build: turn the call into an [`HttpRequest`], choosing the endpoint,
//!   reshaping the messages and attaching credentials.
//! - Parse: extract the generated text from a successful JSON reply, or a
//!   human-readable message from an error reply.
//!
//! Adapters never touch the network themselves. The dispatcher sends the request
//! through a [`Transport`] and, for providers whose replies are event streams,
//! folds the body with the stream aggregator.
//!
//! Adapters are registered in a static table keyed by [`ProviderIdentifier`]
//! (see [`registry`]). Adding a provider means adding an identifier variant and its
//! adapter; the dispatcher's control flow does not change.
//!
//! ## Error Handling
//!
//! Each API reports errors in its own shape. Whatever the shape, failed calls are
//! classified into an [`ErrorKind`] from the HTTP status or the transport failure,
//! and the provider's message (when one can be decoded) is carried verbatim.

mod apireq;
mod coze;
mod deepseek;
mod google;

pub mod providers;
pub mod registry;

pub use apireq::{
    aggregate, ByteStream, EventStreamAggregator, EventStreamError, HttpRequest, HttpResponse,
    ReqwestTransport, Transport, TransportError, TransportErrorKind,
};
pub use coze::COZE_LOCAL_DEFAULT_ENDPOINT;
pub use providers::ProviderIdentifier;

#[cfg(test)]
pub(crate) use apireq::mock;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::catalog::ModelDescriptor;
use crate::chat::Message;

/// The number of output tokens requested when the caller does not say.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// This is a list specifying general categories of errors that
/// can be returned by a provider call. This list may be updated
/// as providers are added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Failed to connect to the underlying API service.
    /// This could be due to network issues like DNS
    /// resolution, connectivity issues, or routing problems.
    Connection,
    /// A request timed out.
    TimedOut,
    /// The credential was rejected or service-specific
    /// permissions are needed.
    Authentication,
    /// A rate limit was reached or a quota was exceeded.
    ExcessUsage,
    /// The servers are overloaded. This is non-fatal
    /// and indicates that a retry may be needed later.
    ApiOverloaded,
    /// The requested resource was not found. This likely means that
    /// the model or workflow does not exist on the provider's side.
    NotFound,
    /// The request was malformed or is otherwise improper.
    BadRequest,
    /// The server encountered an error.
    InternalError,
    /// An API response was unable to be deserialized, malformed,
    /// or otherwise violated the assumptions of the client.
    UnexpectedResponse,
    /// An error that does not fit into any of the other categories.
    UnspecifiedError,
}

impl ErrorKind {
    pub fn from_status(status: u16) -> ErrorKind {
        match status {
            400 | 422 => ErrorKind::BadRequest,
            401 | 403 => ErrorKind::Authentication,
            404 => ErrorKind::NotFound,
            429 => ErrorKind::ExcessUsage,
            500 => ErrorKind::InternalError,
            503 => ErrorKind::ApiOverloaded,
            _ => ErrorKind::UnspecifiedError,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "failed to connect to the API service",
            ErrorKind::TimedOut => "request timed out",
            ErrorKind::Authentication => "authentication failed or not provided",
            ErrorKind::ExcessUsage => "rate limit exceeded or quota crossed",
            ErrorKind::ApiOverloaded => "API server(s) are currently overloaded",
            ErrorKind::NotFound => "the requested resource was not found",
            ErrorKind::BadRequest => "the request was bad or malformed",
            ErrorKind::InternalError => "the server encountered an internal error",
            ErrorKind::UnexpectedResponse => "API response was unexpected or malformed",
            ErrorKind::UnspecifiedError => "an unspecified error occurred",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Why an adapter could not build a request. All of these are raised before any
/// network I/O.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("a workflow id is required")]
    MissingWorkflowId,
    #[error("a credential is required")]
    MissingCredential,
    #[error("invalid endpoint \"{url}\": {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// How a provider delivers a successful reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// A single JSON document.
    Json,
    /// A server-sent event stream whose `data:` payloads carry `content`.
    EventStream,
}

/// Per-call options. Only the options a provider understands are used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallOptions {
    /// The server-side workflow to run (workflow-style providers only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    /// Inputs forwarded to workflow-style providers.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub parameters: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl CallOptions {
    pub fn with_workflow_id<S: Into<String>>(mut self, workflow_id: S) -> CallOptions {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    pub fn with_parameter<S, V>(mut self, name: S, value: V) -> CallOptions
    where
        S: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> CallOptions {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// The requested output budget, never above what the model allows.
    pub fn max_tokens_for(&self, model: &ModelDescriptor) -> u32 {
        self.max_tokens
            .unwrap_or(DEFAULT_MAX_TOKENS)
            .min(model.max_tokens)
    }

    /// The workflow id, if present and non-empty.
    pub fn workflow_id(&self) -> Option<&str> {
        self.workflow_id.as_deref().filter(|w| !w.is_empty())
    }
}

/// Everything an adapter needs to build one request.
#[derive(Debug, Clone, Copy)]
pub struct AdapterCall<'c> {
    pub model: &'c ModelDescriptor,
    pub messages: &'c [Message],
    pub options: &'c CallOptions,
    /// The provider's secret, when one is configured.
    pub secret: Option<&'c str>,
    /// The configured base URL of a locally deployed provider.
    pub endpoint: Option<&'c str>,
}

/// A trait implemented by all provider adapters.
pub trait ProviderAdapter: Send + Sync {
    /// Returns the provider identifier.
    fn id(&self) -> ProviderIdentifier;

    /// Returns the shape of a successful reply.
    fn response_format(&self) -> ResponseFormat;

    /// Translate a call into the provider's request.
    fn build_request(&self, call: &AdapterCall<'_>) -> Result<HttpRequest, BuildError>;

    /// Extract the generated text from a successful JSON reply. Only called for
    /// [`ResponseFormat::Json`] providers. The error is a human-readable message.
    fn parse_response(&self, body: &[u8]) -> Result<String, String>;

    /// A human-readable message for a failed reply. Adapters decode their
    /// provider's error payload and fall back to [`status_message`].
    fn error_message(&self, status: u16, _body: &[u8]) -> String {
        status_message(status)
    }
}

/// The generic message used when an error payload cannot be decoded.
pub fn status_message(status: u16) -> String {
    format!("HTTP {}", status)
}

/// Join a base URL and a path and parse the result.
pub(crate) fn endpoint_url(base: &str, path: &str) -> Result<url::Url, BuildError> {
    let raw = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );

    url::Url::parse(&raw).map_err(|source| BuildError::InvalidEndpoint { url: raw, source })
}

//! Error and retry-policy types for the workflow engine client.
//!
//! [`ClientError`] is what every [`crate::Agent`] operation returns. It splits
//! failures by *where* they were detected:
//!
//! - before any request was made ([`ClientError::Validation`]),
//! - in the server's payload ([`ClientError::Protocol`], [`ClientError::Conflict`]),
//! - underneath the payload, in the HTTP layer ([`ClientError::Transport`]).
//!
//! [`RetryPolicy`] lets a caller decide what to do with a failure without
//! matching on every variant. The client itself never retries.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AgentId, Fei};

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// ## Rules
///
/// - `Retryable`: connection failures, timeouts, HTTP 408/429/5xx, and
///   workitem updates that did not take effect (refetch, re-apply, retry).
/// - `NonRetryable`: invalid launch items, payloads that do not match the
///   expected shape, other HTTP statuses, misconfiguration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt, taken from the server's
        /// `Retry-After` header when it sent one. `None` means apply the
        /// caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// Retrying the same request will fail the same way.
    NonRetryable,
}

impl RetryPolicy {
    /// Returns `true` for [`RetryPolicy::Retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, RetryPolicy::Retryable { .. })
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Failure below the JSON payload: the request could not be sent, or the
/// response could not be read as JSON.
///
/// Produced by [`crate::Transport`] implementations and passed through the
/// agent unchanged.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// The HTTP client could not be constructed for the configured endpoint.
    #[error("Transport setup failed: {message}")]
    Setup { message: String },

    /// The server could not be reached.
    #[error("Connection to {url} failed: {message}")]
    Connect { url: String, message: String },

    /// The request did not complete within the configured timeout.
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
        /// Parsed `Retry-After` header, if the server sent one in seconds.
        retry_after: Option<Duration>,
    },

    /// The response body was not valid JSON.
    #[error("Response from {url} is not JSON: {message}")]
    Decode { url: String, message: String },

    /// Any other failure reported by the underlying HTTP client.
    #[error("Request to {url} failed: {message}")]
    Other { url: String, message: String },
}

impl TransportError {
    /// Classifies this transport failure.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            TransportError::Connect { .. } | TransportError::Timeout { .. } => {
                RetryPolicy::Retryable { after: None }
            }
            TransportError::Status {
                status,
                retry_after,
                ..
            } if *status == 408 || *status == 429 || *status >= 500 => RetryPolicy::Retryable {
                after: *retry_after,
            },
            TransportError::Status { .. }
            | TransportError::Setup { .. }
            | TransportError::Decode { .. }
            | TransportError::Other { .. } => RetryPolicy::NonRetryable,
        }
    }
}

// ---------------------------------------------------------------------------
// Client errors
// ---------------------------------------------------------------------------

/// Errors returned by [`crate::Agent`] operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    /// A launch item failed local checks. No request was sent.
    #[error("Launch item not valid: {reason}")]
    Validation { reason: String },

    /// The server answered, but not with the payload this operation expects:
    /// a null body, a missing or null named field, or an element that does
    /// not decode. Usually means client and server disagree on the protocol.
    #[error("Invalid response from server during {operation}: {detail}")]
    Protocol {
        operation: &'static str,
        detail: String,
    },

    /// A workitem update or proceed was answered, but the echoed fields differ
    /// from the ones sent: the change did not take effect (stale workitem,
    /// concurrent modification).
    #[error("Update of workitem {fei} did not take effect")]
    Conflict { fei: Fei },

    /// An entity was handed to an agent other than the one that fetched it.
    #[error("Entity belongs to agent {owner}, not agent {agent}")]
    ForeignEntity { owner: AgentId, agent: AgentId },

    /// The agent was configured with an unusable base URL.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Network or HTTP-layer failure, passed through unchanged.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ClientError {
    pub(crate) fn protocol(operation: &'static str, detail: impl Into<String>) -> Self {
        ClientError::Protocol {
            operation,
            detail: detail.into(),
        }
    }

    /// Short stable name of the error kind, for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Validation { .. } => "validation",
            ClientError::Protocol { .. } => "protocol",
            ClientError::Conflict { .. } => "conflict",
            ClientError::ForeignEntity { .. } => "foreign_entity",
            ClientError::Configuration { .. } => "configuration",
            ClientError::Transport(_) => "transport",
        }
    }

    /// Classifies this failure as retryable or not.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            ClientError::Transport(e) => e.retry_policy(),
            ClientError::Conflict { .. } => RetryPolicy::Retryable { after: None },
            ClientError::Validation { .. }
            | ClientError::Protocol { .. }
            | ClientError::ForeignEntity { .. }
            | ClientError::Configuration { .. } => RetryPolicy::NonRetryable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Expid, Wfid};

    fn status(code: u16, retry_after: Option<Duration>) -> TransportError {
        TransportError::Status {
            url: "http://engine/_ruote/processes".into(),
            status: code,
            body: String::new(),
            retry_after,
        }
    }

    #[test]
    fn server_errors_and_throttling_are_retryable() {
        assert_eq!(
            status(503, Some(Duration::from_secs(7))).retry_policy(),
            RetryPolicy::Retryable {
                after: Some(Duration::from_secs(7))
            }
        );
        assert!(status(429, None).retry_policy().is_retryable());
        assert!(status(408, None).retry_policy().is_retryable());
        assert!(!status(404, None).retry_policy().is_retryable());
        assert!(!status(400, None).retry_policy().is_retryable());
    }

    #[test]
    fn connection_failures_are_retryable_but_decode_failures_are_not() {
        let connect = TransportError::Connect {
            url: "http://engine".into(),
            message: "refused".into(),
        };
        let decode = TransportError::Decode {
            url: "http://engine".into(),
            message: "expected value".into(),
        };
        assert!(ClientError::from(connect).retry_policy().is_retryable());
        assert!(!ClientError::from(decode).retry_policy().is_retryable());
    }

    #[test]
    fn conflict_is_retryable_protocol_is_not() {
        let fei = Fei::new(Wfid::new("w").unwrap(), Expid::new("0_0").unwrap());
        let conflict = ClientError::Conflict { fei };
        assert_eq!(conflict.kind(), "conflict");
        assert!(conflict.retry_policy().is_retryable());

        let protocol = ClientError::protocol("find_process", "missing 'process'");
        assert_eq!(protocol.kind(), "protocol");
        assert_eq!(protocol.retry_policy(), RetryPolicy::NonRetryable);
    }

    #[test]
    fn transport_errors_display_unchanged() {
        let inner = status(500, None);
        let outer = ClientError::from(inner.clone());
        assert_eq!(outer.to_string(), inner.to_string());
    }
}

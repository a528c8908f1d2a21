//! Transport port: the one seam between the agent and the HTTP layer.
//!
//! The agent builds fully-formed [`Request`]s (path, query, body) and hands
//! them to a [`Transport`]; the transport adds the JSON `Accept` and
//! `Content-Type` headers, performs the round trip, and returns the parsed
//! body. Shaping decisions (path escaping, wrapping field filters, request
//! bodies) are made by the agent. The transport only percent-encodes the
//! query string.
//!
//! A [`Connector`] creates the transport. The agent calls it at most once,
//! on first use.

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::{ClientError, TransportError};

/// HTTP methods the engine's API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request to the engine.
///
/// `path` is absolute (it already includes the endpoint's path prefix) and
/// its segments are already escaped. `query` pairs are unescaped; the
/// transport percent-encodes each name and value exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns the first query value registered under `name`.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Issues one request and returns the parsed JSON body.
///
/// An empty body is returned as [`Value::Null`]. Non-success HTTP statuses,
/// network failures and undecodable bodies are [`TransportError`]s.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Value, TransportError>;
}

/// Builds the [`Transport`] for an [`Endpoint`].
pub trait Connector: Send + Sync {
    type Transport: Transport;

    fn connect(&self, endpoint: &Endpoint) -> Result<Self::Transport, TransportError>;
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// The engine's base URL, split into the origin requests go to and the path
/// prefix every request path starts with.
///
/// The prefix has its trailing slash removed once, here, so paths can be
/// built by plain concatenation (`prefix + "/processes"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
    prefix: String,
}

impl Endpoint {
    /// Parses a base URL such as `http://localhost:8080/_ruote/`.
    pub fn parse(base_url: &str) -> Result<Self, ClientError> {
        let url = Url::parse(base_url).map_err(|e| ClientError::Configuration {
            message: format!("invalid base URL '{base_url}': {e}"),
        })?;
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(ClientError::Configuration {
                message: format!("base URL '{base_url}' has no host"),
            });
        }

        let path = url.path();
        let prefix = path.strip_suffix('/').unwrap_or(path).to_string();
        Ok(Self { url, prefix })
    }

    /// The base URL as configured.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Path prefix without trailing slash (empty when the URL has no path).
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Scheme, host and port of the base URL, with path, query and fragment
    /// cleared. Transports resolve [`Request::path`] against this.
    pub fn origin(&self) -> Url {
        let mut origin = self.url.clone();
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);
        origin
    }
}

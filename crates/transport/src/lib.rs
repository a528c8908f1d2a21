//! HTTP transport for the workflow engine client.
//!
//! Implements the [`client::Connector`] and [`client::Transport`] ports over
//! `reqwest`. The [`client::Agent`] decides paths, query values and bodies;
//! this crate only moves them over the wire:
//!
//! - every request carries `Accept: application/json`,
//! - bodies are sent as JSON with `Content-Type: application/json`,
//! - non-success statuses, connection failures, timeouts and non-JSON bodies
//!   become [`client::TransportError`]s,
//! - an empty body is returned as JSON `null`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Connection pooling, TLS and timeouts are reqwest's;
//! nothing here knows about processes or workitems.
//!
//! ```no_run
//! use client::Agent;
//! use transport::{HttpConfig, HttpConnector};
//!
//! # async fn run() -> Result<(), client::ClientError> {
//! let agent = Agent::new("http://localhost:8080/_ruote", HttpConnector::new(HttpConfig::default()))?;
//! for process in agent.processes().await? {
//!     println!("{}", process.wfid());
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod http;

pub use config::HttpConfig;
pub use http::{HttpConnector, HttpTransport};

/// Convenience alias for an agent talking HTTP.
pub type HttpAgent = client::Agent<HttpConnector>;

//! Client for driving a remote workflow engine over HTTP+JSON.
//!
//! Launch processes, list and update the workitems waiting in them, inspect
//! and cancel their expressions, and cancel or kill whole processes, all
//! through one [`Agent`] per engine.
//!
//! ## Architectural Layer
//!
//! **Domain + port definitions.** This crate has no HTTP dependency. It
//! builds requests and judges responses; the [`Transport`] it talks through
//! is supplied by the `transport` crate (or by a test double).
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | `Wfid`, `Expid`, `Fei`, `AgentId` |
//! | [`types`] | `Fields`, `Timestamp` |
//! | [`launch`] | `LaunchItem`, `LaunchSpec`, `DefinitionSource` |
//! | [`entities`] | `Process`, `Workitem`, `Expression` |
//! | [`query`] | `WorkitemQuery` |
//! | [`transport`] | `Transport` / `Connector` ports, `Request`, `Endpoint` |
//! | [`agent`] | `Agent` |
//! | [`errors`] | `ClientError`, `TransportError`, `RetryPolicy` |
//!
//! ## Failure model
//!
//! Every operation returns [`ClientError`] on failure and never retries.
//! [`ClientError::retry_policy`] tells a caller whether trying again can help.
//! The only operations that hide failures are [`Agent::update_workitem_ok`] and
//! [`Agent::proceed_workitem_ok`], which turn any error into `false`.

pub mod agent;
pub mod entities;
pub mod errors;
pub mod identifiers;
pub mod launch;
pub mod query;
pub mod transport;
pub mod types;
mod validate;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use agent::Agent;
pub use entities::{AgentBound, Expression, Process, Workitem};
pub use errors::{ClientError, RetryPolicy, TransportError};
pub use identifiers::{AgentId, Expid, Fei, Wfid};
pub use launch::{DefinitionSource, LaunchItem, LaunchSpec};
pub use query::WorkitemQuery;
pub use transport::{Connector, Endpoint, Method, Request, Transport};
pub use types::{Fields, Timestamp};

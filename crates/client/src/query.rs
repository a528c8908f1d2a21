//! Options for [`crate::Agent::workitems`].

use serde_json::{json, Value};

use crate::{Process, Wfid};

/// Narrows and filters a workitem listing.
///
/// ```
/// use client::WorkitemQuery;
///
/// let query = WorkitemQuery::new()
///     .participants(["alice", "bob"])
///     .field("priority", 5);
/// assert_eq!(query.query_params()[0], ("participant".to_string(), "alice,bob".to_string()));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkitemQuery {
    process: Option<Wfid>,
    wfid: Option<Wfid>,
    participants: Vec<String>,
    fields: Vec<(String, Value)>,
}

impl WorkitemQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the listing to one process. Takes precedence over
    /// [`WorkitemQuery::wfid`].
    pub fn process(mut self, process: &Process) -> Self {
        self.process = Some(process.wfid().clone());
        self
    }

    /// Restricts the listing to one process by id.
    pub fn wfid(mut self, wfid: Wfid) -> Self {
        self.wfid = Some(wfid);
        self
    }

    /// Adds one participant name to filter on.
    pub fn participant(mut self, name: impl Into<String>) -> Self {
        self.participants.push(name.into());
        self
    }

    /// Adds several participant names, keeping their order.
    pub fn participants<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.participants.extend(names.into_iter().map(Into::into));
        self
    }

    /// Filters on a workitem field value.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// The process the listing is narrowed to, if any, and whether a second,
    /// ignored scope was also given.
    pub(crate) fn scope(&self) -> (Option<&Wfid>, bool) {
        match (&self.process, &self.wfid) {
            (Some(process), Some(_)) => (Some(process), true),
            (Some(process), None) => (Some(process), false),
            (None, wfid) => (wfid.as_ref(), false),
        }
    }

    /// Query parameters for the listing request, in insertion order:
    /// `participant` first (names joined with `,`), then one parameter per
    /// field filter.
    ///
    /// Values are unescaped; the transport percent-encodes them exactly once,
    /// so the engine decodes `{"value":5}` back from `%7B%22value%22%3A5%7D`.
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(self.fields.len() + 1);
        if !self.participants.is_empty() {
            params.push(("participant".to_string(), self.participants.join(",")));
        }
        for (name, value) in &self.fields {
            params.push((name.clone(), encode_field_value(value)));
        }
        params
    }
}

/// Strings go through verbatim; anything else is wrapped as
/// `{"value": v}` and JSON-encoded.
pub(crate) fn encode_field_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => json!({ "value": other }).to_string(),
    }
}

//! The [`Agent`]: one handle per engine, translating domain operations into
//! HTTP requests and responses back into entities.
//!
//! ## Request map
//!
//! | Operation | Method | Path | Success shape |
//! |-----------|--------|------|---------------|
//! | [`Agent::launch_process`] | POST | `/processes` | `{launched: wfid}` |
//! | [`Agent::processes`] | GET | `/processes` | `{processes: [...]}` |
//! | [`Agent::find_process`] | GET | `/processes/{wfid}` | `{process: {...}}` |
//! | [`Agent::cancel_process`] | DELETE | `/processes/{wfid}` | not validated |
//! | [`Agent::kill_process`] | DELETE | `/processes/{wfid}?_kill=1` | not validated |
//! | [`Agent::workitems`] | GET | `/workitems[/{wfid}]` | `{workitems: [...]}` |
//! | [`Agent::find_workitem`] | GET | `/workitems/{wfid}/{expid}` | `{workitem: {...}}` |
//! | [`Agent::update_workitem`] | PUT | `/workitems/{wfid}/{expid}` | fields echoed back |
//! | [`Agent::proceed_workitem`] | PUT | `/workitems/{wfid}/{expid}` | fields echoed back |
//! | [`Agent::expressions`] | GET | `/expressions/{wfid}` | `{expressions: [...]}` |
//! | [`Agent::find_expression`] | GET | `/expressions/{wfid}/{expid}` | `{expression: {...}}` |
//! | [`Agent::cancel_expression`] | DELETE | `/expressions/{wfid}/{expid}` | `{status: "ok"}` |
//! | [`Agent::kill_expression`] | DELETE | `/expressions/{wfid}/{expid}?_kill=1` | `{status: "ok"}` |
//!
//! All paths are relative to the endpoint's path prefix.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::validate::{require_array, require_echoed_fields, require_field, require_status_ok};
use crate::{
    AgentBound, AgentId, ClientError, Connector, Endpoint, Expid, Expression, LaunchSpec, Method,
    Process, Request, Transport, Wfid, Workitem, WorkitemQuery,
};

/// Bytes escaped when an id is placed into a path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Client handle bound to one engine base URL.
///
/// The transport is created by the [`Connector`] on the first request and
/// reused for the agent's lifetime. Concurrent first calls race safely: one
/// initialisation wins and every caller gets the same transport.
///
/// Operations take `&self`, so one agent can be shared (e.g. in an `Arc`)
/// across tasks.
pub struct Agent<C: Connector> {
    id: AgentId,
    endpoint: Endpoint,
    connector: C,
    transport: OnceCell<C::Transport>,
}

impl<C: Connector> std::fmt::Debug for Agent<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("url", &self.endpoint.url().as_str())
            .field("connected", &self.transport.initialized())
            .finish()
    }
}

impl<C: Connector> Agent<C> {
    /// Creates an agent for `base_url` (e.g. `http://localhost:8080/_ruote`).
    ///
    /// No connection is made here.
    pub fn new(base_url: &str, connector: C) -> Result<Self, ClientError> {
        Ok(Self {
            id: AgentId::new_random(),
            endpoint: Endpoint::parse(base_url)?,
            connector,
            transport: OnceCell::new(),
        })
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns `true` if `entity` was fetched by this agent.
    pub fn owns(&self, entity: &impl AgentBound) -> bool {
        entity.agent_id() == self.id
    }

    pub(crate) fn ensure_owns(&self, entity: &impl AgentBound) -> Result<(), ClientError> {
        if self.owns(entity) {
            Ok(())
        } else {
            Err(ClientError::ForeignEntity {
                owner: entity.agent_id(),
                agent: self.id,
            })
        }
    }

    // -----------------------------------------------------------------------
    // Processes
    // -----------------------------------------------------------------------

    /// Launches a process and returns it as the engine reports it right after
    /// launch.
    ///
    /// Accepts a ready [`crate::LaunchItem`] or a raw definition/URI plus
    /// fields. An invalid launch item fails with [`ClientError::Validation`]
    /// before any request is sent. Two round trips: the launch itself, then
    /// [`Agent::find_process`] for the new `wfid`.
    #[tracing::instrument(skip_all, fields(agent = %self.id))]
    pub async fn launch_process(&self, spec: impl Into<LaunchSpec>) -> Result<Process, ClientError> {
        let item = spec.into().into_launch_item();
        item.validate()?;

        let body = serde_json::to_value(&item)
            .map_err(|e| ClientError::Validation { reason: e.to_string() })?;
        let request = Request::new(Method::Post, self.path(&["processes"])).with_body(body);
        let response = self.send(request).await?;

        let launched = require_field(&response, "launched", "launch_process")?;
        let wfid: Wfid = crate::validate::decode(launched, "launch_process")?;
        debug!(%wfid, "process launched");

        self.find_process(&wfid).await
    }

    /// Lists processes in the order the engine returns them.
    #[tracing::instrument(skip_all, fields(agent = %self.id))]
    pub async fn processes(&self) -> Result<Vec<Process>, ClientError> {
        let response = self
            .send(Request::new(Method::Get, self.path(&["processes"])))
            .await?;

        require_array(&response, "processes", "processes")?
            .iter()
            .map(|p| Process::decode(p, self.id, "processes"))
            .collect()
    }

    #[tracing::instrument(skip(self), fields(agent = %self.id))]
    pub async fn find_process(&self, wfid: &Wfid) -> Result<Process, ClientError> {
        let response = self
            .send(Request::new(Method::Get, self.path(&["processes", wfid.as_str()])))
            .await?;

        let process = require_field(&response, "process", "find_process")?;
        Process::decode(process, self.id, "find_process")
    }

    /// Asks the engine to cancel a process.
    ///
    /// The response is returned as-is, without validation; only transport
    /// failures are reported as errors.
    #[tracing::instrument(skip(self), fields(agent = %self.id))]
    pub async fn cancel_process(&self, wfid: &Wfid) -> Result<Value, ClientError> {
        self.delete_process(wfid, false).await
    }

    /// Asks the engine to kill a process. Like [`Agent::cancel_process`], the
    /// response is not validated.
    #[tracing::instrument(skip(self), fields(agent = %self.id))]
    pub async fn kill_process(&self, wfid: &Wfid) -> Result<Value, ClientError> {
        self.delete_process(wfid, true).await
    }

    async fn delete_process(&self, wfid: &Wfid, kill: bool) -> Result<Value, ClientError> {
        let mut request = Request::new(Method::Delete, self.path(&["processes", wfid.as_str()]));
        if kill {
            request = request.with_query("_kill", "1");
        }
        let response = self.send(request).await?;
        // Process deletion has no success shape to check against.
        debug!(kill, "process delete sent; response not validated");
        Ok(response)
    }

    // -----------------------------------------------------------------------
    // Workitems
    // -----------------------------------------------------------------------

    /// Lists workitems, optionally narrowed to one process and filtered by
    /// participant and field values.
    #[tracing::instrument(skip_all, fields(agent = %self.id))]
    pub async fn workitems(&self, query: &WorkitemQuery) -> Result<Vec<Workitem>, ClientError> {
        let (scope, shadowed) = query.scope();
        if shadowed {
            warn!(wfid = ?scope, "workitem query names both a process and a wfid; using the process");
        }

        let path = match scope {
            Some(wfid) => self.path(&["workitems", wfid.as_str()]),
            None => self.path(&["workitems"]),
        };
        let mut request = Request::new(Method::Get, path);
        request.query = query.query_params();

        let response = self.send(request).await?;
        require_array(&response, "workitems", "workitems")?
            .iter()
            .map(|w| Workitem::decode(w, self.id, "workitems"))
            .collect()
    }

    #[tracing::instrument(skip(self), fields(agent = %self.id))]
    pub async fn find_workitem(&self, wfid: &Wfid, expid: &Expid) -> Result<Workitem, ClientError> {
        let path = self.path(&["workitems", wfid.as_str(), expid.as_str()]);
        let response = self.send(Request::new(Method::Get, path)).await?;

        let workitem = require_field(&response, "workitem", "find_workitem")?;
        Workitem::decode(workitem, self.id, "find_workitem")
    }

    /// Saves the workitem's fields on the engine.
    ///
    /// Succeeds only if the engine echoes back exactly the fields sent;
    /// anything else is [`ClientError::Conflict`].
    #[tracing::instrument(skip_all, fields(agent = %self.id, fei = %workitem.fei()))]
    pub async fn update_workitem(&self, workitem: &Workitem) -> Result<(), ClientError> {
        self.put_workitem(workitem, false).await
    }

    /// [`Agent::update_workitem`], reporting only whether it worked.
    ///
    /// Every failure, including transport failures, becomes `false`. Use the
    /// strict form to find out why an update failed.
    pub async fn update_workitem_ok(&self, workitem: &Workitem) -> bool {
        flatten_to_bool(self.update_workitem(workitem).await, "update_workitem")
    }

    /// Saves the workitem's fields and tells the engine to move the process
    /// past this step. Same success rule as [`Agent::update_workitem`].
    #[tracing::instrument(skip_all, fields(agent = %self.id, fei = %workitem.fei()))]
    pub async fn proceed_workitem(&self, workitem: &Workitem) -> Result<(), ClientError> {
        self.put_workitem(workitem, true).await
    }

    /// [`Agent::proceed_workitem`], reporting only whether it worked.
    pub async fn proceed_workitem_ok(&self, workitem: &Workitem) -> bool {
        flatten_to_bool(self.proceed_workitem(workitem).await, "proceed_workitem")
    }

    async fn put_workitem(&self, workitem: &Workitem, proceed: bool) -> Result<(), ClientError> {
        let mut body = json!({ "fields": workitem.fields() });
        if proceed {
            body["_proceed"] = json!("1");
        }

        let path = self.path(&["workitems", workitem.wfid().as_str(), workitem.expid().as_str()]);
        let response = self
            .send(Request::new(Method::Put, path).with_body(body))
            .await?;

        require_echoed_fields(&response, workitem.fields(), workitem.fei()).inspect_err(|_| {
            warn!(proceed, "engine did not echo the fields sent");
        })
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    /// Lists the expressions of a process.
    #[tracing::instrument(skip_all, fields(agent = %self.id, wfid = %process.wfid()))]
    pub async fn expressions(&self, process: &Process) -> Result<Vec<Expression>, ClientError> {
        let path = self.path(&["expressions", process.wfid().as_str()]);
        let response = self.send(Request::new(Method::Get, path)).await?;

        require_array(&response, "expressions", "expressions")?
            .iter()
            .map(|e| Expression::decode(e, self.id, "expressions"))
            .collect()
    }

    #[tracing::instrument(skip(self), fields(agent = %self.id))]
    pub async fn find_expression(&self, wfid: &Wfid, expid: &Expid) -> Result<Expression, ClientError> {
        let path = self.path(&["expressions", wfid.as_str(), expid.as_str()]);
        let response = self.send(Request::new(Method::Get, path)).await?;

        let expression = require_field(&response, "expression", "find_expression")?;
        Expression::decode(expression, self.id, "find_expression")
    }

    /// Cancels one expression. Requires `{"status": "ok"}` in the response.
    #[tracing::instrument(skip_all, fields(agent = %self.id, fei = %expression.fei()))]
    pub async fn cancel_expression(&self, expression: &Expression) -> Result<(), ClientError> {
        self.delete_expression(expression, false, "cancel_expression").await
    }

    /// Kills one expression. Requires `{"status": "ok"}` in the response.
    #[tracing::instrument(skip_all, fields(agent = %self.id, fei = %expression.fei()))]
    pub async fn kill_expression(&self, expression: &Expression) -> Result<(), ClientError> {
        self.delete_expression(expression, true, "kill_expression").await
    }

    async fn delete_expression(
        &self,
        expression: &Expression,
        kill: bool,
        operation: &'static str,
    ) -> Result<(), ClientError> {
        let path = self.path(&["expressions", expression.wfid().as_str(), expression.expid().as_str()]);
        let mut request = Request::new(Method::Delete, path);
        if kill {
            request = request.with_query("_kill", "1");
        }

        let response = self.send(request).await?;
        require_status_ok(&response, operation)
    }

    // -----------------------------------------------------------------------
    // Plumbing
    // -----------------------------------------------------------------------

    fn path(&self, segments: &[&str]) -> String {
        let mut path = self.endpoint.prefix().to_string();
        for segment in segments {
            path.push('/');
            path.extend(utf8_percent_encode(segment, PATH_SEGMENT));
        }
        path
    }

    async fn transport(&self) -> Result<&C::Transport, ClientError> {
        let transport = self
            .transport
            .get_or_try_init(|| async {
                debug!(agent = %self.id, url = %self.endpoint.url(), "connecting transport");
                self.connector.connect(&self.endpoint)
            })
            .await?;
        Ok(transport)
    }

    async fn send(&self, request: Request) -> Result<Value, ClientError> {
        let method = request.method;
        let transport = self.transport().await?;
        transport.send(request).await.map_err(|e| {
            debug!(%method, error = %e, "transport failure");
            ClientError::from(e)
        })
    }
}

fn flatten_to_bool(result: Result<(), ClientError>, operation: &'static str) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            debug!(operation, kind = e.kind(), error = %e, "reporting failure as false");
            false
        }
    }
}

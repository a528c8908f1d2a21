//! Entities fetched from the engine: processes, workitems and expressions.
//!
//! Each entity is a snapshot of what the server reported when it was fetched.
//! Nothing here is updated when the server-side object changes; fetch again to
//! see the new state.
//!
//! Every entity remembers the [`AgentId`] of the agent that fetched it. The
//! convenience methods (`cancel`, `update`, `refresh`, ...) take that agent by
//! reference and refuse to run against any other one.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    Agent, AgentId, ClientError, Connector, Expid, Fei, Fields, Timestamp, Wfid, WorkitemQuery,
};

/// Implemented by every entity an [`Agent`] hands out.
pub trait AgentBound {
    /// The agent that fetched this entity.
    fn agent_id(&self) -> AgentId;
}

// ---------------------------------------------------------------------------
// Process
// ---------------------------------------------------------------------------

/// One process instance as the engine last reported it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Process {
    #[serde(skip)]
    agent: AgentId,
    wfid: Wfid,
    #[serde(skip_serializing_if = "Option::is_none")]
    definition_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    definition_revision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    launched_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_active: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<Fields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<Fields>,
    #[serde(flatten)]
    extra: Fields,
}

#[derive(Deserialize)]
struct ProcessRepr {
    wfid: Wfid,
    #[serde(default)]
    definition_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    definition_revision: Option<String>,
    #[serde(default)]
    launched_time: Option<String>,
    #[serde(default)]
    last_active: Option<String>,
    #[serde(default)]
    variables: Option<Fields>,
    #[serde(default)]
    tags: Option<Fields>,
    #[serde(flatten)]
    extra: Fields,
}

impl Process {
    pub(crate) fn decode(value: &Value, agent: AgentId, operation: &'static str) -> Result<Self, ClientError> {
        let repr: ProcessRepr = crate::validate::decode(value, operation)?;
        Ok(Self {
            agent,
            wfid: repr.wfid,
            definition_name: repr.definition_name,
            definition_revision: repr.definition_revision,
            launched_time: repr.launched_time,
            last_active: repr.last_active,
            variables: repr.variables,
            tags: repr.tags,
            extra: repr.extra,
        })
    }

    pub fn wfid(&self) -> &Wfid {
        &self.wfid
    }

    pub fn definition_name(&self) -> Option<&str> {
        self.definition_name.as_deref()
    }

    pub fn definition_revision(&self) -> Option<&str> {
        self.definition_revision.as_deref()
    }

    /// When the process was launched, if the engine reported a parseable time.
    pub fn launched_at(&self) -> Option<Timestamp> {
        self.launched_time.as_deref().and_then(Timestamp::parse)
    }

    /// When the process last did something, if reported.
    pub fn last_active_at(&self) -> Option<Timestamp> {
        self.last_active.as_deref().and_then(Timestamp::parse)
    }

    pub fn variables(&self) -> Option<&Fields> {
        self.variables.as_ref()
    }

    pub fn tags(&self) -> Option<&Fields> {
        self.tags.as_ref()
    }

    /// Keys the engine sent that have no dedicated accessor.
    pub fn extra(&self) -> &Fields {
        &self.extra
    }

    /// Fetches the current state of this process.
    pub async fn refresh<C: Connector>(&self, agent: &Agent<C>) -> Result<Process, ClientError> {
        agent.ensure_owns(self)?;
        agent.find_process(&self.wfid).await
    }

    /// Lists the workitems currently waiting in this process.
    pub async fn workitems<C: Connector>(&self, agent: &Agent<C>) -> Result<Vec<Workitem>, ClientError> {
        agent.ensure_owns(self)?;
        agent.workitems(&WorkitemQuery::new().process(self)).await
    }

    /// Lists the expressions of this process.
    pub async fn expressions<C: Connector>(
        &self,
        agent: &Agent<C>,
    ) -> Result<Vec<Expression>, ClientError> {
        agent.ensure_owns(self)?;
        agent.expressions(self).await
    }

    /// Requests graceful termination. Returns the server's raw response.
    pub async fn cancel<C: Connector>(&self, agent: &Agent<C>) -> Result<Value, ClientError> {
        agent.ensure_owns(self)?;
        agent.cancel_process(&self.wfid).await
    }

    /// Requests immediate termination. Returns the server's raw response.
    pub async fn kill<C: Connector>(&self, agent: &Agent<C>) -> Result<Value, ClientError> {
        agent.ensure_owns(self)?;
        agent.kill_process(&self.wfid).await
    }
}

impl AgentBound for Process {
    fn agent_id(&self) -> AgentId {
        self.agent
    }
}

// ---------------------------------------------------------------------------
// Workitem
// ---------------------------------------------------------------------------

/// Application data attached to one waiting step of a process.
///
/// Edit the fields locally with [`Workitem::fields_mut`] or
/// [`Workitem::set_field`], then push them with [`Agent::update_workitem`] or
/// [`Agent::proceed_workitem`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workitem {
    #[serde(skip)]
    agent: AgentId,
    fei: Fei,
    fields: Fields,
    #[serde(skip_serializing_if = "Option::is_none")]
    participant_name: Option<String>,
    #[serde(flatten)]
    extra: Fields,
}

#[derive(Deserialize)]
struct WorkitemRepr {
    fei: Fei,
    #[serde(default, deserialize_with = "null_as_empty")]
    fields: Fields,
    #[serde(default)]
    participant_name: Option<String>,
    #[serde(flatten)]
    extra: Fields,
}

impl Workitem {
    pub(crate) fn decode(value: &Value, agent: AgentId, operation: &'static str) -> Result<Self, ClientError> {
        let repr: WorkitemRepr = crate::validate::decode(value, operation)?;
        Ok(Self {
            agent,
            fei: repr.fei,
            fields: repr.fields,
            participant_name: repr.participant_name,
            extra: repr.extra,
        })
    }

    pub fn fei(&self) -> &Fei {
        &self.fei
    }

    pub fn wfid(&self) -> &Wfid {
        &self.fei.wfid
    }

    pub fn expid(&self) -> &Expid {
        &self.fei.expid
    }

    pub fn participant_name(&self) -> Option<&str> {
        self.participant_name.as_deref()
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Sets one field locally, returning the previous value.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn extra(&self) -> &Fields {
        &self.extra
    }

    /// Fetches the current state of this workitem.
    pub async fn refresh<C: Connector>(&self, agent: &Agent<C>) -> Result<Workitem, ClientError> {
        agent.ensure_owns(self)?;
        agent.find_workitem(self.wfid(), self.expid()).await
    }

    /// Pushes the local fields to the engine. See [`Agent::update_workitem`].
    pub async fn update<C: Connector>(&self, agent: &Agent<C>) -> Result<(), ClientError> {
        agent.ensure_owns(self)?;
        agent.update_workitem(self).await
    }

    /// Pushes the local fields and lets the process move on.
    /// See [`Agent::proceed_workitem`].
    pub async fn proceed<C: Connector>(&self, agent: &Agent<C>) -> Result<(), ClientError> {
        agent.ensure_owns(self)?;
        agent.proceed_workitem(self).await
    }

    /// Fetches the process this workitem belongs to.
    pub async fn process<C: Connector>(&self, agent: &Agent<C>) -> Result<Process, ClientError> {
        agent.ensure_owns(self)?;
        agent.find_process(self.wfid()).await
    }
}

impl AgentBound for Workitem {
    fn agent_id(&self) -> AgentId {
        self.agent
    }
}

// ---------------------------------------------------------------------------
// Expression
// ---------------------------------------------------------------------------

/// One node of a process's execution tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expression {
    #[serde(skip)]
    agent: AgentId,
    fei: Fei,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<Fei>,
    #[serde(flatten)]
    extra: Fields,
}

#[derive(Deserialize)]
struct ExpressionRepr {
    fei: Fei,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    parent_id: Option<Fei>,
    #[serde(flatten)]
    extra: Fields,
}

impl Expression {
    pub(crate) fn decode(value: &Value, agent: AgentId, operation: &'static str) -> Result<Self, ClientError> {
        let repr: ExpressionRepr = crate::validate::decode(value, operation)?;
        Ok(Self {
            agent,
            fei: repr.fei,
            name: repr.name,
            class: repr.class,
            parent_id: repr.parent_id,
            extra: repr.extra,
        })
    }

    pub fn fei(&self) -> &Fei {
        &self.fei
    }

    pub fn wfid(&self) -> &Wfid {
        &self.fei.wfid
    }

    pub fn expid(&self) -> &Expid {
        &self.fei.expid
    }

    /// Expression name in the definition (`"sequence"`, `"participant"`, ...).
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Engine-side implementation class.
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// The parent node; `None` for the root expression.
    pub fn parent(&self) -> Option<&Fei> {
        self.parent_id.as_ref()
    }

    pub fn extra(&self) -> &Fields {
        &self.extra
    }

    pub async fn refresh<C: Connector>(&self, agent: &Agent<C>) -> Result<Expression, ClientError> {
        agent.ensure_owns(self)?;
        agent.find_expression(self.wfid(), self.expid()).await
    }

    pub async fn cancel<C: Connector>(&self, agent: &Agent<C>) -> Result<(), ClientError> {
        agent.ensure_owns(self)?;
        agent.cancel_expression(self).await
    }

    pub async fn kill<C: Connector>(&self, agent: &Agent<C>) -> Result<(), ClientError> {
        agent.ensure_owns(self)?;
        agent.kill_expression(self).await
    }

    pub async fn process<C: Connector>(&self, agent: &Agent<C>) -> Result<Process, ClientError> {
        agent.ensure_owns(self)?;
        agent.find_process(self.wfid()).await
    }
}

impl AgentBound for Expression {
    fn agent_id(&self) -> AgentId {
        self.agent
    }
}

// ---------------------------------------------------------------------------
// Serde helpers
// ---------------------------------------------------------------------------

fn null_as_empty<'de, D>(deserializer: D) -> Result<Fields, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Fields>::deserialize(deserializer)?.unwrap_or_default())
}

// Revisions come back as strings or bare numbers depending on the definition.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

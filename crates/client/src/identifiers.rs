//! Newtype identifiers for the workflow engine's addressable things.
//!
//! A process instance is addressed by its [`Wfid`]; a single step inside it by
//! the pair ([`Wfid`], [`Expid`]), which the engine ships as a [`Fei`]. Keeping
//! them as distinct newtypes prevents passing an expression id where a process
//! id is expected even though both are strings on the wire.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display, and the
// String conversions serde uses so an empty id never decodes.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value).ok_or_else(|| concat!(stringify!($name), " must not be empty").to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

string_id! {
    /// Workflow instance id: identifies one launched process on the engine.
    ///
    /// Unique per process instance for as long as the instance lives.
    Wfid
}

string_id! {
    /// Expression id: identifies one node of a process's execution tree
    /// (e.g. `"0_0_1"`). Only meaningful together with a [`Wfid`].
    Expid
}

// ---------------------------------------------------------------------------
// Flow expression id
// ---------------------------------------------------------------------------

/// Flow-expression-id: the compound key addressing one step of a process.
///
/// `engine_id` and `subid` are carried through untouched when the engine
/// supplies them; the client only ever routes on `wfid` and `expid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fei {
    pub wfid: Wfid,
    pub expid: Expid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subid: Option<String>,
}

impl Fei {
    pub fn new(wfid: Wfid, expid: Expid) -> Self {
        Self {
            wfid,
            expid,
            engine_id: None,
            subid: None,
        }
    }
}

impl std::fmt::Display for Fei {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.wfid, self.expid)
    }
}

// ---------------------------------------------------------------------------
// Agent identity
// ---------------------------------------------------------------------------

/// Identifies one [`crate::Agent`] instance.
///
/// Generated fresh for every agent. Entities store this instead of a reference
/// to the agent, so an entity never keeps its agent alive and the two can be
/// moved and sent independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(Uuid);

impl AgentId {
    /// Generates a new random agent identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ids_are_rejected() {
        assert!(Wfid::new("").is_none());
        assert!(Expid::new(String::new()).is_none());
        assert_eq!(Wfid::new("20100101-bakuyoka").unwrap().as_str(), "20100101-bakuyoka");
    }

    #[test]
    fn fei_decodes_with_optional_parts_missing() {
        let fei: Fei = serde_json::from_value(serde_json::json!({
            "wfid": "20100101-bakuyoka",
            "expid": "0_0_1"
        }))
        .unwrap();

        assert_eq!(fei.wfid.as_str(), "20100101-bakuyoka");
        assert_eq!(fei.expid.as_str(), "0_0_1");
        assert!(fei.engine_id.is_none());
        assert_eq!(fei.to_string(), "20100101-bakuyoka/0_0_1");
    }

    #[test]
    fn fei_keeps_engine_id_and_subid() {
        let value = serde_json::json!({
            "engine_id": "engine",
            "wfid": "w",
            "subid": "abc",
            "expid": "0"
        });
        let fei: Fei = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(serde_json::to_value(&fei).unwrap(), value);
    }

    #[test]
    fn empty_wfid_does_not_decode() {
        let decoded: Result<Wfid, _> = serde_json::from_value(serde_json::json!(""));
        assert!(decoded.is_err());
    }

    #[test]
    fn agent_ids_are_distinct() {
        assert_ne!(AgentId::new_random(), AgentId::new_random());
    }
}

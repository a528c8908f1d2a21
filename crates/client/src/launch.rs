//! Launch items: what to start on the engine, and with which initial data.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use url::Url;

use crate::{ClientError, Fields};

/// URL schemes recognised by [`LaunchItem::from_raw`] as a definition reference.
const DEFINITION_URI_SCHEMES: &[&str] = &["http", "https", "file"];

/// Where the process definition comes from.
///
/// Exactly one source per launch item, so a definition can never be both
/// inline and referenced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionSource {
    /// The definition text itself (Ruby DSL, XML or JSON tree).
    Inline(String),
    /// A URI the engine fetches the definition from.
    Uri(String),
}

impl DefinitionSource {
    fn as_str(&self) -> &str {
        match self {
            DefinitionSource::Inline(s) | DefinitionSource::Uri(s) => s,
        }
    }
}

/// The payload describing which definition to launch and its initial fields.
///
/// Build one with the `with_*` methods, or let [`LaunchItem::from_raw`] decide
/// whether a string is a definition or a URI. [`crate::Agent::launch_process`]
/// refuses items for which [`LaunchItem::validate`] fails.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchItem {
    definition: Option<DefinitionSource>,
    fields: Fields,
    variables: Fields,
}

impl LaunchItem {
    /// An empty launch item. Not valid until a definition is set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a launch item from a string that is either a definition or a
    /// URI, plus initial fields.
    ///
    /// The string is treated as a URI when it parses as an absolute
    /// `http`, `https` or `file` URL, and as an inline definition otherwise.
    pub fn from_raw(definition_or_uri: impl Into<String>, fields: Fields) -> Self {
        let raw = definition_or_uri.into();
        let is_uri = Url::parse(raw.trim())
            .map(|url| DEFINITION_URI_SCHEMES.contains(&url.scheme()))
            .unwrap_or(false);

        let item = if is_uri {
            Self::new().with_definition_uri(raw)
        } else {
            Self::new().with_definition(raw)
        };
        item.with_fields(fields)
    }

    /// Sets an inline definition, replacing any previous source.
    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(DefinitionSource::Inline(definition.into()));
        self
    }

    /// Sets a definition URI, replacing any previous source.
    pub fn with_definition_uri(mut self, uri: impl Into<String>) -> Self {
        self.definition = Some(DefinitionSource::Uri(uri.into()));
        self
    }

    /// Adds or replaces one initial field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Merges a set of initial fields, later values winning.
    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Adds or replaces one initial process variable.
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn definition(&self) -> Option<&DefinitionSource> {
        self.definition.as_ref()
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn variables(&self) -> &Fields {
        &self.variables
    }

    /// Checks that this item names a usable definition.
    ///
    /// Valid iff it carries a non-blank inline definition or a URI that
    /// parses as an absolute URL.
    pub fn validate(&self) -> Result<(), ClientError> {
        let reason = match &self.definition {
            None => "no definition or definition URI",
            Some(DefinitionSource::Inline(text)) if text.trim().is_empty() => "definition is empty",
            Some(DefinitionSource::Inline(_)) => return Ok(()),
            Some(DefinitionSource::Uri(uri)) => match Url::parse(uri.trim()) {
                Ok(_) => return Ok(()),
                Err(_) => "definition URI does not resolve",
            },
        };
        Err(ClientError::Validation {
            reason: reason.to_string(),
        })
    }

    /// Returns `true` when [`LaunchItem::validate`] succeeds.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl Serialize for LaunchItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(definition) = &self.definition {
            map.serialize_entry("definition", definition.as_str())?;
        }
        map.serialize_entry("fields", &self.fields)?;
        if !self.variables.is_empty() {
            map.serialize_entry("variables", &self.variables)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Launch argument
// ---------------------------------------------------------------------------

/// Argument accepted by [`crate::Agent::launch_process`]: a ready launch item,
/// or a raw definition/URI string plus initial fields.
#[derive(Debug, Clone, PartialEq)]
pub enum LaunchSpec {
    Item(LaunchItem),
    Raw { definition: String, fields: Fields },
}

impl LaunchSpec {
    pub fn raw(definition: impl Into<String>, fields: Fields) -> Self {
        LaunchSpec::Raw {
            definition: definition.into(),
            fields,
        }
    }

    /// Resolves the argument into the launch item that will be posted.
    pub fn into_launch_item(self) -> LaunchItem {
        match self {
            LaunchSpec::Item(item) => item,
            LaunchSpec::Raw { definition, fields } => LaunchItem::from_raw(definition, fields),
        }
    }
}

impl From<LaunchItem> for LaunchSpec {
    fn from(item: LaunchItem) -> Self {
        LaunchSpec::Item(item)
    }
}

impl From<&str> for LaunchSpec {
    fn from(definition: &str) -> Self {
        LaunchSpec::raw(definition, Fields::new())
    }
}

impl From<String> for LaunchSpec {
    fn from(definition: String) -> Self {
        LaunchSpec::raw(definition, Fields::new())
    }
}

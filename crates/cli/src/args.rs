//! Command-line surface.

use clap::{Parser, Subcommand};
use client::{Expid, Wfid};
use serde_json::Value;

use crate::observability::LogFormat;

#[derive(Debug, Parser)]
#[command(name = "ruote", version, about = "Drive a ruote-kit workflow engine over HTTP")]
pub struct Cli {
    /// Base URL of the engine, e.g. http://localhost:8080/_ruote
    #[arg(long, env = "RUOTE_URL")]
    pub url: String,

    /// Whole-request timeout in seconds.
    #[arg(long, env = "RUOTE_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    #[arg(long, env = "RUOTE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch a process from an inline definition or a definition URI.
    Launch {
        definition: String,
        /// Initial field as name=value; the value is parsed as JSON when possible.
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, Value)>,
    },
    /// List processes.
    Processes,
    /// Show one process.
    Process {
        #[arg(value_parser = parse_wfid)]
        wfid: Wfid,
    },
    /// Cancel a process.
    Cancel {
        #[arg(value_parser = parse_wfid)]
        wfid: Wfid,
    },
    /// Kill a process.
    Kill {
        #[arg(value_parser = parse_wfid)]
        wfid: Wfid,
    },
    /// List workitems.
    Workitems {
        /// Only workitems of this process.
        #[arg(long, value_parser = parse_wfid)]
        wfid: Option<Wfid>,
        /// Only workitems for this participant (repeatable).
        #[arg(long = "participant")]
        participants: Vec<String>,
        /// Only workitems whose field matches, as name=value (repeatable).
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, Value)>,
    },
    /// Show one workitem.
    Workitem {
        #[arg(value_parser = parse_wfid)]
        wfid: Wfid,
        #[arg(value_parser = parse_expid)]
        expid: Expid,
    },
    /// Set fields on a workitem, optionally letting the process move on.
    Update {
        #[arg(value_parser = parse_wfid)]
        wfid: Wfid,
        #[arg(value_parser = parse_expid)]
        expid: Expid,
        #[arg(long = "field", value_parser = parse_field, required = true)]
        fields: Vec<(String, Value)>,
        /// Proceed past this step after saving.
        #[arg(long)]
        proceed: bool,
    },
    /// List the expressions of a process.
    Expressions {
        #[arg(value_parser = parse_wfid)]
        wfid: Wfid,
    },
    /// Show one expression.
    Expression {
        #[arg(value_parser = parse_wfid)]
        wfid: Wfid,
        #[arg(value_parser = parse_expid)]
        expid: Expid,
    },
    /// Cancel (or with --kill, kill) one expression.
    CancelExpression {
        #[arg(value_parser = parse_wfid)]
        wfid: Wfid,
        #[arg(value_parser = parse_expid)]
        expid: Expid,
        #[arg(long)]
        kill: bool,
    },
}

fn parse_wfid(raw: &str) -> Result<Wfid, String> {
    Wfid::new(raw).ok_or_else(|| "wfid must not be empty".to_string())
}

fn parse_expid(raw: &str) -> Result<Expid, String> {
    Expid::new(raw).ok_or_else(|| "expid must not be empty".to_string())
}

/// `name=value`; `value` is JSON if it parses as JSON, a string otherwise.
pub(crate) fn parse_field(raw: &str) -> Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    if name.is_empty() {
        return Err(format!("field name missing in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn field_values_parse_as_json_or_fall_back_to_string() {
        assert_eq!(parse_field("priority=5").unwrap(), ("priority".into(), json!(5)));
        assert_eq!(parse_field("ok=true").unwrap(), ("ok".into(), json!(true)));
        assert_eq!(parse_field("team=ops").unwrap(), ("team".into(), json!("ops")));
        assert_eq!(parse_field("note=a=b").unwrap(), ("note".into(), json!("a=b")));
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=5").is_err());
    }

    #[test]
    fn workitems_accepts_repeated_filters() {
        let cli = Cli::try_parse_from([
            "ruote",
            "--url",
            "http://localhost:8080/_ruote",
            "workitems",
            "--participant",
            "alice",
            "--participant",
            "bob",
            "--field",
            "priority=5",
        ])
        .unwrap();

        match cli.command {
            Command::Workitems {
                wfid,
                participants,
                fields,
            } => {
                assert!(wfid.is_none());
                assert_eq!(participants, ["alice", "bob"]);
                assert_eq!(fields, vec![("priority".to_string(), json!(5))]);
            }
            other => panic!("parsed as {other:?}"),
        }
    }

    #[test]
    fn update_requires_a_field() {
        let parsed = Cli::try_parse_from([
            "ruote",
            "--url",
            "http://localhost:8080",
            "update",
            "w1",
            "0_0",
        ]);
        assert!(parsed.is_err());
    }
}

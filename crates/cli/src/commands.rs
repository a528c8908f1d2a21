//! Subcommand dispatch: one agent operation per command, result printed as
//! pretty JSON on stdout.

use std::time::Duration;

use anyhow::Context;
use client::{Fields, LaunchSpec, WorkitemQuery};
use serde::Serialize;
use serde_json::json;
use transport::{HttpAgent, HttpConfig, HttpConnector};

use crate::args::{Cli, Command};

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = HttpConfig::default();
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    let agent = HttpAgent::new(&cli.url, HttpConnector::new(config))
        .with_context(|| format!("Cannot use engine URL '{}'", cli.url))?;
    tracing::debug!(agent = %agent.id(), url = %cli.url, "agent ready");

    match cli.command {
        Command::Launch { definition, fields } => {
            let spec = LaunchSpec::raw(definition, to_fields(fields));
            let process = agent.launch_process(spec).await.context("Launch failed")?;
            print_json(&process)
        }
        Command::Processes => {
            let processes = agent.processes().await.context("Listing processes failed")?;
            print_json(&processes)
        }
        Command::Process { wfid } => {
            let process = agent.find_process(&wfid).await.context("Fetching process failed")?;
            print_json(&process)
        }
        Command::Cancel { wfid } => {
            let response = agent.cancel_process(&wfid).await.context("Cancel failed")?;
            print_json(&response)
        }
        Command::Kill { wfid } => {
            let response = agent.kill_process(&wfid).await.context("Kill failed")?;
            print_json(&response)
        }
        Command::Workitems {
            wfid,
            participants,
            fields,
        } => {
            let mut query = WorkitemQuery::new().participants(participants);
            if let Some(wfid) = wfid {
                query = query.wfid(wfid);
            }
            for (name, value) in fields {
                query = query.field(name, value);
            }
            let workitems = agent.workitems(&query).await.context("Listing workitems failed")?;
            print_json(&workitems)
        }
        Command::Workitem { wfid, expid } => {
            let workitem = agent
                .find_workitem(&wfid, &expid)
                .await
                .context("Fetching workitem failed")?;
            print_json(&workitem)
        }
        Command::Update {
            wfid,
            expid,
            fields,
            proceed,
        } => {
            let mut workitem = agent
                .find_workitem(&wfid, &expid)
                .await
                .context("Fetching workitem failed")?;
            workitem.fields_mut().extend(fields);
            if proceed {
                agent.proceed_workitem(&workitem).await.context("Proceed failed")?;
            } else {
                agent.update_workitem(&workitem).await.context("Update failed")?;
            }
            print_json(&json!({ "fei": workitem.fei(), "proceeded": proceed, "fields": workitem.fields() }))
        }
        Command::Expressions { wfid } => {
            let process = agent.find_process(&wfid).await.context("Fetching process failed")?;
            let expressions = agent
                .expressions(&process)
                .await
                .context("Listing expressions failed")?;
            print_json(&expressions)
        }
        Command::Expression { wfid, expid } => {
            let expression = agent
                .find_expression(&wfid, &expid)
                .await
                .context("Fetching expression failed")?;
            print_json(&expression)
        }
        Command::CancelExpression { wfid, expid, kill } => {
            let expression = agent
                .find_expression(&wfid, &expid)
                .await
                .context("Fetching expression failed")?;
            if kill {
                agent.kill_expression(&expression).await.context("Kill failed")?;
            } else {
                agent.cancel_expression(&expression).await.context("Cancel failed")?;
            }
            print_json(&json!({ "fei": expression.fei(), "killed": kill }))
        }
    }
}

fn to_fields(pairs: Vec<(String, serde_json::Value)>) -> Fields {
    pairs.into_iter().collect()
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{rendered}");
    Ok(())
}

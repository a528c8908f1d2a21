//! `ruote` command-line client.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: engine URL, timeout and log format from flags
//!    or `RUOTE_*` environment variables.
//! 2. **Wire observability**: `tracing-subscriber` with an env filter and a
//!    pretty or JSON layer on stderr, plus an OpenTelemetry OTLP exporter when
//!    `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
//! 3. **Construct infrastructure**: an [`transport::HttpConnector`] injected
//!    into a [`client::Agent`].
//! 4. **Dispatch**: run the one agent operation the subcommand names and
//!    print its result as JSON on stdout.

use std::process::ExitCode;

use clap::Parser;

mod args;
mod commands;
mod observability;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = args::Cli::parse();

    let telemetry = match observability::init(cli.log_format) {
        Ok(telemetry) => telemetry,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = commands::run(cli).await;
    telemetry.shutdown();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

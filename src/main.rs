use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use perfdata_graphite::PerfdataSource;
use perfdata_graphs::output::{write_report, write_response};
use perfdata_graphs::{load_settings, Args, Command};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries only the response.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let settings = load_settings(args.config.as_deref())?;
    debug!(
        api_url = %settings.api_url,
        render_format = %settings.render_format,
        timeout_secs = settings.api_timeout,
        "loaded settings"
    );
    let source = PerfdataSource::new(settings);

    match args.command {
        Command::Fetch(fetch) => {
            let response = source.fetch_data(&fetch.to_request()).await;
            write_response(&mut io::stdout().lock(), &response, fetch.pretty)?;
            Ok(if response.is_ok() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Status => {
            let report = source.status().await;
            write_report(&mut io::stdout().lock(), source.name(), &report)?;
            Ok(if report.ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

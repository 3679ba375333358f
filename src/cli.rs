//! Command line arguments.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use perfdata_graphite::PerfdataRequest;

#[derive(Parser, Debug)]
#[command(name = "perfdata-graphs")]
#[command(about = "Chart-ready Icinga performance data from a Graphite backend")]
pub struct Args {
    /// Path to a TOML config file with the Graphite settings
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (e.g. "debug", "perfdata_graphite=trace")
    #[arg(long, global = true, default_value = "warn")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch the datasets of one host or service and print them as JSON
    Fetch(FetchArgs),
    /// Check that the configured backend is reachable
    Status,
}

#[derive(ClapArgs, Debug)]
pub struct FetchArgs {
    /// Host name
    #[arg(long)]
    pub host: String,

    /// Service name; omit to chart the host check
    #[arg(long)]
    pub service: Option<String>,

    /// Check command of the host or service
    #[arg(long = "check-command")]
    pub check_command: String,

    /// Window length as an ISO 8601 duration (e.g. "PT1H", "P7D")
    #[arg(short, long, default_value = "PT12H")]
    pub duration: String,

    /// Only chart metrics matching this glob (repeatable)
    #[arg(short, long)]
    pub include: Vec<String>,

    /// Never chart metrics matching this glob (repeatable)
    #[arg(short, long)]
    pub exclude: Vec<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

impl FetchArgs {
    /// The request these arguments describe.
    pub fn to_request(&self) -> PerfdataRequest {
        let request = match &self.service {
            Some(service) => PerfdataRequest::service(&self.host, service, &self.check_command),
            None => PerfdataRequest::host(&self.host, &self.check_command),
        };
        request
            .duration(&self.duration)
            .include(self.include.iter().cloned())
            .exclude(self.exclude.iter().cloned())
    }
}

//! # perfdata-graphs
//!
//! Command line front end for [`perfdata_graphite`]: loads the backend
//! settings, answers one perfdata request and prints the chart-ready
//! response as JSON.
//!
//! ## Usage
//!
//! ```bash
//! # Datasets of a service check over the last hour
//! perfdata-graphs --config graphite.toml fetch \
//!     --host web01 --service ping4 --check-command ping4 --duration PT1H
//!
//! # Validate the configured backend
//! PERFDATA_GRAPHITE_API_URL=http://graphite:8081 perfdata-graphs status
//! ```
//!
//! - **[`cli`]**: argument parsing
//! - **[`settings`]**: configuration from file and environment
//! - **[`output`]**: JSON and text rendering of results

pub mod cli;
pub mod output;
pub mod settings;

pub use cli::{Args, Command, FetchArgs};
pub use settings::load_settings;

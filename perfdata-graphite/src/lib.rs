//! # perfdata-graphite
//!
//! Fetch Icinga performance data from a Graphite backend and reshape it into
//! chart-ready [`Response`]s.
//!
//! A request flows through a short linear pipeline:
//!
//! 1. **Resolve** the host/service naming template into a dotted query path
//! 2. **Discover** the metrics stored under that path (`/metrics/find`)
//! 3. **Filter** them through include/exclude glob patterns, capped at [`MAX_METRICS`]
//! 4. **Render** their `value`/`warn`/`crit` series (`/render`, JSON or CSV)
//! 5. **Transform** the payload into one timestamp-aligned [`Dataset`] per metric
//!
//! Configuration and transport failures end the pipeline and are reported in
//! [`Response::errors`]. Malformed rows and discovery entries are skipped.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use perfdata_graphite::{GraphiteConfig, PerfdataRequest, PerfdataSource};
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = PerfdataSource::new(GraphiteConfig {
//!         api_url: "http://graphite.local:8081".to_string(),
//!         ..Default::default()
//!     });
//!
//!     let request = PerfdataRequest::service("web01", "ping4", "ping4").duration("PT1H");
//!     let response = source.fetch_data(&request).await;
//!
//!     for dataset in &response.data {
//!         println!("{}: {} points", dataset.title, dataset.len());
//!     }
//! }
//! ```

pub mod client;
pub mod config;
pub mod duration;
pub mod error;
pub mod filter;
pub mod parser;
pub mod sanitize;
pub mod source;
pub mod template;
pub mod transform;

pub use client::{ConnectivityInfo, MetricsClient, MetricsClientBuilder, QueryTarget};
pub use config::{GraphiteConfig, RenderFormat};
pub use error::{ErrorCategory, GraphiteError};
pub use filter::{filter_metrics, MetricFilter, MAX_METRICS};
pub use sanitize::sanitize_path;
pub use source::{PerfdataRequest, PerfdataSource, ValidationReport};
pub use template::TemplateResolver;

// Re-export types for convenience
pub use perfdata_types::{Dataset, MetricRecord, MetricSeries, Response, SeriesKind};

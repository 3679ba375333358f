//! The request pipeline: discover metrics, render them, build datasets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use perfdata_types::Response;

use crate::client::{MetricsClient, QueryTarget};
use crate::config::GraphiteConfig;
use crate::duration::{window_start, DEFAULT_WINDOW};
use crate::transform::transform_payload;
use crate::GraphiteError;

/// What a caller wants charted.
///
/// # Example
///
/// ```rust
/// use perfdata_graphite::PerfdataRequest;
///
/// let request = PerfdataRequest::service("web01", "disk /", "disk")
///     .duration("P1D")
///     .exclude(["*_inodes"]);
///
/// assert!(!request.is_host_check);
/// assert_eq!(request.exclude_metrics, vec!["*_inodes"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerfdataRequest {
    pub host_name: String,
    #[serde(default)]
    pub service_name: String,
    pub check_command: String,
    /// ISO 8601 duration of the window, counted back from now.
    #[serde(default = "default_duration")]
    pub duration: String,
    #[serde(default)]
    pub is_host_check: bool,
    #[serde(default)]
    pub include_metrics: Vec<String>,
    #[serde(default)]
    pub exclude_metrics: Vec<String>,
}

fn default_duration() -> String {
    DEFAULT_WINDOW.to_string()
}

impl PerfdataRequest {
    /// Request the perfdata of a host check.
    pub fn host(host_name: impl Into<String>, check_command: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
            service_name: String::new(),
            check_command: check_command.into(),
            duration: default_duration(),
            is_host_check: true,
            include_metrics: Vec::new(),
            exclude_metrics: Vec::new(),
        }
    }

    /// Request the perfdata of a service check.
    pub fn service(
        host_name: impl Into<String>,
        service_name: impl Into<String>,
        check_command: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            is_host_check: false,
            ..Self::host(host_name, check_command)
        }
    }

    /// Set the window length (default: `PT12H`).
    pub fn duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = duration.into();
        self
    }

    /// Only chart metrics matching one of these glob patterns.
    pub fn include<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_metrics = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Never chart metrics matching one of these glob patterns.
    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_metrics = patterns.into_iter().map(Into::into).collect();
        self
    }

    fn target(&self, from: DateTime<Utc>) -> QueryTarget {
        QueryTarget {
            host_name: self.host_name.clone(),
            service_name: self.service_name.clone(),
            check_command: self.check_command.clone(),
            is_host_check: self.is_host_check,
            from,
        }
    }
}

/// Outcome of a configuration check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub ok: bool,
    pub output: Vec<String>,
    pub error: Option<String>,
}

/// Perfdata source backed by Graphite.
#[derive(Debug, Clone, Default)]
pub struct PerfdataSource {
    config: GraphiteConfig,
}

impl PerfdataSource {
    pub fn new(config: GraphiteConfig) -> Self {
        Self { config }
    }

    /// Display name of this backend.
    pub fn name(&self) -> &'static str {
        "Graphite"
    }

    pub fn config(&self) -> &GraphiteConfig {
        &self.config
    }

    /// Answer `request` for a window ending now.
    ///
    /// Never fails: configuration and transport errors end up in
    /// [`Response::errors`].
    pub async fn fetch_data(&self, request: &PerfdataRequest) -> Response {
        self.fetch_data_at(request, Utc::now()).await
    }

    /// Answer `request` for a window ending at `now`.
    pub async fn fetch_data_at(&self, request: &PerfdataRequest, now: DateTime<Utc>) -> Response {
        match self.run(request, now).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    host = %request.host_name,
                    service = %request.service_name,
                    category = ?e.category(),
                    error = %e,
                    "perfdata request failed"
                );
                Response::from_error(e.to_string())
            }
        }
    }

    async fn run(
        &self,
        request: &PerfdataRequest,
        now: DateTime<Utc>,
    ) -> Result<Response, GraphiteError> {
        let client = MetricsClient::from_config(&self.config)?;
        let target = request.target(window_start(now, &request.duration));

        let metrics = client
            .find_metrics(&target, request.include_metrics.as_slice(), request.exclude_metrics.as_slice())
            .await?;
        if metrics.is_empty() {
            debug!(host = %request.host_name, "no metrics to render");
            return Ok(Response::empty());
        }

        let payload = client.render(&target, &metrics).await?;
        transform_payload(payload, &metrics, &request.check_command).await
    }

    /// Check that the configured backend is reachable.
    pub async fn status(&self) -> ValidationReport {
        let result = match MetricsClient::from_config(&self.config) {
            Ok(client) => client.status().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(info) => ValidationReport {
                ok: true,
                output: vec!["Connection successful".to_string(), info.to_string()],
                error: None,
            },
            Err(e) => ValidationReport {
                ok: false,
                output: vec![e.to_string()],
                error: Some("Connection not successful".to_string()),
            },
        }
    }
}

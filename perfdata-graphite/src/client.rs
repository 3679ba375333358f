//! Graphite render/find API client.
//!
//! Talks to the Graphite web API:
//!
//! - `GET /metrics` to check that the backend is reachable
//! - `GET /metrics/find` to discover which metrics exist for a host/service
//! - `GET /render` to fetch the `value`/`warn`/`crit` series of those metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use chrono::{Duration, Utc};
//! use perfdata_graphite::{MetricsClient, QueryTarget};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MetricsClient::builder()
//!         .endpoint("http://localhost:8081")
//!         .credentials("icinga", "secret")
//!         .build()?;
//!
//!     let target = QueryTarget::host("web01", "hostalive", Utc::now() - Duration::hours(1));
//!     let metrics = client.find_metrics::<&str>(&target, &[], &[]).await?;
//!     println!("metrics: {:?}", metrics);
//!
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::io;
use std::pin::Pin;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures_util::{Stream, TryStreamExt};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use tokio_util::io::StreamReader;
use tracing::{debug, warn};

use crate::config::{GraphiteConfig, RenderFormat};
use crate::filter::{MetricFilter, MAX_METRICS};
use crate::parser::CsvRecords;
use crate::sanitize::sanitize_path;
use crate::template::TemplateResolver;
use crate::transform::RawPayload;
use crate::GraphiteError;

const STATUS_ENDPOINT: &str = "/metrics";
const FIND_ENDPOINT: &str = "/metrics/find";
const RENDER_ENDPOINT: &str = "/render";

/// Suffix selecting all three series of every metric in one render call.
const SERIES_SELECTOR: &str = ".{value,warn,crit}";

type BodyStream = Pin<Box<dyn Stream<Item = io::Result<bytes::Bytes>> + Send>>;

/// Reader over a streaming render response body.
pub type BodyReader = StreamReader<BodyStream, bytes::Bytes>;

/// Render payload as returned by [`MetricsClient::render`].
pub type RenderPayload = RawPayload<BodyReader>;

/// What to query: a host or service and the start of the time window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTarget {
    pub host_name: String,
    pub service_name: String,
    pub check_command: String,
    pub is_host_check: bool,
    /// Lower bound of the time window.
    pub from: DateTime<Utc>,
}

impl QueryTarget {
    /// Target for a host check.
    pub fn host(
        host_name: impl Into<String>,
        check_command: impl Into<String>,
        from: DateTime<Utc>,
    ) -> Self {
        Self {
            host_name: host_name.into(),
            service_name: String::new(),
            check_command: check_command.into(),
            is_host_check: true,
            from,
        }
    }

    /// Target for a service check.
    pub fn service(
        host_name: impl Into<String>,
        service_name: impl Into<String>,
        check_command: impl Into<String>,
        from: DateTime<Utc>,
    ) -> Self {
        Self {
            host_name: host_name.into(),
            service_name: service_name.into(),
            check_command: check_command.into(),
            is_host_check: false,
            from,
        }
    }

    /// `from` as the API expects it: seconds since the Unix epoch.
    pub fn from_param(&self) -> String {
        self.from.timestamp().to_string()
    }

    fn resolve(&self, resolver: &TemplateResolver, selector: &str) -> String {
        resolver.resolve(
            &self.host_name,
            &self.service_name,
            &self.check_command,
            self.is_host_check,
            selector,
        )
    }
}

/// Result of a successful connectivity check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectivityInfo {
    pub endpoint: String,
    pub status: u16,
    pub elapsed: Duration,
}

impl fmt::Display for ConnectivityInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} answered {} in {}ms",
            self.endpoint,
            self.status,
            self.elapsed.as_millis()
        )
    }
}

/// Client for a Graphite-compatible metrics backend.
#[derive(Debug, Clone)]
pub struct MetricsClient {
    client: Client,
    endpoint: String,
    credentials: Option<(String, String)>,
    resolver: TemplateResolver,
    format: RenderFormat,
}

impl MetricsClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> MetricsClientBuilder {
        MetricsClientBuilder::default()
    }

    /// Build a client from validated settings.
    pub fn from_config(config: &GraphiteConfig) -> Result<Self, GraphiteError> {
        config.validate()?;

        let mut builder = Self::builder()
            .endpoint(config.endpoint())
            .timeout(config.timeout())
            .tls_insecure(config.api_tls_insecure)
            .templates(config.resolver())
            .render_format(config.render_format);
        if let Some((username, password)) = config.credentials() {
            builder = builder.credentials(username, password);
        }
        builder.build()
    }

    /// The base URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The configured render payload shape.
    pub fn render_format(&self) -> RenderFormat {
        self.format
    }

    /// Check that the backend answers on its metrics listing endpoint.
    pub async fn status(&self) -> Result<ConnectivityInfo, GraphiteError> {
        let url = format!("{}{}", self.endpoint, STATUS_ENDPOINT);
        let started = Instant::now();

        let response = self.get(&url).send().await?;
        let response = check_status(response)?;

        Ok(ConnectivityInfo {
            endpoint: self.endpoint.clone(),
            status: response.status().as_u16(),
            elapsed: started.elapsed(),
        })
    }

    /// Discover the metric names stored for `target`.
    ///
    /// Names are filtered through `include`/`exclude` glob patterns and
    /// capped at [`MAX_METRICS`].
    pub async fn find_metrics<S: AsRef<str>>(
        &self,
        target: &QueryTarget,
        include: &[S],
        exclude: &[S],
    ) -> Result<Vec<String>, GraphiteError> {
        let query = target.resolve(&self.resolver, "*");
        debug!(query = %query, "discovering metrics");

        let url = format!("{}{}", self.endpoint, FIND_ENDPOINT);
        let response = self
            .get(&url)
            .query(&[
                ("query", query.as_str()),
                ("from", target.from_param().as_str()),
                ("format", "treejson"),
            ])
            .send()
            .await?;
        let response = check_status(response)?;

        let body = response.bytes().await?;
        let entries = discovery_entries(&body);

        let names = entries.iter().filter_map(|entry| {
            let text = entry.get("text").and_then(Value::as_str);
            if text.is_none() {
                debug!(entry = %entry, "skipping discovery entry without text");
            }
            text.map(str::to_string)
        });

        let mut metrics = MetricFilter::new(include, exclude).apply(names);
        if metrics.len() > MAX_METRICS {
            warn!(
                found = metrics.len(),
                limit = MAX_METRICS,
                "too many metrics, truncating"
            );
            metrics.truncate(MAX_METRICS);
        }

        debug!(count = metrics.len(), "discovered metrics");
        Ok(metrics)
    }

    /// Fetch the `value`, `warn` and `crit` series of `metrics`.
    ///
    /// An empty metric list selects every metric of the target.
    pub async fn render(
        &self,
        target: &QueryTarget,
        metrics: &[String],
    ) -> Result<RenderPayload, GraphiteError> {
        let query = format!(
            "{}{}",
            target.resolve(&self.resolver, &metric_selector(metrics)),
            SERIES_SELECTOR
        );
        debug!(target = %query, format = %self.format, "rendering series");

        let url = format!("{}{}", self.endpoint, RENDER_ENDPOINT);
        let response = self
            .get(&url)
            .query(&[
                ("target", query.as_str()),
                ("from", target.from_param().as_str()),
                ("format", self.format.as_str()),
                ("tz", "UTC"),
            ])
            .send()
            .await?;
        let response = check_status(response)?;

        match self.format {
            RenderFormat::Json => Ok(RawPayload::Json(response.bytes().await?.to_vec())),
            RenderFormat::Csv => Ok(RawPayload::Csv(CsvRecords::new(body_reader(response)))),
        }
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self.client.get(url);
        match &self.credentials {
            Some((username, password)) => request.basic_auth(username, Some(password)),
            None => request,
        }
    }
}

/// Builder for MetricsClient.
#[derive(Debug, Default)]
pub struct MetricsClientBuilder {
    endpoint: Option<String>,
    username: Option<String>,
    password: Option<String>,
    timeout: Option<Duration>,
    tls_insecure: bool,
    resolver: Option<TemplateResolver>,
    format: RenderFormat,
}

impl MetricsClientBuilder {
    /// Set the Graphite web endpoint (e.g., "http://localhost:8081").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the username and password for basic authentication.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Accept invalid TLS certificates.
    pub fn tls_insecure(mut self, insecure: bool) -> Self {
        self.tls_insecure = insecure;
        self
    }

    /// Set the naming templates (default: Icinga's Graphite writer layout).
    pub fn templates(mut self, resolver: TemplateResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Set the render payload shape (default: JSON).
    pub fn render_format(mut self, format: RenderFormat) -> Self {
        self.format = format;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<MetricsClient, GraphiteError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));

        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(self.tls_insecure)
            .build()
            .map_err(|e| GraphiteError::Config(format!("failed to build HTTP client: {}", e)))?;

        let endpoint = self
            .endpoint
            .unwrap_or_else(|| "http://localhost:8081".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(MetricsClient {
            client,
            endpoint,
            credentials: self
                .username
                .map(|user| (user, self.password.unwrap_or_default())),
            resolver: self.resolver.unwrap_or_default(),
            format: self.format,
        })
    }
}

// `*` for every metric, otherwise a `{a,b}` list of sanitized names.
fn metric_selector(metrics: &[String]) -> String {
    if metrics.is_empty() {
        return "*".to_string();
    }
    let names: Vec<String> = metrics.iter().map(|m| sanitize_path(m)).collect();
    format!("{{{}}}", names.join(","))
}

// Entries of a treejson body. Anything but a JSON array counts as no entries.
fn discovery_entries(body: &[u8]) -> Vec<Value> {
    match serde_json::from_slice(body) {
        Ok(Value::Array(entries)) => entries,
        Ok(other) => {
            warn!(body = %other, "discovery response is not a list, ignoring it");
            Vec::new()
        }
        Err(e) => {
            warn!(error = %e, "discarding undecodable discovery response");
            Vec::new()
        }
    }
}

fn check_status(response: Response) -> Result<Response, GraphiteError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(GraphiteError::from_status(status))
    }
}

fn body_reader(response: Response) -> BodyReader {
    let stream: BodyStream = Box::pin(response.bytes_stream().map_err(io::Error::other));
    StreamReader::new(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::Matcher;

    use crate::transform::transform_payload;

    fn from() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 17, 10, 0, 0).unwrap()
    }

    fn client(server: &mockito::Server, format: RenderFormat) -> MetricsClient {
        MetricsClient::builder()
            .endpoint(server.url())
            .render_format(format)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let client = MetricsClient::builder().build().unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8081");
        assert!(client.credentials.is_none());
        assert_eq!(client.render_format(), RenderFormat::Json);
        assert_eq!(client.resolver, TemplateResolver::default());
    }

    #[test]
    fn test_builder_custom() {
        let client = MetricsClient::builder()
            .endpoint("https://graphite.local/")
            .credentials("admin", "secret")
            .render_format(RenderFormat::Csv)
            .build()
            .unwrap();

        assert_eq!(client.endpoint(), "https://graphite.local");
        assert_eq!(
            client.credentials,
            Some(("admin".to_string(), "secret".to_string()))
        );
        assert_eq!(client.render_format(), RenderFormat::Csv);
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let config = GraphiteConfig {
            api_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            MetricsClient::from_config(&config),
            Err(GraphiteError::Config(_))
        ));
    }

    #[test]
    fn test_metric_selector() {
        assert_eq!(metric_selector(&[]), "*");
        assert_eq!(
            metric_selector(&["rta".to_string(), "p l".to_string()]),
            "{rta,p_l}"
        );
    }

    #[test]
    fn test_discovery_entries_tolerates_garbage() {
        assert_eq!(discovery_entries(br#"[{"text": "rta"}]"#).len(), 1);
        assert!(discovery_entries(b"<html>proxy page</html>").is_empty());
        assert!(discovery_entries(br#"{"text": "rta"}"#).is_empty());
        assert!(discovery_entries(b"").is_empty());
    }

    #[test]
    fn test_from_param_is_epoch_seconds() {
        let target = QueryTarget::host("h", "hostalive", from());
        assert_eq!(target.from_param(), "1731837600");
    }

    #[tokio::test]
    async fn test_status_ok() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/metrics")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let info = client(&server, RenderFormat::Json).status().await.unwrap();
        assert_eq!(info.status, 200);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_protocol_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/metrics")
            .with_status(503)
            .create_async()
            .await;

        let err = client(&server, RenderFormat::Json).status().await.unwrap_err();
        assert!(matches!(err, GraphiteError::Protocol { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_status_connection_error() {
        let client = MetricsClient::builder()
            .endpoint("http://127.0.0.1:1")
            .build()
            .unwrap();

        let err = client.status().await.unwrap_err();
        assert!(matches!(err, GraphiteError::Connection(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_find_metrics_filters_and_caps() {
        let mut server = mockito::Server::new_async().await;
        let entries: Vec<Value> = (0..15)
            .map(|i| serde_json::json!({"text": format!("m{:02}", i), "leaf": 0}))
            .chain([serde_json::json!({"id": "no-text"}), serde_json::json!({"text": "skipme"})])
            .collect();

        let mock = server
            .mock("GET", "/metrics/find")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded(
                    "query".into(),
                    "icinga2.web01.services.ping.ping4.perfdata.*".into(),
                ),
                Matcher::UrlEncoded("from".into(), "1731837600".into()),
                Matcher::UrlEncoded("format".into(), "treejson".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::to_string(&entries).unwrap())
            .create_async()
            .await;

        let target = QueryTarget::service("web01", "ping", "ping4", from());
        let metrics = client(&server, RenderFormat::Json)
            .find_metrics(&target, &[], &["skip*"])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(metrics.len(), MAX_METRICS);
        assert_eq!(metrics[0], "m00");
        assert_eq!(metrics[9], "m09");
    }

    #[tokio::test]
    async fn test_find_metrics_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/metrics/find")
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let target = QueryTarget::host("web01", "hostalive", from());
        let none: [&str; 0] = [];
        let err = client(&server, RenderFormat::Json)
            .find_metrics(&target, &none, &none)
            .await
            .unwrap_err();
        assert!(matches!(err, GraphiteError::Auth(_)));
    }

    #[tokio::test]
    async fn test_render_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/render")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded(
                    "target".into(),
                    "icinga2.web01.host.hostalive.perfdata.{pl,rta}.{value,warn,crit}".into(),
                ),
                Matcher::UrlEncoded("format".into(), "json".into()),
                Matcher::UrlEncoded("tz".into(), "UTC".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"[{"target": "icinga2.web01.host.hostalive.perfdata.rta.value", "datapoints": [[1.5, 1731837600]]}]"#,
            )
            .create_async()
            .await;

        let target = QueryTarget::host("web01", "hostalive", from());
        let metrics = vec!["pl".to_string(), "rta".to_string()];
        let payload = client(&server, RenderFormat::Json)
            .render(&target, &metrics)
            .await
            .unwrap();
        mock.assert_async().await;

        let response = transform_payload(payload, &metrics, "hostalive").await.unwrap();
        assert_eq!(response.data.len(), 1);
        assert_eq!(response.data[0].title, "rta");
    }

    #[tokio::test]
    async fn test_render_csv_streams_rows() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/render")
            .match_query(Matcher::UrlEncoded("format".into(), "csv".into()))
            .with_status(200)
            .with_body(
                "icinga2.web01.host.hostalive.perfdata.rta.value,2024-11-17 10:00:00,1.5\n\
                 icinga2.web01.host.hostalive.perfdata.rta.crit,2024-11-17 10:00:00,5\n",
            )
            .create_async()
            .await;

        let target = QueryTarget::host("web01", "hostalive", from());
        let metrics = vec!["rta".to_string()];
        let payload = client(&server, RenderFormat::Csv)
            .render(&target, &metrics)
            .await
            .unwrap();

        let response = transform_payload(payload, &metrics, "hostalive").await.unwrap();
        let rta = &response.data[0];
        assert_eq!(rta.timestamps, vec![1731837600]);
        assert_eq!(rta.series.len(), 2);
    }
}

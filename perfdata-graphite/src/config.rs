//! Backend connection settings.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::template::{TemplateResolver, DEFAULT_HOST_TEMPLATE, DEFAULT_SERVICE_TEMPLATE};
use crate::GraphiteError;

/// Payload shape requested from the render endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    /// One JSON document holding every target and its datapoints.
    #[default]
    Json,
    /// `path,timestamp,value` rows, read as the body streams in.
    Csv,
}

impl RenderFormat {
    /// Value of the render API's `format` parameter.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RenderFormat::Json => "json",
            RenderFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderFormat {
    type Err = GraphiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(RenderFormat::Json),
            "csv" => Ok(RenderFormat::Csv),
            other => Err(GraphiteError::Config(format!(
                "unknown render format '{}', expected 'json' or 'csv'",
                other
            ))),
        }
    }
}

/// Settings for talking to a Graphite-compatible backend.
///
/// Every field has a default, so a partial config file is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphiteConfig {
    /// Base URL of the Graphite web API.
    pub api_url: String,
    /// Request timeout in seconds.
    pub api_timeout: u64,
    pub api_username: String,
    pub api_password: String,
    /// Skip TLS certificate verification.
    pub api_tls_insecure: bool,
    pub host_template: String,
    pub service_template: String,
    pub render_format: RenderFormat,
}

impl Default for GraphiteConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8081".to_string(),
            api_timeout: 10,
            api_username: String::new(),
            api_password: String::new(),
            api_tls_insecure: false,
            host_template: DEFAULT_HOST_TEMPLATE.to_string(),
            service_template: DEFAULT_SERVICE_TEMPLATE.to_string(),
            render_format: RenderFormat::Json,
        }
    }
}

impl GraphiteConfig {
    /// Check the settings without touching the network.
    pub fn validate(&self) -> Result<(), GraphiteError> {
        let url = self.api_url.trim();
        if url.is_empty() {
            return Err(GraphiteError::Config("api_url must not be empty".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(GraphiteError::Config(format!(
                "api_url '{}' must start with http:// or https://",
                url
            )));
        }
        if self.api_timeout == 0 {
            return Err(GraphiteError::Config(
                "api_timeout must be greater than zero".to_string(),
            ));
        }
        if self.host_template.trim().is_empty() {
            return Err(GraphiteError::Config("host_template must not be empty".to_string()));
        }
        if self.service_template.trim().is_empty() {
            return Err(GraphiteError::Config(
                "service_template must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn endpoint(&self) -> &str {
        self.api_url.trim().trim_end_matches('/')
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout)
    }

    /// Basic auth credentials, if a username is configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.api_username.is_empty() {
            None
        } else {
            Some((&self.api_username, &self.api_password))
        }
    }

    /// Template resolver for the configured templates.
    pub fn resolver(&self) -> TemplateResolver {
        TemplateResolver::new(&self.host_template, &self.service_template)
    }
}

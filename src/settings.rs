//! Loading [`GraphiteConfig`] from a file and the environment.
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. the TOML file given with `--config`, or `perfdata-graphs.toml` in the
//!    working directory if it exists
//! 3. `PERFDATA_GRAPHITE_*` environment variables
//!
//! ```toml
//! api_url = "https://graphite.example.org"
//! api_username = "icinga"
//! api_password = "secret"
//! render_format = "csv"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use perfdata_graphite::GraphiteConfig;

/// Config file looked up when none is given explicitly.
pub const DEFAULT_CONFIG_FILE: &str = "perfdata-graphs";

/// Prefix of environment overrides, e.g. `PERFDATA_GRAPHITE_API_URL`.
pub const ENV_PREFIX: &str = "PERFDATA_GRAPHITE";

/// Load settings. An explicitly named file must exist.
pub fn load_settings(path: Option<&Path>) -> Result<GraphiteConfig> {
    load_with_env(path, Environment::with_prefix(ENV_PREFIX))
}

fn load_with_env(path: Option<&Path>, env: Environment) -> Result<GraphiteConfig> {
    let file = match path {
        Some(path) => File::from(path),
        None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let settings: GraphiteConfig = Config::builder()
        .add_source(file)
        .add_source(env.try_parsing(true))
        .build()
        .context("failed to read settings")?
        .try_deserialize()
        .context("invalid settings")?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use perfdata_graphite::RenderFormat;

    fn no_env() -> Environment {
        Environment::with_prefix(ENV_PREFIX).source(Some(Default::default()))
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graphite.toml");
        std::fs::write(
            &path,
            "api_url = \"https://graphite.example.org\"\napi_timeout = 30\nrender_format = \"csv\"\n",
        )
        .unwrap();

        let settings = load_with_env(Some(&path), no_env()).unwrap();
        assert_eq!(settings.api_url, "https://graphite.example.org");
        assert_eq!(settings.api_timeout, 30);
        assert_eq!(settings.render_format, RenderFormat::Csv);
        assert_eq!(settings.host_template, GraphiteConfig::default().host_template);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graphite.toml");
        std::fs::write(&path, "api_url = \"http://file:8081\"\n").unwrap();

        let env = Environment::with_prefix(ENV_PREFIX).source(Some(
            [
                ("PERFDATA_GRAPHITE_API_URL".to_string(), "http://env:8081".to_string()),
                ("PERFDATA_GRAPHITE_API_TLS_INSECURE".to_string(), "true".to_string()),
            ]
            .into_iter()
            .collect(),
        ));

        let settings = load_with_env(Some(&path), env).unwrap();
        assert_eq!(settings.api_url, "http://env:8081");
        assert!(settings.api_tls_insecure);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        assert!(load_with_env(Some(&path), no_env()).is_err());
    }

    #[test]
    fn test_defaults_without_sources() {
        let settings = load_with_env(None, no_env()).unwrap();
        assert_eq!(settings, GraphiteConfig::default());
    }
}

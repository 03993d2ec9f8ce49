use serde::Deserialize;
use std::fs::File;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    pub sentry_dsn: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            sentry_dsn: None,
        }
    }
}

fn default_level() -> String {
    "info".into()
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub logging: Option<LoggingConfig>,
    pub metrics: Option<MetricsConfig>,
    pub gateway: Option<gateway::config::Config>,
    pub analytics: Option<analytics::config::Config>,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("missing `{0}` section in config")]
    MissingSection(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    #[test]
    fn full_config() {
        let yaml = r#"
            logging:
                level: debug
                format: json
                sentry_dsn: "https://key@sentry.example.com/1"
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            gateway:
                name: central-perk-gateway
                listener:
                    host: 0.0.0.0
                    port: 8000
                admin_listener:
                    host: 127.0.0.1
                    port: 8001
                users:
                    url: "http://users-service:5001"
                orders:
                    url: "http://orders-service:5002"
                    timeout_secs: 5
                normalize_empty_filters: false
            analytics:
                listener:
                    host: 0.0.0.0
                    port: 5101
                garage:
                    url: "http://garage-service:5100"
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        let logging = config.logging.expect("logging config");
        assert_eq!(logging.level, "debug");
        assert_eq!(logging.format, LogFormat::Json);
        assert!(logging.sentry_dsn.is_some());

        assert_eq!(
            config.metrics,
            Some(MetricsConfig {
                statsd_host: "127.0.0.1".into(),
                statsd_port: 8125,
            })
        );

        let gateway = config.gateway.expect("gateway config");
        assert_eq!(gateway.name, "central-perk-gateway");
        assert!(!gateway.normalize_empty_filters);
        assert!(gateway.validate().is_ok());

        let analytics = config.analytics.expect("analytics config");
        assert_eq!(analytics.name, "analytics-service");
        assert!(analytics.validate().is_ok());
    }

    #[test]
    fn logging_defaults() {
        let tmp = write_tmp_file("logging: {}\n");
        let config = Config::from_file(tmp.path()).expect("load config");
        assert_eq!(config.logging, Some(LoggingConfig::default()));
        assert!(config.gateway.is_none());
        assert!(config.metrics.is_none());
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let tmp = write_tmp_file("logging:\n    format: xml\n");
        assert!(matches!(
            Config::from_file(tmp.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn missing_file() {
        let result = Config::from_file(std::path::Path::new("/nonexistent/confluence.yaml"));
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}

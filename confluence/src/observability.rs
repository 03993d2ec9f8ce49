use crate::config::{LogFormat, LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::{StatsdBuilder, StatsdError};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global subscriber. The returned guard flushes pending Sentry
/// events on drop and must be held until the process exits.
pub fn init_logging(config: &LoggingConfig) -> Option<sentry::ClientInitGuard> {
    let sentry_guard = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let sentry_layer = sentry_guard
        .as_ref()
        .map(|_| sentry::integrations::tracing::layer());

    let registry = tracing_subscriber::registry().with(filter).with(sentry_layer);

    match config.format {
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(false)).init(),
    }

    sentry_guard
}

#[derive(thiserror::Error, Debug)]
pub enum MetricsError {
    #[error("could not build statsd recorder: {0}")]
    Statsd(#[from] StatsdError),
    #[error("a metrics recorder is already installed")]
    AlreadyInstalled,
}

/// Routes every `metrics` macro call to statsd, prefixed with `prefix`.
pub fn init_metrics(
    config: &MetricsConfig,
    prefix: &str,
    definitions: &[shared::metrics_defs::MetricDef],
) -> Result<(), MetricsError> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some(prefix))?;
    metrics::set_global_recorder(recorder).map_err(|_| MetricsError::AlreadyInstalled)?;

    shared::metrics_defs::describe_all(definitions);
    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        prefix,
        "statsd metrics enabled"
    );
    Ok(())
}

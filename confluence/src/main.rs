mod config;
mod observability;

use clap::{Args, Parser};
use config::{Config, ConfigError};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
enum CliCommand {
    /// Users/orders gateway
    Gateway(ConfigArgs),
    /// Garage analytics service
    Analytics(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long)]
    config_file_path: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Metrics(#[from] observability::MetricsError),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Gateway(#[from] gateway::errors::GatewayError),
    #[error(transparent)]
    Analytics(#[from] analytics::errors::AnalyticsError),
}

fn main() {
    let cli = CliCommand::parse();

    if let Err(e) = cli_main(cli) {
        eprintln!("{e}");
        process::exit(1);
    }
}

fn cli_main(cli: CliCommand) -> Result<(), CliError> {
    let args = match &cli {
        CliCommand::Gateway(args) | CliCommand::Analytics(args) => args,
    };
    let config = Config::from_file(&args.config_file_path)?;

    let _sentry_guard = observability::init_logging(&config.logging.unwrap_or_default());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli {
        CliCommand::Gateway(_) => {
            let gateway_config = config.gateway.ok_or(ConfigError::MissingSection("gateway"))?;
            if let Some(metrics) = &config.metrics {
                observability::init_metrics(
                    metrics,
                    &gateway_config.name,
                    upstream::metrics_defs::ALL_METRICS,
                )?;
            }
            tracing::info!("starting gateway");
            runtime.block_on(gateway::run(gateway_config))?;
        }
        CliCommand::Analytics(_) => {
            let analytics_config = config
                .analytics
                .ok_or(ConfigError::MissingSection("analytics"))?;
            if let Some(metrics) = &config.metrics {
                observability::init_metrics(
                    metrics,
                    &analytics_config.name,
                    upstream::metrics_defs::ALL_METRICS,
                )?;
            }
            tracing::info!("starting analytics");
            runtime.block_on(analytics::run(analytics_config))?;
        }
    }

    Ok(())
}

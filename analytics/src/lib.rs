//! Analytics over the garage record store.
//!
//! Each report reads the full car list once and derives everything else
//! locally: per-car classes and scores, rankings, category comparisons,
//! collection summaries and operational alerts.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod enrichment;
pub mod errors;
pub mod models;
pub mod reports;

use crate::api::{Analytics, router};
use crate::config::Config;
use crate::errors::AnalyticsError;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use tokio::net::TcpListener;
use upstream::UpstreamClient;

pub async fn run(config: Config) -> Result<(), AnalyticsError> {
    config.validate()?;

    let app = router(Analytics::new(&config, UpstreamClient::http()));

    let listener = TcpListener::bind(config.listener.addr()).await?;
    tracing::info!(
        name = %config.name,
        addr = %config.listener.addr(),
        garage = %config.garage.url,
        "analytics listening"
    );
    let api_task = async { axum::serve(listener, app).await.map_err(AnalyticsError::from) };

    match &config.admin_listener {
        Some(admin) => {
            let admin_task = async {
                run_http_service(&admin.host, admin.port, AdminService::new(|| true))
                    .await
                    .map_err(AnalyticsError::from)
            };
            tokio::try_join!(api_task, admin_task)?;
        }
        None => api_task.await?,
    }

    Ok(())
}

//! Gateway in front of the users and orders record stores.
//!
//! Most endpoints relay the upstream answer unchanged. `/users/{id}/orders`
//! joins a user with their orders, `/dashboard` aggregates both lists on a
//! best-effort basis and `/health` rolls up the liveness of both stores.

pub mod api;
pub mod config;
pub mod errors;
pub mod models;
pub mod views;

use crate::api::{Gateway, router};
use crate::config::Config;
use crate::errors::GatewayError;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use tokio::net::TcpListener;
use upstream::UpstreamClient;

pub async fn run(config: Config) -> Result<(), GatewayError> {
    config.validate()?;

    let gateway = Gateway::new(&config, UpstreamClient::http());
    let app = router(gateway);

    let listener = TcpListener::bind(config.listener.addr()).await?;
    tracing::info!(
        name = %config.name,
        addr = %config.listener.addr(),
        users = %config.users.url,
        orders = %config.orders.url,
        "gateway listening"
    );
    let api_task = async { axum::serve(listener, app).await.map_err(GatewayError::from) };

    match &config.admin_listener {
        Some(admin) => {
            let admin_task = async {
                run_http_service(&admin.host, admin.port, AdminService::new(|| true))
                    .await
                    .map_err(GatewayError::from)
            };
            tokio::try_join!(api_task, admin_task)?;
        }
        None => api_task.await?,
    }

    Ok(())
}

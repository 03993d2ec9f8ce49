use crate::errors::GatewayError;
use serde::Deserialize;
use shared::config::Listener;
use upstream::config::{Timeouts, UpstreamConfig};

/// Gateway configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Name reported in every response body
    #[serde(default = "default_name")]
    pub name: String,
    /// Main listener for the REST API
    pub listener: Listener,
    /// Optional listener for process liveness/readiness checks
    pub admin_listener: Option<Listener>,
    /// Users record store
    pub users: UpstreamConfig,
    /// Orders record store
    pub orders: UpstreamConfig,
    #[serde(default)]
    pub timeouts: Timeouts,
    /// Rewrite "404 + error" answers of filter endpoints into empty 200 lists
    #[serde(default = "default_normalize_empty_filters")]
    pub normalize_empty_filters: bool,
}

impl Config {
    pub fn validate(&self) -> Result<(), GatewayError> {
        self.listener.validate()?;
        if let Some(admin) = &self.admin_listener {
            admin.validate()?;
        }
        self.users.validate()?;
        self.orders.validate()?;
        self.timeouts.validate()?;
        Ok(())
    }
}

fn default_name() -> String {
    "gateway".into()
}

fn default_normalize_empty_filters() -> bool {
    true
}

use crate::errors::AnalyticsError;
use serde::Deserialize;
use shared::config::Listener;
use upstream::config::{Timeouts, UpstreamConfig};

/// Analytics service configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_name")]
    pub name: String,
    pub listener: Listener,
    pub admin_listener: Option<Listener>,
    /// Garage record store, source of every report
    pub garage: UpstreamConfig,
    #[serde(default)]
    pub timeouts: Timeouts,
}

impl Config {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        self.listener.validate()?;
        if let Some(admin) = &self.admin_listener {
            admin.validate()?;
        }
        self.garage.validate()?;
        self.timeouts.validate()?;
        Ok(())
    }
}

fn default_name() -> String {
    "analytics-service".into()
}

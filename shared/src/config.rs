use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ListenerError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Empty listener host")]
    EmptyHost,
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ListenerError> {
        if self.host.is_empty() {
            return Err(ListenerError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ListenerError::InvalidPort);
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

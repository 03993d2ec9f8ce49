use shared::config::ListenerError;
use upstream::config::ValidationError;

#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid listener: {0}")]
    Listener(#[from] ListenerError),

    #[error("invalid upstream configuration: {0}")]
    Upstream(#[from] ValidationError),
}

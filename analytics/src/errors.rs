use shared::config::ListenerError;
use upstream::config::ValidationError;

#[derive(thiserror::Error, Debug)]
pub enum AnalyticsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid listener: {0}")]
    Listener(#[from] ListenerError),

    #[error("invalid garage configuration: {0}")]
    Upstream(#[from] ValidationError),
}

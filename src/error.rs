use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("item not found: {0}")]
    NotFound(String),

    #[error("item not available on the storefront: {0}")]
    NotAvailable(String),

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("store error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, TrackerError>;

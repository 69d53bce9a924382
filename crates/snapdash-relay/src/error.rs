//! Relay error types

use redis::RedisError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("redis error: {0}")]
    Redis(#[from] RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid view id: {0:?}")]
    InvalidViewId(String),

    #[error("unknown channel: {0}")]
    UnknownChannel(String),
}

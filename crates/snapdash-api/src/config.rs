//! Server configuration from the environment
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATABASE_URL` | `sqlite://snapdash.db` |
//! | `REDIS_URL` | unset (in-process relay) |
//! | `API_PORT` | `5000` |
//! | `QUERY_TIMEOUT_SECS` | `30` |
//! | `JWT_SECRET` | required unless `JWT_ENABLED=false`, see [`JwtConfig::from_lookup`] |
//! | `SHUTDOWN_TIMEOUT_SECS` | `30` |
//!
//! Blank values count as unset.

use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::jwt::{JwtConfig, JwtError};
use crate::shutdown::{GracefulShutdown, DEFAULT_DRAIN_TIMEOUT};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://snapdash.db";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error(transparent)]
    Jwt(#[from] JwtError),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub port: u16,
    pub query_timeout: Duration,
    pub jwt: Option<JwtConfig>,
    pub shutdown: GracefulShutdown,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let database_url =
            non_empty("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let redis_url = non_empty("REDIS_URL");
        let port = parse_var("API_PORT", non_empty("API_PORT"), DEFAULT_PORT)?;
        let timeout_secs = parse_var(
            "QUERY_TIMEOUT_SECS",
            non_empty("QUERY_TIMEOUT_SECS"),
            DEFAULT_QUERY_TIMEOUT_SECS,
        )?;
        let drain_secs = parse_var(
            "SHUTDOWN_TIMEOUT_SECS",
            non_empty("SHUTDOWN_TIMEOUT_SECS"),
            DEFAULT_DRAIN_TIMEOUT.as_secs(),
        )?;

        Ok(Self {
            database_url,
            redis_url,
            port,
            query_timeout: Duration::from_secs(timeout_secs),
            jwt: JwtConfig::from_lookup(&non_empty)?,
            shutdown: GracefulShutdown::new(Duration::from_secs(drain_secs)),
        })
    }

    pub fn is_postgres(&self) -> bool {
        self.database_url.starts_with("postgres://")
            || self.database_url.starts_with("postgresql://")
    }
}

fn parse_var<T: FromStr>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

//! Process configuration read from the environment.
//!
//! # Environment Variables
//!
//! - `HOST`: bind address (default: `127.0.0.1`)
//! - `PORT`: bind port (default: `3000`)
//! - `PUBLIC_URL`: base of the `url` field in responses (default: `http://{HOST}:{PORT}`)
//! - `DATA_STORE`: `in_memory` (default) | `sqlite`
//! - `DATABASE_URL`: SQLite connection URL (required when `DATA_STORE=sqlite`)
//! - `CORS_ORIGINS`: `*` or a comma-separated origin list (default: `http://localhost:8989`)

use std::{env, str::FromStr};

use axum::http::HeaderValue;
use thiserror::Error;
use todo_core::StoreConfig;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:8989";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid PORT `{0}`")]
    InvalidPort(String),

    #[error("invalid DATA_STORE `{0}` (expected `in_memory` or `sqlite`)")]
    InvalidDataStore(String),

    #[error("DATABASE_URL is required when DATA_STORE=sqlite")]
    MissingDatabaseUrl,

    #[error("invalid CORS origin `{0}`")]
    InvalidOrigin(String),
}

/// Backing store selected by `DATA_STORE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataStore {
    #[default]
    InMemory,
    Sqlite,
}

impl FromStr for DataStore {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(Self::InMemory),
            "sqlite" | "sql" => Ok(Self::Sqlite),
            _ => Err(ConfigError::InvalidDataStore(value.to_string())),
        }
    }
}

/// Origins allowed to make cross-origin requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<HeaderValue>),
}

impl FromStr for CorsOrigins {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim() == "*" {
            return Ok(Self::Any);
        }
        value
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| match origin {
                "*" => Err(ConfigError::InvalidOrigin(origin.to_string())),
                _ => HeaderValue::from_str(origin)
                    .map_err(|_| ConfigError::InvalidOrigin(origin.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::List)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub public_url: String,
    pub store: StoreConfig,
    pub cors: CorsOrigins,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            public_url: format!("http://{DEFAULT_HOST}:{DEFAULT_PORT}"),
            store: StoreConfig::InMemory,
            cors: CorsOrigins::List(vec![HeaderValue::from_static(DEFAULT_CORS_ORIGIN)]),
        }
    }
}

impl Config {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through `lookup`, treating `None` and blank
    /// values as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match var("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(value))?,
            None => DEFAULT_PORT,
        };
        let public_url = var("PUBLIC_URL").unwrap_or_else(|| format!("http://{host}:{port}"));

        let data_store = match var("DATA_STORE") {
            Some(value) => value.parse::<DataStore>()?,
            None => DataStore::default(),
        };
        let store = match data_store {
            DataStore::InMemory => StoreConfig::InMemory,
            DataStore::Sqlite => StoreConfig::Sqlite {
                database_url: var("DATABASE_URL").ok_or(ConfigError::MissingDatabaseUrl)?,
            },
        };

        let cors = var("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string())
            .parse::<CorsOrigins>()?;

        Ok(Self {
            host,
            port,
            public_url,
            store,
            cors,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

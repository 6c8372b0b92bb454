use std::fmt::Display;
use std::str::FromStr;

use crate::auth::jwt::JwtConfig;

/// Server settings. Everything but the JWT secret has a development default.
///
/// | Env Var                  | Default                 |
/// |--------------------------|-------------------------|
/// | `HOST`                   | `0.0.0.0`               |
/// | `PORT`                   | `3000`                  |
/// | `CORS_ORIGINS`           | `http://localhost:5173` |
/// | `REQUEST_TIMEOUT_SECS`   | `30`                    |
/// | `SHUTDOWN_TIMEOUT_SECS`  | `30`                    |
/// | `SYNC_AUTH_TIMEOUT_SECS` | `10`                    |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Comma-separated in `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// Time open sync sockets get to drain after a shutdown signal.
    pub shutdown_timeout_secs: u64,
    /// Deadline for the first (`auth`) frame on a sync socket.
    pub sync_auth_timeout_secs: u64,
    pub jwt: JwtConfig,
}

/// Read `key`, falling back to `default`. Panics if the value does not parse.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} has an invalid value '{raw}': {e}")),
        Err(_) => default,
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let cors_origins = env_or("CORS_ORIGINS", "http://localhost:5173".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Self {
            host: env_or("HOST", "0.0.0.0".to_string()),
            port: env_or("PORT", 3000),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 30),
            sync_auth_timeout_secs: env_or("SYNC_AUTH_TIMEOUT_SECS", 10),
            jwt: JwtConfig::from_env(),
        }
    }
}

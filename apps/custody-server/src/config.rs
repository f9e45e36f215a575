// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the parsed [`ServerConfig`].
//! Configuration is loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding `custody.redb` | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWT_SECRET` | HS256 secret for access tokens | Required unless built with `dev` |
//! | `JWT_AUDIENCE` | Expected `aud` claim | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `RATE_LIMIT_MAX_ACTIONS` | Privileged actions per admin, per action kind, per window | `30` |
//! | `RATE_LIMIT_WINDOW_SECS` | Rate-limit window length | `60` |
//! | `PAYOUT_API_URL` | Payout provider base URL | Optional (automatic payouts disabled) |
//! | `PAYOUT_API_KEY` | Payout provider API key | Optional |
//! | `PAYOUT_TIMEOUT_SECS` | Upper bound on one payout call | `30` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::state::AuthConfig;
use crate::workflow::RateLimitConfig;

pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_AUDIENCE_ENV: &str = "JWT_AUDIENCE";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const RATE_LIMIT_MAX_ACTIONS_ENV: &str = "RATE_LIMIT_MAX_ACTIONS";
pub const RATE_LIMIT_WINDOW_SECS_ENV: &str = "RATE_LIMIT_WINDOW_SECS";
pub const PAYOUT_API_URL_ENV: &str = "PAYOUT_API_URL";
pub const PAYOUT_API_KEY_ENV: &str = "PAYOUT_API_KEY";
pub const PAYOUT_TIMEOUT_SECS_ENV: &str = "PAYOUT_TIMEOUT_SECS";

pub const DEFAULT_DATA_DIR: &str = "/data";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";
pub const DEFAULT_RATE_LIMIT_MAX_ACTIONS: usize = 30;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
pub const DEFAULT_PAYOUT_TIMEOUT_SECS: u64 = 30;

/// File name of the embedded database inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "custody.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub jwt_secret: Option<String>,
    pub jwt_audience: Option<String>,
    pub rate_limit: RateLimitConfig,
    pub payout_timeout: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let max_actions = parse_or(&get, RATE_LIMIT_MAX_ACTIONS_ENV, DEFAULT_RATE_LIMIT_MAX_ACTIONS)?;
        let window_secs = parse_or(&get, RATE_LIMIT_WINDOW_SECS_ENV, DEFAULT_RATE_LIMIT_WINDOW_SECS)?;
        let payout_timeout_secs = parse_or(&get, PAYOUT_TIMEOUT_SECS_ENV, DEFAULT_PAYOUT_TIMEOUT_SECS)?;
        for (name, value) in [
            (RATE_LIMIT_MAX_ACTIONS_ENV, max_actions as u64),
            (RATE_LIMIT_WINDOW_SECS_ENV, window_secs),
            (PAYOUT_TIMEOUT_SECS_ENV, payout_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    name,
                    value: "0".to_string(),
                });
            }
        }

        Ok(Self {
            data_dir: get(DATA_DIR_ENV)
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
                .into(),
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&get, PORT_ENV, DEFAULT_PORT)?,
            jwt_secret: get(JWT_SECRET_ENV),
            jwt_audience: get(JWT_AUDIENCE_ENV),
            rate_limit: RateLimitConfig {
                max_actions,
                window: Duration::from_secs(window_secs),
            },
            payout_timeout: Duration::from_secs(payout_timeout_secs),
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::Invalid {
            name: HOST_ENV,
            value: raw,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            jwt_secret: self.jwt_secret.clone(),
            audience: self.jwt_audience.clone(),
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(name) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/data"));
        assert_eq!(config.port, 8080);
        assert!(config.jwt_secret.is_none());
        assert_eq!(config.rate_limit, RateLimitConfig::default());
        assert_eq!(config.payout_timeout, Duration::from_secs(30));
        assert_eq!(config.database_path(), PathBuf::from("/data/custody.redb"));
        assert_eq!(config.bind_addr().unwrap().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn reads_overrides_and_ignores_blank_values() {
        let config = config_from(&[
            ("DATA_DIR", "/tmp/custody"),
            ("PORT", "9000"),
            ("JWT_SECRET", "  s3cret "),
            ("JWT_AUDIENCE", ""),
            ("RATE_LIMIT_MAX_ACTIONS", "5"),
            ("RATE_LIMIT_WINDOW_SECS", "10"),
            ("PAYOUT_TIMEOUT_SECS", "3"),
        ])
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.jwt_secret.as_deref(), Some("s3cret"));
        assert!(config.jwt_audience.is_none());
        assert_eq!(config.rate_limit.max_actions, 5);
        assert_eq!(config.rate_limit.window, Duration::from_secs(10));
        assert_eq!(config.payout_timeout, Duration::from_secs(3));
    }

    #[test]
    fn rejects_unparseable_and_zero_values() {
        assert!(matches!(
            config_from(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
        assert!(matches!(
            config_from(&[("RATE_LIMIT_MAX_ACTIONS", "0")]),
            Err(ConfigError::Invalid {
                name: "RATE_LIMIT_MAX_ACTIONS",
                ..
            })
        ));
    }
}

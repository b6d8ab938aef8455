//! Environment-driven configuration.
//!
//! The database endpoint and the administrative credential are required;
//! a missing value is fatal at startup. Everything else has a default.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::economy::EconomicPolicy;
use crate::error::{ConfigError, ValidationError};
use crate::generator::GeneratorPolicy;
use crate::placement::ProviderKind;
use crate::validation::UnknownRelicPolicy;

pub const ENV_DATABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SERVICE_ROLE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";
pub const ENV_BIND: &str = "STARCRITTERS_BIND";
pub const ENV_TARGET_MARGIN: &str = "STARCRITTERS_TARGET_MARGIN";
pub const ENV_BASE_FRAGMENTS: &str = "STARCRITTERS_BASE_FRAGMENTS";
pub const ENV_GRID_SIZE: &str = "STARCRITTERS_GRID_SIZE";
pub const ENV_UNKNOWN_RELICS: &str = "STARCRITTERS_UNKNOWN_RELICS";
pub const ENV_PLACEMENT: &str = "STARCRITTERS_PLACEMENT";
pub const ENV_IMAGE_URL_TEMPLATE: &str = "STARCRITTERS_IMAGE_URL_TEMPLATE";

/// Default listen address of the trigger server.
pub const DEFAULT_BIND: &str = "0.0.0.0:8000";

/// Hosted database connection settings.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Administrative (service role) key.
    pub service_role_key: String,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url)
            .field("service_role_key", &"<redacted>")
            .finish()
    }
}

/// Full service configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database: DatabaseConfig,
    pub bind_addr: SocketAddr,
    pub policy: GeneratorPolicy,
    pub placement: ProviderKind,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &'static str| get(name).ok_or(ConfigError::MissingVar { name });

        let url = required(ENV_DATABASE_URL)?;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::InvalidVar {
                name: ENV_DATABASE_URL,
                value: url,
                reason: "expected an http(s) URL".to_string(),
            });
        }
        let database = DatabaseConfig {
            url: url.trim_end_matches('/').to_string(),
            service_role_key: required(ENV_SERVICE_ROLE_KEY)?,
        };

        let defaults = GeneratorPolicy::default();
        let policy = GeneratorPolicy {
            economy: EconomicPolicy {
                target_margin: parse_or(&get, ENV_TARGET_MARGIN, defaults.economy.target_margin)?,
                base_fragment_count: parse_or(
                    &get,
                    ENV_BASE_FRAGMENTS,
                    defaults.economy.base_fragment_count,
                )?,
            },
            grid_size: parse_or(&get, ENV_GRID_SIZE, defaults.grid_size)?,
            unknown_relics: parse_or(&get, ENV_UNKNOWN_RELICS, UnknownRelicPolicy::default())?,
            image_url_template: get(ENV_IMAGE_URL_TEMPLATE).unwrap_or(defaults.image_url_template),
        };
        policy.validate()?;

        let bind_addr: SocketAddr = match get(ENV_BIND) {
            Some(raw) => parse_var(ENV_BIND, &raw)?,
            None => DEFAULT_BIND.parse().map_err(|_| {
                ConfigError::Validation(ValidationError::InvalidSetting {
                    field: "bind".to_string(),
                    reason: "default bind address does not parse".to_string(),
                })
            })?,
        };

        Ok(Self {
            database,
            bind_addr,
            policy,
            placement: parse_or(&get, ENV_PLACEMENT, ProviderKind::default())?,
        })
    }
}

fn parse_var<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::InvalidVar {
        name,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&'static str) -> Option<String>,
{
    match get(name) {
        Some(raw) => parse_var(name, &raw),
        None => Ok(default),
    }
}

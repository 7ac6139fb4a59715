use std::env;
use thiserror::Error;

pub const DEFAULT_DATABASE: &str = "SplitLedger";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("You need to add {0} to the env")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub service_token: String,
    /// When unset the service keeps its ledger in memory.
    pub mongodb_uri: Option<String>,
    pub database: String,
    pub host: String,
    pub port: u16,
    pub seed_demo_data: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let service_token =
            non_empty("SERVICE_TOKEN").ok_or(ConfigError::Missing("SERVICE_TOKEN"))?;
        let port = match non_empty("PORT") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value,
            })?,
            None => DEFAULT_PORT,
        };
        let seed_demo_data = match non_empty("SEED_DEMO_DATA").as_deref().map(str::trim) {
            None | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "SEED_DEMO_DATA",
                    value: other.to_string(),
                })
            }
        };

        Ok(Config {
            service_token,
            mongodb_uri: non_empty("MONGODB_URI"),
            database: non_empty("DATABASE_NAME").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            host: non_empty("BIND_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            seed_demo_data,
        })
    }
}

use log::{info, warn};
use std::{env, fmt::Display, path::PathBuf, str::FromStr};
use thiserror::Error;

const DEV_SECRET_KEY: [u8; 32] = [0u8; 32];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    /// `None` opens a temporary database that is dropped on shutdown.
    pub database_path: Option<PathBuf>,
    pub secret_key: Vec<u8>,
    pub token_lifetime: chrono::Duration,
    pub bcrypt_cost: u32,
    pub templates: String,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let secret_key = match env::var("MOVIELIST_SECRET_KEY") {
            Ok(key) if key.len() >= 32 => key.into_bytes(),
            Ok(_) => {
                return Err(ConfigError::Invalid {
                    key: "MOVIELIST_SECRET_KEY",
                    message: "must be at least 32 bytes".to_owned(),
                })
            }
            Err(_) => {
                warn!("MOVIELIST_SECRET_KEY not set, session cookies use a development key");
                DEV_SECRET_KEY.to_vec()
            }
        };
        let token_lifetime: i64 = try_load("MOVIELIST_TOKEN_TTL", "3600")?;
        if token_lifetime <= 0 {
            return Err(ConfigError::Invalid {
                key: "MOVIELIST_TOKEN_TTL",
                message: "must be a positive number of seconds".to_owned(),
            });
        }
        let bcrypt_cost: u32 =
            try_load("MOVIELIST_BCRYPT_COST", &bcrypt::DEFAULT_COST.to_string())?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "MOVIELIST_BCRYPT_COST",
                message: "must be between 4 and 31".to_owned(),
            });
        }
        Ok(Config {
            bind_address: try_load("MOVIELIST_BIND", "127.0.0.1:8080")?,
            database_path: env::var("MOVIELIST_DB").ok().map(PathBuf::from),
            secret_key,
            token_lifetime: chrono::Duration::seconds(token_lifetime),
            bcrypt_cost,
            templates: try_load(
                "MOVIELIST_TEMPLATES",
                concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*"),
            )?,
        })
    }

    pub fn open_database(&self) -> sled::Result<sled::Db> {
        match &self.database_path {
            Some(path) => sled::open(path),
            None => {
                warn!("MOVIELIST_DB not set, using a temporary database");
                sled::Config::new().temporary(true).open()
            }
        }
    }
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        info!("{} not set, using default: {}", key, default);
        default.to_owned()
    });
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        message: e.to_string(),
    })
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            bind_address: "127.0.0.1:0".to_owned(),
            database_path: None,
            secret_key: DEV_SECRET_KEY.to_vec(),
            token_lifetime: chrono::Duration::seconds(3600),
            bcrypt_cost: 4,
            templates: concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*").to_owned(),
        }
    }
}

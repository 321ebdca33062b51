//! Process configuration, read from `SIGNALHUB_*` environment variables.

use rand::RngCore;
use thiserror::Error;
use tracing::warn;

use crate::signaling::{
    DEFAULT_MAX_BROADCASTS_PER_SECOND, DEFAULT_MAX_ROOM_USERS, DEFAULT_SIGNALING_PORT,
    DEFAULT_TURN_TTL,
};

const GENERATED_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub version: String,
    pub turn_uris: Vec<String>,
    /// Shared with the TURN server; empty disables relay auth.
    pub turn_secret: Vec<u8>,
    pub turn_ttl: u64,
    /// Signs contact tokens, attestations and user nonces.
    pub session_secret: Vec<u8>,
    pub encryption_secret: Vec<u8>,
    pub max_room_users: usize,
    pub max_broadcasts_per_second: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: format!("0.0.0.0:{}", DEFAULT_SIGNALING_PORT),
            version: env!("CARGO_PKG_VERSION").to_string(),
            turn_uris: Vec::new(),
            turn_secret: Vec::new(),
            turn_ttl: DEFAULT_TURN_TTL,
            session_secret: random_secret(),
            encryption_secret: random_secret(),
            max_room_users: DEFAULT_MAX_ROOM_USERS,
            max_broadcasts_per_second: DEFAULT_MAX_BROADCASTS_PER_SECOND,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source.
    ///
    /// Missing token secrets keep the random defaults, so contact tokens do
    /// not survive a restart unless both are set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let var = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let turn_uris = var("SIGNALHUB_TURN_URIS")
            .map(|uris| {
                uris.split(',')
                    .map(str::trim)
                    .filter(|uri| !uri.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            listen: var("SIGNALHUB_LISTEN").unwrap_or(defaults.listen),
            version: defaults.version,
            turn_uris,
            turn_secret: var("SIGNALHUB_TURN_SECRET")
                .map(String::into_bytes)
                .unwrap_or_default(),
            turn_ttl: parse(
                "SIGNALHUB_TURN_TTL",
                var("SIGNALHUB_TURN_TTL"),
                defaults.turn_ttl,
            )?,
            session_secret: secret(
                "SIGNALHUB_SESSION_SECRET",
                var("SIGNALHUB_SESSION_SECRET"),
                defaults.session_secret,
            ),
            encryption_secret: secret(
                "SIGNALHUB_ENCRYPTION_SECRET",
                var("SIGNALHUB_ENCRYPTION_SECRET"),
                defaults.encryption_secret,
            ),
            max_room_users: parse(
                "SIGNALHUB_MAX_ROOM_USERS",
                var("SIGNALHUB_MAX_ROOM_USERS"),
                defaults.max_room_users,
            )?,
            max_broadcasts_per_second: parse(
                "SIGNALHUB_MAX_BROADCASTS",
                var("SIGNALHUB_MAX_BROADCASTS"),
                defaults.max_broadcasts_per_second,
            )?,
        })
    }
}

fn parse<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        None => Ok(default),
    }
}

fn secret(name: &str, value: Option<String>, default: Vec<u8>) -> Vec<u8> {
    match value {
        Some(value) => value.into_bytes(),
        None => {
            warn!("{} not set, using a random secret", name);
            default
        }
    }
}

fn random_secret() -> Vec<u8> {
    let mut bytes = vec![0u8; GENERATED_SECRET_LEN];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}

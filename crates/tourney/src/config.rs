//! Server configuration.
//!
//! Everything has a default, so `ServerConfig::default()` is a working
//! setup. [`ServerConfig::from_env`] overlays environment variables on
//! top of it:
//!
//! | Variable              | Meaning                                  |
//! |-----------------------|------------------------------------------|
//! | `TOURNEY_BIND`        | Full bind address, e.g. `127.0.0.1:9000` |
//! | `PORT`                | Port only; host stays `0.0.0.0`          |
//! | `TOURNEY_VOTE_POLICY` | `once` or `repeated`                     |
//! | `TOURNEY_DEMO_ROOM`   | `true`/`false`, seed a demo room         |
//!
//! `TOURNEY_BIND` wins over `PORT` when both are set.

use tourney_room::{Rules, UnknownVotePolicy, VotePolicy};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8090";

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {name}: {value:?} is not a port number")]
    InvalidPort { name: &'static str, value: String },

    #[error("invalid {name}: expected true or false, got {value:?}")]
    InvalidFlag { name: &'static str, value: String },

    #[error(transparent)]
    VotePolicy(#[from] UnknownVotePolicy),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub rules: Rules,
    /// Create a sample room at startup so a fresh server has something to
    /// join.
    pub demo_room: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            rules: Rules::default(),
            demo_room: true,
        }
    }
}

impl ServerConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("TOURNEY_BIND") {
            config.bind_addr = addr;
        } else if let Some(port) = lookup("PORT") {
            let port: u16 = port.trim().parse().map_err(|_| ConfigError::InvalidPort {
                name: "PORT",
                value: port.clone(),
            })?;
            config.bind_addr = format!("0.0.0.0:{port}");
        }

        if let Some(policy) = lookup("TOURNEY_VOTE_POLICY") {
            config.rules = Rules::with_vote_policy(policy.parse::<VotePolicy>()?);
        }

        if let Some(flag) = lookup("TOURNEY_DEMO_ROOM") {
            config.demo_room = parse_flag("TOURNEY_DEMO_ROOM", &flag)?;
        }

        Ok(config)
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: value.to_string(),
        }),
    }
}

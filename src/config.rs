use std::path::PathBuf;
use std::str::FromStr;

use tracing::{warn, Level};

use crate::error::ConfigError;
use crate::matching::MatchPolicy;

const DATA_DIR: &str = "RENTAL_MATCH_DATA_DIR";
const LOG_LEVEL: &str = "RENTAL_MATCH_LOG_LEVEL";
const MATCH_POLICY: &str = "RENTAL_MATCH_MATCH_POLICY";
const BCRYPT_COST: &str = "RENTAL_MATCH_BCRYPT_COST";
const PET_RESPONSE_DAYS: &str = "RENTAL_MATCH_PET_RESPONSE_DAYS";

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for the JSON file adapter.
    pub data_dir: PathBuf,
    pub log_level: Level,
    pub match_policy: MatchPolicy,
    pub bcrypt_cost: u32,
    /// Days a landlord has to answer a pet request.
    pub pet_response_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            log_level: Level::INFO,
            match_policy: MatchPolicy::Unconditional,
            bcrypt_cost: 10,
            pet_response_days: 28,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                warn!("Ignoring unreadable .env file: {}", err);
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_dir = lookup(DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let log_level = parse_or(&lookup, LOG_LEVEL, defaults.log_level, "expected a tracing level")?;

        let match_policy = match lookup(MATCH_POLICY) {
            None => defaults.match_policy,
            Some(value) => MatchPolicy::from_str(&value).map_err(|_| ConfigError::Invalid {
                key: MATCH_POLICY,
                value,
                reason: "expected \"unconditional\" or \"mutual\"",
            })?,
        };

        let bcrypt_cost: u32 = parse_or(&lookup, BCRYPT_COST, defaults.bcrypt_cost, "expected an integer")?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: BCRYPT_COST,
                value: bcrypt_cost.to_string(),
                reason: "cost must be between 4 and 31",
            });
        }

        let pet_response_days: i64 = parse_or(
            &lookup,
            PET_RESPONSE_DAYS,
            defaults.pet_response_days,
            "expected an integer",
        )?;
        if pet_response_days < 1 {
            return Err(ConfigError::Invalid {
                key: PET_RESPONSE_DAYS,
                value: pet_response_days.to_string(),
                reason: "must be at least one day",
            });
        }

        Ok(Self {
            data_dir,
            log_level,
            match_policy,
            bcrypt_cost,
            pet_response_days,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T, reason: &'static str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value, reason }),
    }
}

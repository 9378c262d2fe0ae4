use std::env;

use chrono_tz::Tz;

use crate::ConfigError;

pub const DEFAULT_TIME_ZONE: Tz = chrono_tz::Europe::Berlin;
pub const DEFAULT_PRODUCT_ID: &str = concat!("-//", env!("CARGO_PKG_NAME"), "//DE");
pub const DEFAULT_UID_DOMAIN: &str = env!("CARGO_PKG_NAME");

/// Settings injected into the encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Zone used for dates, clock times and timestamps without an offset.
    pub time_zone: Tz,
    /// `PRODID` written into every document header.
    pub product_id: String,
    /// Suffix of every `UID`, as in `42@<uid_domain>`.
    pub uid_domain: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            time_zone: DEFAULT_TIME_ZONE,
            product_id: DEFAULT_PRODUCT_ID.to_string(),
            uid_domain: DEFAULT_UID_DOMAIN.to_string(),
        }
    }
}

pub fn parse_time_zone(name: &str) -> Result<Tz, ConfigError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ConfigError::InvalidTimeZone(name.to_string()))
}

/// Where the event table lives and how to authenticate against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: String,
}

impl BackendConfig {
    pub const URL_VAR: &'static str = "SUPABASE_URL";
    pub const KEY_VARS: [&'static str; 2] = ["SUPABASE_ANON_KEY", "SUPABASE_SERVICE_ROLE"];

    /// Reads the backend settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let base_url = non_empty(Self::URL_VAR).ok_or(ConfigError::MissingVariable(Self::URL_VAR))?;
        let api_key = Self::KEY_VARS
            .iter()
            .find_map(|&name| non_empty(name))
            .ok_or(ConfigError::MissingVariable(Self::KEY_VARS[0]))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

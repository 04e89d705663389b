use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub db_path: String,
    pub stream_api_key: Option<String>,
    pub stream_api_secret: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5001,
            db_path: String::from("lingo-db"),
            stream_api_key: None,
            stream_api_secret: None,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let defaults = Self::default();
        Self {
            port: try_load("LINGO_PORT", defaults.port),
            db_path: try_load("LINGO_DB_PATH", defaults.db_path),
            stream_api_key: var("STREAM_API_KEY"),
            stream_api_secret: var("STREAM_API_SECRET"),
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty()).or_else(|| {
        warn!("Environment variable {key} not found");
        None
    })
}

fn try_load<T: FromStr + Display>(key: &str, default: T) -> T
where
    T::Err: Display,
{
    let Ok(raw) = env::var(key) else {
        info!("{key} not set, using default: {default}");
        return default;
    };
    raw.parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value: {e}, using default: {default}");
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        env::set_var("LINGO_TEST_PORT_INVALID", "not-a-port");
        assert_eq!(try_load("LINGO_TEST_PORT_INVALID", 5001u16), 5001);
        env::set_var("LINGO_TEST_PORT_VALID", "8080");
        assert_eq!(try_load("LINGO_TEST_PORT_VALID", 5001u16), 8080);
        assert_eq!(try_load("LINGO_TEST_PORT_UNSET", 5001u16), 5001);
    }

    #[test]
    fn blank_secrets_are_missing() {
        env::set_var("LINGO_TEST_BLANK_SECRET", "  ");
        assert_eq!(var("LINGO_TEST_BLANK_SECRET"), None);
    }
}

use std::env;
use std::path::PathBuf;

use tracing::info;

pub const DEFAULT_API_BASE: &str = "http://localhost:5001/api";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base: String,
    /// Directory holding the client's persisted key/value state.
    pub state_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            state_dir: PathBuf::from(".lingo"),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base: var("LINGO_API_BASE").unwrap_or(defaults.api_base),
            state_dir: var("LINGO_STATE_DIR").map(PathBuf::from).unwrap_or(defaults.state_dir),
        }
    }
}

fn var(key: &str) -> Option<String> {
    let value = env::var(key).ok().filter(|value| !value.trim().is_empty());
    if value.is_none() {
        info!("{key} not set, using default");
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_local_api() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base, "http://localhost:5001/api");
        assert_eq!(config.state_dir, PathBuf::from(".lingo"));
    }

    #[test]
    fn environment_overrides_defaults() {
        env::set_var("LINGO_API_BASE", "https://api.lingo.test/api");
        let config = ClientConfig::from_env();
        env::remove_var("LINGO_API_BASE");
        assert_eq!(config.api_base, "https://api.lingo.test/api");
    }
}

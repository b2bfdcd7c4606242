//! Process configuration.
//!
//! [`Config`] holds process-level settings read from the environment (a `.env`
//! file is loaded first). [`SeasonConfig`] holds the per-season cast, aliases
//! and source list, read from a TOML file.

mod season;

use std::path::PathBuf;
use std::time::Duration;

use figment::Figment;
use figment::providers::Env;
use fundu::DurationParser;
use serde::{Deserialize, Deserializer};

pub use season::{ConfigError, SeasonConfig, SourceConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base level for this crate's log targets.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Where the snapshot JSON lives.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    /// Season TOML; the bundled season is used when unset.
    #[serde(default)]
    pub season_file: Option<PathBuf>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-request timeout, e.g. `15s` or `2m`.
    #[serde(
        default = "default_request_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub request_timeout: Duration,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Config {
    /// Figment reading every environment variable by its lowercased name.
    pub fn figment() -> Figment {
        Figment::new().merge(Env::raw())
    }

    pub fn from_env() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("survivor_data.json")
}

fn default_user_agent() -> String {
    format!(
        "Mozilla/5.0 (compatible; survivor-pool/{}; +https://github.com/fundas-friends/survivor-pool)",
        env!("CARGO_PKG_VERSION")
    )
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_port() -> u16 {
    8080
}

/// Accepts `"15s"`, `"2m"`, `"500ms"` or a bare number of seconds.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => {
            let parsed = DurationParser::with_all_time_units()
                .parse(text.trim())
                .map_err(|e| D::Error::custom(format!("invalid duration {text:?}: {e}")))?;
            Duration::try_from(parsed)
                .map_err(|e| D::Error::custom(format!("invalid duration {text:?}: {e}")))
        }
    }
}

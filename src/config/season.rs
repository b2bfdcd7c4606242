use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Format, Toml};
use serde::Deserialize;
use url::Url;

use crate::parser::TableGrammar;
use crate::roster::AliasTable;

/// Season bundled with the binary, used when no season file is configured.
const BUNDLED_SEASON: &str = include_str!("../../seasons/survivor-50.toml");

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load season configuration")]
    Load(#[from] Box<figment::Error>),
    #[error("season file {0} does not exist")]
    SeasonFileMissing(PathBuf),
    #[error("season configuration lists no sources")]
    NoSources,
    #[error("source \"{name}\" lists no page titles")]
    NoTitles { name: String },
    #[error("source \"{name}\" has an invalid api_url {url:?}")]
    InvalidApiUrl {
        name: String,
        url: String,
        #[source]
        error: url::ParseError,
    },
    #[error("alias \"{alias}\" points at \"{key}\", which is not in the cast")]
    UnknownCastKey { alias: String, key: String },
}

/// One wiki to try, with the page titles to try on it in order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub api_url: String,
    pub titles: Vec<String>,
    #[serde(flatten)]
    pub grammar: TableGrammar,
}

impl SourceConfig {
    pub fn parsed_api_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.api_url).map_err(|error| ConfigError::InvalidApiUrl {
            name: self.name.clone(),
            url: self.api_url.clone(),
            error,
        })
    }
}

/// Cast, aliases and source priority for one season.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeasonConfig {
    pub name: String,
    /// Canonical member keys. When non-empty every alias must point into it.
    #[serde(default)]
    pub cast: Vec<String>,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    pub sources: Vec<SourceConfig>,
}

impl SeasonConfig {
    /// Load from `path`, or the bundled season when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let figment = match path {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::SeasonFileMissing(path.to_path_buf()));
                }
                Figment::from(Toml::file(path))
            }
            None => Figment::from(Toml::string(BUNDLED_SEASON)),
        };

        let season: Self = figment.extract().map_err(Box::new)?;
        season.validate()?;
        Ok(season)
    }

    pub fn bundled() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }

        for source in &self.sources {
            if source.titles.is_empty() {
                return Err(ConfigError::NoTitles {
                    name: source.name.clone(),
                });
            }
            source.parsed_api_url()?;
        }

        if !self.cast.is_empty() {
            let cast: HashSet<&str> = self.cast.iter().map(String::as_str).collect();
            if let Some((alias, key)) = self
                .aliases
                .iter()
                .find(|(_, key)| !cast.contains(key.as_str()))
            {
                return Err(ConfigError::UnknownCastKey {
                    alias: alias.clone(),
                    key: key.clone(),
                });
            }
        }

        Ok(())
    }

    /// Alias table covering every alias plus every cast key.
    pub fn alias_table(&self) -> AliasTable {
        AliasTable::new(
            self.cast
                .iter()
                .map(|key| (key.as_str(), key.as_str()))
                .chain(self.aliases.iter().map(|(a, k)| (a.as_str(), k.as_str()))),
        )
    }
}

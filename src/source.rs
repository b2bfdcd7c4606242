//! Pluggable page sources for the pipeline.

use async_trait::async_trait;

use crate::config::{ConfigError, SourceConfig};
use crate::parser::{self, RowRecord, SectionMissing, TableGrammar};
use crate::roster::AliasTable;
use crate::wiki::{FetchFailure, WikiClient};

/// A logical source: somewhere to fetch markup from and a way to read it.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short name used in logs and run reports.
    fn name(&self) -> &str;

    /// Candidate page titles, in priority order.
    fn titles(&self) -> &[String];

    async fn fetch(&self, title: &str) -> Result<String, FetchFailure>;

    fn parse(&self, markup: &str, aliases: &AliasTable)
    -> Result<Vec<RowRecord>, SectionMissing>;
}

/// A MediaWiki site read through its `api.php`.
#[derive(Debug, Clone)]
pub struct WikiSource {
    name: String,
    titles: Vec<String>,
    client: WikiClient,
    grammar: TableGrammar,
}

impl WikiSource {
    pub fn new(
        name: impl Into<String>,
        titles: Vec<String>,
        client: WikiClient,
        grammar: TableGrammar,
    ) -> Self {
        Self {
            name: name.into(),
            titles,
            client,
            grammar,
        }
    }

    pub fn from_config(config: &SourceConfig, http: reqwest::Client) -> Result<Self, ConfigError> {
        let client = WikiClient::new(http, config.parsed_api_url()?);
        Ok(Self::new(
            config.name.clone(),
            config.titles.clone(),
            client,
            config.grammar.clone(),
        ))
    }
}

#[async_trait]
impl SourceAdapter for WikiSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn titles(&self) -> &[String] {
        &self.titles
    }

    async fn fetch(&self, title: &str) -> Result<String, FetchFailure> {
        self.client.fetch(title).await
    }

    fn parse(
        &self,
        markup: &str,
        aliases: &AliasTable,
    ) -> Result<Vec<RowRecord>, SectionMissing> {
        parser::parse(markup, &self.grammar, aliases)
    }
}

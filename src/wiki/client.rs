use std::time::{Duration, Instant};

use anyhow::Context;
use reqwest::StatusCode;
use tracing::{debug, trace};
use url::Url;

use super::{FetchFailure, envelope};
use crate::utils::log_if_slow;

/// Fetches above this duration are logged as slow.
const SLOW_FETCH_THRESHOLD: Duration = Duration::from_secs(5);

/// Build the HTTP client shared by every wiki source in a run.
pub fn build_http_client(user_agent: &str, timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Retrieves page wikitext from one MediaWiki `api.php` endpoint.
#[derive(Debug, Clone)]
pub struct WikiClient {
    http: reqwest::Client,
    api_url: Url,
}

impl WikiClient {
    pub fn new(http: reqwest::Client, api_url: Url) -> Self {
        Self { http, api_url }
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// `action=parse` URL returning the wikitext of `title`.
    pub fn page_url(&self, title: &str) -> Url {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("action", "parse")
            .append_pair("page", title)
            .append_pair("prop", "wikitext")
            .append_pair("format", "json")
            .append_pair("formatversion", "2")
            .append_pair("redirects", "1");
        url
    }

    /// Fetch the raw wikitext of a page.
    ///
    /// Issues exactly one request; the client's timeout bounds it. Failures are
    /// classified so the caller can decide whether another title is worth
    /// trying.
    pub async fn fetch(&self, title: &str) -> Result<String, FetchFailure> {
        let url = self.page_url(title);
        debug!(title, url = %url, "Fetching wiki page");

        let start = Instant::now();
        let transient = |source: anyhow::Error| FetchFailure::Transient {
            title: title.to_owned(),
            source,
        };

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| transient(e.into()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(FetchFailure::NotFound {
                title: title.to_owned(),
                reason: format!("HTTP {status}"),
            });
        }
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(transient(anyhow::anyhow!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(FetchFailure::Malformed {
                title: title.to_owned(),
                reason: format!("unexpected HTTP {status}"),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| transient(anyhow::Error::new(e).context("Failed to read body")))?;
        log_if_slow(start, SLOW_FETCH_THRESHOLD, "wiki fetch");
        trace!(title, bytes = body.len(), "Received wiki response");

        envelope::read_wikitext(title, &body)
    }
}

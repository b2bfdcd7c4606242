//! Fallback orchestration over the configured sources.
//!
//! Sources are tried strictly in priority order, one request at a time:
//!
//! - a fetch failure moves on to the next title of the same source,
//! - a page without a castaway section, or whose table shows no season
//!   progress, moves on to the next source,
//! - the first useful parse is validated, saved and ends the run.
//!
//! When every candidate fails, the previously persisted snapshot is saved
//! again with status [`ScrapeStatus::FailedKeptExisting`]. A snapshot file
//! that cannot be parsed is left untouched in that case.

use std::collections::HashSet;
use std::fmt;

use anyhow::Result;
use chrono::Utc;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::{Config, SeasonConfig};
use crate::roster::AliasTable;
use crate::snapshot::{
    Anomaly, Assembly, Downgrade, ScrapeStatus, Snapshot, SnapshotStore, Stored, Validation,
    assemble, validate,
};
use crate::source::{SourceAdapter, WikiSource};
use crate::wiki::{FetchFailureKind, build_http_client};

/// What the caller wants this run to do.
#[derive(Debug, Clone)]
pub enum RunMode {
    /// Walk the sources and persist the first useful result.
    Scrape,
    /// Persist an operator-supplied snapshot, skipping the sources entirely.
    ManualOverride(Snapshot),
}

/// Result of trying one title on one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    FetchFailed(FetchFailureKind),
    SectionMissing,
    /// The table parsed but showed no episode and no eliminations.
    Empty,
    Accepted,
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchFailed(kind) => write!(f, "fetch failed ({kind})"),
            Self::SectionMissing => f.write_str("section missing"),
            Self::Empty => f.write_str("empty"),
            Self::Accepted => f.write_str("accepted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub source: String,
    pub title: String,
    pub outcome: AttemptOutcome,
}

/// Everything a run did, for logging and tests.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The snapshot this run settled on.
    pub snapshot: Snapshot,
    /// Whether `snapshot` was written. False only when every source failed
    /// and the file on disk was unreadable, which is then left as is.
    pub saved: bool,
    pub attempts: Vec<Attempt>,
    pub anomalies: Vec<Anomaly>,
    pub downgrades: Vec<Downgrade>,
}

impl RunReport {
    fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            saved: true,
            attempts: Vec::new(),
            anomalies: Vec::new(),
            downgrades: Vec::new(),
        }
    }

    pub fn status(&self) -> ScrapeStatus {
        self.snapshot.scrape_status
    }

    /// The attempt whose data was persisted, if any.
    pub fn accepted(&self) -> Option<&Attempt> {
        self.attempts
            .iter()
            .find(|a| a.outcome == AttemptOutcome::Accepted)
    }
}

pub struct Pipeline {
    sources: Vec<Box<dyn SourceAdapter>>,
    aliases: AliasTable,
    store: SnapshotStore,
}

impl Pipeline {
    pub fn new(
        sources: Vec<Box<dyn SourceAdapter>>,
        aliases: AliasTable,
        store: SnapshotStore,
    ) -> Self {
        if aliases.is_empty() {
            warn!("Alias table is empty, every castaway row will be dropped");
        }
        debug!(
            sources = sources.len(),
            aliases = aliases.len(),
            "Pipeline configured"
        );
        Self {
            sources,
            aliases,
            store,
        }
    }

    /// Wire up wiki sources for `season` using the process settings.
    pub fn from_config(season: &SeasonConfig, config: &Config) -> Result<Self> {
        let http = build_http_client(&config.user_agent, config.request_timeout)?;
        let sources = season
            .sources
            .iter()
            .map(|source| {
                WikiSource::from_config(source, http.clone())
                    .map(|s| Box::new(s) as Box<dyn SourceAdapter>)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(
            sources,
            season.alias_table(),
            SnapshotStore::new(&config.snapshot_path),
        ))
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub async fn run(&self, mode: RunMode) -> Result<RunReport> {
        match mode {
            RunMode::Scrape => self.scrape().await,
            RunMode::ManualOverride(snapshot) => self.manual_override(snapshot).await,
        }
    }

    async fn manual_override(&self, snapshot: Snapshot) -> Result<RunReport> {
        let snapshot = snapshot.into_manual(Utc::now());
        info!(
            episode = snapshot.episode,
            eliminated = snapshot.eliminated.len(),
            "Persisting manual override"
        );
        self.store.save(&snapshot).await?;
        Ok(RunReport::new(snapshot))
    }

    async fn scrape(&self) -> Result<RunReport> {
        let stored = self.store.load_stored().await?;
        let previous = stored.snapshot();
        if let Some(previous) = previous {
            info!(
                episode = previous.episode,
                status = %previous.scrape_status,
                "Loaded previous snapshot"
            );
        }

        let mut attempts = Vec::new();
        let mut tried = HashSet::new();

        for source in &self.sources {
            for title in source.titles() {
                if !tried.insert((source.name(), title.as_str())) {
                    debug!(
                        source = source.name(),
                        title = title.as_str(),
                        "Title already tried this run"
                    );
                    continue;
                }

                let span = info_span!("attempt", source = source.name(), title = title.as_str());
                let outcome = self
                    .attempt(source.as_ref(), title, previous)
                    .instrument(span)
                    .await;

                let (recorded, next_source) = match &outcome {
                    Step::Failed(kind) => (AttemptOutcome::FetchFailed(*kind), false),
                    Step::SectionMissing => (AttemptOutcome::SectionMissing, true),
                    Step::Empty => (AttemptOutcome::Empty, true),
                    Step::Accepted { .. } => (AttemptOutcome::Accepted, false),
                };
                attempts.push(Attempt {
                    source: source.name().to_owned(),
                    title: title.clone(),
                    outcome: recorded,
                });

                if let Step::Accepted {
                    snapshot,
                    anomalies,
                    downgrades,
                } = outcome
                {
                    self.store.save(&snapshot).await?;
                    info!(
                        source = source.name(),
                        title = title.as_str(),
                        episode = snapshot.episode,
                        eliminated = snapshot.eliminated.len(),
                        status = %snapshot.scrape_status,
                        "Saved fresh snapshot"
                    );
                    return Ok(RunReport {
                        snapshot,
                        saved: true,
                        attempts,
                        anomalies,
                        downgrades,
                    });
                }

                if next_source {
                    break;
                }
            }
        }

        let retained = previous.cloned().unwrap_or_default().retained();
        let saved = !matches!(stored, Stored::Corrupt);
        if saved {
            warn!(
                attempts = attempts.len(),
                episode = retained.episode,
                "All sources exhausted, keeping previous snapshot"
            );
            self.store.save(&retained).await?;
        } else {
            warn!(
                attempts = attempts.len(),
                path = %self.store.path().display(),
                "All sources exhausted and the snapshot on disk is unreadable, leaving it untouched"
            );
        }

        Ok(RunReport {
            attempts,
            saved,
            ..RunReport::new(retained)
        })
    }

    /// Fetch, parse, assemble and validate one candidate page.
    async fn attempt(
        &self,
        source: &dyn SourceAdapter,
        title: &str,
        previous: Option<&Snapshot>,
    ) -> Step {
        info!("Trying source");

        let markup = match source.fetch(title).await {
            Ok(markup) => markup,
            Err(e) => {
                warn!(kind = %e.kind(), error = ?e, "Fetch failed, trying next title");
                return Step::Failed(e.kind());
            }
        };

        let rows = match source.parse(&markup, &self.aliases) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "Castaway table not found, trying next source");
                return Step::SectionMissing;
            }
        };

        let Assembly {
            snapshot,
            anomalies,
        } = assemble(&rows);
        if !snapshot.is_useful() {
            info!(rows = rows.len(), "No season progress in table, trying next source");
            return Step::Empty;
        }

        let Validation {
            mut snapshot,
            downgrades,
        } = validate(snapshot, previous);
        snapshot.last_updated = Some(Utc::now());

        Step::Accepted {
            snapshot,
            anomalies,
            downgrades,
        }
    }
}

enum Step {
    Failed(FetchFailureKind),
    SectionMissing,
    Empty,
    Accepted {
        snapshot: Snapshot,
        anomalies: Vec<Anomaly>,
        downgrades: Vec<Downgrade>,
    },
}

//! The season snapshot consumed by the serving layer.

mod assemble;
pub mod store;
mod validate;

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::roster::MemberKey;

pub use assemble::{Anomaly, Assembly, assemble};
pub use store::{SnapshotStore, Stored};
pub use validate::{Downgrade, Validation, validate};

/// Where the current snapshot's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeStatus {
    /// Fresh parse that passed validation untouched.
    Ok,
    /// Fresh parse with at least one field dropped or corrected.
    OkDowngraded,
    /// Every source failed; the previous snapshot was kept.
    FailedKeptExisting,
    /// Supplied by an operator.
    Manual,
    /// Nothing has been persisted yet.
    #[default]
    NoData,
}

impl ScrapeStatus {
    /// Whether the data originates from a scrape, fresh or retained.
    pub fn from_scrape(self) -> bool {
        matches!(self, Self::Ok | Self::OkDowngraded | Self::FailedKeptExisting)
    }
}

impl fmt::Display for ScrapeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "ok",
            Self::OkDowngraded => "ok_downgraded",
            Self::FailedKeptExisting => "failed_kept_existing",
            Self::Manual => "manual",
            Self::NoData => "no_data",
        })
    }
}

/// Milestone groups reached by competitors.
///
/// `merge` and `final3` are sets and serialize sorted; `jury` is in boot
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Milestones {
    pub merge: BTreeSet<MemberKey>,
    pub jury: Vec<MemberKey>,
    pub final3: BTreeSet<MemberKey>,
    pub winner: Option<MemberKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub episode: u32,
    /// Eliminated members in chronological order.
    #[serde(default)]
    pub eliminated: Vec<MemberKey>,
    #[serde(default)]
    pub milestones: Milestones,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scrape_status: ScrapeStatus,
}

impl Snapshot {
    /// Whether the snapshot carries any season progress at all.
    pub fn is_useful(&self) -> bool {
        self.episode > 0 || !self.eliminated.is_empty()
    }

    /// Copy of `self` marked as retained after a failed run.
    ///
    /// Only the status changes; in particular `last_updated` keeps pointing at
    /// the run that actually produced the data.
    pub fn retained(&self) -> Self {
        Self {
            scrape_status: ScrapeStatus::FailedKeptExisting,
            ..self.clone()
        }
    }

    /// Operator-supplied snapshot, stamped as manual.
    pub fn into_manual(mut self, now: DateTime<Utc>) -> Self {
        self.scrape_status = ScrapeStatus::Manual;
        self.last_updated.get_or_insert(now);
        self
    }
}

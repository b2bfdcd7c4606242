use tracing::warn;

use super::{ScrapeStatus, Snapshot};

/// A field-level correction applied by [`validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Downgrade {
    /// More eliminations than two per episode; the list was discarded.
    ContaminatedEliminated { eliminated: usize, episode: u32 },
    /// The episode counter went backwards and was restored.
    EpisodeRegressed { parsed: u32, previous: u32 },
    /// The eliminated list shrank; the previous list and milestones were
    /// restored together.
    EliminatedRegressed { parsed: usize, previous: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub snapshot: Snapshot,
    pub downgrades: Vec<Downgrade>,
}

/// Plausibility checks on a freshly assembled snapshot.
///
/// This is a coarse filter, not a proof of correctness: an eliminated list
/// longer than twice the episode count almost always means rows from another
/// season leaked into the table, so it is dropped while the episode counter
/// and milestones are kept. Against a previous scraped snapshot the episode
/// counter and eliminated list may not shrink. A shrunken list brings back
/// the previous milestones as well, so nobody is both eliminated and still
/// counted in the merge.
pub fn validate(mut snapshot: Snapshot, previous: Option<&Snapshot>) -> Validation {
    let mut downgrades = Vec::new();

    let episode = snapshot.episode;
    let contaminated =
        episode > 0 && snapshot.eliminated.len() > (episode as usize).saturating_mul(2);
    if contaminated {
        warn!(
            eliminated = snapshot.eliminated.len(),
            episode, "Eliminated list implausibly long, discarding it"
        );
        downgrades.push(Downgrade::ContaminatedEliminated {
            eliminated: snapshot.eliminated.len(),
            episode,
        });
        snapshot.eliminated.clear();
    }

    if let Some(previous) = previous.filter(|p| p.scrape_status.from_scrape()) {
        if snapshot.episode < previous.episode {
            warn!(
                parsed = snapshot.episode,
                previous = previous.episode,
                "Episode counter went backwards, keeping previous value"
            );
            downgrades.push(Downgrade::EpisodeRegressed {
                parsed: snapshot.episode,
                previous: previous.episode,
            });
            snapshot.episode = previous.episode;
        }

        if !contaminated && snapshot.eliminated.len() < previous.eliminated.len() {
            warn!(
                parsed = snapshot.eliminated.len(),
                previous = previous.eliminated.len(),
                "Eliminated list shrank, keeping previous list"
            );
            downgrades.push(Downgrade::EliminatedRegressed {
                parsed: snapshot.eliminated.len(),
                previous: previous.eliminated.len(),
            });
            snapshot.eliminated = previous.eliminated.clone();
            snapshot.milestones = previous.milestones.clone();
        }
    }

    if !downgrades.is_empty() {
        snapshot.scrape_status = ScrapeStatus::OkDowngraded;
    }

    Validation {
        snapshot,
        downgrades,
    }
}

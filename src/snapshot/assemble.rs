use std::collections::BTreeSet;

use tracing::warn;

use super::{Milestones, ScrapeStatus, Snapshot};
use crate::finish::{self, Day, FinishCategory};
use crate::parser::RowRecord;
use crate::roster::MemberKey;

/// Something odd in the parsed rows that did not stop assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// More than one row claims the win; no winner is recorded.
    AmbiguousWinner(Vec<MemberKey>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub snapshot: Snapshot,
    pub anomalies: Vec<Anomaly>,
}

/// Aggregate classified rows into a snapshot.
///
/// The result has no timestamp and status [`ScrapeStatus::Ok`], or
/// [`ScrapeStatus::OkDowngraded`] when an anomaly was found. Merge membership
/// is jury ∪ final three ∪ still active: pre-merge boots are assumed never to
/// carry a jury marker.
pub fn assemble(rows: &[RowRecord]) -> Assembly {
    let mut eliminated: Vec<(Day, &MemberKey)> = Vec::new();
    let mut jury: Vec<(Day, &MemberKey)> = Vec::new();
    let mut final3 = BTreeSet::new();
    let mut winners = Vec::new();
    let mut active = BTreeSet::new();
    let mut episode = 0;

    for row in rows {
        let (category, day) = finish::classify(&row.finish);
        if category.is_eliminated() {
            eliminated.push((day, &row.member));
            if category == FinishCategory::JuryVotedOut {
                jury.push((day, &row.member));
            }
            if let Some(ordinal) = finish::boot_ordinal(&row.finish) {
                episode = episode.max(ordinal);
            }
        } else if category.is_finalist() {
            final3.insert(row.member.clone());
            if category == FinishCategory::Winner {
                winners.push(row.member.clone());
            }
        } else {
            active.insert(row.member.clone());
        }
    }

    eliminated.sort();
    jury.sort();

    let mut anomalies = Vec::new();
    let winner = match winners.len() {
        0 => None,
        1 => winners.pop(),
        _ => {
            warn!(winners = ?winners, "Multiple winners classified, leaving winner empty");
            anomalies.push(Anomaly::AmbiguousWinner(winners));
            None
        }
    };

    let jury: Vec<MemberKey> = jury.into_iter().map(|(_, key)| key.clone()).collect();
    let merge = jury
        .iter()
        .cloned()
        .chain(final3.iter().cloned())
        .chain(active)
        .collect();

    let snapshot = Snapshot {
        episode,
        eliminated: eliminated.into_iter().map(|(_, key)| key.clone()).collect(),
        milestones: Milestones {
            merge,
            jury,
            final3,
            winner,
        },
        last_updated: None,
        scrape_status: if anomalies.is_empty() {
            ScrapeStatus::Ok
        } else {
            ScrapeStatus::OkDowngraded
        },
    };

    Assembly {
        snapshot,
        anomalies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finish::extract_day;

    fn row(member: &str, finish: &str) -> RowRecord {
        RowRecord {
            member: MemberKey::new(member),
            finish: finish.to_owned(),
            day: extract_day(finish),
        }
    }

    fn keys(names: &[&str]) -> Vec<MemberKey> {
        names.iter().map(|n| MemberKey::new(*n)).collect()
    }

    #[test]
    fn eliminated_is_sorted_by_day_with_unknown_last() {
        let rows = [
            row("C", "3rd Voted Out Day 8"),
            row("Q", "Quit"),
            row("A", "1st Voted Out Day 3"),
            row("B", "2nd Voted Out Day 5"),
        ];
        let snapshot = assemble(&rows).snapshot;
        assert_eq!(snapshot.eliminated, keys(&["A", "B", "C", "Q"]));
        assert_eq!(snapshot.episode, 3);
    }

    #[test]
    fn same_day_ties_break_on_member_key() {
        let rows = [
            row("Zed", "4th Voted Out Day 11"),
            row("Amy", "Evacuated Day 11"),
        ];
        assert_eq!(assemble(&rows).snapshot.eliminated, keys(&["Amy", "Zed"]));
    }

    #[test]
    fn milestones() {
        let rows = [
            row("Pre", "1st Voted Out Day 3"),
            row("J1", "8th Voted Out 1st Jury Member Day 17"),
            row("J2", "9th Voted Out 2nd Jury Member Day 19"),
            row("Active", ""),
            row("Runner", "Runner-Up Day 26"),
            row("Champ", "Sole Survivor Day 26"),
        ];
        let Assembly {
            snapshot,
            anomalies,
        } = assemble(&rows);

        assert!(anomalies.is_empty());
        assert_eq!(snapshot.scrape_status, ScrapeStatus::Ok);
        assert_eq!(snapshot.episode, 9);
        assert_eq!(snapshot.eliminated, keys(&["Pre", "J1", "J2"]));
        assert_eq!(snapshot.milestones.jury, keys(&["J1", "J2"]));
        assert_eq!(
            snapshot.milestones.final3,
            BTreeSet::from_iter(keys(&["Champ", "Runner"]))
        );
        assert_eq!(snapshot.milestones.winner, Some(MemberKey::new("Champ")));
        assert_eq!(
            snapshot.milestones.merge,
            BTreeSet::from_iter(keys(&["Active", "Champ", "J1", "J2", "Runner"]))
        );
    }

    #[test]
    fn winner_is_always_a_finalist() {
        let rows = [row("Champ", "Sole Survivor"), row("X", "2nd Runner-Up")];
        let milestones = assemble(&rows).snapshot.milestones;
        let winner = milestones.winner.unwrap();
        assert!(milestones.final3.contains(&winner));
    }

    #[test]
    fn multiple_winners_are_an_anomaly() {
        let rows = [row("A", "Sole Survivor"), row("B", "Sole Survivor")];
        let Assembly {
            snapshot,
            anomalies,
        } = assemble(&rows);
        assert_eq!(snapshot.milestones.winner, None);
        assert_eq!(snapshot.milestones.final3.len(), 2);
        assert_eq!(snapshot.scrape_status, ScrapeStatus::OkDowngraded);
        assert_eq!(anomalies, vec![Anomaly::AmbiguousWinner(keys(&["A", "B"]))]);
    }

    #[test]
    fn episode_defaults_to_zero_without_ordinals() {
        let rows = [row("A", "Quit Day 2"), row("B", "")];
        let snapshot = assemble(&rows).snapshot;
        assert_eq!(snapshot.episode, 0);
        assert_eq!(snapshot.eliminated, keys(&["A"]));
    }

    #[test]
    fn ordinals_outside_the_voted_out_family_are_ignored() {
        // A still-active row cannot move the episode counter
        let rows = [row("A", "Day 30"), row("B", "2nd Voted Out Day 6")];
        assert_eq!(assemble(&rows).snapshot.episode, 2);
    }

    #[test]
    fn empty_rows() {
        let snapshot = assemble(&[]).snapshot;
        assert!(!snapshot.is_useful());
        assert_eq!(snapshot.milestones, Milestones::default());
    }
}

//! Finish-text classification.
//!
//! The "finish" column of a castaway table is free text such as
//! `"3rd Voted Out Day 8"`, `"8th Voted Out 2nd Jury Member Day 24"` or
//! `"Sole Survivor Day 26"`. [`classify`] maps any such string onto exactly one
//! [`FinishCategory`] plus the day it happened on.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Outcome of a competitor as far as the finish text tells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishCategory {
    StillActive,
    VotedOut,
    JuryVotedOut,
    RunnerUp,
    Winner,
}

impl FinishCategory {
    /// Whether the competitor left the game before the finale.
    pub fn is_eliminated(self) -> bool {
        matches!(self, Self::VotedOut | Self::JuryVotedOut)
    }

    pub fn is_finalist(self) -> bool {
        matches!(self, Self::RunnerUp | Self::Winner)
    }
}

/// Day number of an exit. Known days sort before `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Day {
    Known(u32),
    Unknown,
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(n) => write!(f, "day {n}"),
            Self::Unknown => f.write_str("unknown day"),
        }
    }
}

/// Keywords for the voted-out family, in the order they are tested.
const EXIT_KEYWORDS: &[&str] = &["voted out", "evacuated", "eliminated", "quit", "medevac"];

static DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bday\s+(\d+)\b").expect("valid day regex"));

static ORDINAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+)(?:st|nd|rd|th)\s+(?:voted\s+out|evacuated|eliminated|quit|medevac)")
        .expect("valid ordinal regex")
});

static RUNNER_UP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)runner[\s-]up").expect("valid runner-up regex"));

/// Classify a finish string. Total over all inputs.
///
/// ```
/// use survivor_pool::finish::{classify, Day, FinishCategory};
///
/// assert_eq!(
///     classify("8th Voted Out 1st Jury Member Day 19"),
///     (FinishCategory::JuryVotedOut, Day::Known(19))
/// );
/// assert_eq!(classify(""), (FinishCategory::StillActive, Day::Unknown));
/// ```
pub fn classify(text: &str) -> (FinishCategory, Day) {
    let day = extract_day(text);
    let lower = text.to_lowercase();

    let category = if lower.contains("sole survivor") {
        FinishCategory::Winner
    } else if RUNNER_UP_RE.is_match(&lower) {
        FinishCategory::RunnerUp
    } else if EXIT_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        if lower.contains("jury") {
            FinishCategory::JuryVotedOut
        } else {
            FinishCategory::VotedOut
        }
    } else {
        FinishCategory::StillActive
    };

    (category, day)
}

/// Extract the `Day N` token, if any.
pub fn extract_day(text: &str) -> Day {
    DAY_RE
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
        .map_or(Day::Unknown, Day::Known)
}

/// Extract the boot ordinal from text like `"5th Voted Out"`.
pub fn boot_ordinal(text: &str) -> Option<u32> {
    ORDINAL_RE
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse().ok())
        .max()
}

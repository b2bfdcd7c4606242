//! Error types for the wiki client.

use std::fmt;

/// Why a page could not be fetched.
#[derive(Debug, thiserror::Error)]
pub enum FetchFailure {
    /// The wiki says the page does not exist. Not worth retrying this title.
    #[error("page \"{title}\" not found: {reason}")]
    NotFound { title: String, reason: String },
    /// Timeout, connection trouble or a server-side error.
    #[error("request for \"{title}\" failed")]
    Transient {
        title: String,
        #[source]
        source: anyhow::Error,
    },
    /// The response parsed but did not carry the page text.
    #[error("unexpected response for \"{title}\": {reason}")]
    Malformed { title: String, reason: String },
}

/// Payload-free discriminant of [`FetchFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailureKind {
    NotFound,
    Transient,
    Malformed,
}

impl FetchFailure {
    pub fn kind(&self) -> FetchFailureKind {
        match self {
            Self::NotFound { .. } => FetchFailureKind::NotFound,
            Self::Transient { .. } => FetchFailureKind::Transient,
            Self::Malformed { .. } => FetchFailureKind::Malformed,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::NotFound { title, .. }
            | Self::Transient { title, .. }
            | Self::Malformed { title, .. } => title,
        }
    }
}

impl fmt::Display for FetchFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotFound => "not_found",
            Self::Transient => "transient",
            Self::Malformed => "malformed",
        })
    }
}

//! Upstream correctness reporting consumed by sequence histories.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a data source is (or is not) bad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub enum BadnessReason {
    /// Data is complete and current.
    #[default]
    NotBad,
    /// The source has not been activated yet.
    Inactive,
    /// The source is synchronising; data may still change.
    Synchronising,
    /// Data is stale but explicitly allowed to be used.
    Stale,
    /// The connection to the source is down.
    ConnectionOffline,
    /// The source reported an error.
    SourceError,
}

impl BadnessReason {
    /// Correctness implied by this reason.
    #[must_use]
    pub const fn correctness(self) -> Correctness {
        match self {
            Self::NotBad => Correctness::Good,
            Self::Stale => Correctness::Usable,
            Self::Synchronising => Correctness::Suspect,
            Self::Inactive | Self::ConnectionOffline | Self::SourceError => Correctness::Error,
        }
    }
}

/// Coarse correctness of a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Correctness {
    /// Fully correct.
    Good,
    /// Suspect but explicitly usable.
    Usable,
    /// May be wrong; do not use.
    Suspect,
    /// Wrong.
    Error,
}

impl Correctness {
    /// Good or explicitly usable.
    #[must_use]
    pub const fn is_usable(self) -> bool {
        matches!(self, Self::Good | Self::Usable)
    }
}

/// A badness report: reason code plus free-text detail.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Badness {
    /// Reason code.
    pub reason: BadnessReason,
    /// Free-text detail supplied by the reporter.
    pub reason_extra: String,
}

impl Badness {
    /// The "all good" report.
    pub const NOT_BAD: Self = Self {
        reason: BadnessReason::NotBad,
        reason_extra: String::new(),
    };

    /// Build a report.
    pub fn new(reason: BadnessReason, reason_extra: impl Into<String>) -> Self {
        Self {
            reason,
            reason_extra: reason_extra.into(),
        }
    }

    /// Correctness implied by the reason.
    #[must_use]
    pub const fn correctness(&self) -> Correctness {
        self.reason.correctness()
    }

    /// Whether the report is [`Badness::NOT_BAD`]-equivalent.
    #[must_use]
    pub const fn is_good(&self) -> bool {
        matches!(self.reason, BadnessReason::NotBad)
    }
}

impl fmt::Display for Badness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason_extra.is_empty() {
            write!(f, "{:?}", self.reason)
        } else {
            write!(f, "{:?}: {}", self.reason, self.reason_extra)
        }
    }
}

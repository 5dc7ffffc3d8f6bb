use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the tickseq workspace.
///
/// Configuration and argument problems are recoverable. The remaining variants
/// report a broken sequencer contract: the caller drove the sequencer into a
/// state its invariants forbid. Each of those carries a stable diagnostic code
/// (see [`SequenceError::code`]).
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SequenceError {
    /// A configuration value is out of range or inconsistent.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Invalid input argument.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// The history is already registered with this sequencer.
    #[error("history {history} is already registered")]
    HistoryAlreadyRegistered {
        /// Identifier of the history.
        history: u64,
    },

    /// The history is not registered with this sequencer.
    #[error("history {history} is not registered")]
    HistoryNotRegistered {
        /// Identifier of the history.
        history: u64,
    },

    /// The all-histories-usable timeout fired while it was not active.
    #[error("usable timeout processed while inactive (transaction {transaction_id})")]
    UsableTimeoutInactive {
        /// Transaction id carried by the timer callback.
        transaction_id: u64,
    },

    /// A chained next-interval start could not be computed although a point exists.
    #[error("next interval start undefined after {after} (offset {offset})")]
    NextIntervalUndefined {
        /// RFC 3339 rendering of the tick that requested the next interval.
        after: String,
        /// Interval offset that could not be computed.
        offset: u32,
    },

    /// Unknown/opaque error.
    #[error("unknown error: {0}")]
    Other(String),
}

impl SequenceError {
    /// Helper: build an `InvalidConfig` error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Helper: build an `InvalidArg` error.
    pub fn invalid_arg(msg: impl Into<String>) -> Self {
        Self::InvalidArg(msg.into())
    }

    /// Helper: build a `NextIntervalUndefined` error.
    pub fn next_interval_undefined(after: impl Into<String>, offset: u32) -> Self {
        Self::NextIntervalUndefined {
            after: after.into(),
            offset,
        }
    }

    /// Returns true if this error reports a violated sequencer contract rather
    /// than bad input.
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::HistoryAlreadyRegistered { .. }
                | Self::HistoryNotRegistered { .. }
                | Self::UsableTimeoutInactive { .. }
                | Self::NextIntervalUndefined { .. }
        )
    }

    /// Stable diagnostic code for contract violations; `None` for ordinary errors.
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::HistoryAlreadyRegistered { .. } => Some("HSRH10021"),
            Self::HistoryNotRegistered { .. } => Some("HSDH10022"),
            Self::UsableTimeoutInactive { .. } => Some("HSPAHUT10023"),
            Self::NextIntervalUndefined { .. } => Some("IHSATN10031"),
            Self::InvalidConfig(_) | Self::InvalidArg(_) | Self::Other(_) => None,
        }
    }
}

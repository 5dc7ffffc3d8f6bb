//! Tickseq-specific configuration, tick model and error primitives shared across the workspace.
#![warn(missing_docs)]

mod badness;
mod config;
mod error;
mod tick;

pub use badness::{Badness, BadnessReason, Correctness};
pub use config::{
    DEFAULT_USABLE_TIMEOUT, HistorySequencerConfig, IntervalSequencerConfig, IntervalSpec,
    IntervalUnit, SeriesVisibility,
};
pub use error::SequenceError;
pub use tick::{OhlcValues, SourceDateTime, Tick, TickData, compare_repeatable};

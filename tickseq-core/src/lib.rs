//! tickseq-core
//!
//! Sequencers, sequence series and the history registration protocol.
//!
//! - `sequencer`: interval and repeatable-exact sequencers plus the
//!   `HistorySequencer` coordinator that batches history changes and reloads.
//! - `series`: incremental reducers (close, last, OHLC, current value) kept
//!   aligned with a sequencer's points.
//! - `history`: the contract a tick source implements to be registered.
//! - `event` and `list`: the notification and sorted-storage primitives
//!   underneath.
//!
//! Ownership
//! ---------
//! Everything here is single-threaded and built on `Rc`/`RefCell`. A sequencer
//! reaches its series through weak references, handlers are snapshotted
//! before each notification, and payloads are passed by value, so a listener
//! never has to borrow its emitter back. Timer work is not run here: the
//! coordinator queues [`SequencerAction`]s for an async host to execute.
#![warn(missing_docs)]

/// Multicast notifications with stable subscription ids.
pub mod event;
/// History contract and usability status.
pub mod history;
/// Ordered storage with append-friendly growth.
pub mod list;
pub mod sequencer;
pub mod series;

pub use tickseq_types as types;
pub use tickseq_types::SequenceError;

pub use event::{MultiEvent, Notification, SubscriptionId};
pub use history::{HistoryRef, HistoryStatus, SequenceHistory, UsabilityChange};
pub use list::ComparableList;
pub use sequencer::{
    HistoryId, HistorySequencer, HistorySequencerEvent, IntervalHistorySequencer, IntervalPoint,
    IntervalSequencer, LoadingFlag, RepeatableExactHistorySequencer, RepeatableExactPoint,
    RepeatableExactSequencer, SequencerAction, SequencerCore, SequencerEvents, SequencerListener,
    SeriesBinding,
};
pub use series::{
    ClosePoint, CloseSeries, CurrentRepeatableExactSeries, CurrentValuePoint,
    HistorySequenceSeries, LastPoint, LastSeries, OhlcPoint, OhlcSeries, SeriesCore, SeriesRef,
    SeriesView, StagedTick,
};
pub use types::{
    Badness, BadnessReason, Correctness, HistorySequencerConfig, IntervalSequencerConfig,
    IntervalSpec, IntervalUnit, OhlcValues, SeriesVisibility, SourceDateTime, Tick, TickData,
};

/// Everything needed to build and drive a sequencer with its series.
pub mod prelude {
    pub use crate::{
        Badness, BadnessReason, CloseSeries, CurrentRepeatableExactSeries, HistoryId,
        HistorySequenceSeries, HistorySequencer, HistorySequencerConfig, HistoryStatus,
        IntervalHistorySequencer, IntervalSequencer, IntervalSequencerConfig, IntervalSpec,
        IntervalUnit, LastSeries, OhlcSeries, RepeatableExactHistorySequencer,
        RepeatableExactSequencer, SequenceError, SequenceHistory, SequencerAction, SequencerCore,
        SeriesRef, SeriesView, SeriesVisibility, SourceDateTime, Tick, TickData,
    };
}

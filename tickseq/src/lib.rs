//! tickseq turns an ordered stream of market ticks into aligned, bucketed
//! series.
//!
//! Overview
//! - A sequencer decides which boundary point each tick belongs to: fixed
//!   calendar/clock intervals (`IntervalSequencer`) or one point per distinct
//!   `(instant, repeat index)` (`RepeatableExactSequencer`).
//! - Series (`CloseSeries`, `LastSeries`, `OhlcSeries`,
//!   `CurrentRepeatableExactSeries`) are bound to a sequencer and stay aligned
//!   with its points, 1:1.
//! - Histories own series and report their usability; the `HistorySequencer`
//!   coordinator batches registrations and badness changes and rebuilds every
//!   series when the set of usable histories changes.
//! - `SequencerHost` runs the coordinator's debounce timer on tokio.
//!
//! Key behaviors
//! - Gaps between intervals are padded with null points unless
//!   `skip_empty_periods` is set; with `skip_weekends` Saturday and Sunday do
//!   not exist for daily intervals.
//! - While one history is unusable the coordinator waits for it. With more
//!   than one unusable it arms a timeout (default 1500 ms) and reloads with
//!   whatever is usable when it fires.
//! - Reloads are silent at series level; subscribe to
//!   `HistorySequencerEvent::AllEngineSeriesLoaded` instead.
//!
//! Example
//! ```rust,ignore
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use tickseq::{CloseSeries, IntervalSequencerConfig, SequencerHost, SeriesRef};
//!
//! let mut host = SequencerHost::builder()
//!     .build_interval(IntervalSequencerConfig::new("60000ms".parse()?))?;
//! let close = Rc::new(RefCell::new(CloseSeries::default()));
//! host.sequencer_mut().core_mut().bind_series(&close);
//!
//! let series: Vec<SeriesRef<_>> = vec![close.clone()];
//! host.ingest(&series, &tick)?;
//! ```
#![warn(missing_docs)]

mod host;
mod timer;

pub use host::{SequencerHost, SequencerHostBuilder};

pub use tickseq_core::{
    ClosePoint, CloseSeries, CurrentRepeatableExactSeries, CurrentValuePoint, HistoryId,
    HistoryRef, HistorySequenceSeries, HistorySequencer, HistorySequencerEvent, HistoryStatus,
    IntervalHistorySequencer, IntervalPoint, IntervalSequencer, LastPoint, LastSeries, OhlcPoint,
    OhlcSeries, RepeatableExactHistorySequencer, RepeatableExactPoint, RepeatableExactSequencer,
    SequenceHistory, SequencerAction, SequencerCore, SeriesBinding, SeriesRef, SeriesView,
    UsabilityChange,
};
pub use tickseq_types::{
    Badness, BadnessReason, Correctness, DEFAULT_USABLE_TIMEOUT, HistorySequencerConfig,
    IntervalSequencerConfig, IntervalSpec, IntervalUnit, OhlcValues, SequenceError,
    SeriesVisibility, SourceDateTime, Tick, TickData,
};

//! Test doubles for tickseq: fixture tick streams and a history that replays
//! recorded ticks into its series.
#![warn(missing_docs)]

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tickseq_core::types::{Badness, Tick};
use tickseq_core::{HistoryStatus, SequenceError, SequenceHistory, SequencerCore, SeriesBinding};

pub mod fixtures;

pub use tickseq_core::SeriesRef;

/// How [`RecordedHistory`] behaves when the coordinator reloads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadBehavior {
    /// Replay every recorded tick.
    Replay,
    /// Fail both load passes with the provided error.
    Fail(SequenceError),
}

/// A [`SequenceHistory`] backed by an in-memory tick list.
///
/// Works with either sequencer kind: `P` is the sequencer's point type. The
/// caller binds the series to the sequencer and may hand the bindings over
/// with [`RecordedHistory::with_binding`], so deregistering the history
/// detaches them. The history stages ticks into its series and replays its
/// ticks on reload.
pub struct RecordedHistory<P: 'static> {
    status: HistoryStatus,
    ticks: Vec<Tick>,
    series: Vec<SeriesRef<P>>,
    bindings: Vec<SeriesBinding>,
    behavior: LoadBehavior,
    tick_loads: usize,
    series_loads: usize,
}

impl<P: 'static> fmt::Debug for RecordedHistory<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordedHistory")
            .field("status", &self.status)
            .field("ticks", &self.ticks.len())
            .field("series", &self.series.len())
            .field("behavior", &self.behavior)
            .finish_non_exhaustive()
    }
}

impl<P: 'static> RecordedHistory<P> {
    /// New history holding `ticks`. It starts inactive, i.e. unusable.
    #[must_use]
    pub fn new(ticks: Vec<Tick>) -> Self {
        Self {
            status: HistoryStatus::new(),
            ticks,
            series: Vec::new(),
            bindings: Vec::new(),
            behavior: LoadBehavior::Replay,
            tick_loads: 0,
            series_loads: 0,
        }
    }

    /// New history holding `ticks` that is already good.
    #[must_use]
    pub fn good(ticks: Vec<Tick>) -> Self {
        let mut history = Self::new(ticks);
        history.status.set_good();
        history
    }

    /// Attach a series.
    #[must_use]
    pub fn with_series(mut self, series: SeriesRef<P>) -> Self {
        self.series.push(series);
        self
    }

    /// Own the sequencer binding of one attached series.
    #[must_use]
    pub fn with_binding(mut self, binding: SeriesBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Set the reload behaviour.
    #[must_use]
    pub fn with_behavior(mut self, behavior: LoadBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Replace the status badness without going through a coordinator.
    #[must_use]
    pub fn with_badness(mut self, badness: Badness) -> Self {
        self.status.set_badness(badness);
        self
    }

    /// Wrap in the shared handle the coordinator expects.
    #[must_use]
    pub fn shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    /// Append a tick to the recording; it is replayed on the next reload.
    pub fn record(&mut self, tick: Tick) {
        self.ticks.push(tick);
    }

    /// Recorded ticks.
    #[must_use]
    pub fn ticks(&self) -> &[Tick] {
        &self.ticks
    }

    /// Attached series.
    #[must_use]
    pub fn series(&self) -> &[SeriesRef<P>] {
        &self.series
    }

    /// How many times pass one ran.
    #[must_use]
    pub const fn tick_loads(&self) -> usize {
        self.tick_loads
    }

    /// How many times pass two ran.
    #[must_use]
    pub const fn series_loads(&self) -> usize {
        self.series_loads
    }

    /// Stage `tick` into every attached series.
    pub fn stage(&self, tick: &Tick) {
        for series in &self.series {
            series.borrow_mut().stage_tick(tick);
        }
    }

    /// Drop any staged tick from every attached series.
    pub fn discard_staged(&self) {
        for series in &self.series {
            series.borrow_mut().discard_staged_tick();
        }
    }

    fn check_behavior(&self) -> Result<(), SequenceError> {
        match &self.behavior {
            LoadBehavior::Replay => Ok(()),
            LoadBehavior::Fail(err) => Err(err.clone()),
        }
    }
}

impl<S: SequencerCore> SequenceHistory<S> for RecordedHistory<S::Point> {
    fn status(&self) -> &HistoryStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut HistoryStatus {
        &mut self.status
    }

    fn take_series_bindings(&mut self) -> Vec<SeriesBinding> {
        std::mem::take(&mut self.bindings)
    }

    fn clear_series(&mut self) {
        for series in &self.series {
            series.borrow_mut().clear();
        }
    }

    fn initialise_series(&mut self, boundaries: &[S::Point]) {
        for series in &self.series {
            series.borrow_mut().initialise_with_null_points(boundaries);
        }
    }

    fn load_all_tick_date_times(&mut self, sequencer: &mut S) -> Result<(), SequenceError> {
        self.check_behavior()?;
        self.tick_loads += 1;
        for tick in &self.ticks {
            sequencer.add_date_time(tick.date_time, tick.repeat_index);
        }
        Ok(())
    }

    fn load_all_engine_series(&mut self, sequencer: &mut S) -> Result<(), SequenceError> {
        self.check_behavior()?;
        self.series_loads += 1;
        for tick in &self.ticks {
            self.stage(tick);
            match sequencer.add_tick(tick.date_time, tick.repeat_index) {
                Ok(true) => {}
                Ok(false) => self.discard_staged(),
                Err(err) => {
                    self.discard_staged();
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}

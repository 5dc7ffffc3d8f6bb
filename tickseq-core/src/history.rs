//! Sequence histories: owners of a set of series plus a usability state.
//!
//! A history reports usability transitions to its [`HistorySequencer`]
//! (`set_history_badness`), which batches them and decides when to reload.
//!
//! [`HistorySequencer`]: crate::sequencer::HistorySequencer

use std::cell::RefCell;
use std::rc::Rc;

use crate::SequenceError;
use crate::sequencer::{SequencerCore, SeriesBinding};
use crate::types::{Badness, BadnessReason, Correctness};

/// Usability transition produced by a badness change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsabilityChange {
    /// Usability did not change.
    Unchanged,
    /// The history can now be loaded.
    BecameUsable,
    /// The history can no longer be loaded.
    BecameUnusable,
}

/// Correctness and usability of one history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStatus {
    badness: Badness,
    all_series_loaded: bool,
}

impl Default for HistoryStatus {
    fn default() -> Self {
        Self {
            badness: Badness::new(BadnessReason::Inactive, ""),
            all_series_loaded: false,
        }
    }
}

impl HistoryStatus {
    /// New histories start inactive (unusable) until a source reports.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current badness report.
    #[must_use]
    pub const fn badness(&self) -> &Badness {
        &self.badness
    }

    /// Correctness implied by the badness.
    #[must_use]
    pub const fn correctness(&self) -> Correctness {
        self.badness.correctness()
    }

    /// Good or explicitly usable.
    #[must_use]
    pub const fn usable(&self) -> bool {
        self.correctness().is_usable()
    }

    /// Whether the last reload filled this history's series.
    #[must_use]
    pub const fn all_series_loaded(&self) -> bool {
        self.all_series_loaded
    }

    pub(crate) fn set_all_series_loaded(&mut self, loaded: bool) {
        self.all_series_loaded = loaded;
    }

    /// Replace the badness report.
    pub fn set_badness(&mut self, badness: Badness) -> UsabilityChange {
        let was_usable = self.usable();
        self.badness = badness;
        match (was_usable, self.usable()) {
            (false, true) => UsabilityChange::BecameUsable,
            (true, false) => UsabilityChange::BecameUnusable,
            _ => UsabilityChange::Unchanged,
        }
    }

    /// Report a problem. A `NotBad` report is coerced to `SourceError` so the
    /// history is guaranteed to end up unusable.
    pub fn set_unusable(&mut self, badness: Badness) -> UsabilityChange {
        let badness = if badness.is_good() {
            Badness::new(BadnessReason::SourceError, badness.reason_extra)
        } else {
            badness
        };
        self.set_badness(badness)
    }

    /// Clear every problem.
    pub fn set_good(&mut self) -> UsabilityChange {
        self.set_badness(Badness::NOT_BAD)
    }
}

/// A set of series fed from one tick source and loaded by a sequencer of
/// kind `S`.
///
/// The coordinator drives a reload in two passes: first every usable history
/// adds its tick instants ([`SequenceHistory::load_all_tick_date_times`]) so
/// the sequencer knows every boundary, then every series is initialised with
/// null points and every usable history replays its ticks
/// ([`SequenceHistory::load_all_engine_series`]).
pub trait SequenceHistory<S: SequencerCore> {
    /// Correctness and load state.
    fn status(&self) -> &HistoryStatus;

    /// Mutable status, used by the coordinator. A change made here directly
    /// is only counted once the coordinator's `refresh_history_usability`
    /// runs; prefer the coordinator's `set_history_*` calls.
    fn status_mut(&mut self) -> &mut HistoryStatus;

    /// Hand over the sequencer bindings of the owned series. Called when the
    /// history is deregistered so the coordinator can detach them before the
    /// next reload.
    fn take_series_bindings(&mut self) -> Vec<SeriesBinding> {
        Vec::new()
    }

    /// Empty every owned series.
    fn clear_series(&mut self);

    /// Reset every owned series to one null point per boundary.
    fn initialise_series(&mut self, boundaries: &[S::Point]);

    /// Pass one: register every tick instant with the sequencer.
    ///
    /// # Errors
    /// Propagates sequencer contract violations.
    fn load_all_tick_date_times(&mut self, sequencer: &mut S) -> Result<(), SequenceError>;

    /// Pass two: replay every tick into the owned series.
    ///
    /// # Errors
    /// Propagates sequencer contract violations.
    fn load_all_engine_series(&mut self, sequencer: &mut S) -> Result<(), SequenceError>;

    /// Shorthand for `status().usable()`.
    fn usable(&self) -> bool {
        self.status().usable()
    }
}

/// Shared handle to a registered history.
pub type HistoryRef<S> = Rc<RefCell<dyn SequenceHistory<S>>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unusable_and_reports_transitions() {
        let mut status = HistoryStatus::new();
        assert!(!status.usable());
        assert_eq!(status.set_good(), UsabilityChange::BecameUsable);
        assert_eq!(status.set_good(), UsabilityChange::Unchanged);
        assert_eq!(
            status.set_badness(Badness::new(BadnessReason::Stale, "delayed")),
            UsabilityChange::Unchanged
        );
        assert_eq!(status.correctness(), Correctness::Usable);
        assert_eq!(
            status.set_badness(Badness::new(BadnessReason::Synchronising, "")),
            UsabilityChange::BecameUnusable
        );
        assert_eq!(status.correctness(), Correctness::Suspect);
    }

    #[test]
    fn set_unusable_never_stays_good() {
        let mut status = HistoryStatus::new();
        status.set_good();
        let change = status.set_unusable(Badness::new(BadnessReason::NotBad, "feed lost"));
        assert_eq!(change, UsabilityChange::BecameUnusable);
        assert_eq!(status.badness().reason, BadnessReason::SourceError);
        assert_eq!(status.badness().reason_extra, "feed lost");
    }
}

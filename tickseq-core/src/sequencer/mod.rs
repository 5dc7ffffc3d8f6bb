//! Sequencers turn a tick timeline into an ordered list of boundary points.
//!
//! - [`IntervalSequencer`]: one point per calendar/clock interval, optional
//!   gap padding, and a "next interval" chain for look-back series.
//! - [`RepeatableExactSequencer`]: one point per `(instant, repeat index)`.
//! - [`HistorySequencer`]: coordinator wrapping either kind; brackets changes,
//!   registers histories and decides when every series is reloaded.
//!
//! Points are pushed to listeners through [`SequencerEvents`]. Handlers get the
//! index and the boundary point by value, so a listener never needs to borrow
//! the sequencer back while it is being driven.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use chrono::FixedOffset;

use crate::SequenceError;
use crate::event::{MultiEvent, SubscriptionId};
use crate::types::SourceDateTime;

mod coordinator;
mod interval;
mod repeatable_exact;

pub use coordinator::{
    HistoryId, HistorySequencer, HistorySequencerEvent, IntervalHistorySequencer,
    RepeatableExactHistorySequencer, SequencerAction,
};
pub use interval::{IntervalPoint, IntervalSequencer};
pub use repeatable_exact::{RepeatableExactPoint, RepeatableExactSequencer};

/// Handler for a single inserted or updated point. Returns `true` when the
/// listener needs the following interval as well ("next required").
pub type PointHandler<P> = dyn Fn(usize, &P) -> bool;

/// Handler for a run of inserted empty points.
pub type RangeHandler<P> = dyn Fn(usize, &[P]);

/// Shared "bulk loading in progress" flag.
///
/// Owned by a sequencer and cloned into every series bound to it so series can
/// suppress their own notifications while a full reload runs.
#[derive(Debug, Clone, Default)]
pub struct LoadingFlag(Rc<Cell<bool>>);

impl LoadingFlag {
    /// Whether a full reload is running.
    #[must_use]
    pub fn get(&self) -> bool {
        self.0.get()
    }

    pub(crate) fn set(&self, loading: bool) {
        self.0.set(loading);
    }
}

/// Operations every sequencer kind exposes to the coordinator and histories.
pub trait SequencerCore {
    /// Boundary point stored by the sequencer.
    type Point: Copy + fmt::Debug + 'static;

    /// Register a timestamp without tick data. Returns `false` when no
    /// boundary is defined for it (e.g. a weekend with weekends skipped).
    fn add_date_time(&mut self, date_time: SourceDateTime, repeat_index: u32) -> bool;

    /// Register a tick and notify listeners. `Ok(false)` when the tick has no
    /// boundary.
    ///
    /// # Errors
    /// Returns `NextIntervalUndefined` when a listener requests a following
    /// interval that cannot be computed.
    fn add_tick(
        &mut self,
        date_time: SourceDateTime,
        repeat_index: u32,
    ) -> Result<bool, SequenceError>;

    /// Remove every point.
    fn clear(&mut self);

    /// Source offset of the newest point.
    fn last_source_timezone_offset(&self) -> Option<FixedOffset>;

    /// All points in ascending order.
    fn points(&self) -> &[Self::Point];

    /// Number of points.
    fn point_count(&self) -> usize {
        self.points().len()
    }

    /// Flag raised while the coordinator reloads every series.
    fn loading_flag(&self) -> &LoadingFlag;

    /// Stop notifying a bound series. Returns whether anything was bound.
    fn unbind_series(&mut self, binding: SeriesBinding) -> bool;
}

/// Receiver side of a sequencer's notifications, implemented by series.
pub trait SequencerListener<P> {
    /// A point was inserted at `index`. Return `true` to request the next
    /// interval.
    fn on_point_inserted(&mut self, index: usize, boundary: &P) -> bool;

    /// The point at `index` received another tick. Return `true` to request
    /// the next interval.
    fn on_point_updated(&mut self, index: usize, boundary: &P) -> bool;

    /// A run of empty points was inserted starting at `index`.
    fn on_points_inserted(&mut self, index: usize, boundaries: &[P]);

    /// Receive the sequencer's loading flag when bound.
    fn attach_loading_flag(&mut self, flag: LoadingFlag);
}

/// Subscriptions created by binding a listener; pass back to unbind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesBinding {
    inserted: SubscriptionId,
    updated: SubscriptionId,
    range_inserted: SubscriptionId,
}

/// The three notifications a sequencer fires.
pub struct SequencerEvents<P: 'static> {
    point_inserted: MultiEvent<PointHandler<P>>,
    point_updated: MultiEvent<PointHandler<P>>,
    points_inserted: MultiEvent<RangeHandler<P>>,
}

impl<P: 'static> Default for SequencerEvents<P> {
    fn default() -> Self {
        Self {
            point_inserted: MultiEvent::new(),
            point_updated: MultiEvent::new(),
            points_inserted: MultiEvent::new(),
        }
    }
}

impl<P: 'static> fmt::Debug for SequencerEvents<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequencerEvents")
            .field("point_inserted", &self.point_inserted.len())
            .field("point_updated", &self.point_updated.len())
            .field("points_inserted", &self.points_inserted.len())
            .finish()
    }
}

impl<P: 'static> SequencerEvents<P> {
    /// Subscribe to single-point inserts.
    pub fn subscribe_point_inserted(&mut self, handler: Rc<PointHandler<P>>) -> SubscriptionId {
        self.point_inserted.subscribe(handler)
    }

    /// Subscribe to point updates.
    pub fn subscribe_point_updated(&mut self, handler: Rc<PointHandler<P>>) -> SubscriptionId {
        self.point_updated.subscribe(handler)
    }

    /// Subscribe to runs of inserted empty points.
    pub fn subscribe_points_inserted(&mut self, handler: Rc<RangeHandler<P>>) -> SubscriptionId {
        self.points_inserted.subscribe(handler)
    }

    /// Remove a single-point insert subscription.
    pub fn unsubscribe_point_inserted(&mut self, id: SubscriptionId) -> bool {
        self.point_inserted.unsubscribe(id)
    }

    /// Remove a point update subscription.
    pub fn unsubscribe_point_updated(&mut self, id: SubscriptionId) -> bool {
        self.point_updated.unsubscribe(id)
    }

    /// Remove an empty-run insert subscription.
    pub fn unsubscribe_points_inserted(&mut self, id: SubscriptionId) -> bool {
        self.points_inserted.unsubscribe(id)
    }

    /// Subscribe `listener` to all three events through weak references, so
    /// the sequencer never keeps a series alive.
    pub fn bind<L>(&mut self, listener: &Rc<RefCell<L>>) -> SeriesBinding
    where
        L: SequencerListener<P> + ?Sized + 'static,
    {
        let weak = Rc::downgrade(listener);
        let inserted = self.point_inserted.subscribe(Rc::new(move |index: usize, point: &P| {
            weak.upgrade()
                .is_some_and(|l| l.borrow_mut().on_point_inserted(index, point))
        }));
        let weak = Rc::downgrade(listener);
        let updated = self.point_updated.subscribe(Rc::new(move |index: usize, point: &P| {
            weak.upgrade()
                .is_some_and(|l| l.borrow_mut().on_point_updated(index, point))
        }));
        let weak = Rc::downgrade(listener);
        let range_inserted =
            self.points_inserted
                .subscribe(Rc::new(move |index: usize, points: &[P]| {
                    if let Some(l) = weak.upgrade() {
                        l.borrow_mut().on_points_inserted(index, points);
                    }
                }));
        SeriesBinding {
            inserted,
            updated,
            range_inserted,
        }
    }

    /// Undo [`SequencerEvents::bind`]. Returns `false` if nothing was bound.
    pub fn unbind(&mut self, binding: SeriesBinding) -> bool {
        let a = self.point_inserted.unsubscribe(binding.inserted);
        let b = self.point_updated.unsubscribe(binding.updated);
        let c = self.points_inserted.unsubscribe(binding.range_inserted);
        a | b | c
    }

    /// Fire point-inserted; every handler runs and their answers are OR-ed.
    pub(crate) fn notify_point_inserted(&self, index: usize, point: &P) -> bool {
        let mut next_required = false;
        for handler in self.point_inserted.handlers() {
            next_required |= handler(index, point);
        }
        next_required
    }

    /// Fire point-updated; every handler runs and their answers are OR-ed.
    pub(crate) fn notify_point_updated(&self, index: usize, point: &P) -> bool {
        let mut next_required = false;
        for handler in self.point_updated.handlers() {
            next_required |= handler(index, point);
        }
        next_required
    }

    pub(crate) fn notify_points_inserted(&self, index: usize, points: &[P]) {
        for handler in self.points_inserted.handlers() {
            handler(index, points);
        }
    }
}

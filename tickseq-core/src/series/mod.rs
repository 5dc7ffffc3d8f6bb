//! Sequence series: incremental reducers aligned 1:1 with sequencer points.
//!
//! A series is driven in two steps per tick. The caller stages the tick
//! ([`HistorySequenceSeries::stage_tick`]) and then adds it to the sequencer;
//! the sequencer's insert/update notification reaches the series through its
//! [`SequencerListener`] implementation, which consumes the staged tick.
//!
//! Every series is a thin rule set composed over a [`SeriesCore`], which
//! stores boundaries and points, relays outward notifications and applies the
//! configured [`SeriesVisibility`]. Outward handlers receive the index and the
//! affected point by value and must not borrow the series back.
//!
//! | series | sequencer | rule |
//! |---|---|---|
//! | [`CloseSeries`] | interval | newest `(time, repeat)` wins |
//! | [`LastSeries`] | interval | value in effect at the interval start |
//! | [`OhlcSeries`] | interval | open/high/low/close with tie-breaks |
//! | [`CurrentRepeatableExactSeries`] | repeatable exact | latest value |

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};

use crate::event::{MultiEvent, SubscriptionId};
use crate::sequencer::{IntervalPoint, LoadingFlag, RepeatableExactPoint, SequencerListener};
use crate::types::{OhlcValues, SeriesVisibility, Tick, TickData, compare_repeatable};

mod close;
mod current;
mod last;
mod ohlc;
mod visibility;

pub use close::{ClosePoint, CloseSeries};
pub use current::{CurrentRepeatableExactSeries, CurrentValuePoint};
pub use last::{LastPoint, LastSeries};
pub use ohlc::{OhlcPoint, OhlcSeries};

/// Handler for a single inserted or updated series point (`None` = null).
pub type SeriesPointHandler<T> = dyn Fn(usize, Option<&T>);

/// Handler for a run of inserted points: `(index, count)`.
pub type SeriesRangeHandler = dyn Fn(usize, usize);

/// Shared handle to any series over boundary type `B`.
pub type SeriesRef<B> = Rc<RefCell<dyn HistorySequenceSeries<B>>>;

/// A tick waiting for the sequencer notification that places it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StagedTick {
    /// Tick instant.
    pub tick_date_time: DateTime<Utc>,
    /// Position among ticks sharing the instant.
    pub repeat_count: u32,
    /// Payload; `None` for a tick without data.
    pub data: Option<OhlcValues>,
}

impl StagedTick {
    /// Whether this tick supersedes a value recorded at `(date_time, repeat_count)`.
    #[must_use]
    pub fn supersedes(&self, date_time: DateTime<Utc>, repeat_count: u32) -> bool {
        compare_repeatable(self.tick_date_time, self.repeat_count, date_time, repeat_count)
            .is_ge()
    }
}

struct SeriesEvents<T: 'static> {
    point_inserted: MultiEvent<SeriesPointHandler<T>>,
    points_inserted: MultiEvent<SeriesRangeHandler>,
    point_updated: MultiEvent<SeriesPointHandler<T>>,
}

impl<T: 'static> Default for SeriesEvents<T> {
    fn default() -> Self {
        Self {
            point_inserted: MultiEvent::new(),
            points_inserted: MultiEvent::new(),
            point_updated: MultiEvent::new(),
        }
    }
}

/// Storage and notification relay shared by every concrete series.
pub struct SeriesCore<B, T: 'static> {
    boundaries: Vec<B>,
    points: Vec<Option<T>>,
    staged: Option<StagedTick>,
    visibility: SeriesVisibility,
    loading: LoadingFlag,
    events: SeriesEvents<T>,
}

impl<B: fmt::Debug, T: fmt::Debug + 'static> fmt::Debug for SeriesCore<B, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeriesCore")
            .field("points", &self.points.len())
            .field("staged", &self.staged)
            .field("visibility", &self.visibility)
            .finish_non_exhaustive()
    }
}

/// Core of a series over interval points.
pub type IntervalHistorySequenceSeries<T> = SeriesCore<IntervalPoint, T>;

/// Core of a series over repeatable-exact points.
pub type RepeatableExactHistorySequenceSeries<T> = SeriesCore<RepeatableExactPoint, T>;

impl<B: Copy, T: 'static> SeriesCore<B, T> {
    /// Empty series core.
    #[must_use]
    pub fn new(visibility: SeriesVisibility) -> Self {
        Self {
            boundaries: Vec::new(),
            points: Vec::new(),
            staged: None,
            visibility,
            loading: LoadingFlag::default(),
            events: SeriesEvents::default(),
        }
    }

    /// Visibility policy.
    #[must_use]
    pub const fn visibility(&self) -> SeriesVisibility {
        self.visibility
    }

    /// Number of points visible to consumers.
    #[must_use]
    pub fn point_count(&self) -> usize {
        visibility::visible_count(self.visibility, self.points.len())
    }

    /// Visible point at `index`; `None` when null, hidden or out of range.
    #[must_use]
    pub fn point(&self, index: usize) -> Option<&T> {
        if index >= self.point_count() {
            return None;
        }
        self.points.get(index)?.as_ref()
    }

    /// Whether the visible point at `index` is null.
    #[must_use]
    pub fn is_null(&self, index: usize) -> bool {
        self.point(index).is_none()
    }

    /// Sequencer boundary of the visible point at `index`.
    #[must_use]
    pub fn boundary(&self, index: usize) -> Option<&B> {
        self.boundaries[..self.point_count()].get(index)
    }

    /// Visible points in order.
    #[must_use]
    pub fn points(&self) -> &[Option<T>] {
        &self.points[..self.point_count()]
    }

    /// Visible boundaries in order.
    #[must_use]
    pub fn boundaries(&self) -> &[B] {
        &self.boundaries[..self.point_count()]
    }

    /// The unconsumed staged tick, if any.
    #[must_use]
    pub const fn staged(&self) -> Option<&StagedTick> {
        self.staged.as_ref()
    }

    /// Subscribe to single-point inserts.
    pub fn subscribe_point_inserted(&mut self, handler: Rc<SeriesPointHandler<T>>) -> SubscriptionId {
        self.events.point_inserted.subscribe(handler)
    }

    /// Subscribe to runs of inserted points.
    pub fn subscribe_points_inserted(&mut self, handler: Rc<SeriesRangeHandler>) -> SubscriptionId {
        self.events.points_inserted.subscribe(handler)
    }

    /// Subscribe to point updates.
    pub fn subscribe_point_updated(&mut self, handler: Rc<SeriesPointHandler<T>>) -> SubscriptionId {
        self.events.point_updated.subscribe(handler)
    }

    /// Remove a single-point insert subscription.
    pub fn unsubscribe_point_inserted(&mut self, id: SubscriptionId) -> bool {
        self.events.point_inserted.unsubscribe(id)
    }

    /// Remove a run insert subscription.
    pub fn unsubscribe_points_inserted(&mut self, id: SubscriptionId) -> bool {
        self.events.points_inserted.unsubscribe(id)
    }

    /// Remove an update subscription.
    pub fn unsubscribe_point_updated(&mut self, id: SubscriptionId) -> bool {
        self.events.point_updated.unsubscribe(id)
    }

    pub(crate) fn stage(&mut self, tick: StagedTick) {
        #[cfg(feature = "tracing")]
        {
            if let Some(previous) = &self.staged {
                tracing::debug!(
                    replaced = %previous.tick_date_time,
                    by = %tick.tick_date_time,
                    "unconsumed staged tick replaced"
                );
            }
        }
        self.staged = Some(tick);
    }

    pub(crate) fn take_staged(&mut self) -> Option<StagedTick> {
        self.staged.take()
    }

    pub(crate) const fn staged_tick(&self) -> Option<StagedTick> {
        self.staged
    }

    pub(crate) fn discard_staged(&mut self) {
        self.staged = None;
    }

    pub(crate) fn attach(&mut self, flag: LoadingFlag) {
        self.loading = flag;
    }

    /// Raw stored point, including a hidden newest point.
    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Option<T>> {
        self.points.get_mut(index)
    }

    pub(crate) fn insert(&mut self, index: usize, boundary: B, value: Option<T>) {
        self.boundaries.insert(index, boundary);
        self.points.insert(index, value);
        if self.loading.get() {
            return;
        }
        if let Some(visible) = visibility::visible_insert(self.visibility, index, self.points.len()) {
            let value = self.points[visible].as_ref();
            for handler in self.events.point_inserted.handlers() {
                handler(visible, value);
            }
        }
    }

    pub(crate) fn insert_nulls(&mut self, index: usize, boundaries: &[B]) {
        let count = boundaries.len();
        self.boundaries
            .splice(index..index, boundaries.iter().copied());
        self.points
            .splice(index..index, std::iter::repeat_with(|| None).take(count));
        if self.loading.get() || count == 0 {
            return;
        }
        if let Some((start, visible)) =
            visibility::visible_range(self.visibility, index, count, self.points.len())
        {
            for handler in self.events.points_inserted.handlers() {
                handler(start, visible);
            }
        }
    }

    pub(crate) fn notify_updated(&self, index: usize) {
        if self.loading.get() {
            return;
        }
        if let Some(visible) = visibility::visible_update(self.visibility, index, self.points.len()) {
            let value = self.points[visible].as_ref();
            for handler in self.events.point_updated.handlers() {
                handler(visible, value);
            }
        }
    }

    pub(crate) fn reset_to_nulls(&mut self, boundaries: &[B]) {
        self.boundaries.clear();
        self.boundaries.extend_from_slice(boundaries);
        self.points.clear();
        self.points.resize_with(boundaries.len(), || None);
    }

    pub(crate) fn clear(&mut self) {
        self.boundaries.clear();
        self.points.clear();
        self.staged = None;
    }
}

/// Typed access to a series composed over a [`SeriesCore`].
pub trait SeriesView {
    /// Sequencer boundary type.
    type Boundary: Copy + 'static;
    /// Aggregated point type.
    type Value: 'static;

    /// The composed core.
    fn series_core(&self) -> &SeriesCore<Self::Boundary, Self::Value>;

    /// The composed core, mutably.
    fn series_core_mut(&mut self) -> &mut SeriesCore<Self::Boundary, Self::Value>;

    /// Visible point at `index`; `None` when null, hidden or out of range.
    fn point(&self, index: usize) -> Option<&Self::Value> {
        self.series_core().point(index)
    }

    /// Sequencer boundary of the visible point at `index`.
    fn boundary(&self, index: usize) -> Option<&Self::Boundary> {
        self.series_core().boundary(index)
    }

    /// Visible points in order.
    fn points(&self) -> &[Option<Self::Value>] {
        self.series_core().points()
    }
}

/// Object-safe contract shared by every series: staging, bulk reset and the
/// sequencer notifications (through [`SequencerListener`]).
pub trait HistorySequenceSeries<B>: SequencerListener<B> {
    /// Stage an OHLC tick; `None` marks a tick without data.
    fn stage_ohlc_tick(
        &mut self,
        tick_date_time: DateTime<Utc>,
        repeat_count: u32,
        ohlc: Option<OhlcValues>,
    );

    /// Stage a scalar tick; `None` marks a tick without data.
    fn stage_value_tick(
        &mut self,
        tick_date_time: DateTime<Utc>,
        repeat_count: u32,
        value: Option<f64>,
    );

    /// Drop the staged tick (the sequencer rejected it).
    fn discard_staged_tick(&mut self);

    /// Replace every point with a null point per boundary.
    fn initialise_with_null_points(&mut self, boundaries: &[B]);

    /// Remove every point and any staged tick.
    fn clear(&mut self);

    /// Number of points visible to consumers.
    fn point_count(&self) -> usize;

    /// Stage `tick` with the staging call matching its payload.
    fn stage_tick(&mut self, tick: &Tick) {
        let at = tick.date_time.utc;
        match tick.data {
            TickData::Ohlc(values) => self.stage_ohlc_tick(at, tick.repeat_index, Some(values)),
            TickData::Value(value) => self.stage_value_tick(at, tick.repeat_index, Some(value)),
            TickData::Empty => self.stage_value_tick(at, tick.repeat_index, None),
        }
    }
}

impl<S> HistorySequenceSeries<S::Boundary> for S
where
    S: SeriesView + SequencerListener<S::Boundary>,
{
    fn stage_ohlc_tick(
        &mut self,
        tick_date_time: DateTime<Utc>,
        repeat_count: u32,
        ohlc: Option<OhlcValues>,
    ) {
        self.series_core_mut().stage(StagedTick {
            tick_date_time,
            repeat_count,
            data: ohlc,
        });
    }

    fn stage_value_tick(
        &mut self,
        tick_date_time: DateTime<Utc>,
        repeat_count: u32,
        value: Option<f64>,
    ) {
        self.stage_ohlc_tick(tick_date_time, repeat_count, value.map(OhlcValues::flat));
    }

    fn discard_staged_tick(&mut self) {
        self.series_core_mut().discard_staged();
    }

    fn initialise_with_null_points(&mut self, boundaries: &[S::Boundary]) {
        self.series_core_mut().reset_to_nulls(boundaries);
    }

    fn clear(&mut self) {
        self.series_core_mut().clear();
    }

    fn point_count(&self) -> usize {
        self.series_core().point_count()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn staged_tick_supersede_rule() {
        let t = at("2024-01-02T10:00:00Z");
        let staged = StagedTick {
            tick_date_time: t,
            repeat_count: 1,
            data: None,
        };
        assert!(staged.supersedes(t, 1));
        assert!(staged.supersedes(t, 0));
        assert!(!staged.supersedes(t, 2));
        assert!(!staged.supersedes(at("2024-01-02T10:00:01Z"), 0));
    }

    #[test]
    fn loading_flag_suppresses_notifications() {
        let mut core: SeriesCore<IntervalPoint, f64> = SeriesCore::new(SeriesVisibility::AllIntervals);
        let log = record(&mut core);
        let flag = LoadingFlag::default();
        core.attach(flag.clone());

        flag.set(true);
        core.insert(0, interval("2024-01-02T10:00:00Z"), Some(1.0));
        core.insert_nulls(1, &[interval("2024-01-02T10:01:00Z")]);
        core.notify_updated(0);
        assert!(log.borrow().is_empty());

        flag.set(false);
        core.insert(2, interval("2024-01-02T10:02:00Z"), None);
        core.notify_updated(0);
        assert_eq!(*log.borrow(), ["ins 2", "upd 0"]);
        assert_eq!(core.point_count(), 3);
        assert_eq!(core.point(0), Some(&1.0));
        assert!(core.is_null(1));
    }

    #[test]
    fn completed_only_hides_newest() {
        let mut core: SeriesCore<IntervalPoint, f64> =
            SeriesCore::new(SeriesVisibility::CompletedIntervalsOnly);
        let log = record(&mut core);
        core.insert(0, interval("2024-01-02T10:00:00Z"), Some(1.0));
        core.notify_updated(0);
        assert_eq!(core.point_count(), 0);
        assert_eq!(core.point(0), None);

        core.insert(1, interval("2024-01-02T10:01:00Z"), Some(2.0));
        core.notify_updated(1);
        core.insert_nulls(2, &[interval("2024-01-02T10:02:00Z"), interval("2024-01-02T10:03:00Z")]);
        assert_eq!(*log.borrow(), ["ins 0", "run 1+2"]);
        assert_eq!(core.point_count(), 3);
        assert_eq!(core.points(), &[Some(1.0), Some(2.0), None]);
        assert_eq!(core.boundaries().len(), 3);
    }
}

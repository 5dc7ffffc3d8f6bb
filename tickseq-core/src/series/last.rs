use chrono::{DateTime, Utc};

use super::{IntervalHistorySequenceSeries, SeriesCore, SeriesView, StagedTick};
use crate::sequencer::{IntervalPoint, LoadingFlag, SequencerListener};
use crate::types::SeriesVisibility;

/// Value in effect at the start of an interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastPoint {
    /// Instant of the latest tick at or before the interval start.
    pub previous_interval_close_date_time: DateTime<Utc>,
    /// Repeat count of that tick.
    pub previous_interval_close_date_time_repeat_count: u32,
    /// The value.
    pub value: f64,
}

impl LastPoint {
    fn from_staged(tick: &StagedTick) -> Option<Self> {
        tick.data.map(|data| Self {
            previous_interval_close_date_time: tick.tick_date_time,
            previous_interval_close_date_time_repeat_count: tick.repeat_count,
            value: data.close,
        })
    }
}

/// Look-back interval series: each point holds the last value known at the
/// interval's start.
///
/// A tick inside an interval (strictly after its start) belongs to the
/// *following* interval, so the series leaves the current one untouched, keeps
/// the staged tick and asks the sequencer for the next interval. The chain
/// ends at the first interval starting at or after the tick.
#[derive(Debug)]
pub struct LastSeries {
    core: IntervalHistorySequenceSeries<LastPoint>,
}

impl Default for LastSeries {
    fn default() -> Self {
        Self::new(SeriesVisibility::default())
    }
}

impl LastSeries {
    /// Empty series.
    #[must_use]
    pub fn new(visibility: SeriesVisibility) -> Self {
        Self {
            core: SeriesCore::new(visibility),
        }
    }

    /// Whether the staged tick falls after `boundary` and must move on.
    fn staged_after(&self, boundary: &IntervalPoint) -> bool {
        self.core
            .staged_tick()
            .is_some_and(|tick| tick.tick_date_time > boundary.utc_date_time)
    }
}

impl SeriesView for LastSeries {
    type Boundary = IntervalPoint;
    type Value = LastPoint;

    fn series_core(&self) -> &SeriesCore<IntervalPoint, LastPoint> {
        &self.core
    }

    fn series_core_mut(&mut self) -> &mut SeriesCore<IntervalPoint, LastPoint> {
        &mut self.core
    }
}

impl SequencerListener<IntervalPoint> for LastSeries {
    fn on_point_inserted(&mut self, index: usize, boundary: &IntervalPoint) -> bool {
        if self.staged_after(boundary) {
            self.core.insert(index, *boundary, None);
            return true;
        }
        let value = self
            .core
            .take_staged()
            .and_then(|tick| LastPoint::from_staged(&tick));
        self.core.insert(index, *boundary, value);
        false
    }

    fn on_point_updated(&mut self, index: usize, boundary: &IntervalPoint) -> bool {
        if self.staged_after(boundary) {
            return true;
        }
        let Some(tick) = self.core.take_staged() else {
            return false;
        };
        let Some(candidate) = LastPoint::from_staged(&tick) else {
            return false;
        };
        let Some(slot) = self.core.slot_mut(index) else {
            return false;
        };
        let replace = slot.as_ref().is_none_or(|current| {
            tick.supersedes(
                current.previous_interval_close_date_time,
                current.previous_interval_close_date_time_repeat_count,
            )
        });
        if replace {
            *slot = Some(candidate);
            self.core.notify_updated(index);
        }
        false
    }

    fn on_points_inserted(&mut self, index: usize, boundaries: &[IntervalPoint]) {
        self.core.insert_nulls(index, boundaries);
    }

    fn attach_loading_flag(&mut self, flag: LoadingFlag) {
        self.core.attach(flag);
    }
}

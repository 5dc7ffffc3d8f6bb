use chrono::{DateTime, Utc};

use super::{IntervalHistorySequenceSeries, SeriesCore, SeriesView, StagedTick};
use crate::sequencer::{IntervalPoint, LoadingFlag, SequencerListener};
use crate::types::SeriesVisibility;

/// Last value seen in an interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosePoint {
    /// Instant of the tick that set `value`.
    pub close_date_time: DateTime<Utc>,
    /// Repeat count of that tick.
    pub close_date_time_repeat_count: u32,
    /// Closing value.
    pub value: f64,
}

impl ClosePoint {
    fn from_staged(tick: &StagedTick) -> Option<Self> {
        tick.data.map(|data| Self {
            close_date_time: tick.tick_date_time,
            close_date_time_repeat_count: tick.repeat_count,
            value: data.close,
        })
    }
}

/// Interval series holding each interval's closing value.
///
/// A tick replaces the close when its `(time, repeat)` is at or after the
/// recorded one, so late out-of-order ticks never overwrite a newer close. A
/// tick without data leaves an existing close untouched.
#[derive(Debug)]
pub struct CloseSeries {
    core: IntervalHistorySequenceSeries<ClosePoint>,
}

impl Default for CloseSeries {
    fn default() -> Self {
        Self::new(SeriesVisibility::default())
    }
}

impl CloseSeries {
    /// Empty series.
    #[must_use]
    pub fn new(visibility: SeriesVisibility) -> Self {
        Self {
            core: SeriesCore::new(visibility),
        }
    }
}

impl SeriesView for CloseSeries {
    type Boundary = IntervalPoint;
    type Value = ClosePoint;

    fn series_core(&self) -> &SeriesCore<IntervalPoint, ClosePoint> {
        &self.core
    }

    fn series_core_mut(&mut self) -> &mut SeriesCore<IntervalPoint, ClosePoint> {
        &mut self.core
    }
}

impl SequencerListener<IntervalPoint> for CloseSeries {
    fn on_point_inserted(&mut self, index: usize, boundary: &IntervalPoint) -> bool {
        let value = self
            .core
            .take_staged()
            .and_then(|tick| ClosePoint::from_staged(&tick));
        self.core.insert(index, *boundary, value);
        false
    }

    fn on_point_updated(&mut self, index: usize, _boundary: &IntervalPoint) -> bool {
        let Some(tick) = self.core.take_staged() else {
            return false;
        };
        let Some(candidate) = ClosePoint::from_staged(&tick) else {
            return false;
        };
        let Some(slot) = self.core.slot_mut(index) else {
            return false;
        };
        let replace = slot.as_ref().is_none_or(|current| {
            tick.supersedes(current.close_date_time, current.close_date_time_repeat_count)
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

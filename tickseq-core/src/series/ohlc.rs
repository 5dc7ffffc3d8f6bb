use chrono::{DateTime, Utc};

use super::{IntervalHistorySequenceSeries, SeriesCore, SeriesView, StagedTick};
use crate::sequencer::{IntervalPoint, LoadingFlag, SequencerListener};
use crate::types::{OhlcValues, SeriesVisibility, compare_repeatable};

/// Open/high/low/close of one interval with the instants that set open and
/// close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OhlcPoint {
    /// Instant of the tick that set `open`.
    pub open_date_time: DateTime<Utc>,
    /// Repeat count of that tick.
    pub open_date_time_repeat_count: u32,
    /// Instant of the tick that set `close`.
    pub close_date_time: DateTime<Utc>,
    /// Repeat count of that tick.
    pub close_date_time_repeat_count: u32,
    /// Opening value.
    pub open: f64,
    /// Highest value.
    pub high: f64,
    /// Lowest value.
    pub low: f64,
    /// Closing value.
    pub close: f64,
}

impl OhlcPoint {
    fn first(tick: &StagedTick, values: OhlcValues) -> Self {
        Self {
            open_date_time: tick.tick_date_time,
            open_date_time_repeat_count: tick.repeat_count,
            close_date_time: tick.tick_date_time,
            close_date_time_repeat_count: tick.repeat_count,
            open: values.open,
            high: values.high,
            low: values.low,
            close: values.close,
        }
    }

    /// Fold another tick in. Returns whether anything changed.
    fn merge(&mut self, tick: &StagedTick, values: OhlcValues) -> bool {
        let mut changed = false;
        let at = (tick.tick_date_time, tick.repeat_count);
        if compare_repeatable(
            at.0,
            at.1,
            self.open_date_time,
            self.open_date_time_repeat_count,
        )
        .is_le()
        {
            changed |= self.open != values.open
                || (self.open_date_time, self.open_date_time_repeat_count) != at;
            self.open = values.open;
            (self.open_date_time, self.open_date_time_repeat_count) = at;
        }
        if compare_repeatable(
            at.0,
            at.1,
            self.close_date_time,
            self.close_date_time_repeat_count,
        )
        .is_ge()
        {
            changed |= self.close != values.close
                || (self.close_date_time, self.close_date_time_repeat_count) != at;
            self.close = values.close;
            (self.close_date_time, self.close_date_time_repeat_count) = at;
        }
        if values.high > self.high {
            self.high = values.high;
            changed = true;
        }
        if values.low < self.low {
            self.low = values.low;
            changed = true;
        }
        changed
    }
}

/// Interval series aggregating ticks into OHLC bars.
///
/// Scalar ticks count as flat bars. A tick without data nulls its interval.
#[derive(Debug)]
pub struct OhlcSeries {
    core: IntervalHistorySequenceSeries<OhlcPoint>,
}

impl Default for OhlcSeries {
    fn default() -> Self {
        Self::new(SeriesVisibility::default())
    }
}

impl OhlcSeries {
    /// Empty series.
    #[must_use]
    pub fn new(visibility: SeriesVisibility) -> Self {
        Self {
            core: SeriesCore::new(visibility),
        }
    }
}

impl SeriesView for OhlcSeries {
    type Boundary = IntervalPoint;
    type Value = OhlcPoint;

    fn series_core(&self) -> &SeriesCore<IntervalPoint, OhlcPoint> {
        &self.core
    }

    fn series_core_mut(&mut self) -> &mut SeriesCore<IntervalPoint, OhlcPoint> {
        &mut self.core
    }
}

impl SequencerListener<IntervalPoint> for OhlcSeries {
    fn on_point_inserted(&mut self, index: usize, boundary: &IntervalPoint) -> bool {
        let value = self
            .core
            .take_staged()
            .and_then(|tick| tick.data.map(|values| OhlcPoint::first(&tick, values)));
        self.core.insert(index, *boundary, value);
        false
    }

    fn on_point_updated(&mut self, index: usize, _boundary: &IntervalPoint) -> bool {
        let Some(tick) = self.core.take_staged() else {
            return false;
        };
        let Some(slot) = self.core.slot_mut(index) else {
            return false;
        };
        let changed = match (slot.as_mut(), tick.data) {
            (_, None) => slot.take().is_some(),
            (None, Some(values)) => {
                *slot = Some(OhlcPoint::first(&tick, values));
                true
            }
            (Some(point), Some(values)) => point.merge(&tick, values),
        };
        if changed {
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

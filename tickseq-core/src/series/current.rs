use super::{RepeatableExactHistorySequenceSeries, SeriesCore, SeriesView};
use crate::sequencer::{LoadingFlag, RepeatableExactPoint, SequencerListener};
use crate::types::SeriesVisibility;

/// Value carried by one repeatable-exact point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentValuePoint {
    /// The value.
    pub value: f64,
}

/// Series over a repeatable-exact sequencer: each point holds the latest
/// value staged for its `(instant, repeat index)`.
///
/// Every point is a distinct tick, so there is nothing to hide and the
/// visibility is always [`SeriesVisibility::AllIntervals`].
#[derive(Debug)]
pub struct CurrentRepeatableExactSeries {
    core: RepeatableExactHistorySequenceSeries<CurrentValuePoint>,
}

impl Default for CurrentRepeatableExactSeries {
    fn default() -> Self {
        Self::new()
    }
}

impl CurrentRepeatableExactSeries {
    /// Empty series.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: SeriesCore::new(SeriesVisibility::AllIntervals),
        }
    }
}

impl SeriesView for CurrentRepeatableExactSeries {
    type Boundary = RepeatableExactPoint;
    type Value = CurrentValuePoint;

    fn series_core(&self) -> &SeriesCore<RepeatableExactPoint, CurrentValuePoint> {
        &self.core
    }

    fn series_core_mut(&mut self) -> &mut SeriesCore<RepeatableExactPoint, CurrentValuePoint> {
        &mut self.core
    }
}

impl SequencerListener<RepeatableExactPoint> for CurrentRepeatableExactSeries {
    fn on_point_inserted(&mut self, index: usize, boundary: &RepeatableExactPoint) -> bool {
        let value = self
            .core
            .take_staged()
            .and_then(|tick| tick.data)
            .map(|data| CurrentValuePoint { value: data.close });
        self.core.insert(index, *boundary, value);
        false
    }

    fn on_point_updated(&mut self, index: usize, _boundary: &RepeatableExactPoint) -> bool {
        let Some(tick) = self.core.take_staged() else {
            return false;
        };
        let value = tick.data.map(|data| CurrentValuePoint { value: data.close });
        let Some(slot) = self.core.slot_mut(index) else {
            return false;
        };
        if *slot != value {
            *slot = value;
            self.core.notify_updated(index);
        }
        false
    }

    fn on_points_inserted(&mut self, index: usize, boundaries: &[RepeatableExactPoint]) {
        self.core.insert_nulls(index, boundaries);
    }

    fn attach_loading_flag(&mut self, flag: LoadingFlag) {
        self.core.attach(flag);
    }
}

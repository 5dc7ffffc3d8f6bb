use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use chrono::{DateTime, FixedOffset, Utc};

use super::{LoadingFlag, SequencerCore, SequencerEvents, SequencerListener, SeriesBinding};
use crate::SequenceError;
use crate::list::ComparableList;
use crate::types::{SourceDateTime, compare_repeatable};

/// One distinct `(instant, repeat index)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RepeatableExactPoint {
    /// Tick instant.
    pub utc_date_time: DateTime<Utc>,
    /// Offset of the source time zone.
    pub source_offset: FixedOffset,
    /// Position among ticks sharing `utc_date_time`.
    pub repeat_index: u32,
}

impl RepeatableExactPoint {
    fn cmp_key(&self, utc: DateTime<Utc>, repeat_index: u32) -> Ordering {
        compare_repeatable(self.utc_date_time, self.repeat_index, utc, repeat_index)
    }
}

/// Sequencer with one point per unique tick instant and repeat index. It never
/// aggregates, pads or chains.
#[derive(Debug, Default)]
pub struct RepeatableExactSequencer {
    points: ComparableList<RepeatableExactPoint>,
    active_index: Option<usize>,
    loading: LoadingFlag,
    events: SequencerEvents<RepeatableExactPoint>,
}

impl RepeatableExactSequencer {
    /// Empty sequencer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Point at `index`.
    #[must_use]
    pub fn point(&self, index: usize) -> Option<&RepeatableExactPoint> {
        self.points.get(index)
    }

    /// Raw notification registry.
    pub fn events_mut(&mut self) -> &mut SequencerEvents<RepeatableExactPoint> {
        &mut self.events
    }

    /// Hand `series` the loading flag and subscribe it to every notification.
    pub fn bind_series<L>(&mut self, series: &Rc<RefCell<L>>) -> SeriesBinding
    where
        L: SequencerListener<RepeatableExactPoint> + ?Sized + 'static,
    {
        series.borrow_mut().attach_loading_flag(self.loading.clone());
        self.events.bind(series)
    }

    fn find_point(&self, utc: DateTime<Utc>, repeat_index: u32) -> Result<usize, usize> {
        if let Some(active) = self.active_index
            && self
                .points
                .get(active)
                .is_some_and(|p| p.cmp_key(utc, repeat_index).is_eq())
        {
            return Ok(active);
        }
        match self.points.last() {
            None => Err(0),
            Some(last) if last.cmp_key(utc, repeat_index).is_lt() => Err(self.points.len()),
            Some(_) => self
                .points
                .binary_search_by(|p| p.cmp_key(utc, repeat_index)),
        }
    }

    fn insert_point(&mut self, index: usize, date_time: SourceDateTime, repeat_index: u32) {
        let point = RepeatableExactPoint {
            utc_date_time: date_time.utc,
            source_offset: date_time.offset,
            repeat_index,
        };
        self.points.insert(index, point);
        self.active_index = Some(index);
        self.events.notify_point_inserted(index, &point);
    }
}

impl SequencerCore for RepeatableExactSequencer {
    type Point = RepeatableExactPoint;

    fn add_date_time(&mut self, date_time: SourceDateTime, repeat_index: u32) -> bool {
        match self.find_point(date_time.utc, repeat_index) {
            Ok(index) => self.active_index = Some(index),
            Err(index) => self.insert_point(index, date_time, repeat_index),
        }
        true
    }

    fn add_tick(
        &mut self,
        date_time: SourceDateTime,
        repeat_index: u32,
    ) -> Result<bool, SequenceError> {
        match self.find_point(date_time.utc, repeat_index) {
            Ok(index) => {
                self.active_index = Some(index);
                let point = self.points[index];
                self.events.notify_point_updated(index, &point);
            }
            Err(index) => self.insert_point(index, date_time, repeat_index),
        }
        Ok(true)
    }

    fn clear(&mut self) {
        self.points.clear();
        self.active_index = None;
    }

    fn last_source_timezone_offset(&self) -> Option<FixedOffset> {
        self.points.last().map(|p| p.source_offset)
    }

    fn points(&self) -> &[RepeatableExactPoint] {
        self.points.as_slice()
    }

    fn loading_flag(&self) -> &LoadingFlag {
        &self.loading
    }

    fn unbind_series(&mut self, binding: SeriesBinding) -> bool {
        self.events.unbind(binding)
    }
}

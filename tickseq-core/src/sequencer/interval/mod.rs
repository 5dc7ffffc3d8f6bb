use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

use super::{LoadingFlag, SequencerCore, SequencerEvents, SequencerListener, SeriesBinding};
use crate::SequenceError;
use crate::list::ComparableList;
use crate::types::{IntervalSequencerConfig, SourceDateTime};

mod calc;

use calc::IntervalCalculator;

/// Start of one interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntervalPoint {
    /// Interval start as a UTC instant.
    pub utc_date_time: DateTime<Utc>,
    /// Offset of the source time zone the start was computed in.
    pub source_offset: FixedOffset,
}

impl IntervalPoint {
    /// The start paired with its source offset.
    #[must_use]
    pub const fn source_date_time(&self) -> SourceDateTime {
        SourceDateTime::new(self.utc_date_time, self.source_offset)
    }
}

impl From<SourceDateTime> for IntervalPoint {
    fn from(value: SourceDateTime) -> Self {
        Self {
            utc_date_time: value.utc,
            source_offset: value.offset,
        }
    }
}

/// Sequencer producing one point per interval of the configured width.
#[derive(Debug)]
pub struct IntervalSequencer {
    config: IntervalSequencerConfig,
    calculator: IntervalCalculator,
    points: ComparableList<IntervalPoint>,
    active_index: Option<usize>,
    loading: LoadingFlag,
    events: SequencerEvents<IntervalPoint>,
}

impl IntervalSequencer {
    /// Empty sequencer for `config`.
    #[must_use]
    pub fn new(config: IntervalSequencerConfig) -> Self {
        Self {
            config,
            calculator: IntervalCalculator::new(config.interval, config.skip_weekends),
            points: ComparableList::new(),
            active_index: None,
            loading: LoadingFlag::default(),
            events: SequencerEvents::default(),
        }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &IntervalSequencerConfig {
        &self.config
    }

    /// Point at `index`.
    #[must_use]
    pub fn point(&self, index: usize) -> Option<&IntervalPoint> {
        self.points.get(index)
    }

    /// Index of the interval most recently inserted or updated.
    #[must_use]
    pub const fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    /// Raw notification registry.
    pub fn events_mut(&mut self) -> &mut SequencerEvents<IntervalPoint> {
        &mut self.events
    }

    /// Hand `series` the loading flag and subscribe it to every notification.
    pub fn bind_series<L>(&mut self, series: &Rc<RefCell<L>>) -> SeriesBinding
    where
        L: SequencerListener<IntervalPoint> + ?Sized + 'static,
    {
        series.borrow_mut().attach_loading_flag(self.loading.clone());
        self.events.bind(series)
    }

    /// Start of the interval `offset` intervals after the one holding
    /// `date_time`; `None` when undefined.
    #[must_use]
    pub fn interval_start(&self, date_time: SourceDateTime, offset: u32) -> Option<SourceDateTime> {
        let first = self.points.first().map(IntervalPoint::source_date_time);
        self.calculator
            .interval_start(date_time, i64::from(offset), first)
    }

    /// Identity of an interval start. Calendar intervals are keyed on the
    /// local wall clock, so a month or day whose ticks carry different
    /// offsets still maps to one point. Clock intervals are keyed on UTC,
    /// which keeps a repeated local hour as two distinct intervals.
    fn key(&self, at: SourceDateTime) -> NaiveDateTime {
        if self.config.interval.unit.is_calendar() {
            at.local()
        } else {
            at.utc.naive_utc()
        }
    }

    fn point_key(&self, point: &IntervalPoint) -> NaiveDateTime {
        self.key(point.source_date_time())
    }

    fn find_point(&self, start: SourceDateTime) -> Result<usize, usize> {
        let key = self.key(start);
        if let Some(active) = self.active_index {
            for index in std::iter::once(active).chain(active.checked_sub(1)) {
                if self
                    .points
                    .get(index)
                    .is_some_and(|p| self.point_key(p) == key)
                {
                    return Ok(index);
                }
            }
        }
        match self.points.last() {
            None => return Err(0),
            Some(last) if self.point_key(last) < key => return Err(self.points.len()),
            Some(_) => {}
        }
        self.points
            .binary_search_by(|p| self.point_key(p).cmp(&key))
    }

    /// Empty intervals strictly between the interval starting at `from` and
    /// `until`, compared by interval key.
    fn empty_intervals_between(
        &self,
        from: SourceDateTime,
        until: SourceDateTime,
    ) -> Vec<IntervalPoint> {
        let first = self.points.first().map(IntervalPoint::source_date_time);
        let until = self.key(until);
        let mut gap = Vec::new();
        let mut offset = 1;
        while let Some(start) = self.calculator.interval_start(from, offset, first) {
            if self.key(start) >= until {
                break;
            }
            gap.push(IntervalPoint::from(start));
            offset += 1;
        }
        gap
    }

    fn pad(&mut self, index: usize, from: SourceDateTime, until: SourceDateTime) -> usize {
        let gap = self.empty_intervals_between(from, until);
        if gap.is_empty() {
            return 0;
        }
        let count = self.points.insert_range(index, gap.iter().copied());
        self.events.notify_points_inserted(index, &gap);
        count
    }

    /// Insert a new interval at `index` (padding both neighbours' gaps when
    /// active) and fire point-inserted. Returns whether a listener requested
    /// the next interval.
    fn insert_interval(&mut self, mut index: usize, start: SourceDateTime) -> bool {
        let padding = self.config.padding_active();
        if padding && index > 0 {
            let previous = self.points[index - 1].source_date_time();
            index += self.pad(index, previous, start);
        }
        let point = IntervalPoint::from(start);
        self.points.insert(index, point);
        self.active_index = Some(index);
        let next_required = self.events.notify_point_inserted(index, &point);
        if padding && let Some(following) = self.points.get(index + 1).copied() {
            self.pad(index + 1, start, following.source_date_time());
        }
        next_required
    }

    fn apply_interval(&mut self, start: SourceDateTime) -> bool {
        match self.find_point(start) {
            Ok(index) => {
                self.active_index = Some(index);
                let point = self.points[index];
                self.events.notify_point_updated(index, &point)
            }
            Err(index) => self.insert_interval(index, start),
        }
    }
}

impl SequencerCore for IntervalSequencer {
    type Point = IntervalPoint;

    fn add_date_time(&mut self, date_time: SourceDateTime, _repeat_index: u32) -> bool {
        let Some(start) = self.interval_start(date_time, 0) else {
            return false;
        };
        match self.find_point(start) {
            Ok(index) => self.active_index = Some(index),
            Err(index) => {
                self.insert_interval(index, start);
            }
        }
        true
    }

    fn add_tick(
        &mut self,
        date_time: SourceDateTime,
        _repeat_index: u32,
    ) -> Result<bool, SequenceError> {
        let Some(mut start) = self.interval_start(date_time, 0) else {
            #[cfg(feature = "tracing")]
            tracing::debug!(at = %date_time.utc, "tick has no interval; skipped");
            return Ok(false);
        };
        let mut offset = 0;
        while self.apply_interval(start) {
            offset += 1;
            start = self.interval_start(date_time, offset).ok_or_else(|| {
                SequenceError::next_interval_undefined(date_time.utc.to_rfc3339(), offset)
            })?;
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

    fn points(&self) -> &[IntervalPoint] {
        self.points.as_slice()
    }

    fn loading_flag(&self) -> &LoadingFlag {
        &self.loading
    }

    fn unbind_series(&mut self, binding: SeriesBinding) -> bool {
        self.events.unbind(binding)
    }
}

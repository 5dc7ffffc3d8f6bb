//! Tick model consumed at the ingestion boundary.

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};

/// A UTC instant paired with the offset of the time zone it originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceDateTime {
    /// The instant.
    pub utc: DateTime<Utc>,
    /// Offset of the originating time zone.
    pub offset: FixedOffset,
}

impl SourceDateTime {
    /// Pair an instant with its source offset.
    #[must_use]
    pub const fn new(utc: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { utc, offset }
    }

    /// An instant originating in UTC.
    #[must_use]
    pub fn utc(utc: DateTime<Utc>) -> Self {
        Self::new(utc, Utc.fix())
    }

    /// Wall-clock time in the source time zone.
    #[must_use]
    pub fn local(&self) -> NaiveDateTime {
        self.utc.with_timezone(&self.offset).naive_local()
    }

    /// Milliseconds since the Unix epoch.
    #[must_use]
    pub fn timestamp_millis(&self) -> i64 {
        self.utc.timestamp_millis()
    }
}

/// Open/high/low/close quad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OhlcValues {
    /// First price.
    pub open: f64,
    /// Highest price.
    pub high: f64,
    /// Lowest price.
    pub low: f64,
    /// Last price.
    pub close: f64,
}

impl OhlcValues {
    /// A quad where all four prices equal `value`.
    #[must_use]
    pub const fn flat(value: f64) -> Self {
        Self {
            open: value,
            high: value,
            low: value,
            close: value,
        }
    }
}

/// Payload carried by a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickData {
    /// Full OHLC quad (e.g. a history bar).
    Ohlc(OhlcValues),
    /// Single scalar (e.g. a trade price).
    Value(f64),
    /// The tick carries nothing for series (e.g. a market state change).
    Empty,
}

impl TickData {
    /// Expand the payload to an OHLC quad; `None` for `Empty`.
    #[must_use]
    pub const fn as_ohlc(&self) -> Option<OhlcValues> {
        match *self {
            Self::Ohlc(v) => Some(v),
            Self::Value(v) => Some(OhlcValues::flat(v)),
            Self::Empty => None,
        }
    }

    /// The closing scalar; `None` for `Empty`.
    #[must_use]
    pub const fn close(&self) -> Option<f64> {
        match *self {
            Self::Ohlc(v) => Some(v.close),
            Self::Value(v) => Some(v),
            Self::Empty => None,
        }
    }
}

/// One timestamped tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// When the tick happened.
    pub date_time: SourceDateTime,
    /// Disambiguates ticks sharing the same timestamp.
    pub repeat_index: u32,
    /// Payload.
    pub data: TickData,
}

impl Tick {
    /// OHLC tick.
    #[must_use]
    pub const fn ohlc(date_time: SourceDateTime, repeat_index: u32, values: OhlcValues) -> Self {
        Self {
            date_time,
            repeat_index,
            data: TickData::Ohlc(values),
        }
    }

    /// Scalar tick.
    #[must_use]
    pub const fn value(date_time: SourceDateTime, repeat_index: u32, value: f64) -> Self {
        Self {
            date_time,
            repeat_index,
            data: TickData::Value(value),
        }
    }

    /// Tick without series data.
    #[must_use]
    pub const fn empty(date_time: SourceDateTime, repeat_index: u32) -> Self {
        Self {
            date_time,
            repeat_index,
            data: TickData::Empty,
        }
    }
}

/// Lexicographic compare of `(date_time, repeat_count)` pairs.
#[must_use]
pub fn compare_repeatable(
    left: DateTime<Utc>,
    left_repeat: u32,
    right: DateTime<Utc>,
    right_repeat: u32,
) -> Ordering {
    left.cmp(&right).then(left_repeat.cmp(&right_repeat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn local_applies_source_offset() {
        let utc = Utc.with_ymd_and_hms(2024, 3, 10, 14, 30, 0).unwrap();
        let dt = SourceDateTime::new(utc, FixedOffset::west_opt(5 * 3600).unwrap());
        assert_eq!(dt.local().to_string(), "2024-03-10 09:30:00");
    }

    #[test]
    fn value_tick_expands_flat() {
        let ohlc = TickData::Value(3.5).as_ohlc().unwrap();
        assert_eq!(ohlc, OhlcValues::flat(3.5));
        assert_eq!(TickData::Empty.as_ohlc(), None);
        assert_eq!(TickData::Empty.close(), None);
    }

    #[test]
    fn repeat_count_breaks_ties() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(compare_repeatable(t, 1, t, 0), Ordering::Greater);
        assert_eq!(compare_repeatable(t, 0, t, 0), Ordering::Equal);
        let later = t + chrono::Duration::milliseconds(1);
        assert_eq!(compare_repeatable(t, 9, later, 0), Ordering::Less);
    }
}

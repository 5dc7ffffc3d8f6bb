//! Configuration types shared by sequencers, series and the runtime host.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SequenceError;

/// Default delay before a reload is forced while several histories are unusable.
pub const DEFAULT_USABLE_TIMEOUT: Duration = Duration::from_millis(1500);

/// Unit of a fixed interval. Declaration order is size order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    /// Clock interval measured in milliseconds within a day.
    Millisecond,
    /// Calendar day in the source time zone.
    Day,
    /// Monday-aligned calendar week.
    Week,
    /// Calendar month.
    Month,
    /// Calendar year.
    Year,
}

impl IntervalUnit {
    /// All units, smallest first.
    pub const ALL: [Self; 5] = [
        Self::Millisecond,
        Self::Day,
        Self::Week,
        Self::Month,
        Self::Year,
    ];

    /// Stable identifier used in text and persisted configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Millisecond => "millisecond",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Short suffix used by the compact [`IntervalSpec`] form.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Millisecond => "ms",
            Self::Day => "d",
            Self::Week => "w",
            Self::Month => "mo",
            Self::Year => "y",
        }
    }

    /// Returns true for calendar units (day and larger).
    #[must_use]
    pub const fn is_calendar(self) -> bool {
        !matches!(self, Self::Millisecond)
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntervalUnit {
    type Err = SequenceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|u| u.as_str() == lowered || u.suffix() == lowered)
            .ok_or_else(|| SequenceError::invalid_arg(format!("unknown interval unit: {value}")))
    }
}

/// An interval = unit count × unit (e.g. 60000 ms, 1 day, 2 weeks, 3 months).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntervalSpec {
    /// Interval unit.
    pub unit: IntervalUnit,
    /// Number of units per interval.
    pub unit_count: NonZeroU32,
}

impl IntervalSpec {
    /// Create a new interval.
    #[must_use]
    pub const fn new(unit: IntervalUnit, unit_count: NonZeroU32) -> Self {
        Self { unit, unit_count }
    }

    /// Build an interval from a raw count.
    ///
    /// # Errors
    /// Returns `InvalidConfig` when `unit_count` is zero.
    pub fn try_new(unit: IntervalUnit, unit_count: u32) -> Result<Self, SequenceError> {
        let unit_count = NonZeroU32::new(unit_count)
            .ok_or_else(|| SequenceError::invalid_config("interval unit count must be > 0"))?;
        Ok(Self::new(unit, unit_count))
    }

    /// Unit count as a signed integer for date arithmetic.
    #[must_use]
    pub fn count(&self) -> i64 {
        i64::from(self.unit_count.get())
    }
}

/// Compact form: `60000ms`, `1d`, `2w`, `3mo`, `1y`.
impl fmt::Display for IntervalSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.unit_count, self.unit.suffix())
    }
}

impl FromStr for IntervalSpec {
    type Err = SequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| SequenceError::invalid_arg(format!("missing interval unit: {s}")))?;
        let (digits, unit) = s.split_at(split);
        let count: u32 = digits
            .parse()
            .map_err(|_| SequenceError::invalid_arg(format!("bad interval count: {s}")))?;
        Self::try_new(unit.parse()?, count)
    }
}

/// Interval sequencer behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalSequencerConfig {
    /// Bucket width.
    pub interval: IntervalSpec,
    /// Do not synthesize empty intervals between points.
    pub skip_empty_periods: bool,
    /// Treat Saturday and Sunday as non-existent (day unit only).
    pub skip_weekends: bool,
}

impl IntervalSequencerConfig {
    /// Create a config with no skipping.
    #[must_use]
    pub const fn new(interval: IntervalSpec) -> Self {
        Self {
            interval,
            skip_empty_periods: false,
            skip_weekends: false,
        }
    }

    /// Whether gaps between points are filled with empty intervals.
    #[must_use]
    pub const fn padding_active(&self) -> bool {
        !self.skip_empty_periods || (self.interval.unit.is_calendar() && !self.skip_weekends)
    }
}

/// History sequencer coordination settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySequencerConfig {
    /// Debounce delay used while more than one history is unusable.
    pub usable_timeout: Duration,
}

impl Default for HistorySequencerConfig {
    fn default() -> Self {
        Self {
            usable_timeout: DEFAULT_USABLE_TIMEOUT,
        }
    }
}

/// Which interval points a series exposes to its consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SeriesVisibility {
    /// Every interval, including the still-open newest one.
    #[default]
    AllIntervals,
    /// Hide the newest interval until a later one exists.
    CompletedIntervalsOnly,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compact_interval() {
        let spec: IntervalSpec = "60000ms".parse().expect("must parse");
        assert_eq!(spec.unit, IntervalUnit::Millisecond);
        assert_eq!(spec.unit_count.get(), 60_000);
        assert_eq!(spec.to_string(), "60000ms");

        let spec: IntervalSpec = "3mo".parse().expect("must parse");
        assert_eq!(spec.unit, IntervalUnit::Month);
        assert_eq!(spec.count(), 3);
    }

    #[test]
    fn rejects_zero_and_unknown() {
        assert!(matches!(
            "0d".parse::<IntervalSpec>(),
            Err(SequenceError::InvalidConfig(_))
        ));
        assert!(matches!(
            "5q".parse::<IntervalSpec>(),
            Err(SequenceError::InvalidArg(_))
        ));
        assert!("d".parse::<IntervalSpec>().is_err());
    }

    #[test]
    fn unit_names_round_trip() {
        for unit in IntervalUnit::ALL {
            assert_eq!(unit.as_str().parse::<IntervalUnit>().unwrap(), unit);
            assert_eq!(unit.suffix().parse::<IntervalUnit>().unwrap(), unit);
        }
    }

    #[test]
    fn padding_rules() {
        let day = IntervalSpec::try_new(IntervalUnit::Day, 1).unwrap();
        let ms = IntervalSpec::try_new(IntervalUnit::Millisecond, 1000).unwrap();

        let mut cfg = IntervalSequencerConfig::new(ms);
        assert!(cfg.padding_active());
        cfg.skip_empty_periods = true;
        assert!(!cfg.padding_active());

        let mut cfg = IntervalSequencerConfig::new(day);
        cfg.skip_empty_periods = true;
        assert!(cfg.padding_active());
        cfg.skip_weekends = true;
        assert!(!cfg.padding_active());
    }
}

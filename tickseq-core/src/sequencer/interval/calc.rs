//! Interval start arithmetic.
//!
//! Every computation happens on the tick's source-local wall clock; the local
//! start is converted back to UTC with the tick's own offset. The sequencer
//! matches calendar starts by their local value, so the offset only decides
//! the UTC instant a new point carries. Week, day and
//! business-day arithmetic use "days since 0001-01-01", which is a Monday in
//! the proleptic Gregorian calendar, so `days % 7 == 0` means Monday.

use chrono::{
    Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc,
};

use crate::types::{IntervalSpec, IntervalUnit, SourceDateTime};

const DAY_MS: i64 = 86_400_000;
const WORKDAYS_PER_WEEK: i64 = 5;

/// Days since 0001-01-01 (a Monday).
fn day_number(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce()) - 1
}

fn date_from_day_number(day: i64) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(i32::try_from(day + 1).ok()?)
}

/// Monday of the week containing `day`.
const fn week_start_day(day: i64) -> i64 {
    day - day.rem_euclid(7)
}

const fn is_weekend_day(day: i64) -> bool {
    day.rem_euclid(7) >= WORKDAYS_PER_WEEK
}

/// Business-day index of a weekday. Weekdays map onto consecutive integers.
const fn workday_number(day: i64) -> i64 {
    let week = day.div_euclid(7);
    let dow = day.rem_euclid(7);
    let dow = if dow > WORKDAYS_PER_WEEK {
        WORKDAYS_PER_WEEK
    } else {
        dow
    };
    week * WORKDAYS_PER_WEEK + dow
}

/// Inverse of [`workday_number`]. Never lands on a weekend, which is the
/// "move a weekend start forward" rule applied in index space.
const fn day_from_workday_number(workday: i64) -> i64 {
    workday.div_euclid(WORKDAYS_PER_WEEK) * 7 + workday.rem_euclid(WORKDAYS_PER_WEEK)
}

fn local_midnight(day: i64, offset: FixedOffset) -> Option<SourceDateTime> {
    let date = date_from_day_number(day)?;
    to_source(date.and_time(NaiveTime::MIN), offset)
}

fn to_source(local: NaiveDateTime, offset: FixedOffset) -> Option<SourceDateTime> {
    let at = offset.from_local_datetime(&local).single()?;
    Some(SourceDateTime::new(at.with_timezone(&Utc), offset))
}

/// Computes interval starts for one sequencer configuration.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IntervalCalculator {
    spec: IntervalSpec,
    skip_weekends: bool,
}

impl IntervalCalculator {
    pub(crate) const fn new(spec: IntervalSpec, skip_weekends: bool) -> Self {
        Self {
            spec,
            skip_weekends,
        }
    }

    /// Start of the interval `offset` intervals after the one holding
    /// `date_time`. `first` is the oldest existing point, which anchors
    /// multi-unit day and week grids. `None` when undefined.
    pub(crate) fn interval_start(
        &self,
        date_time: SourceDateTime,
        offset: i64,
        first: Option<SourceDateTime>,
    ) -> Option<SourceDateTime> {
        let count = self.spec.count();
        let local = date_time.local();
        let tz = date_time.offset;
        match self.spec.unit {
            IntervalUnit::Millisecond => millisecond_start(local, count, offset, tz),
            IntervalUnit::Day => {
                let day = day_number(local.date());
                let anchor = first.map(|f| day_number(f.local().date()));
                let start = if self.skip_weekends {
                    workday_start(day, anchor, count, offset)?
                } else {
                    let anchor = anchor.unwrap_or(day);
                    anchor + (day - anchor).div_euclid(count) * count + offset * count
                };
                local_midnight(start, tz)
            }
            IntervalUnit::Week => {
                let week = week_start_day(day_number(local.date()));
                let anchor = first.map_or(week, |f| week_start_day(day_number(f.local().date())));
                let weeks = (week - anchor) / 7;
                let start = anchor + (weeks.div_euclid(count) * count + offset * count) * 7;
                local_midnight(start, tz)
            }
            IntervalUnit::Month => {
                let index = i64::from(local.year()) * 12 + i64::from(local.month0());
                let bucket = index.div_euclid(count) * count + offset * count;
                let year = i32::try_from(bucket.div_euclid(12)).ok()?;
                let month = u32::try_from(bucket.rem_euclid(12)).ok()? + 1;
                let date = NaiveDate::from_ymd_opt(year, month, 1)?;
                to_source(date.and_time(NaiveTime::MIN), tz)
            }
            IntervalUnit::Year => {
                let year = i64::from(local.year());
                let bucket = year.div_euclid(count) * count + offset * count;
                let date = NaiveDate::from_ymd_opt(i32::try_from(bucket).ok()?, 1, 1)?;
                to_source(date.and_time(NaiveTime::MIN), tz)
            }
        }
    }
}

/// Buckets restart at every local midnight, so an interval that does not
/// divide the day leaves a short last bucket and the next one starts at
/// 00:00 of the following day.
fn millisecond_start(
    local: NaiveDateTime,
    count: i64,
    offset: i64,
    tz: FixedOffset,
) -> Option<SourceDateTime> {
    let midnight = local.date().and_time(NaiveTime::MIN);
    let day_ms = local.signed_duration_since(midnight).num_milliseconds();
    let per_day = (DAY_MS + count - 1) / count;
    let bucket = day_ms.div_euclid(count) + offset;
    let days = bucket.div_euclid(per_day);
    let within = bucket.rem_euclid(per_day) * count;
    let start = midnight
        .checked_add_signed(TimeDelta::try_days(days)?)?
        .checked_add_signed(TimeDelta::try_milliseconds(within)?)?;
    to_source(start, tz)
}

fn workday_start(day: i64, anchor: Option<i64>, count: i64, offset: i64) -> Option<i64> {
    if is_weekend_day(day) {
        return None;
    }
    let workday = workday_number(day);
    let anchor = anchor.map_or(workday, workday_number);
    let bucket = anchor + (workday - anchor).div_euclid(count) * count + offset * count;
    Some(day_from_workday_number(bucket))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Weekday};

    fn utc(s: &str) -> SourceDateTime {
        SourceDateTime::utc(s.parse::<DateTime<Utc>>().unwrap())
    }

    fn calc(unit: IntervalUnit, count: u32, skip_weekends: bool) -> IntervalCalculator {
        IntervalCalculator::new(IntervalSpec::try_new(unit, count).unwrap(), skip_weekends)
    }

    #[test]
    fn day_numbers_start_on_monday() {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(monday.weekday(), Weekday::Mon);
        assert_eq!(day_number(monday).rem_euclid(7), 0);
        assert_eq!(date_from_day_number(day_number(monday)), Some(monday));
    }

    #[test]
    fn workday_numbers_skip_weekends() {
        let friday = day_number(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        let monday = day_number(NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(workday_number(monday) - workday_number(friday), 1);
        assert_eq!(day_from_workday_number(workday_number(friday) + 1), monday);
        assert!(is_weekend_day(friday + 1));
        assert!(is_weekend_day(friday + 2));
    }

    #[test]
    fn minute_buckets_floor_and_step() {
        let c = calc(IntervalUnit::Millisecond, 60_000, false);
        let t = utc("2024-01-02T10:00:45.500Z");
        let s0 = c.interval_start(t, 0, None).unwrap();
        assert_eq!(s0.utc.to_rfc3339(), "2024-01-02T10:00:00+00:00");
        let s2 = c.interval_start(t, 2, None).unwrap();
        assert_eq!(s2.utc.to_rfc3339(), "2024-01-02T10:02:00+00:00");
    }

    #[test]
    fn uneven_millisecond_interval_restarts_at_midnight() {
        let seven_hours = 7 * 3_600_000;
        let c = calc(IntervalUnit::Millisecond, seven_hours, false);
        let t = utc("2024-01-02T22:00:00Z");
        assert_eq!(
            c.interval_start(t, 0, None).unwrap().utc.to_rfc3339(),
            "2024-01-02T21:00:00+00:00"
        );
        assert_eq!(
            c.interval_start(t, 1, None).unwrap().utc.to_rfc3339(),
            "2024-01-03T00:00:00+00:00"
        );
    }

    #[test]
    fn local_offset_decides_the_day() {
        let c = calc(IntervalUnit::Day, 1, false);
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        // 02:00 UTC is still the previous evening in UTC-5.
        let t = SourceDateTime::new("2024-01-03T02:00:00Z".parse().unwrap(), tz);
        let s = c.interval_start(t, 0, None).unwrap();
        assert_eq!(s.utc.to_rfc3339(), "2024-01-02T05:00:00+00:00");
        assert_eq!(s.offset, tz);
    }

    #[test]
    fn multi_day_grid_is_anchored_on_first_point() {
        let c = calc(IntervalUnit::Day, 3, false);
        let first = utc("2024-01-02T00:00:00Z");
        let t = utc("2024-01-06T12:00:00Z");
        let s = c.interval_start(t, 0, Some(first)).unwrap();
        assert_eq!(s.utc.to_rfc3339(), "2024-01-05T00:00:00+00:00");
        let before = utc("2023-12-31T12:00:00Z");
        let s = c.interval_start(before, 0, Some(first)).unwrap();
        assert_eq!(s.utc.to_rfc3339(), "2023-12-30T00:00:00+00:00");
    }

    #[test]
    fn weekend_days_are_undefined_when_skipped() {
        let c = calc(IntervalUnit::Day, 1, true);
        let saturday = utc("2024-01-06T12:00:00Z");
        assert!(c.interval_start(saturday, 0, None).is_none());
        let friday = utc("2024-01-05T12:00:00Z");
        let next = c.interval_start(friday, 1, Some(friday)).unwrap();
        assert_eq!(next.utc.to_rfc3339(), "2024-01-08T00:00:00+00:00");
    }

    #[test]
    fn two_workday_buckets_never_start_on_weekends() {
        let c = calc(IntervalUnit::Day, 2, true);
        let first = utc("2024-01-04T00:00:00Z"); // Thursday
        for k in 0..10 {
            let s = c.interval_start(first, k, Some(first)).unwrap();
            let wd = s.local().date().weekday();
            assert!(!matches!(wd, Weekday::Sat | Weekday::Sun), "{k}: {wd}");
        }
        let monday = utc("2024-01-08T09:00:00Z");
        let s = c.interval_start(monday, 0, Some(first)).unwrap();
        // Thu+Fri is one bucket, Mon+Tue the next.
        assert_eq!(s.utc.to_rfc3339(), "2024-01-08T00:00:00+00:00");
    }

    #[test]
    fn weeks_are_monday_aligned() {
        let c = calc(IntervalUnit::Week, 1, false);
        let wednesday = utc("2024-01-10T15:00:00Z");
        let s = c.interval_start(wednesday, 0, None).unwrap();
        assert_eq!(s.utc.to_rfc3339(), "2024-01-08T00:00:00+00:00");

        let c = calc(IntervalUnit::Week, 2, false);
        let first = utc("2024-01-01T00:00:00Z");
        let s = c.interval_start(wednesday, 0, Some(first)).unwrap();
        assert_eq!(s.utc.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        let s = c.interval_start(wednesday, 1, Some(first)).unwrap();
        assert_eq!(s.utc.to_rfc3339(), "2024-01-15T00:00:00+00:00");
    }

    #[test]
    fn month_groups_count_from_year_zero() {
        let c = calc(IntervalUnit::Month, 3, false);
        let t = utc("2024-05-20T00:00:00Z");
        let s = c.interval_start(t, 0, None).unwrap();
        assert_eq!(s.utc.to_rfc3339(), "2024-04-01T00:00:00+00:00");
        let s = c.interval_start(t, 3, None).unwrap();
        assert_eq!(s.utc.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn year_groups() {
        let c = calc(IntervalUnit::Year, 5, false);
        let t = utc("2024-07-01T00:00:00Z");
        let s = c.interval_start(t, 0, None).unwrap();
        assert_eq!(s.utc.to_rfc3339(), "2020-01-01T00:00:00+00:00");
        let s = c.interval_start(t, 1, None).unwrap();
        assert_eq!(s.utc.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }
}

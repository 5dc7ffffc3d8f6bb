//! Deterministic tick streams used across the workspace tests.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use tickseq_core::types::{OhlcValues, SourceDateTime, Tick};

/// Parse an RFC 3339 instant into a UTC-sourced date time.
///
/// # Panics
/// Panics on malformed input; fixtures are static.
#[must_use]
pub fn utc(rfc3339: &str) -> SourceDateTime {
    let parsed: DateTime<FixedOffset> =
        DateTime::parse_from_rfc3339(rfc3339).expect("fixture instant must be RFC 3339");
    SourceDateTime::utc(parsed.with_timezone(&Utc))
}

/// Parse an RFC 3339 instant keeping its written offset as the source offset.
///
/// # Panics
/// Panics on malformed input; fixtures are static.
#[must_use]
pub fn local(rfc3339: &str) -> SourceDateTime {
    let parsed =
        DateTime::parse_from_rfc3339(rfc3339).expect("fixture instant must be RFC 3339");
    SourceDateTime::new(parsed.with_timezone(&Utc), *parsed.offset())
}

/// Three trades across two one-minute buckets:
/// `10:00:00.500 = 100`, `10:00:45 = 105`, `10:01:05 = 102` on 2024-01-02 UTC.
#[must_use]
pub fn minute_trades() -> Vec<Tick> {
    vec![
        Tick::value(utc("2024-01-02T10:00:00.500Z"), 0, 100.0),
        Tick::value(utc("2024-01-02T10:00:45Z"), 0, 105.0),
        Tick::value(utc("2024-01-02T10:01:05Z"), 0, 102.0),
    ]
}

/// One daily bar at 12:00 UTC for each listed date.
///
/// # Panics
/// Panics on dates that do not exist.
#[must_use]
pub fn daily_bars(dates: &[(i32, u32, u32)]) -> Vec<Tick> {
    dates
        .iter()
        .enumerate()
        .map(|(i, &(y, m, d))| {
            let date = NaiveDate::from_ymd_opt(y, m, d).expect("fixture date must exist");
            let at = Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).expect("valid time"));
            #[allow(clippy::cast_precision_loss)]
            let base = 100.0 + i as f64;
            Tick::ohlc(
                SourceDateTime::utc(at),
                0,
                OhlcValues {
                    open: base,
                    high: base + 2.0,
                    low: base - 1.0,
                    close: base + 1.0,
                },
            )
        })
        .collect()
}

/// Monday 2024-01-01 and Friday 2024-01-05 only; the weekdays between are gaps.
#[must_use]
pub fn monday_and_friday() -> Vec<Tick> {
    daily_bars(&[(2024, 1, 1), (2024, 1, 5)])
}

/// Every weekday of the first two weeks of January 2024.
#[must_use]
pub fn two_trading_weeks() -> Vec<Tick> {
    daily_bars(&[
        (2024, 1, 1),
        (2024, 1, 2),
        (2024, 1, 3),
        (2024, 1, 4),
        (2024, 1, 5),
        (2024, 1, 8),
        (2024, 1, 9),
        (2024, 1, 10),
        (2024, 1, 11),
        (2024, 1, 12),
    ])
}

/// Three trades sharing one instant, told apart by repeat index, plus one
/// later trade.
#[must_use]
pub fn repeated_trades() -> Vec<Tick> {
    let at = utc("2024-01-02T10:00:00Z");
    vec![
        Tick::value(at, 0, 10.0),
        Tick::value(at, 1, 11.0),
        Tick::value(at, 2, 12.0),
        Tick::value(utc("2024-01-02T10:00:01Z"), 0, 13.0),
    ]
}

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{Offset, TimeZone, Utc};
use chrono_tz::America::New_York;
use chrono_tz::Tz;
use tickseq_core::prelude::*;

fn in_zone(tz: Tz, y: i32, m: u32, d: u32, h: u32, min: u32) -> SourceDateTime {
    let local = tz.with_ymd_and_hms(y, m, d, h, min, 0).earliest().unwrap();
    SourceDateTime::new(local.with_timezone(&Utc), local.offset().fix())
}

fn sequencer(spec: &str) -> IntervalSequencer {
    IntervalSequencer::new(IntervalSequencerConfig::new(spec.parse().unwrap()))
}

fn rendered(seq: &IntervalSequencer) -> Vec<String> {
    seq.points()
        .iter()
        .map(|p| {
            p.source_date_time()
                .utc
                .with_timezone(&p.source_offset)
                .to_rfc3339()
        })
        .collect()
}

#[test]
fn daily_padding_across_spring_forward_has_no_duplicates() {
    let mut seq = sequencer("1d");
    seq.add_tick(in_zone(New_York, 2024, 3, 8, 10, 0), 0).unwrap();
    seq.add_tick(in_zone(New_York, 2024, 3, 11, 10, 0), 0).unwrap();
    assert_eq!(
        rendered(&seq),
        [
            "2024-03-08T00:00:00-05:00",
            "2024-03-09T00:00:00-05:00",
            "2024-03-10T00:00:00-05:00",
            "2024-03-11T00:00:00-04:00",
        ]
    );
    assert_eq!(
        seq.last_source_timezone_offset().map(|o| o.local_minus_utc()),
        Some(-4 * 3600)
    );
}

#[test]
fn daily_padding_across_fall_back_has_no_duplicates() {
    let mut seq = sequencer("1d");
    seq.add_tick(in_zone(New_York, 2024, 11, 1, 10, 0), 0).unwrap();
    seq.add_tick(in_zone(New_York, 2024, 11, 5, 10, 0), 0).unwrap();
    let days: Vec<String> = rendered(&seq).iter().map(|s| s[..10].to_string()).collect();
    assert_eq!(
        days,
        ["2024-11-01", "2024-11-02", "2024-11-03", "2024-11-04", "2024-11-05"]
    );
}

#[test]
fn repeated_local_hour_yields_two_hourly_points() {
    let mut seq = sequencer("3600000ms");
    let edt = SourceDateTime::new(
        "2024-11-03T05:30:00Z".parse().unwrap(),
        chrono::FixedOffset::west_opt(4 * 3600).unwrap(),
    );
    let est = SourceDateTime::new(
        "2024-11-03T06:30:00Z".parse().unwrap(),
        chrono::FixedOffset::west_opt(5 * 3600).unwrap(),
    );
    seq.add_tick(edt, 0).unwrap();
    seq.add_tick(est, 0).unwrap();
    assert_eq!(
        rendered(&seq),
        ["2024-11-03T01:00:00-04:00", "2024-11-03T01:00:00-05:00"]
    );
}

#[test]
fn monthly_padding_fills_february() {
    let mut seq = sequencer("1mo");
    seq.add_tick(in_zone(New_York, 2024, 1, 31, 23, 30), 0).unwrap();
    seq.add_tick(in_zone(New_York, 2024, 3, 1, 9, 0), 0).unwrap();
    assert_eq!(
        rendered(&seq),
        [
            "2024-01-01T00:00:00-05:00",
            "2024-02-01T00:00:00-05:00",
            "2024-03-01T00:00:00-05:00",
        ]
    );
}

#[test]
fn month_of_a_tick_is_taken_on_the_local_clock() {
    let mut seq = sequencer("1mo");
    // 2024-02-01T02:00Z is still January in New York.
    seq.add_tick(in_zone(New_York, 2024, 1, 31, 21, 0), 0).unwrap();
    assert_eq!(rendered(&seq), ["2024-01-01T00:00:00-05:00"]);
}

#[test]
fn weeks_start_on_monday_and_cross_years() {
    let mut seq = sequencer("1w");
    // Sunday 2023-12-31 and Monday 2024-01-01.
    seq.add_tick(SourceDateTime::utc(Utc.with_ymd_and_hms(2023, 12, 31, 12, 0, 0).unwrap()), 0)
        .unwrap();
    seq.add_tick(SourceDateTime::utc(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()), 0)
        .unwrap();
    assert_eq!(
        rendered(&seq),
        ["2023-12-25T00:00:00+00:00", "2024-01-01T00:00:00+00:00"]
    );
}

#[test]
fn yearly_buckets() {
    let mut seq = sequencer("1y");
    seq.add_tick(SourceDateTime::utc(Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap()), 0)
        .unwrap();
    seq.add_tick(SourceDateTime::utc(Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap()), 0)
        .unwrap();
    assert_eq!(seq.point_count(), 3);
    assert_eq!(rendered(&seq)[1], "2023-01-01T00:00:00+00:00");
}

#[test]
fn month_spanning_spring_forward_is_one_bucket() {
    let mut seq = sequencer("1mo");
    let ohlc = Rc::new(RefCell::new(OhlcSeries::default()));
    seq.bind_series(&ohlc);
    for (at, price) in [
        (in_zone(New_York, 2024, 3, 4, 10, 0), 10.0),
        (in_zone(New_York, 2024, 3, 20, 10, 0), 12.0),
    ] {
        let tick = Tick::value(at, 0, price);
        ohlc.borrow_mut().stage_tick(&tick);
        assert!(seq.add_tick(tick.date_time, 0).unwrap());
    }
    assert_eq!(rendered(&seq), ["2024-03-01T00:00:00-05:00"]);
    let ohlc = ohlc.borrow();
    let bar = ohlc.point(0).unwrap();
    assert_eq!((bar.open, bar.close), (10.0, 12.0));
}

#[test]
fn padded_month_after_an_offset_change_is_not_duplicated() {
    let mut seq = sequencer("1mo");
    seq.add_tick(in_zone(New_York, 2024, 2, 20, 10, 0), 0).unwrap();
    seq.add_tick(in_zone(New_York, 2024, 4, 2, 10, 0), 0).unwrap();
    seq.add_tick(in_zone(New_York, 2024, 3, 25, 10, 0), 0).unwrap();
    assert_eq!(
        rendered(&seq),
        [
            "2024-02-01T00:00:00-05:00",
            "2024-03-01T00:00:00-05:00",
            "2024-04-01T00:00:00-04:00",
        ]
    );
}

#[test]
fn year_spanning_both_offsets_is_one_bucket() {
    let mut seq = sequencer("1y");
    seq.add_tick(in_zone(New_York, 2024, 1, 10, 10, 0), 0).unwrap();
    seq.add_tick(in_zone(New_York, 2024, 7, 10, 10, 0), 0).unwrap();
    seq.add_tick(in_zone(New_York, 2024, 12, 31, 22, 0), 0).unwrap();
    assert_eq!(rendered(&seq), ["2024-01-01T00:00:00-05:00"]);
}

#[test]
fn transition_sunday_is_one_daily_bucket() {
    let mut seq = sequencer("1d");
    seq.add_tick(in_zone(New_York, 2024, 3, 9, 12, 0), 0).unwrap();
    // Before and after the 02:00 switch on the same local day.
    seq.add_tick(in_zone(New_York, 2024, 3, 10, 0, 30), 0).unwrap();
    seq.add_tick(in_zone(New_York, 2024, 3, 10, 15, 0), 0).unwrap();
    seq.add_tick(in_zone(New_York, 2024, 3, 11, 9, 0), 0).unwrap();
    let days: Vec<String> = rendered(&seq).iter().map(|s| s[..10].to_string()).collect();
    assert_eq!(days, ["2024-03-09", "2024-03-10", "2024-03-11"]);
}

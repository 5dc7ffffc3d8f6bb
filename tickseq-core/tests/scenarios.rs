use std::cell::RefCell;
use std::rc::Rc;

use tickseq_core::prelude::*;
use tickseq_core::{HistorySequencerEvent, IntervalPoint, OhlcValues, SeriesCore};
use tickseq_mock::fixtures::{minute_trades, monday_and_friday, utc};
use tickseq_mock::{RecordedHistory, SeriesRef};

fn interval_sequencer(spec: &str, skip_empty: bool, skip_weekends: bool) -> IntervalSequencer {
    let mut cfg = IntervalSequencerConfig::new(spec.parse().unwrap());
    cfg.skip_empty_periods = skip_empty;
    cfg.skip_weekends = skip_weekends;
    IntervalSequencer::new(cfg)
}

/// Stage then add, discarding the stage when the sequencer rejects the tick.
fn feed<L>(seq: &mut IntervalSequencer, series: &Rc<RefCell<L>>, tick: &Tick)
where
    L: HistorySequenceSeries<IntervalPoint>,
{
    series.borrow_mut().stage_tick(tick);
    if !seq.add_tick(tick.date_time, tick.repeat_index).unwrap() {
        series.borrow_mut().discard_staged_tick();
    }
}

fn log_events<B: Copy, T: 'static>(core: &mut SeriesCore<B, T>) -> Rc<RefCell<Vec<String>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let l = Rc::clone(&log);
    core.subscribe_point_inserted(Rc::new(move |i: usize, _: Option<&T>| {
        l.borrow_mut().push(format!("ins {i}"));
    }));
    let l = Rc::clone(&log);
    core.subscribe_points_inserted(Rc::new(move |i: usize, n: usize| {
        l.borrow_mut().push(format!("run {i}+{n}"));
    }));
    let l = Rc::clone(&log);
    core.subscribe_point_updated(Rc::new(move |i: usize, _: Option<&T>| {
        l.borrow_mut().push(format!("upd {i}"));
    }));
    log
}

#[test]
fn monday_to_friday_pads_three_weekdays_in_one_run() {
    let mut seq = interval_sequencer("1d", false, true);
    let close = Rc::new(RefCell::new(CloseSeries::default()));
    seq.bind_series(&close);
    let log = log_events(close.borrow_mut().series_core_mut());

    for tick in monday_and_friday() {
        feed(&mut seq, &close, &tick);
    }

    assert_eq!(seq.point_count(), 5);
    assert_eq!(*log.borrow(), ["ins 0", "run 1+3", "ins 4"]);
    let close = close.borrow();
    let nulls: Vec<bool> = close.points().iter().map(Option::is_none).collect();
    assert_eq!(nulls, [false, true, true, true, false]);
    let days: Vec<String> = close
        .series_core()
        .boundaries()
        .iter()
        .map(|b| b.utc_date_time.format("%a").to_string())
        .collect();
    assert_eq!(days, ["Mon", "Tue", "Wed", "Thu", "Fri"]);
}

#[test]
fn one_minute_ohlc_buckets() {
    let mut seq = interval_sequencer("60000ms", true, false);
    let ohlc = Rc::new(RefCell::new(OhlcSeries::default()));
    seq.bind_series(&ohlc);

    for tick in minute_trades() {
        feed(&mut seq, &ohlc, &tick);
    }

    let ohlc = ohlc.borrow();
    assert_eq!(ohlc.points().len(), 2);
    let first = ohlc.point(0).unwrap();
    assert_eq!(
        (first.open, first.high, first.low, first.close),
        (100.0, 105.0, 100.0, 105.0)
    );
    assert_eq!(first.open_date_time, utc("2024-01-02T10:00:00.500Z").utc);
    let second = ohlc.point(1).unwrap();
    assert_eq!(
        (second.open, second.high, second.low, second.close),
        (102.0, 102.0, 102.0, 102.0)
    );
    assert_eq!(ohlc.boundary(1).unwrap().utc_date_time, utc("2024-01-02T10:01:00Z").utc);
}

#[test]
fn ohlc_takes_open_from_first_and_close_from_last_tick() {
    let mut seq = interval_sequencer("60000ms", true, false);
    let ohlc = Rc::new(RefCell::new(OhlcSeries::default()));
    seq.bind_series(&ohlc);
    let log = log_events(ohlc.borrow_mut().series_core_mut());

    let ticks = [
        Tick::value(utc("2024-01-02T10:00:05Z"), 0, 10.0),
        Tick::ohlc(
            utc("2024-01-02T10:00:20Z"),
            0,
            OhlcValues {
                open: 11.0,
                high: 20.0,
                low: 1.0,
                close: 11.0,
            },
        ),
        Tick::value(utc("2024-01-02T10:00:50Z"), 0, 12.5),
    ];
    for tick in &ticks {
        feed(&mut seq, &ohlc, tick);
    }

    assert_eq!(*log.borrow(), ["ins 0", "upd 0", "upd 0"]);
    let ohlc = ohlc.borrow();
    let bar = ohlc.point(0).unwrap();
    assert_eq!((bar.open, bar.high, bar.low, bar.close), (10.0, 20.0, 1.0, 12.5));
    assert_eq!(bar.open_date_time, ticks[0].date_time.utc);
    assert_eq!(bar.close_date_time, ticks[2].date_time.utc);
}

#[test]
fn last_series_chains_into_following_buckets() {
    let mut seq = interval_sequencer("60000ms", true, false);
    let last = Rc::new(RefCell::new(LastSeries::default()));
    let close = Rc::new(RefCell::new(CloseSeries::default()));
    seq.bind_series(&last);
    seq.bind_series(&close);

    for (at, value) in [
        ("2024-01-02T10:00:30Z", 1.0),
        ("2024-01-02T10:01:30Z", 2.0),
        ("2024-01-02T10:02:30Z", 3.0),
    ] {
        let tick = Tick::value(utc(at), 0, value);
        last.borrow_mut().stage_tick(&tick);
        close.borrow_mut().stage_tick(&tick);
        assert!(seq.add_tick(tick.date_time, 0).unwrap());
    }

    let values: Vec<Option<f64>> = last
        .borrow()
        .points()
        .iter()
        .map(|p| p.map(|p| p.value))
        .collect();
    assert_eq!(values, [None, Some(1.0), Some(2.0), Some(3.0)]);

    // Every bound series sees every interval the chain created.
    let closes: Vec<Option<f64>> = close
        .borrow()
        .points()
        .iter()
        .map(|p| p.map(|p| p.value))
        .collect();
    assert_eq!(closes, [Some(1.0), Some(2.0), Some(3.0), None]);
}

#[test]
fn close_ignores_late_ticks() {
    let mut seq = interval_sequencer("60000ms", true, false);
    let close = Rc::new(RefCell::new(CloseSeries::default()));
    seq.bind_series(&close);

    feed(&mut seq, &close, &Tick::value(utc("2024-01-02T10:00:40Z"), 0, 1.0));
    feed(&mut seq, &close, &Tick::value(utc("2024-01-02T10:00:20Z"), 0, 2.0));
    feed(&mut seq, &close, &Tick::value(utc("2024-01-02T10:00:40Z"), 1, 3.0));

    assert_eq!(close.borrow().point(0).unwrap().value, 3.0);
}

#[test]
fn weekend_tick_is_rejected_and_stage_discarded() {
    let mut seq = interval_sequencer("1d", false, true);
    let close = Rc::new(RefCell::new(CloseSeries::default()));
    seq.bind_series(&close);

    feed(&mut seq, &close, &Tick::value(utc("2024-01-06T12:00:00Z"), 0, 1.0));
    assert_eq!(seq.point_count(), 0);
    assert!(close.borrow().series_core().staged().is_none());
}

#[test]
fn bulk_reload_is_silent_and_announced() {
    let mut seq = HistorySequencer::new(
        interval_sequencer("60000ms", false, false),
        HistorySequencerConfig::default(),
    );
    let close = Rc::new(RefCell::new(CloseSeries::default()));
    seq.core_mut().bind_series(&close);
    let log = log_events(close.borrow_mut().series_core_mut());

    let announced = Rc::new(RefCell::new(Vec::new()));
    for (event, name) in [
        (HistorySequencerEvent::SequencerLoaded, "sequencer"),
        (HistorySequencerEvent::AllEngineSeriesLoaded, "series"),
    ] {
        let a = Rc::clone(&announced);
        seq.subscribe(event, Rc::new(move || a.borrow_mut().push(name)));
    }

    let series: SeriesRef<IntervalPoint> = close.clone();
    let history = RecordedHistory::good(minute_trades())
        .with_series(series)
        .shared();
    seq.register_history(history).unwrap();

    assert!(log.borrow().is_empty());
    assert_eq!(*announced.borrow(), ["sequencer", "series"]);
    assert_eq!(close.borrow().points().len(), 2);
    assert!(seq.history_count() == 1 && !seq.all_series_loading());

    // Live ticks after the reload notify again.
    let tick = Tick::value(utc("2024-01-02T10:03:10Z"), 0, 7.0);
    close.borrow_mut().stage_tick(&tick);
    assert!(seq.add_tick(tick.date_time, 0).unwrap());
    assert_eq!(*log.borrow(), ["run 2+1", "ins 3"]);
}

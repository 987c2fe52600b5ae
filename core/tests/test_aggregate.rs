use chrono::{NaiveDate, NaiveDateTime};
use ridecache_core::*;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

fn at(d: u32, h: u32) -> NaiveDateTime {
    day(d).and_hms_opt(h, 0, 0).unwrap()
}

fn constant(start: NaiveDateTime, watts: f64, secs: usize) -> MemoryRide {
    MemoryRide::new(start, 1.0).with_series(SeriesKind::Watts, vec![watts; secs])
}

#[test]
fn best_value_per_duration_keeps_its_date() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = CacheContext::default();
    let mut lib = MemoryLibrary::new();
    let a = RideEntry::new(dir.path().join("a.json"), at(1, 9));
    let b = RideEntry::new(dir.path().join("b.json"), at(2, 9));
    lib.add(a, constant(at(1, 9), 200.0, 600));
    lib.add(b, constant(at(2, 9), 250.0, 10));

    let agg = RideCache::aggregate(&lib, day(1), day(30), &ctx).unwrap();
    let mm = agg.mean_max_array(SeriesKind::Watts);
    let dates = agg.mean_max_dates(SeriesKind::Watts);
    assert_eq!(mm.len(), 600);
    assert_eq!(mm[5], 250.0);
    assert_eq!(dates[5], day(2));
    // b er bare 10 s lang
    assert_eq!(mm[100], 200.0);
    assert_eq!(dates[100], day(1));

    assert!(agg.distribution_array(SeriesKind::Watts).is_empty());
    assert!(agg.cache_file().is_none());
    match agg.origin() {
        CacheOrigin::Aggregate { start, end, rides } => {
            assert_eq!((*start, *end, *rides), (day(1), day(30), 2));
        }
        other => panic!("unexpected origin {other:?}"),
    }
}

#[test]
fn range_excludes_rides_outside_dates() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = CacheContext::default();
    let mut lib = MemoryLibrary::new();
    lib.add(RideEntry::new(dir.path().join("early.json"), at(1, 9)), constant(at(1, 9), 400.0, 60));
    lib.add(RideEntry::new(dir.path().join("mid.json"), at(10, 9)), constant(at(10, 9), 220.0, 60));

    let agg = RideCache::aggregate(&lib, day(5), day(20), &ctx).unwrap();
    assert_eq!(agg.mean_max_array(SeriesKind::Watts)[0], 220.0);
    assert!(agg.mean_max_dates(SeriesKind::Watts).iter().all(|&d| d == day(10)));
}

#[test]
fn empty_range_gives_empty_arrays() {
    let ctx = CacheContext::default();
    let agg = RideCache::aggregate(&MemoryLibrary::new(), day(1), day(2), &ctx).unwrap();
    for kind in SeriesKind::ALL {
        assert!(agg.mean_max_scaled(kind).is_empty());
    }
}

#[test]
fn unloadable_ride_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = CacheContext::default();
    let mut lib = MemoryLibrary::new();
    lib.add(RideEntry::new(dir.path().join("ok.json"), at(3, 9)), constant(at(3, 9), 180.0, 30));
    let broken = MemoryRide::new(at(4, 9), -1.0).with_series(SeriesKind::Watts, vec![900.0; 30]);
    lib.add(RideEntry::new(dir.path().join("bad.json"), at(4, 9)), broken);

    let agg = RideCache::aggregate(&lib, day(1), day(30), &ctx).unwrap();
    assert_eq!(agg.mean_max_array(SeriesKind::Watts)[0], 180.0);
    assert!(matches!(agg.origin(), CacheOrigin::Aggregate { rides: 1, .. }));
}

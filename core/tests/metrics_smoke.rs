use ridecache_core::metrics::gather_text;
use ridecache_core::*;

#[test]
fn smoke_hit_and_miss_are_counted() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = CacheContext::default();
    let start = chrono::NaiveDate::from_ymd_opt(2024, 9, 9).unwrap().and_hms_opt(17, 0, 0).unwrap();
    let entry = RideEntry::new(dir.path().join("ride.json"), start);
    let mut lib = MemoryLibrary::new();
    lib.add(
        entry.clone(),
        MemoryRide::new(start, 1.0).with_series(SeriesKind::Watts, vec![220.0; 120]),
    );

    RideCache::open(&entry, &lib, &ctx).unwrap();
    RideCache::open(&entry, &lib, &ctx).unwrap();

    let text = gather_text();
    assert!(text.contains("ridecache_hit_total"), "{text}");
    assert!(text.contains("ridecache_miss_total{reason=\"missing\"}"), "{text}");
    assert!(text.contains("ridecache_compute_seconds"), "{text}");
}

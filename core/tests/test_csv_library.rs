use std::fs;

use chrono::NaiveDate;
use ridecache_core::csv_source::{entry_for, CsvLibrary};
use ridecache_core::*;

fn write_ride(dir: &std::path::Path, name: &str, watts: u32, secs: usize) {
    let mut body = String::from("secs,watts,hr,cad\n");
    for t in 0..secs {
        body.push_str(&format!("{t},{watts},{},{}\n", 120 + t % 20, 85 + t % 10));
    }
    fs::write(dir.join(name), body).unwrap();
}

#[test]
fn csv_directory_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write_ride(dir.path(), "2024_07_01_07_30_00.csv", 210, 300);
    write_ride(dir.path(), "2024_07_03_18_00_00.csv", 260, 120);
    fs::write(dir.path().join("README.txt"), "ikke et opptak").unwrap();

    let lib = CsvLibrary::new(dir.path());
    let ctx = CacheContext::default();
    let from = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
    let to = NaiveDate::from_ymd_opt(2024, 7, 31).unwrap();

    let entries = lib.rides_between(from, to).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].start < entries[1].start);

    let first = RideCache::open(&entries[0], &lib, &ctx).unwrap();
    assert_eq!(first.mean_max_array(SeriesKind::Watts).len(), 300);
    assert_eq!(first.mean_max_array(SeriesKind::Hr)[0], 139.0);
    assert!(first.mean_max_array(SeriesKind::Nm).is_empty());
    assert!(dir.path().join("2024_07_01_07_30_00.cpx").exists());
    assert_eq!(RideCache::check(&entries[0], &ctx), CacheStatus::Fresh);
    assert_eq!(RideCache::check(&entries[1], &ctx), CacheStatus::Missing);

    let again = RideCache::open(&entries[0], &lib, &ctx).unwrap();
    assert!(matches!(again.origin(), CacheOrigin::Read));

    let agg = RideCache::aggregate(&lib, from, to, &ctx).unwrap();
    let watts = agg.mean_max_array(SeriesKind::Watts);
    assert_eq!(watts.len(), 300);
    assert_eq!(watts[0], 260.0);
    let july_3 = NaiveDate::from_ymd_opt(2024, 7, 3).unwrap();
    assert_eq!(agg.mean_max_dates(SeriesKind::Watts)[0], july_3);
    assert_eq!(watts[200], 210.0);
    assert_eq!(RideCache::check(&entries[1], &ctx), CacheStatus::Fresh);
}

#[test]
fn missing_ride_file_is_source_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let lib = CsvLibrary::new(dir.path());
    let path = dir.path().join("2024_07_01_07_30_00.csv");
    let entry = entry_for(&path).unwrap();
    let err = RideCache::open(&entry, &lib, &CacheContext::default()).unwrap_err();
    assert!(matches!(err, CacheError::SourceUnavailable { .. }));
}

#[test]
fn missing_directory_is_source_unavailable() {
    let lib = CsvLibrary::new("/definitely/not/here");
    let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    assert!(matches!(
        lib.rides_between(d, d),
        Err(CacheError::SourceUnavailable { .. })
    ));
}

#[test]
fn pause_in_csv_counts_as_zero_power() {
    let dir = tempfile::tempdir().unwrap();
    let mut body = String::from("secs,watts\n");
    for t in (0..10).chain(100..110) {
        body.push_str(&format!("{t},200\n"));
    }
    let path = dir.path().join("2024_07_05_10_00_00.csv");
    fs::write(&path, body).unwrap();

    let lib = CsvLibrary::new(dir.path());
    let entry = entry_for(&path).unwrap();
    let cache = RideCache::open(&entry, &lib, &CacheContext::default()).unwrap();
    let mm = cache.mean_max_array(SeriesKind::Watts);
    assert_eq!(mm.len(), 110);
    assert_eq!(mm[9], 200.0);
    assert_eq!(mm[109], (20.0 * 200.0 / 110.0_f64).round());

    let dist = cache.distribution_array(SeriesKind::Watts);
    assert_eq!(dist.iter().sum::<f64>(), 110.0);
    assert_eq!(dist[0], 90.0);
    assert_eq!(dist[200], 20.0);
}

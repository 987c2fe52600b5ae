//! Enkel opptakskilde: en katalog med CSV-filer navngitt etter starttid
//! (`YYYY_MM_DD_hh_mm_ss.csv`), én rad per sample:
//!
//! ```text
//! secs,watts,hr,cad,nm,kph
//! 0,210,132,88,23.1,31.4
//! ```
//!
//! `secs` er påkrevd; øvrige kolonner er valgfrie. Tomme celler leses som 0.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use log::debug;

use crate::error::{CacheError, Result};
use crate::source::{MemoryRide, RideCatalog, RideLoader, SeriesSource};
use crate::types::{RideEntry, SeriesKind};

const FILE_DATE_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

#[derive(Debug, Clone)]
pub struct CsvLibrary {
    dir: PathBuf,
}

impl CsvLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Oppføring for en fil, hvis navnet følger datoformatet.
pub fn entry_for(path: &Path) -> Option<RideEntry> {
    let stem = path.file_stem()?.to_str()?;
    let start = NaiveDateTime::parse_from_str(stem, FILE_DATE_FORMAT).ok()?;
    Some(RideEntry::new(path, start))
}

pub fn read_ride(path: &Path, start: NaiveDateTime) -> Result<MemoryRide> {
    let unavailable = |e: &dyn std::fmt::Display| CacheError::source_unavailable(path, e);
    let mut rdr = csv::Reader::from_path(path).map_err(|e| unavailable(&e))?;
    let headers = rdr.headers().map_err(|e| unavailable(&e))?.clone();

    let secs_col = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("secs"))
        .ok_or_else(|| unavailable(&"missing 'secs' column"))?;
    let series_cols: Vec<(usize, SeriesKind)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| {
            SeriesKind::from_name(h.trim())
                .filter(|k| !k.is_derived())
                .map(|k| (i, k))
        })
        .collect();

    let mut secs = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); series_cols.len()];
    for (row_no, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| unavailable(&e))?;
        let cell = |i: usize| -> Result<f64> {
            let raw = record.get(i).unwrap_or("").trim();
            if raw.is_empty() {
                return Ok(0.0);
            }
            raw.parse::<f64>()
                .map_err(|e| unavailable(&format!("row {}: '{raw}': {e}", row_no + 1)))
        };
        secs.push(cell(secs_col)?);
        for (col, (i, _)) in columns.iter_mut().zip(series_cols.iter()) {
            col.push(cell(*i)?);
        }
    }

    let rec_int = sample_interval(&secs);
    let columns = fill_pauses(&secs, columns, rec_int).map_err(|e| unavailable(&e))?;
    let mut ride = MemoryRide::new(start, rec_int);
    for (values, (_, kind)) in columns.into_iter().zip(series_cols) {
        ride.insert(kind, values);
    }
    if let Ok(modified) = fs::metadata(path).and_then(|m| m.modified()) {
        ride = ride.with_modified(modified);
    }
    debug!("read {} ({} rows @ {rec_int}s)", path.display(), secs.len());
    Ok(ride)
}

/// Minste positive avstand mellom to tidsstempler; 1 s hvis det ikke finnes.
fn sample_interval(secs: &[f64]) -> f64 {
    secs.windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| *d > 1e-9)
        .fold(None, |best: Option<f64>, d| Some(best.map_or(d, |b| b.min(d))))
        .unwrap_or(1.0)
}

/// Legger hver rad på sin plass i rutenettet `secs[0] + i * rec_int`.
/// Hull (pauser) fylles med 0-verdier i alle kolonner, så opptakets
/// varighet beholdes.
fn fill_pauses(
    secs: &[f64],
    columns: Vec<Vec<f64>>,
    rec_int: f64,
) -> std::result::Result<Vec<Vec<f64>>, String> {
    let Some(&t0) = secs.first() else {
        return Ok(columns);
    };
    let mut slots = Vec::with_capacity(secs.len());
    let mut prev: Option<usize> = None;
    for (row, &t) in secs.iter().enumerate() {
        let idx = ((t - t0) / rec_int).round();
        if !idx.is_finite() || idx < 0.0 || prev.map_or(false, |p| (idx as usize) < p) {
            return Err(format!("row {}: secs {t} goes backwards", row + 1));
        }
        prev = Some(idx as usize);
        slots.push(idx as usize);
    }
    let len = prev.map_or(0, |p| p + 1);
    Ok(columns
        .into_iter()
        .map(|col| {
            let mut grid = vec![0.0; len];
            for (&i, v) in slots.iter().zip(col) {
                grid[i] = v;
            }
            grid
        })
        .collect())
}

impl RideLoader for CsvLibrary {
    fn load(&self, entry: &RideEntry) -> Result<Box<dyn SeriesSource>> {
        Ok(Box::new(read_ride(&entry.path, entry.start)?))
    }
}

impl RideCatalog for CsvLibrary {
    fn rides_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<RideEntry>> {
        let dir = fs::read_dir(&self.dir)
            .map_err(|e| CacheError::source_unavailable(&self.dir, e))?;
        let mut entries: Vec<RideEntry> = dir
            .filter_map(|d| d.ok())
            .map(|d| d.path())
            .filter(|p| p.extension().map_or(false, |e| e.eq_ignore_ascii_case("csv")))
            .filter_map(|p| entry_for(&p))
            .filter(|e| e.date() >= start && e.date() <= end)
            .collect();
        entries.sort_by_key(|e| e.start);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_gives_start() {
        let e = entry_for(Path::new("/x/2024_05_01_08_30_00.csv")).unwrap();
        assert_eq!(e.start.to_string(), "2024-05-01 08:30:00");
        assert!(entry_for(Path::new("/x/notes.csv")).is_none());
    }

    #[test]
    fn reads_columns_and_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024_05_01_08_30_00.csv");
        fs::write(&path, "secs,watts,hr,alt\n0,200,120,5\n2,,122,5\n4,210,125,6\n").unwrap();
        let e = entry_for(&path).unwrap();
        let ride = read_ride(&path, e.start).unwrap();
        assert_eq!(ride.rec_int_secs(), 2.0);
        assert_eq!(ride.samples(SeriesKind::Watts).unwrap(), &[200.0, 0.0, 210.0]);
        assert_eq!(ride.samples(SeriesKind::Hr).unwrap().len(), 3);
        assert!(ride.samples(SeriesKind::Cad).is_none());
        assert!(ride.modified().is_some());
    }

    #[test]
    fn bad_cell_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024_05_01_08_30_00.csv");
        fs::write(&path, "secs,watts\n0,abc\n").unwrap();
        let err = read_ride(&path, entry_for(&path).unwrap().start).unwrap_err();
        assert!(matches!(err, CacheError::SourceUnavailable { .. }));
    }

    #[test]
    fn pause_becomes_zero_samples() {
        let secs: Vec<f64> = (0..10).chain(100..110).map(|t| t as f64).collect();
        let watts = vec![200.0; 20];
        let cols = fill_pauses(&secs, vec![watts], sample_interval(&secs)).unwrap();
        assert_eq!(cols[0].len(), 110);
        assert_eq!(cols[0][9], 200.0);
        assert_eq!(cols[0][10], 0.0);
        assert_eq!(cols[0][99], 0.0);
        assert_eq!(cols[0][109], 200.0);
    }

    #[test]
    fn interval_ignores_leading_pause() {
        assert_eq!(sample_interval(&[0.0, 30.0, 31.0, 32.0]), 1.0);
        assert_eq!(sample_interval(&[5.0]), 1.0);
        assert_eq!(sample_interval(&[0.0, 2.0, 4.0]), 2.0);
    }

    #[test]
    fn backwards_time_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024_05_01_08_30_00.csv");
        fs::write(&path, "secs,watts\n0,100\n5,110\n3,120\n").unwrap();
        let err = read_ride(&path, entry_for(&path).unwrap().start).unwrap_err();
        assert!(matches!(err, CacheError::SourceUnavailable { .. }));
    }
}

use std::path::PathBuf;

use chrono::NaiveDate;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::wrap_pyfunction;

use crate::cache::{CacheContext, RideCache};
use crate::config::CacheConfig;
use crate::csv_source::{entry_for, CsvLibrary};
use crate::types::RideEntry;

fn context(config_json: Option<&str>) -> PyResult<CacheContext> {
    let config = match config_json {
        Some(s) => CacheConfig::from_json(s).map_err(PyValueError::new_err)?,
        None => CacheConfig::default(),
    };
    Ok(CacheContext::new(config))
}

fn entry(ride_file: &str) -> PyResult<(RideEntry, CsvLibrary)> {
    let path = PathBuf::from(ride_file);
    let entry = entry_for(&path).ok_or_else(|| {
        PyValueError::new_err(format!("{ride_file}: expected YYYY_MM_DD_hh_mm_ss.csv"))
    })?;
    let lib = CsvLibrary::new(path.parent().map(PathBuf::from).unwrap_or_default());
    Ok((entry, lib))
}

fn parse_date(s: &str) -> PyResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| PyValueError::new_err(format!("bad date '{s}': {e}")))
}

// ──────────────────────────────────────────────────────────────────────────────
// JSON-inngangene (samme form som RideCache::to_json)
// ──────────────────────────────────────────────────────────────────────────────

#[pyfunction]
#[pyo3(signature = (ride_file, config_json = None))]
fn ride_cache_json(ride_file: &str, config_json: Option<&str>) -> PyResult<String> {
    let ctx = context(config_json)?;
    let (entry, lib) = entry(ride_file)?;
    let cache = RideCache::open(&entry, &lib, &ctx)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(cache.to_json().to_string())
}

#[pyfunction]
#[pyo3(signature = (dir, start, end, config_json = None))]
fn aggregate_cache_json(
    dir: &str,
    start: &str,
    end: &str,
    config_json: Option<&str>,
) -> PyResult<String> {
    let ctx = context(config_json)?;
    let lib = CsvLibrary::new(dir);
    let cache = RideCache::aggregate(&lib, parse_date(start)?, parse_date(end)?, &ctx)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(cache.to_json().to_string())
}

/// "Fresh" | "Missing" | "Stale" | "Corrupt" – laster ingen data.
#[pyfunction]
#[pyo3(signature = (ride_file, config_json = None))]
fn check_cache(ride_file: &str, config_json: Option<&str>) -> PyResult<String> {
    let ctx = context(config_json)?;
    let (entry, _) = entry(ride_file)?;
    Ok(format!("{:?}", RideCache::check(&entry, &ctx)))
}

// ──────────────────────────────────────────────────────────────────────────────
// PyO3-MODUL
// ──────────────────────────────────────────────────────────────────────────────

#[pymodule]
fn ridecache_core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(ride_cache_json, m)?)?;
    m.add_function(wrap_pyfunction!(aggregate_cache_json, m)?)?;
    m.add_function(wrap_pyfunction!(check_cache, m)?)?;
    Ok(())
}

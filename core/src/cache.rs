//! Hovedinngangen til cachen: gir mean-max- og fordelingsarrays for ett
//! opptak (eller et datointervall, se `aggregate`). Finnes en fersk
//! cachefil leses den; ellers beregnes alt på nytt og skrives til disk.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

use chrono::NaiveDate;
use log::{info, warn};
use serde_json::{json, Map as JsonMap, Value};

use crate::config::CacheConfig;
use crate::derived::{DerivedRegistry, SeriesTransform};
use crate::dispatch::{compute_mean_max_all, SeriesInput, Slots};
use crate::distribution::{compute_distribution, to_seconds};
use crate::error::{CacheError, Result, StaleReason};
use crate::meanmax::to_scaled;
use crate::metrics;
use crate::scaling::Scaling;
use crate::source::{RideLoader, SeriesSource};
use crate::storage::{self, Blocks};
use crate::types::{slot, ArrayKind, CacheStatus, RideEntry, SeriesKind};

/// Mean-max er alltid i 1-sekunds steg (opptak normaliseres til 1 Hz).
pub const MEAN_MAX_BIN_SECS: f64 = 1.0;

/// Konfigurasjon + registrerte transformer for avledede serier.
#[derive(Debug)]
pub struct CacheContext {
    pub config: CacheConfig,
    pub derived: DerivedRegistry,
}

impl CacheContext {
    pub fn new(config: CacheConfig) -> Self {
        let derived = DerivedRegistry::from_config(&config);
        Self { config, derived }
    }

    /// Erstatt transformen for en avledet serie (f.eks. en ekstern NP-formel).
    pub fn with_transform(mut self, kind: SeriesKind, transform: Box<dyn SeriesTransform>) -> Self {
        if !self.derived.register(kind, transform) {
            warn!("ignoring transform for primary series {kind}");
        }
        self
    }

    pub fn scaling(&self, kind: SeriesKind) -> Scaling {
        Scaling::new(self.config.spec_for(kind))
    }

    pub fn cache_path(&self, ride_file: &Path) -> PathBuf {
        storage::cache_path_for(ride_file, &self.config.cache_extension)
    }
}

impl Default for CacheContext {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// Hvor dataene i en `RideCache` kom fra.
#[derive(Debug)]
pub enum CacheOrigin {
    /// Lest fra en fersk cachefil.
    Read,
    /// Beregnet på nytt; `reason` sier hvorfor cachefilen ikke kunne brukes.
    Computed { reason: CacheError },
    /// Aggregat over et datointervall.
    Aggregate { start: NaiveDate, end: NaiveDate, rides: usize },
}

#[derive(Debug)]
pub struct RideCache {
    cache_file: Option<PathBuf>,
    scalings: Slots<Scaling>,
    mean_max: Slots<Vec<u32>>,
    mean_max_dates: Slots<Vec<NaiveDate>>,
    distribution: Slots<Vec<u32>>,
    origin: CacheOrigin,
    write_error: Option<CacheError>,
}

/// Ferdig beregnede arrays for ett opptak (før serialisering).
struct Computed {
    mean_max: Slots<Vec<u32>>,
    mean_max_dates: Slots<Vec<NaiveDate>>,
    distribution: Slots<Vec<u32>>,
}

impl RideCache {
    /// Åpner cachen for et opptak; opptaket lastes via `loader` bare ved behov.
    pub fn open(entry: &RideEntry, loader: &dyn RideLoader, ctx: &CacheContext) -> Result<Self> {
        let cache_file = ctx.cache_path(&entry.path);
        let ride_modified = file_modified(&entry.path);
        match load_fresh(&cache_file, ride_modified, ctx) {
            Ok(blocks) => Ok(Self::from_blocks(entry, cache_file, blocks, ctx)),
            Err(reason) if reason.triggers_recompute() => {
                let ride = loader.load(entry)?;
                Self::recompute(entry, cache_file, ride.as_ref(), reason, ctx)
            }
            Err(e) => Err(e),
        }
    }

    /// Som `open`, men med et opptak som allerede er lest inn.
    pub fn from_ride(
        entry: &RideEntry,
        ride: &dyn SeriesSource,
        ctx: &CacheContext,
    ) -> Result<Self> {
        let cache_file = ctx.cache_path(&entry.path);
        let ride_modified = ride.modified().or_else(|| file_modified(&entry.path));
        match load_fresh(&cache_file, ride_modified, ctx) {
            Ok(blocks) => Ok(Self::from_blocks(entry, cache_file, blocks, ctx)),
            Err(reason) if reason.triggers_recompute() => {
                Self::recompute(entry, cache_file, ride, reason, ctx)
            }
            Err(e) => Err(e),
        }
    }

    /// Ren ferskhetssjekk: leser bare headeren, laster ingen arrays.
    pub fn check(entry: &RideEntry, ctx: &CacheContext) -> CacheStatus {
        let cache_file = ctx.cache_path(&entry.path);
        let verdict = verify_mtime(&cache_file, file_modified(&entry.path)).and_then(|_| {
            storage::read_header(&cache_file, ctx.config.cache_version()).map(|_| ())
        });
        match verdict {
            Ok(()) => CacheStatus::Fresh,
            Err(CacheError::CacheMissing { .. }) => CacheStatus::Missing,
            Err(CacheError::CacheStale { .. }) => CacheStatus::Stale,
            Err(_) => CacheStatus::Corrupt,
        }
    }

    /// For bulk-forhåndsskanning: beregn og skriv cachen hvis den ikke er fersk,
    /// uten å holde på dataene. Returnerer statusen før oppfriskingen.
    pub fn refresh_if_stale(
        entry: &RideEntry,
        loader: &dyn RideLoader,
        ctx: &CacheContext,
    ) -> Result<CacheStatus> {
        let status = Self::check(entry, ctx);
        if !status.needs_refresh() {
            return Ok(status);
        }
        let ride = loader.load(entry)?;
        let computed = compute(entry, ride.as_ref(), ctx)?;
        let cache_file = ctx.cache_path(&entry.path);
        persist(&cache_file, &computed, ctx)?;
        info!("refreshed {} (was {:?})", cache_file.display(), status);
        Ok(status)
    }

    fn from_blocks(
        entry: &RideEntry,
        cache_file: PathBuf,
        mut blocks: Blocks,
        ctx: &CacheContext,
    ) -> Self {
        metrics::record_hit();
        info!("cache hit {}", cache_file.display());
        let mut mean_max: Slots<Vec<u32>> = Default::default();
        let mut distribution: Slots<Vec<u32>> = Default::default();
        let mut mean_max_dates: Slots<Vec<NaiveDate>> = Default::default();
        for kind in SeriesKind::ALL {
            let k = kind.index();
            mean_max[k] = std::mem::take(&mut blocks[slot(kind, ArrayKind::MeanMax)]);
            distribution[k] = std::mem::take(&mut blocks[slot(kind, ArrayKind::Distribution)]);
            mean_max_dates[k] = ride_dates(entry, mean_max[k].len());
        }
        Self {
            cache_file: Some(cache_file),
            scalings: scalings(ctx),
            mean_max,
            mean_max_dates,
            distribution,
            origin: CacheOrigin::Read,
            write_error: None,
        }
    }

    fn recompute(
        entry: &RideEntry,
        cache_file: PathBuf,
        ride: &dyn SeriesSource,
        reason: CacheError,
        ctx: &CacheContext,
    ) -> Result<Self> {
        warn!("{reason}; recomputing {}", entry.path.display());
        metrics::record_miss(reason.label());
        let computed = compute(entry, ride, ctx)?;
        let write_error = persist(&cache_file, &computed, ctx).err();
        Ok(Self {
            cache_file: Some(cache_file),
            scalings: scalings(ctx),
            mean_max: computed.mean_max,
            mean_max_dates: computed.mean_max_dates,
            distribution: computed.distribution,
            origin: CacheOrigin::Computed { reason },
            write_error,
        })
    }

    pub(crate) fn from_aggregate(
        mean_max: Slots<Vec<u32>>,
        mean_max_dates: Slots<Vec<NaiveDate>>,
        origin: CacheOrigin,
        ctx: &CacheContext,
    ) -> Self {
        Self {
            cache_file: None,
            scalings: scalings(ctx),
            mean_max,
            mean_max_dates,
            distribution: Default::default(),
            origin,
            write_error: None,
        }
    }

    /// Beste snitt per varighet (indeks i = i+1 sekunder), i semantiske enheter.
    pub fn mean_max_array(&self, kind: SeriesKind) -> Vec<f64> {
        let s = &self.scalings[kind.index()];
        self.mean_max[kind.index()].iter().map(|&v| s.from_scaled(v)).collect()
    }

    pub fn mean_max_scaled(&self, kind: SeriesKind) -> &[u32] {
        &self.mean_max[kind.index()]
    }

    pub fn mean_max_dates(&self, kind: SeriesKind) -> &[NaiveDate] {
        &self.mean_max_dates[kind.index()]
    }

    /// Sekunder per verdibøtte fra seriens minimum.
    pub fn distribution_array(&self, kind: SeriesKind) -> Vec<f64> {
        to_seconds(&self.distribution[kind.index()])
    }

    pub fn distribution_scaled(&self, kind: SeriesKind) -> &[u32] {
        &self.distribution[kind.index()]
    }

    pub fn mean_max_bin_size(&self, _kind: SeriesKind) -> f64 {
        MEAN_MAX_BIN_SECS
    }

    pub fn dist_bin_size(&self, kind: SeriesKind) -> f64 {
        self.scalings[kind.index()].dist_bin_width()
    }

    pub fn origin(&self) -> &CacheOrigin {
        &self.origin
    }

    /// Satt hvis dataene ble beregnet, men ikke kunne lagres (ikke-fatalt).
    pub fn write_error(&self) -> Option<&CacheError> {
        self.write_error.as_ref()
    }

    pub fn cache_file(&self) -> Option<&Path> {
        self.cache_file.as_deref()
    }

    pub fn to_json(&self) -> Value {
        let mut series = JsonMap::new();
        for kind in SeriesKind::ALL {
            series.insert(
                kind.name().to_string(),
                json!({
                    "mean_max": self.mean_max_array(kind),
                    "mean_max_dates": self.mean_max_dates(kind),
                    "mean_max_bin_size": self.mean_max_bin_size(kind),
                    "distribution": self.distribution_array(kind),
                    "dist_bin_size": self.dist_bin_size(kind),
                }),
            );
        }
        let origin = match &self.origin {
            CacheOrigin::Read => json!({ "kind": "read" }),
            CacheOrigin::Computed { reason } => {
                json!({ "kind": "computed", "reason": reason.label() })
            }
            CacheOrigin::Aggregate { start, end, rides } => {
                json!({ "kind": "aggregate", "start": start, "end": end, "rides": rides })
            }
        };
        json!({
            "cache_file": self.cache_file.as_ref().map(|p| p.display().to_string()),
            "origin": origin,
            "write_error": self.write_error.as_ref().map(|e| e.to_string()),
            "series": Value::Object(series),
        })
    }
}

fn scalings(ctx: &CacheContext) -> Slots<Scaling> {
    SeriesKind::ALL.map(|k| ctx.scaling(k))
}

fn file_modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Cachefilen må finnes og ikke være eldre enn opptaket.
fn verify_mtime(cache_file: &Path, ride_modified: Option<SystemTime>) -> Result<()> {
    let meta = fs::metadata(cache_file).map_err(|e| match e.kind() {
        ErrorKind::NotFound => CacheError::CacheMissing { path: cache_file.to_path_buf() },
        _ => CacheError::corrupt(cache_file, format!("stat failed: {e}")),
    })?;
    if let (Some(ride), Ok(cache)) = (ride_modified, meta.modified()) {
        if cache < ride {
            return Err(CacheError::CacheStale {
                path: cache_file.to_path_buf(),
                reason: StaleReason::Outdated,
            });
        }
    }
    Ok(())
}

fn load_fresh(
    cache_file: &Path,
    ride_modified: Option<SystemTime>,
    ctx: &CacheContext,
) -> Result<Blocks> {
    verify_mtime(cache_file, ride_modified)?;
    storage::read_cache(cache_file, ctx.config.cache_version())
}

/// Datoene lagres ikke; lest og beregnet cache daterer begge alle
/// beste verdier med opptakets dato.
fn ride_dates(entry: &RideEntry, len: usize) -> Vec<NaiveDate> {
    vec![entry.date(); len]
}

fn compute(entry: &RideEntry, ride: &dyn SeriesSource, ctx: &CacheContext) -> Result<Computed> {
    let ride_file = entry.path();
    let rec_int = ride.rec_int_secs();
    if !(rec_int.is_finite() && rec_int > 0.0) {
        return Err(CacheError::source_unavailable(
            ride_file,
            format!("invalid sampling interval {rec_int}"),
        ));
    }
    let t0 = Instant::now();

    let inputs: Slots<Option<SeriesInput<'_>>> = SeriesKind::ALL.map(|kind| {
        ctx.derived.series_values(ride, kind).map(|values| SeriesInput {
            values,
            exponent: ctx.derived.exponent(kind),
        })
    });

    let points = compute_mean_max_all(&inputs, ctx.config.parallel);

    let mut out = Computed {
        mean_max: Default::default(),
        mean_max_dates: Default::default(),
        distribution: Default::default(),
    };
    for kind in SeriesKind::ALL {
        let k = kind.index();
        let scaling = ctx.scaling(kind);
        out.mean_max[k] = to_scaled(&points[k], &scaling);
        out.mean_max_dates[k] = ride_dates(entry, out.mean_max[k].len());
        if let Some(input) = &inputs[k] {
            out.distribution[k] = compute_distribution(&input.values, &scaling);
        }
    }

    let secs = t0.elapsed().as_secs_f64();
    metrics::observe_compute(secs);
    info!("computed {} in {:.2}s", ride_file.display(), secs);
    Ok(out)
}

fn persist(cache_file: &Path, computed: &Computed, ctx: &CacheContext) -> Result<()> {
    let mut blocks: Blocks = Default::default();
    for kind in SeriesKind::ALL {
        blocks[slot(kind, ArrayKind::MeanMax)] = computed.mean_max[kind.index()].clone();
        blocks[slot(kind, ArrayKind::Distribution)] = computed.distribution[kind.index()].clone();
    }
    storage::write_cache(cache_file, ctx.config.cache_version(), &blocks).map_err(|e| {
        warn!("{e}; returning in-memory arrays");
        metrics::record_write_failed();
        e
    })
}

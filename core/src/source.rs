//! Grensesnittet mot opptakskilden. Parsing av råfiler ligger utenfor
//! denne cratens ansvar; cachen trenger bare sampleverdier per serie,
//! samplingsintervall og start-/endringstidspunkt. Presisjon og gyldig
//! område er globale per serietype og ligger i `CacheConfig`.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::SystemTime;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{CacheError, Result};
use crate::types::{RideEntry, SeriesKind};

/// Ett innlest opptak. Deles lesende mellom arbeidstrådene.
pub trait SeriesSource: Sync {
    /// Rå sampleverdier for en primærserie; `None` hvis serien mangler.
    /// Pauser leveres som 0-verdier.
    fn samples(&self, kind: SeriesKind) -> Option<&[f64]>;

    /// Samplingsintervall i sekunder.
    fn rec_int_secs(&self) -> f64;

    fn start(&self) -> NaiveDateTime;

    /// Endringssignal for innholdet; brukes i ferskhetssjekken når
    /// opptaket ikke finnes som fil.
    fn modified(&self) -> Option<SystemTime> {
        None
    }
}

pub trait RideLoader {
    fn load(&self, entry: &RideEntry) -> Result<Box<dyn SeriesSource>>;
}

/// Katalog over opptak – brukes av aggregatbyggeren.
pub trait RideCatalog: RideLoader {
    /// Alle opptak med dato i [start, end], sortert på starttid.
    fn rides_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<RideEntry>>;
}

/// Normaliserer til 1 Hz (sample-and-hold) slik at ett indekssteg = ett sekund.
pub fn normalize_1hz(samples: &[f64], rec_int_secs: f64) -> Cow<'_, [f64]> {
    if (rec_int_secs - 1.0).abs() < 1e-9 || samples.is_empty() {
        return Cow::Borrowed(samples);
    }
    let total = (samples.len() as f64 * rec_int_secs).round() as usize;
    let last = samples.len() - 1;
    let out = (0..total)
        .map(|t| {
            let idx = ((t as f64 + 1e-9) / rec_int_secs).floor() as usize;
            samples[idx.min(last)]
        })
        .collect();
    Cow::Owned(out)
}

/// Opptak i minnet – for kall der opptaket allerede er lest inn, og for tester.
#[derive(Debug, Clone)]
pub struct MemoryRide {
    start: NaiveDateTime,
    rec_int_secs: f64,
    series: BTreeMap<SeriesKind, Vec<f64>>,
    modified: Option<SystemTime>,
}

impl MemoryRide {
    pub fn new(start: NaiveDateTime, rec_int_secs: f64) -> Self {
        Self {
            start,
            rec_int_secs,
            series: BTreeMap::new(),
            modified: None,
        }
    }

    pub fn with_series(mut self, kind: SeriesKind, values: Vec<f64>) -> Self {
        self.series.insert(kind, values);
        self
    }

    pub fn with_modified(mut self, modified: SystemTime) -> Self {
        self.modified = Some(modified);
        self
    }

    pub fn insert(&mut self, kind: SeriesKind, values: Vec<f64>) {
        self.series.insert(kind, values);
    }
}

impl SeriesSource for MemoryRide {
    fn samples(&self, kind: SeriesKind) -> Option<&[f64]> {
        self.series.get(&kind).map(Vec::as_slice)
    }

    fn rec_int_secs(&self) -> f64 {
        self.rec_int_secs
    }

    fn start(&self) -> NaiveDateTime {
        self.start
    }

    fn modified(&self) -> Option<SystemTime> {
        self.modified
    }
}

/// Katalog i minnet: (oppføring, opptak)-par.
#[derive(Debug, Clone, Default)]
pub struct MemoryLibrary {
    rides: Vec<(RideEntry, MemoryRide)>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: RideEntry, ride: MemoryRide) {
        self.rides.push((entry, ride));
        self.rides.sort_by_key(|(e, _)| e.start);
    }
}

impl RideLoader for MemoryLibrary {
    fn load(&self, entry: &RideEntry) -> Result<Box<dyn SeriesSource>> {
        self.rides
            .iter()
            .find(|(e, _)| e.path == entry.path)
            .map(|(_, r)| Box::new(r.clone()) as Box<dyn SeriesSource>)
            .ok_or_else(|| CacheError::source_unavailable(&entry.path, "not in library"))
    }
}

impl RideCatalog for MemoryLibrary {
    fn rides_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<RideEntry>> {
        Ok(self
            .rides
            .iter()
            .filter(|(e, _)| e.date() >= start && e.date() <= end)
            .map(|(e, _)| e.clone())
            .collect())
    }
}

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// De sju serietypene cachen holder. Rekkefølgen her er den faste
/// rekkefølgen i filheaderen og blokkene – ikke endre uten versjonsbump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Watts,
    Hr,
    Cad,
    Nm,
    Kph,
    XPower,
    Np,
}

impl SeriesKind {
    pub const ALL: [SeriesKind; 7] = [
        SeriesKind::Watts,
        SeriesKind::Hr,
        SeriesKind::Cad,
        SeriesKind::Nm,
        SeriesKind::Kph,
        SeriesKind::XPower,
        SeriesKind::Np,
    ];

    /// Serier som leses direkte fra opptaket.
    pub const PRIMARY: [SeriesKind; 5] = [
        SeriesKind::Watts,
        SeriesKind::Hr,
        SeriesKind::Cad,
        SeriesKind::Nm,
        SeriesKind::Kph,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// xPower og NP beregnes fra kraftserien.
    pub fn is_derived(self) -> bool {
        matches!(self, SeriesKind::XPower | SeriesKind::Np)
    }

    pub fn name(self) -> &'static str {
        match self {
            SeriesKind::Watts => "watts",
            SeriesKind::Hr => "hr",
            SeriesKind::Cad => "cad",
            SeriesKind::Nm => "nm",
            SeriesKind::Kph => "kph",
            SeriesKind::XPower => "xpower",
            SeriesKind::Np => "np",
        }
    }

    pub fn from_name(name: &str) -> Option<SeriesKind> {
        SeriesKind::ALL
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }

    /// Standard presisjon og gyldig område per serie.
    pub fn default_spec(self) -> SeriesSpec {
        match self {
            SeriesKind::Watts | SeriesKind::XPower | SeriesKind::Np => {
                SeriesSpec::new(0, 0.0, 2500.0)
            }
            SeriesKind::Hr => SeriesSpec::new(0, 0.0, 250.0),
            SeriesKind::Cad => SeriesSpec::new(0, 0.0, 300.0),
            SeriesKind::Nm => SeriesSpec::new(2, 0.0, 300.0),
            SeriesKind::Kph => SeriesSpec::new(1, 0.0, 150.0),
        }
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayKind {
    MeanMax,
    Distribution,
}

impl ArrayKind {
    pub const ALL: [ArrayKind; 2] = [ArrayKind::MeanMax, ArrayKind::Distribution];
}

/// Posisjonen til (serie, arraytype) i headerens 14 tellere.
pub fn slot(kind: SeriesKind, array: ArrayKind) -> usize {
    match array {
        ArrayKind::MeanMax => kind.index(),
        ArrayKind::Distribution => SeriesKind::ALL.len() + kind.index(),
    }
}

/// Presisjon (antall desimaler) og gyldig verdiområde for en serie.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesSpec {
    pub decimals: u32,
    pub min: f64,
    pub max: f64,
}

impl SeriesSpec {
    pub fn new(decimals: u32, min: f64, max: f64) -> Self {
        Self { decimals, min, max }
    }
}

/// Ett opptak i biblioteket: filsti + starttidspunkt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RideEntry {
    pub path: PathBuf,
    pub start: NaiveDateTime,
}

impl RideEntry {
    pub fn new(path: impl Into<PathBuf>, start: NaiveDateTime) -> Self {
        Self { path: path.into(), start }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }
}

/// Resultat av en ren ferskhetssjekk (ingen data lastes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Fresh,
    Missing,
    Stale,
    Corrupt,
}

impl CacheStatus {
    pub fn needs_refresh(self) -> bool {
        self != CacheStatus::Fresh
    }
}

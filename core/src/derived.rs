//! Avledede kraftserier (xPower, NP). Transformen er en registrert, ren
//! funksjon av kraftserien; snitt- og fordelingsmotorene ser bare
//! ferdige verdier og vet ikke hvor de kommer fra.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use crate::config::{CacheConfig, DerivedConfig, SmoothingMethod};
use crate::smoothing::{exponential, rolling_mean};
use crate::source::{normalize_1hz, SeriesSource};
use crate::types::SeriesKind;

pub trait SeriesTransform: Send + Sync + fmt::Debug {
    /// Avledet serie fra 1 Hz kraftverdier; samme lengde som input.
    fn derive(&self, power: &[f64]) -> Vec<f64>;

    /// Eksponent for potenssnittet i mean-max (1 = aritmetisk snitt).
    fn exponent(&self) -> i32 {
        1
    }
}

/// Konfigurerbar glatting (rullende eller eksponentiell).
#[derive(Debug, Clone)]
pub struct Smoothed {
    config: DerivedConfig,
}

impl Smoothed {
    pub fn new(config: DerivedConfig) -> Self {
        Self { config }
    }
}

impl SeriesTransform for Smoothed {
    fn derive(&self, power: &[f64]) -> Vec<f64> {
        match self.config.method {
            SmoothingMethod::Rolling { window_secs } => rolling_mean(power, window_secs as usize),
            SmoothingMethod::Exponential { time_constant_secs } => {
                exponential(power, time_constant_secs, 1.0)
            }
        }
    }

    fn exponent(&self) -> i32 {
        self.config.exponent.max(1)
    }
}

#[derive(Debug, Default)]
pub struct DerivedRegistry {
    transforms: BTreeMap<SeriesKind, Box<dyn SeriesTransform>>,
}

impl DerivedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        let mut reg = Self::new();
        for kind in SeriesKind::ALL.into_iter().filter(|k| k.is_derived()) {
            if let Some(d) = config.derived(kind) {
                reg.register(kind, Box::new(Smoothed::new(d.clone())));
            }
        }
        reg
    }

    /// Registrer (eller erstatt) transformen for en avledet serie.
    /// Primærserier kan ikke overstyres; returnerer false.
    pub fn register(&mut self, kind: SeriesKind, transform: Box<dyn SeriesTransform>) -> bool {
        if !kind.is_derived() {
            return false;
        }
        self.transforms.insert(kind, transform);
        true
    }

    pub fn get(&self, kind: SeriesKind) -> Option<&dyn SeriesTransform> {
        self.transforms.get(&kind).map(|t| t.as_ref())
    }

    pub fn exponent(&self, kind: SeriesKind) -> i32 {
        self.get(kind).map_or(1, |t| t.exponent())
    }

    /// Verdiene motorene skal bruke for `kind`, på 1 Hz-grid.
    /// `None` hvis serien (eller kraftserien for avledede) mangler.
    pub fn series_values<'a>(
        &self,
        source: &'a dyn SeriesSource,
        kind: SeriesKind,
    ) -> Option<Cow<'a, [f64]>> {
        let rec_int = source.rec_int_secs();
        if !kind.is_derived() {
            return source.samples(kind).map(|xs| normalize_1hz(xs, rec_int));
        }
        let transform = self.get(kind)?;
        let power = normalize_1hz(source.samples(SeriesKind::Watts)?, rec_int);
        Some(Cow::Owned(transform.derive(&power)))
    }
}

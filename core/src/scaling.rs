use crate::types::SeriesSpec;

// toleranse mot flyttallsstøy ved bøttegrenser (0.3 / 0.1 = 2.999…)
const BUCKET_EPS: f64 = 1e-9;

/// Skalering mellom semantiske verdier (f64) og lagrede heltall (u32),
/// samt kvantisering til fordelingsbøtter.
///
/// 27.1 km/t med 1 desimal lagres som 271, 27.454 Nm med 2 desimaler som 2745.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaling {
    spec: SeriesSpec,
    scale: f64,
}

impl Scaling {
    pub fn new(spec: SeriesSpec) -> Self {
        let scale = 10_f64.powi(spec.decimals as i32);
        Self { spec, scale }
    }

    pub fn spec(&self) -> SeriesSpec {
        self.spec
    }

    /// 10^decimals
    pub fn factor(&self) -> f64 {
        self.scale
    }

    pub fn to_scaled(&self, value: f64) -> u32 {
        if !value.is_finite() || value <= 0.0 {
            return 0;
        }
        let v = (value * self.scale).round();
        if v >= u32::MAX as f64 { u32::MAX } else { v as u32 }
    }

    pub fn from_scaled(&self, stored: u32) -> f64 {
        stored as f64 / self.scale
    }

    /// 1.0 for heltallsserier, ellers 0.1.
    pub fn dist_bin_width(&self) -> f64 {
        if self.spec.decimals == 0 { 1.0 } else { 0.1 }
    }

    /// Antall bøtter fra min til og med max.
    pub fn dist_len(&self) -> usize {
        let span = (self.spec.max - self.spec.min).max(0.0);
        (span / self.dist_bin_width() + BUCKET_EPS).floor() as usize + 1
    }

    /// Bøtteindeks for en verdi, klemt inn i [0, dist_len).
    pub fn bucket(&self, value: f64) -> usize {
        if !value.is_finite() {
            return 0;
        }
        let raw = ((value - self.spec.min) / self.dist_bin_width() + BUCKET_EPS).floor();
        if raw <= 0.0 {
            0
        } else {
            (raw as usize).min(self.dist_len() - 1)
        }
    }

    /// Nedre grense (semantisk verdi) for bøtte `idx`.
    pub fn bucket_value(&self, idx: usize) -> f64 {
        self.spec.min + idx as f64 * self.dist_bin_width()
    }
}

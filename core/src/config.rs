use std::collections::BTreeMap;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_path_to_error as spte;

use crate::error::{CacheError, Result};
use crate::storage::RIDE_CACHE_VERSION;
use crate::types::{SeriesKind, SeriesSpec};

/// Glattingsmetode for en avledet kraftserie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingMethod {
    Rolling { window_secs: u32 },
    Exponential { time_constant_secs: f64 },
}

/// Parametre for en avledet serie. `exponent` = 1 gir vanlig snitt,
/// 4 gir potenssnitt ((Σx⁴)/n)^¼ slik NP/xPower regnes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedConfig {
    pub method: SmoothingMethod,
    #[serde(default = "default_exponent")]
    pub exponent: i32,
}

fn default_exponent() -> i32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Filendelse for cachefilen (erstatter opptakets endelse).
    pub cache_extension: String,
    /// Overstyring av presisjon/område per serie.
    pub series: BTreeMap<SeriesKind, SeriesSpec>,
    pub xpower: DerivedConfig,
    pub np: DerivedConfig,
    /// Bumpes når transformene endres; inngår i headerversjonen.
    pub transform_revision: u16,
    /// Fork-join over serier (false = sekvensielt).
    pub parallel: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_extension: "cpx".to_string(),
            series: BTreeMap::new(),
            xpower: DerivedConfig {
                method: SmoothingMethod::Exponential { time_constant_secs: 25.0 },
                exponent: 4,
            },
            np: DerivedConfig {
                method: SmoothingMethod::Rolling { window_secs: 30 },
                exponent: 4,
            },
            transform_revision: 1,
            parallel: true,
        }
    }
}

impl CacheConfig {
    pub fn spec_for(&self, kind: SeriesKind) -> SeriesSpec {
        self.series.get(&kind).copied().unwrap_or_else(|| kind.default_spec())
    }

    pub fn derived(&self, kind: SeriesKind) -> Option<&DerivedConfig> {
        match kind {
            SeriesKind::XPower => Some(&self.xpower),
            SeriesKind::Np => Some(&self.np),
            _ => None,
        }
    }

    /// Versjonen som skrives i headeren: format i øvre 16 bit, transform-revisjon i nedre.
    pub fn cache_version(&self) -> u32 {
        (RIDE_CACHE_VERSION << 16) | self.transform_revision as u32
    }

    pub fn from_json(json_str: &str) -> std::result::Result<Self, String> {
        let mut de = serde_json::Deserializer::from_str(json_str);
        spte::deserialize(&mut de).map_err(|e| format!("parse error at {}: {}", e.path(), e))
    }
}

/// Leser konfigurasjon fra disk (JSON).
/// Hvis filen ikke finnes, returneres default-konfigurasjon.
pub fn load_config(path: &Path) -> Result<CacheConfig> {
    if !path.exists() {
        warn!("config {} not found, using defaults", path.display());
        return Ok(CacheConfig::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| CacheError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let config = CacheConfig::from_json(&contents).map_err(|message| CacheError::Config {
        path: path.to_path_buf(),
        message,
    })?;
    info!(
        "config loaded from {} (revision={}, parallel={})",
        path.display(),
        config.transform_revision,
        config.parallel
    );
    Ok(config)
}

/// Lagrer konfigurasjon som JSON (pretty-print).
pub fn save_config(config: &CacheConfig, path: &Path) -> Result<()> {
    let to_err = |message: String| CacheError::Config { path: path.to_path_buf(), message };
    let json = serde_json::to_string_pretty(config).map_err(|e| to_err(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| to_err(e.to_string()))?;
    info!("config saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fall_back_to_kind_spec() {
        let cfg = CacheConfig::default();
        assert_eq!(cfg.spec_for(SeriesKind::Kph), SeriesSpec::new(1, 0.0, 150.0));
        assert!(cfg.derived(SeriesKind::Watts).is_none());
        assert_eq!(cfg.derived(SeriesKind::Np).map(|d| d.exponent), Some(4));
    }

    #[test]
    fn revision_changes_version() {
        let a = CacheConfig::default();
        let b = CacheConfig { transform_revision: 2, ..CacheConfig::default() };
        assert_ne!(a.cache_version(), b.cache_version());
        assert_eq!(a.cache_version() >> 16, RIDE_CACHE_VERSION);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = CacheConfig::from_json(
            r#"{
                "np": {"method": {"rolling": {"window_secs": 20}}},
                "series": {"hr": {"decimals": 0, "min": 30.0, "max": 220.0}}
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.np.method, SmoothingMethod::Rolling { window_secs: 20 });
        assert_eq!(cfg.np.exponent, 1);
        assert_eq!(cfg.spec_for(SeriesKind::Hr).min, 30.0);
        assert_eq!(cfg.cache_extension, "cpx");
    }

    #[test]
    fn bad_json_reports_path() {
        let err = CacheConfig::from_json(r#"{"parallel": "yes"}"#).unwrap_err();
        assert!(err.contains("parallel"), "{err}");
    }
}

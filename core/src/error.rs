use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CacheError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// Headerversjonen matcher ikke gjeldende format/transform-revisjon.
    Version { expected: u32, found: u32 },
    /// Opptaket er endret etter at cachen ble skrevet.
    Outdated,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::Version { expected, found } => {
                write!(f, "version {found:#x}, expected {expected:#x}")
            }
            StaleReason::Outdated => f.write_str("ride file is newer than cache"),
        }
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache file missing: {path}")]
    CacheMissing { path: PathBuf },

    #[error("cache file stale ({reason}): {path}")]
    CacheStale { path: PathBuf, reason: StaleReason },

    #[error("cache file corrupt ({detail}): {path}")]
    CacheCorrupt { path: PathBuf, detail: String },

    #[error("ride unavailable ({reason}): {path}")]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("failed to write cache {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },
}

impl CacheError {
    /// Format-/ferskhetsfeil håndteres lokalt ved å beregne på nytt.
    pub fn triggers_recompute(&self) -> bool {
        matches!(
            self,
            CacheError::CacheMissing { .. }
                | CacheError::CacheStale { .. }
                | CacheError::CacheCorrupt { .. }
        )
    }

    /// Kort etikett for metrikker/logg.
    pub fn label(&self) -> &'static str {
        match self {
            CacheError::CacheMissing { .. } => "missing",
            CacheError::CacheStale { .. } => "stale",
            CacheError::CacheCorrupt { .. } => "corrupt",
            CacheError::SourceUnavailable { .. } => "source_unavailable",
            CacheError::WriteFailed { .. } => "write_failed",
            CacheError::Config { .. } => "config",
        }
    }

    pub(crate) fn source_unavailable(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        CacheError::SourceUnavailable { path: path.into(), reason: reason.to_string() }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        CacheError::CacheCorrupt { path: path.into(), detail: detail.into() }
    }
}

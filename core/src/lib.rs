//! Cache for avledede data fra treningsopptak: mean-maximal-kurver og
//! tidsfordelinger per verdibøtte, forhåndsberegnet og lagret i en
//! binær cachefil per opptak.

pub mod aggregate;
pub mod cache;
pub mod cli;
pub mod config;
pub mod csv_source;
pub mod derived;
pub mod dispatch;
pub mod distribution;
pub mod error;
pub mod meanmax;
pub mod metrics;
pub mod scaling;
pub mod smoothing;
pub mod source;
pub mod storage;
pub mod types;

#[cfg(feature = "python")]
mod py;

pub use aggregate::AggregateBuilder;
pub use cache::{CacheContext, CacheOrigin, RideCache};
pub use config::{load_config, save_config, CacheConfig, DerivedConfig, SmoothingMethod};
pub use derived::{DerivedRegistry, SeriesTransform};
pub use error::{CacheError, Result, StaleReason};
pub use scaling::Scaling;
pub use source::{MemoryLibrary, MemoryRide, RideCatalog, RideLoader, SeriesSource};
pub use storage::{CacheHeader, RIDE_CACHE_VERSION};
pub use types::{ArrayKind, CacheStatus, RideEntry, SeriesKind, SeriesSpec};

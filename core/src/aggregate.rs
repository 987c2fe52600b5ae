use chrono::NaiveDate;
use log::{info, warn};

use crate::cache::{CacheContext, CacheOrigin, RideCache};
use crate::dispatch::Slots;
use crate::error::Result;
use crate::source::RideCatalog;
use crate::types::SeriesKind;

/// Slår sammen mean-max-arrays fra flere opptak: per varighet vinner
/// høyeste verdi, og datoen til opptaket som ga den følger med.
/// Opptak som er kortere enn en varighet bidrar ikke der.
#[derive(Debug, Default)]
pub struct AggregateBuilder {
    mean_max: Slots<Vec<u32>>,
    dates: Slots<Vec<NaiveDate>>,
    rides: usize,
}

impl AggregateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, kind: SeriesKind, values: &[u32], dates: &[NaiveDate]) {
        let best = &mut self.mean_max[kind.index()];
        let best_dates = &mut self.dates[kind.index()];
        for (i, (&v, &d)) in values.iter().zip(dates.iter()).enumerate() {
            if i >= best.len() {
                best.push(v);
                best_dates.push(d);
            } else if v > best[i] {
                // likhet beholder tidligste opptak
                best[i] = v;
                best_dates[i] = d;
            }
        }
    }

    pub fn merge_ride(&mut self, ride: &RideCache) {
        for kind in SeriesKind::ALL {
            self.merge(kind, ride.mean_max_scaled(kind), ride.mean_max_dates(kind));
        }
        self.rides += 1;
    }

    pub fn rides(&self) -> usize {
        self.rides
    }

    /// Aggregatet har ingen fordelinger.
    pub fn finish(self, start: NaiveDate, end: NaiveDate, ctx: &CacheContext) -> RideCache {
        let origin = CacheOrigin::Aggregate { start, end, rides: self.rides };
        RideCache::from_aggregate(self.mean_max, self.dates, origin, ctx)
    }
}

impl RideCache {
    /// Mean-max over alle opptak med dato i [start, end]. Hvert opptak
    /// åpnes (og beregnes ved behov) etter tur; opptak som ikke kan lastes
    /// hoppes over med en advarsel.
    pub fn aggregate<C: RideCatalog>(
        catalog: &C,
        start: NaiveDate,
        end: NaiveDate,
        ctx: &CacheContext,
    ) -> Result<RideCache> {
        let entries = catalog.rides_between(start, end)?;
        let mut builder = AggregateBuilder::new();
        for entry in &entries {
            match RideCache::open(entry, catalog, ctx) {
                Ok(ride) => builder.merge_ride(&ride),
                Err(e) => warn!("skipping {} in aggregate: {e}", entry.path.display()),
            }
        }
        info!(
            "aggregated {} of {} rides between {start} and {end}",
            builder.rides(),
            entries.len()
        );
        Ok(builder.finish(start, end, ctx))
    }
}

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Tellere for cachen, samlet i et eget register.
pub struct Metrics {
    pub registry: Registry,
    pub hit_total: IntCounter,
    pub miss_total: IntCounterVec,
    pub write_failed_total: IntCounter,
    pub compute_seconds: Histogram,
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new();

        // navnene er konstante; registrering kan bare feile ved duplikater
        let hit_total = IntCounter::new("ridecache_hit_total", "Cache files read without recompute")
            .expect("valid metric");
        let miss_total = IntCounterVec::new(
            Opts::new("ridecache_miss_total", "Cache recomputes by reason"),
            &["reason"],
        )
        .expect("valid metric");
        let write_failed_total = IntCounter::new(
            "ridecache_write_failed_total",
            "Cache files that could not be persisted",
        )
        .expect("valid metric");
        let compute_seconds = Histogram::with_opts(
            HistogramOpts::new("ridecache_compute_seconds", "Time spent recomputing one ride")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]),
        )
        .expect("valid metric");

        registry.register(Box::new(hit_total.clone())).expect("register hit_total");
        registry.register(Box::new(miss_total.clone())).expect("register miss_total");
        registry
            .register(Box::new(write_failed_total.clone()))
            .expect("register write_failed_total");
        registry
            .register(Box::new(compute_seconds.clone()))
            .expect("register compute_seconds");

        Self { registry, hit_total, miss_total, write_failed_total, compute_seconds }
    }
}

pub static METRICS: Lazy<Metrics> = Lazy::new(Metrics::new);

pub fn record_hit() {
    METRICS.hit_total.inc();
}

pub fn record_miss(reason: &str) {
    METRICS.miss_total.with_label_values(&[reason]).inc();
}

pub fn record_write_failed() {
    METRICS.write_failed_total.inc();
}

pub fn observe_compute(secs: f64) {
    METRICS.compute_seconds.observe(secs);
}

/// Tekstformatet (Prometheus exposition).
pub fn gather_text() -> String {
    let mut buf = Vec::new();
    let families = METRICS.registry.gather();
    if TextEncoder::new().encode(&families, &mut buf).is_err() {
        return String::new();
    }
    String::from_utf8(buf).unwrap_or_default()
}

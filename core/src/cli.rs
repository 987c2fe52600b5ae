use crate::cache::{CacheOrigin, RideCache};
use crate::types::SeriesKind;

/// Varighetene som vises i rapporten (sekunder).
pub const REPORT_DURATIONS: [usize; 5] = [5, 60, 300, 1200, 3600];

pub fn report_lines(cache: &RideCache) -> Vec<String> {
    let mut lines = Vec::new();
    let origin = match cache.origin() {
        CacheOrigin::Read => "read from cache".to_string(),
        CacheOrigin::Computed { reason } => format!("recomputed ({})", reason.label()),
        CacheOrigin::Aggregate { start, end, rides } => {
            format!("aggregate {start}..{end}, {rides} rides")
        }
    };
    lines.push(format!("--- Ride Cache ({origin}) ---"));
    if let Some(e) = cache.write_error() {
        lines.push(format!("warning: {e}"));
    }

    for kind in SeriesKind::ALL {
        let mm = cache.mean_max_array(kind);
        if mm.is_empty() {
            continue;
        }
        let bests: Vec<String> = REPORT_DURATIONS
            .iter()
            .filter(|&&d| d <= mm.len())
            .map(|&d| format!("{}={:.1}", label(d), mm[d - 1]))
            .collect();
        let dist = cache.distribution_array(kind);
        let total: f64 = dist.iter().sum();
        lines.push(format!(
            "{:<7} {:>6}s  {}  dist {:.0}s @ {} bin",
            kind.name(),
            mm.len(),
            bests.join(" "),
            total,
            cache.dist_bin_size(kind)
        ));
    }
    lines
}

pub fn print_cache_report(cache: &RideCache) {
    for line in report_lines(cache) {
        println!("{line}");
    }
}

fn label(secs: usize) -> String {
    if secs < 60 {
        format!("{secs}s")
    } else {
        format!("{}m", secs / 60)
    }
}

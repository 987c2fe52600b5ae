use crate::scaling::Scaling;

/// Tid (sekunder, ett per 1 Hz-sample) per kvantisert verdibøtte fra min til max.
/// Verdier utenfor området klemmes inn i nærmeste bøtte, så summen alltid
/// er lik seriens varighet.
pub fn compute_distribution(values: &[f64], scaling: &Scaling) -> Vec<u32> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut buckets = vec![0u32; scaling.dist_len()];
    for &v in values {
        let idx = scaling.bucket(v);
        buckets[idx] = buckets[idx].saturating_add(1);
    }
    buckets
}

/// Lagrede sekunder som f64 (bøttestørrelsen ligger i `Scaling::dist_bin_width`).
pub fn to_seconds(buckets: &[u32]) -> Vec<f64> {
    buckets.iter().map(|&c| c as f64).collect()
}

use crate::scaling::Scaling;

/// Beste snitt for én varighet og hvor vinduet startet (sekunder fra start).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanMaxPoint {
    pub value: f64,
    pub offset_secs: usize,
}

/// Mean-maximal kurve: for hver varighet d = 1..=L sekunder, beste snitt
/// over et sammenhengende vindu på d sampler.
///
/// Vindussummene leses av prefikssummer (sum = prefix[s+d] - prefix[s])
/// i stedet for en glidende sum; resultatet er det samme. O(L) per
/// varighet, O(L²) totalt – kjøres én gang og caches.
///
/// `exponent` > 1 gir potenssnitt ((Σx^p)/d)^(1/p), brukt for NP/xPower.
/// Ved likhet vinner tidligste vindu.
pub fn compute_mean_max(values: &[f64], exponent: i32) -> Vec<MeanMaxPoint> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let p = exponent.max(1);
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0f64);
    let mut acc = 0.0f64;
    for &x in values {
        let w = if p == 1 { x } else { x.max(0.0).powi(p) };
        acc += w;
        prefix.push(acc);
    }

    let mut out = Vec::with_capacity(n);
    for d in 1..=n {
        let mut best = prefix[d] - prefix[0];
        let mut best_start = 0usize;
        for start in 1..=(n - d) {
            let sum = prefix[start + d] - prefix[start];
            if sum > best {
                best = sum;
                best_start = start;
            }
        }
        let mean = best / d as f64;
        let value = if p == 1 { mean } else { mean.max(0.0).powf(1.0 / p as f64) };
        out.push(MeanMaxPoint { value, offset_secs: best_start });
    }
    out
}

/// Skalerte heltall for lagring.
pub fn to_scaled(points: &[MeanMaxPoint], scaling: &Scaling) -> Vec<u32> {
    points.iter().map(|pt| scaling.to_scaled(pt.value)).collect()
}

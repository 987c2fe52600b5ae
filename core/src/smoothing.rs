/// Bakoverskuende glidende snitt over `window` sampler.
/// Starten bruker de samplene som finnes (deler på min(i+1, window)),
/// slik at lengden holdes og en konstant serie forblir konstant.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || values.is_empty() {
        return values.to_vec();
    }
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for i in 0..values.len() {
        sum += values[i];
        if i >= window {
            sum -= values[i - window];
        }
        let denom = (i + 1).min(window) as f64;
        out.push(sum / denom);
    }
    out
}

/// Eksponentiell glatting med tidskonstant `tau` sekunder,
/// `dt` sekunder mellom samplene. Startverdien er første sample.
pub fn exponential(values: &[f64], tau: f64, dt: f64) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };
    if tau <= dt {
        return values.to_vec();
    }
    let alpha = dt / tau;
    let mut out = Vec::with_capacity(values.len());
    let mut s = first;
    for &x in values {
        s += (x - s) * alpha;
        out.push(s);
    }
    out
}

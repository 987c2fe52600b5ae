use std::borrow::Cow;
use std::time::Instant;

use log::debug;
use rayon::prelude::*;

use crate::meanmax::{compute_mean_max, MeanMaxPoint};
use crate::types::SeriesKind;

/// Input til mean-max for én serie (1 Hz-verdier + eksponent).
#[derive(Debug, Clone)]
pub struct SeriesInput<'a> {
    pub values: Cow<'a, [f64]>,
    pub exponent: i32,
}

/// Én plass per serietype, i `SeriesKind::ALL`-rekkefølge.
pub type Slots<T> = [T; 7];

/// Fork-join over rayon-poolen: én oppgave per serie som finnes. Hver
/// oppgave skriver kun til sin egen plass; kallet returnerer først når
/// alle er ferdige. Panikk i en oppgave videreføres til kalleren.
pub fn compute_mean_max_all(
    inputs: &Slots<Option<SeriesInput<'_>>>,
    parallel: bool,
) -> Slots<Vec<MeanMaxPoint>> {
    let mut out: Slots<Vec<MeanMaxPoint>> = Default::default();

    if !parallel {
        for ((slot, input), kind) in out.iter_mut().zip(inputs.iter()).zip(SeriesKind::ALL) {
            if let Some(input) = input {
                *slot = run_one(kind, input);
            }
        }
        return out;
    }

    out.par_iter_mut()
        .zip(inputs.par_iter())
        .enumerate()
        .for_each(|(k, (slot, input))| {
            if let Some(input) = input {
                *slot = run_one(SeriesKind::ALL[k], input);
            }
        });
    out
}

fn run_one(kind: SeriesKind, input: &SeriesInput<'_>) -> Vec<MeanMaxPoint> {
    let t0 = Instant::now();
    let points = compute_mean_max(&input.values, input.exponent);
    debug!(
        "meanmax {kind}: {} samples in {:.1} ms",
        input.values.len(),
        t0.elapsed().as_secs_f64() * 1000.0
    );
    points
}

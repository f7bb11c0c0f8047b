//! Tallies made once, as a photon reaches a detection surface.

use num_complex::Complex64;
use units::{ghz, ns, phase};

use super::{Binned, Histogram};
use crate::photon::Photon;

// Keeps 1/|uz| finite for photons skimming a surface
const MIN_COS: f64 = 1e-6;

pub(super) fn tally_weight(binned: &mut Binned, h: &mut Histogram<f64>, photon: &Photon) {
    let dp = &photon.dp;
    if let Some(index) = binned.locate(&dp.position, &dp.direction, dp.total_time) {
        h.add(index, dp.weight);
    }
}

/// Frequency-domain reflectance: one phasor `w·exp(-iωt)` per modulation
/// frequency
pub(super) fn tally_phasors(binned: &mut Binned, h: &mut Histogram<Complex64>, frequencies: &[f64], photon: &Photon) {
    let dp = &photon.dp;
    let Some(&[ir]) = binned.locate(&dp.position, &dp.direction, dp.total_time) else { return };
    for (k, f) in frequencies.iter().enumerate() {
        let phi = phase(ghz(*f), ns(dp.total_time));
        h.add(&[ir, k], Complex64::new(phi.cos(), -phi.sin()) * dp.weight);
    }
}

/// Radiance crossing an internal plane: weight over the cosine to its normal
pub(super) fn tally_radiance(binned: &mut Binned, h: &mut Histogram<f64>, photon: &Photon) {
    let dp = &photon.dp;
    if let Some(index) = binned.locate(&dp.position, &dp.direction, dp.total_time) {
        h.add(index, dp.weight / dp.direction.uz.abs().max(MIN_COS));
    }
}

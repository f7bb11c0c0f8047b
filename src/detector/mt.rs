//! Momentum-transfer histograms of exiting photons.
//!
//! The momentum transfer of a photon is the sum of `1 - cos θ` over its
//! scatterings. Exiting weight is binned on ρ and total momentum transfer,
//! with a breakdown of the fraction contributed by each subregion. The
//! dynamic variant labels each collision static or dynamic (a moving
//! scatterer, with probability equal to the blood volume fraction of the
//! region hit), drawing from the simulation's random stream as it tallies.

use ndhistogram::axis::Axis;

use super::{Binned, Binning, Histogram};
use crate::photon::Photon;
use crate::rng::SimRng;

pub const FRACTIONAL_MT: &str = "FractionalMT";
pub const SUBREGION_COLLISIONS: &str = "SubregionCollisions";
pub const TOTAL_MT_OF_Z: &str = "TotalMTOfZ";
pub const DYNAMIC_MT_OF_Z: &str = "DynamicMTOfZ";

#[derive(Debug, Clone)]
pub(super) struct Dynamic {
    pub blood_volume_fraction: Vec<f64>,
    pub z: Binning,
}

#[derive(Debug, Clone)]
pub(super) struct MtTally {
    mt: Binning,
    fractions: Binning,
    n_regions: usize,
    dynamic: Option<Dynamic>,
}

impl MtTally {
    pub fn new(mt: Binning, fractions: Binning, n_regions: usize, dynamic: Option<Dynamic>) -> Self {
        Self { mt, fractions, n_regions, dynamic }
    }

    pub fn mt_bins(&self) -> usize { self.mt.num_bins() }

    /// Auxiliary arrays, given the normalization of the ρ axis
    pub fn extras(&self, rho: &[f64]) -> Vec<(String, Histogram<f64>)> {
        let ones = |n| vec![1.0; n];
        let (n_mt, n_frac) = (self.mt.num_bins(), self.fractions.num_bins());
        match &self.dynamic {
            None => vec![
                (FRACTIONAL_MT.into(), Histogram::new(vec![rho.to_vec(), ones(n_mt), ones(self.n_regions), ones(n_frac)], false)),
            ],
            Some(Dynamic { z, .. }) => vec![
                (FRACTIONAL_MT       .into(), Histogram::new(vec![rho.to_vec(), ones(n_mt), ones(n_frac)], false)),
                (SUBREGION_COLLISIONS.into(), Histogram::new(vec![ones(self.n_regions), ones(2)], false)),
                (TOTAL_MT_OF_Z       .into(), Histogram::new(vec![rho.to_vec(), z.widths()], false)),
                (DYNAMIC_MT_OF_Z     .into(), Histogram::new(vec![rho.to_vec(), z.widths()], false)),
            ],
        }
    }

    pub fn tally(&self, binned: &mut Binned, h: &mut Histogram<f64>, extras: &mut [(String, Histogram<f64>)],
                 photon: &Photon, rng: &mut SimRng) {
        let dp = &photon.dp;
        let Some(&[ir]) = binned.locate(&dp.position, &dp.direction, dp.total_time) else { return };
        let w = dp.weight;
        match &self.dynamic {
            None => {
                let total: f64 = photon.history.total_momentum_transfer();
                let Some(imt) = self.mt.index(&total) else { return };
                h.add(&[ir, imt], w);
                for (region, info) in photon.history.sub_regions.iter().enumerate() {
                    let fraction = if total > 0.0 { info.momentum_transfer / total } else { 0.0 };
                    if let Some(ifrac) = self.fractions.index(&fraction) {
                        extras[0].1.add(&[ir, imt, region, ifrac], w);
                    }
                }
            }
            Some(Dynamic { blood_volume_fraction, z }) => {
                let (mut total, mut dynamic) = (0.0, 0.0);
                for point in photon.history.collisions() {
                    let moving = rng.next_f64() < blood_volume_fraction[point.region];
                    let mt = point.momentum_transfer;
                    total += mt;
                    extras[1].1.add(&[point.region, moving as usize], 1.0);
                    if let Some(iz) = z.index(&point.position.z) {
                        extras[2].1.add(&[ir, iz], w * mt);
                        if moving { extras[3].1.add(&[ir, iz], w * mt) }
                    }
                    if moving { dynamic += mt }
                }
                let Some(imt) = self.mt.index(&total) else { return };
                h.add(&[ir, imt], w);
                let fraction = if total > 0.0 { dynamic / total } else { 0.0 };
                if let Some(ifrac) = self.fractions.index(&fraction) {
                    extras[0].1.add(&[ir, imt, ifrac], w);
                }
            }
        }
    }
}

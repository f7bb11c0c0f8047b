//! Perturbation Monte Carlo: reweighting recorded photons as if the tissue
//! had had different optical properties.
//!
//! A photon which spent path length `L` and made `n` collisions in a region
//! with scattering and total attenuation coefficients `μs`, `μt` would have
//! been `(μs'/μs)^n · exp(-(μt' - μt)·L)` times as likely to follow the same
//! path had they been `μs'`, `μt'`. The derivative (dMC) detectors score the
//! derivative of that factor with respect to μa or μs.

use crate::error::{ensure, Result};
use crate::optics::OpticalProperties;
use crate::photon::Photon;
use crate::tissue::Tissue;

use super::{Binned, Histogram};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivative { Mua, Mus }

/// Perturbed optical properties for a subset of regions
#[derive(Debug, Clone, PartialEq)]
pub struct PerturbedRegions {
    regions: Vec<usize>,
    ops: Vec<OpticalProperties>,
}

impl PerturbedRegions {

    pub fn new(detector: &str, regions: &[usize], ops: &[OpticalProperties], tissue: &Tissue) -> Result<Self> {
        ensure!(ops.len() == tissue.len(),
                format!("DetectorInput {detector}: {} perturbed optical properties for {} tissue regions", ops.len(), tissue.len()),
                "Give perturbed_ops for every tissue region, including unperturbed ones");
        ensure!(ops.iter().all(OpticalProperties::is_valid),
                format!("DetectorInput {detector}: invalid perturbed optical properties"),
                "Use mua, musp >= 0, -1 <= g <= 1 and n > 0");
        for &r in regions {
            ensure!(r < tissue.len() && !tissue.is_exterior(r),
                    format!("DetectorInput {detector}: perturbed region {r} is not an interior tissue region"),
                    "Perturb only regions inside the tissue");
        }
        Ok(Self { regions: regions.to_vec(), ops: ops.to_vec() })
    }

    /// One region's factor, and its derivatives with respect to μa and μs
    fn region_terms(&self, r: usize, photon: &Photon, tissue: &Tissue) -> (f64, f64, f64) {
        let info = &photon.history.sub_regions[r];
        let (base, pert) = (tissue.ops(r), &self.ops[r]);
        let (n, length) = (info.collisions, info.path_length);
        let attenuation = (-(pert.mut_() - base.mut_()) * length).exp();
        let (scatter, d_scatter) = if n == 0 { (1.0, 0.0) } else {
            let ratio = pert.mus() / base.mus();
            (ratio.powi(n as i32), n as f64 * ratio.powi(n as i32 - 1) / base.mus())
        };
        let factor = scatter * attenuation;
        (factor, -length * factor, (d_scatter - length * scatter) * attenuation)
    }

    /// Relative likelihood of the recorded path under the perturbed
    /// properties
    pub fn weight_factor(&self, photon: &Photon, tissue: &Tissue) -> f64 {
        self.regions.iter().map(|&r| self.region_terms(r, photon, tissue).0).product()
    }

    /// Derivative of the weight factor with respect to μa or μs, the same
    /// change applied in every perturbed region. Taken term by term, so it
    /// stays finite when a perturbed μs is zero.
    pub fn derivative(&self, photon: &Photon, tissue: &Tissue, derivative: Derivative) -> f64 {
        let terms: Vec<_> = self.regions.iter().map(|&r| self.region_terms(r, photon, tissue)).collect();
        (0..terms.len()).map(|i| {
            let (_, d_mua, d_mus) = terms[i];
            let others: f64 = terms.iter().enumerate().filter(|&(j, _)| j != i).map(|(_, t)| t.0).product();
            match derivative {
                Derivative::Mua => d_mua * others,
                Derivative::Mus => d_mus * others,
            }
        }).sum()
    }
}

#[derive(Debug, Clone)]
pub(super) struct PmcTally {
    pub perturbed: PerturbedRegions,
    pub derivative: Option<Derivative>,
}

impl PmcTally {
    pub fn tally(&self, binned: &mut Binned, h: &mut Histogram<f64>, photon: &Photon, tissue: &Tissue) {
        let dp = &photon.dp;
        let value = match self.derivative {
            None    => dp.weight * self.perturbed.weight_factor(photon, tissue),
            Some(d) => dp.weight * self.perturbed.derivative(photon, tissue, d),
        };
        if let Some(index) = binned.locate(&dp.position, &dp.direction, dp.total_time) {
            h.add(index, value);
        }
    }
}

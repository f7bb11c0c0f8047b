use serde::{Deserialize, Serialize};
use crate::rng::SimRng;

/// Configured in the tissue's phase-function table and selected per region by
/// key
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PhaseFunctionInput {
    /// `g` defaults to the anisotropy of the region using it
    HenyeyGreenstein { #[serde(default)] g: Option<f64> },
    Isotropic,
    /// Straight ahead with probability (1+g)/2, straight back otherwise
    Bidirectional,
}

/// Phase function resolved against one region's optical properties
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseFunction {
    HenyeyGreenstein { g: f64 },
    Isotropic,
    Bidirectional { g: f64 },
}

impl PhaseFunctionInput {
    pub fn resolve(&self, region_g: f64) -> PhaseFunction {
        match *self {
            PhaseFunctionInput::HenyeyGreenstein { g } => PhaseFunction::HenyeyGreenstein { g: g.unwrap_or(region_g) },
            PhaseFunctionInput::Isotropic              => PhaseFunction::Isotropic,
            PhaseFunctionInput::Bidirectional          => PhaseFunction::Bidirectional { g: region_g },
        }
    }
}

impl PhaseFunction {

    /// Sample the cosine of the polar scattering angle and the azimuthal
    /// angle. Henyey-Greenstein and isotropic sampling take two draws,
    /// bidirectional sampling takes one.
    pub fn sample(&self, rng: &mut SimRng) -> (f64, f64) {
        match *self {
            PhaseFunction::HenyeyGreenstein { g } => {
                let cos_theta = henyey_greenstein_cos_theta(g, rng.next_f64());
                (cos_theta, std::f64::consts::TAU * rng.next_f64())
            }
            PhaseFunction::Isotropic => {
                let cos_theta = 2.0 * rng.next_f64() - 1.0;
                (cos_theta, std::f64::consts::TAU * rng.next_f64())
            }
            PhaseFunction::Bidirectional { g } => {
                let forward = rng.next_f64() < 0.5 * (1.0 + g);
                (if forward { 1.0 } else { -1.0 }, 0.0)
            }
        }
    }
}

/// Invert the Henyey-Greenstein cumulative distribution at `xi`
pub fn henyey_greenstein_cos_theta(g: f64, xi: f64) -> f64 {
    if g == 0.0 { return 2.0 * xi - 1.0 }
    let temp = (1.0 - g * g) / (1.0 - g + 2.0 * g * xi);
    ((1.0 + g * g - temp * temp) / (2.0 * g)).clamp(-1.0, 1.0)
}

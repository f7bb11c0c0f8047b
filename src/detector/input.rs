//! Declarative description of detectors, as read from configuration files.

use serde::{Deserialize, Serialize};

use crate::error::{ensure, Result};
use crate::optics::OpticalProperties;

/// Binning along one physical coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bins {
    /// `count` equally spaced edges from `start` to `stop`, giving `count-1`
    /// bins. Values beyond either end are clamped into the edge bins.
    Uniform { start: f64, stop: f64, count: usize },
    /// Bins of common `width` around arbitrary centres. Values outside every
    /// bin are not tallied.
    Centres { centres: Vec<f64>, width: f64 },
}

impl Bins {
    pub fn uniform(start: f64, stop: f64, count: usize) -> Self { Bins::Uniform { start, stop, count } }

    pub fn centres(centres: Vec<f64>, width: f64) -> Self { Bins::Centres { centres, width } }

    pub(crate) fn validate(&self, detector: &str, axis: &str) -> Result<()> {
        match self {
            Bins::Uniform { start, stop, count } => {
                ensure!(*count >= 2,
                        format!("DetectorInput {detector}: axis {axis} has fewer than two edges"),
                        "Give count >= 2: count is the number of bin edges");
                ensure!(stop > start,
                        format!("DetectorInput {detector}: axis {axis} stops before it starts"),
                        "Give stop > start");
            }
            Bins::Centres { centres, width } => {
                ensure!(!centres.is_empty(),
                        format!("DetectorInput {detector}: axis {axis} has no bin centres"),
                        "List at least one centre");
                ensure!(*width > 0.0,
                        format!("DetectorInput {detector}: axis {axis} has non-positive bin width"),
                        "Give width > 0");
            }
        }
        Ok(())
    }

    /// As `validate`, for an axis listing values rather than bin edges: a
    /// single value is enough, and centre widths are not used.
    pub(crate) fn validate_points(&self, detector: &str, axis: &str) -> Result<()> {
        match self {
            Bins::Uniform { start, stop, count } => {
                ensure!(*count >= 1,
                        format!("DetectorInput {detector}: axis {axis} has no values"),
                        "Give count >= 1: count is the number of values");
                ensure!(*count == 1 || stop > start,
                        format!("DetectorInput {detector}: axis {axis} stops before it starts"),
                        "Give stop > start");
            }
            Bins::Centres { centres, .. } => {
                ensure!(!centres.is_empty(),
                        format!("DetectorInput {detector}: axis {axis} has no values"),
                        "List at least one centre");
            }
        }
        Ok(())
    }
}

/// What a detector measures, and along which axes.
///
/// Axis field names match the physical coordinate binned: `rho`, `x`, `y`,
/// `z` in mm, `angle`, `theta`, `phi` in radians, `time` in ns, `omega` in
/// GHz, `mt` dimensionless momentum transfer, `fractions` in [0, 1].
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tally_type")]
pub enum TallyType {
    // ----- Diffuse reflectance -----------------------------------------------------------
    RDiffuse,
    ROfRho           { rho: Bins },
    ROfAngle         { angle: Bins },
    ROfRhoAndAngle   { rho: Bins, angle: Bins },
    ROfRhoAndTime    { rho: Bins, time: Bins },
    ROfXAndY         { x: Bins, y: Bins },
    /// Frequency-domain reflectance. `omega` lists modulation frequencies, so
    /// its `count` is the number of frequencies, not of edges.
    ROfRhoAndOmega   { rho: Bins, omega: Bins },
    ReflectedMTOfRhoAndSubregionHist { rho: Bins, mt: Bins, fractions: Bins },
    ReflectedDynamicMTOfRhoAndSubregionHist {
        blood_volume_fraction: Vec<f64>,
        rho: Bins, mt: Bins, z: Bins, fractions: Bins,
    },

    // ----- Diffuse transmittance ---------------------------------------------------------
    TDiffuse,
    TOfRho           { rho: Bins },
    TOfAngle         { angle: Bins },
    TOfRhoAndAngle   { rho: Bins, angle: Bins },
    TOfXAndY         { x: Bins, y: Bins },
    TransmittedMTOfRhoAndSubregionHist { rho: Bins, mt: Bins, fractions: Bins },
    TransmittedDynamicMTOfRhoAndSubregionHist {
        blood_volume_fraction: Vec<f64>,
        rho: Bins, mt: Bins, z: Bins, fractions: Bins,
    },

    // ----- Volume (whole history) --------------------------------------------------------
    ATotal,
    AOfRhoAndZ                 { rho: Bins, z: Bins },
    FluenceOfRhoAndZ           { rho: Bins, z: Bins },
    FluenceOfRhoAndZAndTime    { rho: Bins, z: Bins, time: Bins },
    FluenceOfXAndYAndZ         { x: Bins, y: Bins, z: Bins },
    RadianceOfRhoAndZAndAngle  { rho: Bins, z: Bins, angle: Bins },
    RadianceOfXAndYAndZAndThetaAndPhi { x: Bins, y: Bins, z: Bins, theta: Bins, phi: Bins },

    // ----- Internal surface --------------------------------------------------------------
    RadianceOfRho { z_depth: f64, rho: Bins },

    // ----- Perturbation Monte Carlo, post-processing only --------------------------------
    pMCROfRho        { perturbed_regions: Vec<usize>, rho: Bins,             perturbed_ops: Vec<OpticalProperties> },
    pMCROfRhoAndTime { perturbed_regions: Vec<usize>, rho: Bins, time: Bins, perturbed_ops: Vec<OpticalProperties> },
    dMCdROfRhodMua   { perturbed_regions: Vec<usize>, rho: Bins,             perturbed_ops: Vec<OpticalProperties> },
    dMCdROfRhodMus   { perturbed_regions: Vec<usize>, rho: Bins,             perturbed_ops: Vec<OpticalProperties> },
}

/// The detection surface a tally is fed from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryKind {
    DiffuseReflectance,
    DiffuseTransmittance,
    /// Internal plane at the given depth
    SurfaceRadiance(f64),
    GenericVolume,
    PmcDiffuseReflectance,
}

impl TallyType {

    pub fn boundary(&self) -> BoundaryKind {
        use TallyType::*;
        match self {
            RDiffuse | ROfRho {..} | ROfAngle {..} | ROfRhoAndAngle {..} | ROfRhoAndTime {..} |
            ROfXAndY {..} | ROfRhoAndOmega {..} | ReflectedMTOfRhoAndSubregionHist {..} |
            ReflectedDynamicMTOfRhoAndSubregionHist {..}
                => BoundaryKind::DiffuseReflectance,

            TDiffuse | TOfRho {..} | TOfAngle {..} | TOfRhoAndAngle {..} | TOfXAndY {..} |
            TransmittedMTOfRhoAndSubregionHist {..} | TransmittedDynamicMTOfRhoAndSubregionHist {..}
                => BoundaryKind::DiffuseTransmittance,

            ATotal | AOfRhoAndZ {..} | FluenceOfRhoAndZ {..} | FluenceOfRhoAndZAndTime {..} |
            FluenceOfXAndYAndZ {..} | RadianceOfRhoAndZAndAngle {..} |
            RadianceOfXAndYAndZAndThetaAndPhi {..}
                => BoundaryKind::GenericVolume,

            RadianceOfRho { z_depth, .. } => BoundaryKind::SurfaceRadiance(*z_depth),

            pMCROfRho {..} | pMCROfRhoAndTime {..} | dMCdROfRhodMua {..} | dMCdROfRhodMus {..}
                => BoundaryKind::PmcDiffuseReflectance,
        }
    }

    pub fn is_pmc(&self) -> bool { self.boundary() == BoundaryKind::PmcDiffuseReflectance }

    /// The name under which the tally type is written in configuration files
    pub fn type_name(&self) -> String {
        let debug = format!("{self:?}");
        debug.split(|c: char| !c.is_alphanumeric()).next().unwrap_or_default().to_string()
    }

    /// Named binning axes, in array-dimension order
    pub fn axes(&self) -> Vec<(&'static str, &Bins)> {
        use TallyType::*;
        match self {
            RDiffuse | TDiffuse | ATotal => vec![],
            ROfRho { rho } | TOfRho { rho } | RadianceOfRho { rho, .. } |
            pMCROfRho { rho, .. } | dMCdROfRhodMua { rho, .. } | dMCdROfRhodMus { rho, .. }
                => vec![("rho", rho)],
            ROfAngle { angle } | TOfAngle { angle } => vec![("angle", angle)],
            ROfRhoAndAngle { rho, angle } | TOfRhoAndAngle { rho, angle } => vec![("rho", rho), ("angle", angle)],
            ROfRhoAndTime { rho, time } | pMCROfRhoAndTime { rho, time, .. } => vec![("rho", rho), ("time", time)],
            ROfXAndY { x, y } | TOfXAndY { x, y } => vec![("x", x), ("y", y)],
            ROfRhoAndOmega { rho, omega } => vec![("rho", rho), ("omega", omega)],
            ReflectedMTOfRhoAndSubregionHist { rho, mt, fractions } |
            TransmittedMTOfRhoAndSubregionHist { rho, mt, fractions }
                => vec![("rho", rho), ("mt", mt), ("fractions", fractions)],
            ReflectedDynamicMTOfRhoAndSubregionHist { rho, mt, z, fractions, .. } |
            TransmittedDynamicMTOfRhoAndSubregionHist { rho, mt, z, fractions, .. }
                => vec![("rho", rho), ("mt", mt), ("z", z), ("fractions", fractions)],
            AOfRhoAndZ { rho, z } | FluenceOfRhoAndZ { rho, z } => vec![("rho", rho), ("z", z)],
            FluenceOfRhoAndZAndTime { rho, z, time } => vec![("rho", rho), ("z", z), ("time", time)],
            FluenceOfXAndYAndZ { x, y, z } => vec![("x", x), ("y", y), ("z", z)],
            RadianceOfRhoAndZAndAngle { rho, z, angle } => vec![("rho", rho), ("z", z), ("angle", angle)],
            RadianceOfXAndYAndZAndThetaAndPhi { x, y, z, theta, phi }
                => vec![("x", x), ("y", y), ("z", z), ("theta", theta), ("phi", phi)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorInput {
    /// Defaults to the tally type's name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub tally_second_moment: bool,

    #[serde(flatten)]
    pub tally: TallyType,
}

impl DetectorInput {
    pub fn new(tally: TallyType) -> Self { Self { name: None, tally_second_moment: false, tally } }

    pub fn named(mut self, name: &str) -> Self { self.name = Some(name.into()); self }

    pub fn with_second_moment(mut self) -> Self { self.tally_second_moment = true; self }

    pub fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.tally.type_name())
    }

    /// Checks which need nothing but the detector itself. Rules that depend
    /// on the tissue are applied when the detector is built.
    pub(crate) fn validate(&self) -> Result<()> {
        let name = self.name();
        for (axis, bins) in self.tally.axes() {
            if axis == "omega" { bins.validate_points(&name, axis)? }
            else               { bins.validate       (&name, axis)? }
        }
        Ok(())
    }
}

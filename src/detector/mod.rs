//! Statistical accumulators fed by photons.
//!
//! A detector is built from a `DetectorInput` and bound to the virtual
//! boundary its tally type names. Termination detectors are offered each
//! photon as it reaches their boundary; history detectors see each photon's
//! complete record once, after it dies. Either way the protocol is
//! `contains_point`, then `tally`, and finally a single `normalize`.

mod axis;
mod histogram;
mod input;
mod mt;
mod pmc;
mod termination;
mod volume;

pub use axis::Binning;
pub use histogram::{Histogram, Value};
pub use input::{Bins, BoundaryKind, DetectorInput, TallyType};
pub use mt::{DYNAMIC_MT_OF_Z, FRACTIONAL_MT, SUBREGION_COLLISIONS, TOTAL_MT_OF_Z};
pub use pmc::{Derivative, PerturbedRegions};

use geometry::{Direction, Point};
use ndarray::ArrayD;
use ndhistogram::axis::Axis;
use num_complex::Complex64;

use crate::error::{ensure, Result};
use crate::photon::{Photon, PhotonState};
use crate::rng::SimRng;
use crate::tissue::Tissue;

/// Physical coordinate binned along one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coordinate {
    Rho,
    X,
    Y,
    Z,
    Time,
    /// Polar angle of an upward exit, measured from -z
    ReflectedAngle,
    /// Polar angle of a downward exit, measured from +z
    TransmittedAngle,
    /// Polar angle from +z, normalized by the solid angle of its cone shell
    PolarAngle,
    /// Polar angle from +z, paired with an azimuthal axis
    Theta,
    Phi,
}

impl Coordinate {
    pub fn value(self, position: &Point, direction: &Direction, time: f64) -> f64 {
        use Coordinate::*;
        match self {
            Rho => position.rho(),
            X => position.x,
            Y => position.y,
            Z => position.z,
            Time => time,
            ReflectedAngle => (-direction.uz).clamp(-1.0, 1.0).acos(),
            TransmittedAngle | PolarAngle | Theta => direction.theta(),
            Phi => direction.phi(),
        }
    }

    /// Geometric normalization of each bin
    pub fn factors(self, binning: &Binning) -> Vec<f64> {
        use Coordinate::*;
        match self {
            Rho => binning.ring_areas(),
            ReflectedAngle | TransmittedAngle | PolarAngle => binning.cone_solid_angles(),
            Theta => binning.polar_weights(),
            X | Y | Z | Time | Phi => binning.widths(),
        }
    }
}

/// Maps a photon's coordinates to a bin in every axis, reusing one index
/// buffer
#[derive(Debug, Clone)]
pub(crate) struct Binned {
    axes: Vec<(Coordinate, Binning)>,
    index: Vec<usize>,
}

impl Binned {
    fn new(axes: Vec<(Coordinate, Binning)>) -> Self {
        let index = vec![0; axes.len()];
        Self { axes, index }
    }

    pub(crate) fn locate(&mut self, position: &Point, direction: &Direction, time: f64) -> Option<&[usize]> {
        for ((coordinate, binning), i) in self.axes.iter().zip(self.index.iter_mut()) {
            *i = binning.index(&coordinate.value(position, direction, time))?;
        }
        Some(&self.index)
    }

    fn factors(&self) -> Vec<Vec<f64>> {
        self.axes.iter().map(|(c, b)| c.factors(b)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side { Top, Bottom }

impl Side {
    fn exited(self, state: PhotonState) -> bool {
        match self {
            Side::Top    => state.has(PhotonState::EXITED_OUT_TOP),
            Side::Bottom => state.has(PhotonState::EXITED_OUT_BOTTOM),
        }
    }
}

#[derive(Debug, Clone)]
enum Kind {
    Surface(Side),
    Omega { side: Side, frequencies: Vec<f64> },
    Mt { side: Side, tally: mt::MtTally },
    Volume(volume::Quantity),
    SurfaceRadiance { z: f64 },
    Pmc(pmc::PmcTally),
}

#[derive(Debug, Clone)]
enum Moments {
    Real(Histogram<f64>),
    Complex(Histogram<Complex64>),
}

#[derive(Debug, Clone)]
pub struct Detector {
    input: DetectorInput,
    name: String,
    kind: Kind,
    binned: Binned,
    moments: Moments,
    extras: Vec<(String, Histogram<f64>)>,
    tally_count: u64,
    normalized: bool,
}

impl Detector {

    pub fn new(input: &DetectorInput, tissue: &Tissue) -> Result<Self> {
        use TallyType::*;
        use Coordinate as C;
        input.validate()?;
        let name = input.name();
        let second = input.tally_second_moment;
        let b = Binning::new;
        let n_regions = tissue.len();

        let (kind, axes) = match &input.tally {
            RDiffuse => (Kind::Surface(Side::Top),    vec![]),
            TDiffuse => (Kind::Surface(Side::Bottom), vec![]),
            ROfRho { rho } => (Kind::Surface(Side::Top),    vec![(C::Rho, b(rho))]),
            TOfRho { rho } => (Kind::Surface(Side::Bottom), vec![(C::Rho, b(rho))]),
            ROfAngle { angle } => (Kind::Surface(Side::Top),    vec![(C::ReflectedAngle,   b(angle))]),
            TOfAngle { angle } => (Kind::Surface(Side::Bottom), vec![(C::TransmittedAngle, b(angle))]),
            ROfRhoAndAngle { rho, angle } => (Kind::Surface(Side::Top),    vec![(C::Rho, b(rho)), (C::ReflectedAngle,   b(angle))]),
            TOfRhoAndAngle { rho, angle } => (Kind::Surface(Side::Bottom), vec![(C::Rho, b(rho)), (C::TransmittedAngle, b(angle))]),
            ROfRhoAndTime { rho, time } => (Kind::Surface(Side::Top), vec![(C::Rho, b(rho)), (C::Time, b(time))]),
            ROfXAndY { x, y } => (Kind::Surface(Side::Top),    vec![(C::X, b(x)), (C::Y, b(y))]),
            TOfXAndY { x, y } => (Kind::Surface(Side::Bottom), vec![(C::X, b(x)), (C::Y, b(y))]),
            ROfRhoAndOmega { rho, omega } => {
                let frequencies = Binning::points(omega).centres();
                (Kind::Omega { side: Side::Top, frequencies }, vec![(C::Rho, b(rho))])
            }
            ReflectedMTOfRhoAndSubregionHist { rho, mt, fractions } |
            TransmittedMTOfRhoAndSubregionHist { rho, mt, fractions } => {
                let side = if matches!(input.tally, ReflectedMTOfRhoAndSubregionHist {..}) { Side::Top } else { Side::Bottom };
                let tally = mt::MtTally::new(b(mt), b(fractions), n_regions, None);
                (Kind::Mt { side, tally }, vec![(C::Rho, b(rho))])
            }
            ReflectedDynamicMTOfRhoAndSubregionHist { blood_volume_fraction, rho, mt, z, fractions } |
            TransmittedDynamicMTOfRhoAndSubregionHist { blood_volume_fraction, rho, mt, z, fractions } => {
                ensure!(blood_volume_fraction.len() == n_regions,
                        format!("DetectorInput {name}: {} blood volume fractions for {n_regions} tissue regions",
                                blood_volume_fraction.len()),
                        "Give one blood volume fraction per tissue region, including the exterior layers");
                ensure!(blood_volume_fraction.iter().all(|f| (0.0..=1.0).contains(f)),
                        format!("DetectorInput {name}: blood volume fraction outside [0, 1]"),
                        "Give fractions between 0 and 1");
                let side = if matches!(input.tally, ReflectedDynamicMTOfRhoAndSubregionHist {..}) { Side::Top } else { Side::Bottom };
                let dynamic = mt::Dynamic { blood_volume_fraction: blood_volume_fraction.clone(), z: b(z) };
                let tally = mt::MtTally::new(b(mt), b(fractions), n_regions, Some(dynamic));
                (Kind::Mt { side, tally }, vec![(C::Rho, b(rho))])
            }
            ATotal                   => (Kind::Volume(volume::Quantity::Absorption), vec![]),
            AOfRhoAndZ { rho, z }    => (Kind::Volume(volume::Quantity::Absorption), vec![(C::Rho, b(rho)), (C::Z, b(z))]),
            FluenceOfRhoAndZ { rho, z } => (Kind::Volume(volume::Quantity::Fluence), vec![(C::Rho, b(rho)), (C::Z, b(z))]),
            FluenceOfRhoAndZAndTime { rho, z, time } =>
                (Kind::Volume(volume::Quantity::Fluence), vec![(C::Rho, b(rho)), (C::Z, b(z)), (C::Time, b(time))]),
            FluenceOfXAndYAndZ { x, y, z } =>
                (Kind::Volume(volume::Quantity::Fluence), vec![(C::X, b(x)), (C::Y, b(y)), (C::Z, b(z))]),
            RadianceOfRhoAndZAndAngle { rho, z, angle } =>
                (Kind::Volume(volume::Quantity::Fluence), vec![(C::Rho, b(rho)), (C::Z, b(z)), (C::PolarAngle, b(angle))]),
            RadianceOfXAndYAndZAndThetaAndPhi { x, y, z, theta, phi } =>
                (Kind::Volume(volume::Quantity::Fluence),
                 vec![(C::X, b(x)), (C::Y, b(y)), (C::Z, b(z)), (C::Theta, b(theta)), (C::Phi, b(phi))]),
            RadianceOfRho { z_depth, rho } => {
                ensure!(tissue.top_surface() <= *z_depth && *z_depth <= tissue.bottom_surface(),
                        format!("DetectorInput {name}: depth {z_depth} lies outside the tissue"),
                        format!("Give z_depth between {} and {}", tissue.top_surface(), tissue.bottom_surface()));
                (Kind::SurfaceRadiance { z: *z_depth }, vec![(C::Rho, b(rho))])
            }
            pMCROfRho { perturbed_regions, rho, perturbed_ops } |
            dMCdROfRhodMua { perturbed_regions, rho, perturbed_ops } |
            dMCdROfRhodMus { perturbed_regions, rho, perturbed_ops } => {
                let derivative = match input.tally {
                    dMCdROfRhodMua {..} => Some(Derivative::Mua),
                    dMCdROfRhodMus {..} => Some(Derivative::Mus),
                    _ => None,
                };
                let perturbed = PerturbedRegions::new(&name, perturbed_regions, perturbed_ops, tissue)?;
                (Kind::Pmc(pmc::PmcTally { perturbed, derivative }), vec![(C::Rho, b(rho))])
            }
            pMCROfRhoAndTime { perturbed_regions, rho, time, perturbed_ops } => {
                let perturbed = PerturbedRegions::new(&name, perturbed_regions, perturbed_ops, tissue)?;
                (Kind::Pmc(pmc::PmcTally { perturbed, derivative: None }), vec![(C::Rho, b(rho)), (C::Time, b(time))])
            }
        };

        let binned = Binned::new(axes);
        let mut factors = binned.factors();
        let mut extras = vec![];
        let moments = match &kind {
            Kind::Omega { frequencies, .. } => {
                factors.push(vec![1.0; frequencies.len()]);
                Moments::Complex(Histogram::new(factors, second))
            }
            Kind::Mt { tally, .. } => {
                extras = tally.extras(&factors[0]);
                factors.push(vec![1.0; tally.mt_bins()]);
                Moments::Real(Histogram::new(factors, second))
            }
            _ => Moments::Real(Histogram::new(factors, second)),
        };

        Ok(Self { input: input.clone(), name, kind, binned, moments, extras, tally_count: 0, normalized: false })
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn input(&self) -> &DetectorInput { &self.input }
    pub fn boundary(&self) -> BoundaryKind { self.input.tally.boundary() }
    pub fn tally_count(&self) -> u64 { self.tally_count }

    /// Whether the photon, as it stands on this detector's boundary, is one
    /// this detector counts
    pub fn contains_point(&self, photon: &Photon) -> bool {
        let state = photon.dp.state;
        match &self.kind {
            Kind::Surface(side) | Kind::Omega { side, .. } | Kind::Mt { side, .. } => side.exited(state),
            Kind::Volume(_) => true,
            Kind::SurfaceRadiance { z } =>
                state.has(PhotonState::PSEUDO_SURFACE_RADIANCE) && photon.dp.position.z == *z,
            Kind::Pmc(_) => state.has(PhotonState::EXITED_OUT_TOP),
        }
    }

    pub fn tally(&mut self, photon: &Photon, tissue: &Tissue, rng: &mut SimRng) {
        self.tally_count += 1;
        match (&self.kind, &mut self.moments) {
            (Kind::Surface(_), Moments::Real(h)) =>
                termination::tally_weight(&mut self.binned, h, photon),
            (Kind::Omega { frequencies, .. }, Moments::Complex(h)) =>
                termination::tally_phasors(&mut self.binned, h, frequencies, photon),
            (Kind::SurfaceRadiance { .. }, Moments::Real(h)) =>
                termination::tally_radiance(&mut self.binned, h, photon),
            (Kind::Mt { tally, .. }, Moments::Real(h)) =>
                tally.tally(&mut self.binned, h, &mut self.extras, photon, rng),
            (Kind::Volume(quantity), Moments::Real(h)) =>
                volume::tally(*quantity, &mut self.binned, h, photon, tissue),
            (Kind::Pmc(p), Moments::Real(h)) =>
                p.tally(&mut self.binned, h, photon, tissue),
            _ => {}
        }
    }

    /// Close the books on the photon just offered to this detector
    pub fn end_photon(&mut self) {
        match &mut self.moments {
            Moments::Real(h)    => h.end_photon(),
            Moments::Complex(h) => h.end_photon(),
        }
    }

    /// Divide by the number of photons launched and by bin sizes. Repeated
    /// calls have no further effect.
    pub fn normalize(&mut self, n: u64) {
        if self.normalized { return }
        let n = n as f64;
        match &mut self.moments {
            Moments::Real(h)    => h.normalize(n),
            Moments::Complex(h) => h.normalize(n),
        }
        for (_, h) in &mut self.extras { h.normalize(n) }
        self.normalized = true;
    }

    pub fn output(&self) -> Result<DetectorOutput> {
        let (mean, second_moment) = match &self.moments {
            Moments::Real(h)    => (Values::Real(h.mean_array()?),    h.second_moment_array()?.map(Values::Real)),
            Moments::Complex(h) => (Values::Complex(h.mean_array()?), h.second_moment_array()?.map(Values::Complex)),
        };
        let extras = self.extras.iter()
            .map(|(name, h)| Ok((name.clone(), h.mean_array()?)))
            .collect::<Result<_>>()?;
        Ok(DetectorOutput {
            name: self.name.clone(),
            input: self.input.clone(),
            mean,
            second_moment,
            extras,
            tally_count: self.tally_count,
        })
    }
}

/// Array of tallied values, real or complex
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Real(ArrayD<f64>),
    Complex(ArrayD<Complex64>),
}

impl Values {
    pub fn shape(&self) -> &[usize] {
        match self {
            Values::Real(a)    => a.shape(),
            Values::Complex(a) => a.shape(),
        }
    }
}

/// Normalized results of one detector
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorOutput {
    pub name: String,
    pub input: DetectorInput,
    pub mean: Values,
    pub second_moment: Option<Values>,
    pub extras: Vec<(String, ArrayD<f64>)>,
    pub tally_count: u64,
}

impl DetectorOutput {
    pub fn real(&self) -> Option<&ArrayD<f64>> {
        match &self.mean { Values::Real(a) => Some(a), Values::Complex(_) => None }
    }

    pub fn complex(&self) -> Option<&ArrayD<Complex64>> {
        match &self.mean { Values::Complex(a) => Some(a), Values::Real(_) => None }
    }

    pub fn real_second_moment(&self) -> Option<&ArrayD<f64>> {
        match &self.second_moment { Some(Values::Real(a)) => Some(a), _ => None }
    }

    pub fn extra(&self, name: &str) -> Option<&ArrayD<f64>> {
        self.extras.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    /// The single value of a rank-0 real detector
    pub fn scalar(&self) -> Option<f64> {
        self.real().and_then(|a| a.iter().next().copied()).filter(|_| self.mean.shape().is_empty())
    }
}

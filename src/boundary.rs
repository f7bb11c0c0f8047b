//! Virtual boundaries: zero-thickness detection surfaces which compete with
//! tissue boundaries for a photon's next event.
//!
//! Reaching one is a pseudo-collision. The photon is paused there, its state
//! is tagged, and the detectors subscribed to the surface are offered the
//! photon, but it neither scatters nor changes region.

use geometry::distance_to_z_plane;
use itertools::Itertools;

use crate::detector::{BoundaryKind, Detector};
use crate::photon::{Photon, PhotonState};
use crate::tissue::Tissue;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VirtualBoundaryKind {
    DiffuseReflectance,
    DiffuseTransmittance,
    SurfaceRadiance { z: f64 },
    GenericVolume,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VirtualBoundary {
    pub kind: VirtualBoundaryKind,
    /// Flag added to the photon state when the boundary is reached
    pub state: PhotonState,
    /// Indices of the subscribed detectors
    pub detectors: Vec<usize>,
}

impl VirtualBoundary {
    fn new(kind: VirtualBoundaryKind) -> Self {
        let state = match kind {
            VirtualBoundaryKind::DiffuseReflectance   => PhotonState::EXITED_OUT_TOP,
            VirtualBoundaryKind::DiffuseTransmittance => PhotonState::EXITED_OUT_BOTTOM,
            VirtualBoundaryKind::SurfaceRadiance {..} => PhotonState::PSEUDO_SURFACE_RADIANCE,
            VirtualBoundaryKind::GenericVolume        => PhotonState::PSEUDO_GENERIC_VOLUME,
        };
        Self { kind, state, detectors: vec![] }
    }

    /// How far the photon must travel to reach this boundary
    pub fn distance(&self, photon: &Photon, tissue: &Tissue) -> f64 {
        match self.kind {
            VirtualBoundaryKind::DiffuseReflectance =>
                if photon.region == tissue.exterior_top() { 0.0 } else { f64::INFINITY },
            VirtualBoundaryKind::DiffuseTransmittance =>
                if photon.region == tissue.exterior_bottom() { 0.0 } else { f64::INFINITY },
            VirtualBoundaryKind::SurfaceRadiance { z } => {
                if tissue.is_exterior(photon.region) { return f64::INFINITY }
                let d = distance_to_z_plane(&photon.dp.position, &photon.dp.direction, z);
                // A photon paused on the plane has already been counted there
                if d > 0.0 { d } else { f64::INFINITY }
            }
            VirtualBoundaryKind::GenericVolume => f64::INFINITY,
        }
    }
}

/// All virtual boundaries of a simulation, in priority order
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualBoundaries {
    boundaries: Vec<VirtualBoundary>,
}

impl VirtualBoundaries {

    /// Build the boundaries needed by `detectors` and subscribe each detector
    /// to its boundary. The reflectance and transmittance surfaces always
    /// exist, as they are what ends the walk of escaping photons.
    pub fn new(detectors: &[Detector]) -> Self {
        use VirtualBoundaryKind::*;
        let depths = detectors.iter()
            .filter_map(|d| match d.boundary() { BoundaryKind::SurfaceRadiance(z) => Some(z), _ => None })
            .sorted_by(f64::total_cmp)
            .dedup();

        let mut boundaries = vec![VirtualBoundary::new(DiffuseReflectance), VirtualBoundary::new(DiffuseTransmittance)];
        boundaries.extend(depths.map(|z| VirtualBoundary::new(SurfaceRadiance { z })));
        boundaries.push(VirtualBoundary::new(GenericVolume));

        for (i, detector) in detectors.iter().enumerate() {
            let kind = match detector.boundary() {
                BoundaryKind::DiffuseReflectance    => DiffuseReflectance,
                BoundaryKind::DiffuseTransmittance  => DiffuseTransmittance,
                BoundaryKind::SurfaceRadiance(z)    => SurfaceRadiance { z },
                BoundaryKind::GenericVolume         => GenericVolume,
                BoundaryKind::PmcDiffuseReflectance => continue,
            };
            if let Some(vb) = boundaries.iter_mut().find(|vb| vb.kind == kind) {
                vb.detectors.push(i);
            }
        }
        Self { boundaries }
    }

    pub fn get(&self, index: usize) -> &VirtualBoundary { &self.boundaries[index] }

    pub fn iter(&self) -> impl Iterator<Item = &VirtualBoundary> { self.boundaries.iter() }

    /// Nearest boundary ahead of the photon, earlier boundaries winning ties.
    /// The distance is infinite when none lies ahead.
    pub fn closest(&self, photon: &Photon, tissue: &Tissue) -> (usize, f64) {
        let mut best = (self.boundaries.len() - 1, f64::INFINITY);
        for (i, vb) in self.boundaries.iter().enumerate() {
            let d = vb.distance(photon, tissue);
            if d < best.1 { best = (i, d) }
        }
        best
    }

    /// Detectors which see whole histories
    pub fn history_detectors(&self) -> &[usize] {
        self.boundaries.iter()
            .find(|vb| vb.kind == VirtualBoundaryKind::GenericVolume)
            .map(|vb| vb.detectors.as_slice())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tissue::TissueInput;
    use crate::detector::{Bins, DetectorInput, TallyType};
    use crate::photon::Limits;
    use crate::tissue::AbsorptionWeighting;
    use geometry::{Direction, Point};
    use pretty_assertions::assert_eq;

    fn tissue() -> Tissue { Tissue::new(&TissueInput::three_layer_slab(), AbsorptionWeighting::Discrete).unwrap() }

    fn detectors(tissue: &Tissue, tallies: Vec<TallyType>) -> Vec<Detector> {
        tallies.into_iter().map(|t| Detector::new(&DetectorInput::new(t), tissue).unwrap()).collect()
    }

    fn radiance(z_depth: f64) -> TallyType { TallyType::RadianceOfRho { z_depth, rho: Bins::uniform(0.0, 1.0, 2) } }

    #[test]
    fn detectors_subscribe_to_their_surfaces() {
        let t = tissue();
        let ds = detectors(&t, vec![TallyType::ATotal, TallyType::RDiffuse, radiance(5.0), TallyType::TDiffuse,
                                    radiance(2.0), radiance(5.0)]);
        let vbs = VirtualBoundaries::new(&ds);
        let kinds: Vec<_> = vbs.iter().map(|vb| (vb.kind, vb.detectors.clone())).collect();
        assert_eq!(kinds, vec![
            (VirtualBoundaryKind::DiffuseReflectance,          vec![1]),
            (VirtualBoundaryKind::DiffuseTransmittance,        vec![3]),
            (VirtualBoundaryKind::SurfaceRadiance { z: 2.0 },  vec![4]),
            (VirtualBoundaryKind::SurfaceRadiance { z: 5.0 },  vec![2, 5]),
            (VirtualBoundaryKind::GenericVolume,               vec![0]),
        ]);
        assert_eq!(vbs.history_detectors(), &[0]);
    }

    #[test]
    fn surfaces_exist_without_detectors() {
        let vbs = VirtualBoundaries::new(&[]);
        assert_eq!(vbs.iter().count(), 3);
        let t = tissue();
        let mut p = Photon::new(&t, Limits::default());
        p.restart(Point::new(0.0, 0.0, -1.0), Direction::along_z(), 1.0, 0);
        assert_eq!(vbs.closest(&p, &t), (0, 0.0));
        p.region = 2;
        assert_eq!(vbs.closest(&p, &t), (1, 0.0));
        p.region = 1;
        assert_eq!(vbs.closest(&p, &t).1, f64::INFINITY);
    }

    #[test]
    fn radiance_plane_is_ahead_or_nowhere() {
        let t = tissue();
        let vbs = VirtualBoundaries::new(&detectors(&t, vec![radiance(5.0)]));
        let mut p = Photon::new(&t, Limits::default());
        p.restart(Point::new(0.0, 0.0, 1.0), Direction::along_z(), 1.0, 1);
        assert_eq!(vbs.closest(&p, &t), (2, 4.0));
        p.dp.position.z = 5.0;
        assert_eq!(vbs.closest(&p, &t).1, f64::INFINITY);
        p.dp.direction = Direction::new(0.0, 0.0, -1.0);
        p.dp.position.z = 7.0;
        assert_eq!(vbs.closest(&p, &t), (2, 2.0));
    }
}

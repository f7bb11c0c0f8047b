//! Geometry and optical properties of the medium.
//!
//! A tissue is an ordered list of regions. Layers come first, ordered by
//! depth, and the first and last of them are the semi-infinite media outside
//! the tissue. An optional inclusion (ellipsoid or voxel) follows the layers.
//! Region indices never change during a run.

mod phase;
mod region;

pub use phase::{henyey_greenstein_cos_theta, PhaseFunction, PhaseFunctionInput};
pub use region::{Region, Shape};

use serde::{Deserialize, Serialize};
use geometry::{distance_to_z_plane, Cuboid, Direction, Ellipsoid, Point};

use crate::config::tissue::{InclusionInput, TissueInput};
use crate::error::{ensure, Error, Result};
use crate::optics::OpticalProperties;

/// How absorption reduces photon weight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbsorptionWeighting {
    /// Weight decremented by μa/μt at every collision
    #[default]
    Discrete,
    /// Weight multiplied by exp(-μa·s) along every segment
    Continuous,
    /// Photon killed outright with probability μa/μt at a collision
    Analog,
}

/// A tissue surface reached by a photon in flight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    pub distance: f64,
    /// Region on the other side
    pub neighbor: usize,
    /// Surface normal at the crossing, either orientation
    pub normal: Direction,
    /// Depth of the plane crossed, when the surface is a layer interface
    pub plane_z: Option<f64>,
}

impl Boundary {
    fn none() -> Self {
        Self { distance: f64::INFINITY, neighbor: usize::MAX, normal: Direction::along_z(), plane_z: None }
    }
}

#[derive(Debug, Clone)]
pub struct Tissue {
    regions: Vec<Region>,
    n_layers: usize,
    inclusion: Option<usize>,
    weighting: AbsorptionWeighting,
    // μt, or μs under continuous weighting: the coefficient that sets step lengths
    scatter_lengths: Vec<f64>,
}

impl Tissue {

    pub fn new(input: &TissueInput, weighting: AbsorptionWeighting) -> Result<Self> {
        let TissueInput { layers, inclusion, phase_functions } = input;

        ensure!(layers.len() >= 3,
                "TissueInput: fewer than three layers",
                "Give semi-infinite layers above and below the tissue");
        ensure!(layers[0].z[0] == f64::NEG_INFINITY && layers[layers.len() - 1].z[1] == f64::INFINITY,
                "TissueInput: outermost layers are not semi-infinite",
                "Start the first layer at -inf and end the last at +inf");
        ensure!(layers.iter().all(|l| l.z[0] <= l.z[1]),
                "TissueInput: layer ends before it starts",
                "Give every layer's z as [start, stop] with start <= stop");
        ensure!(layers.windows(2).all(|w| w[0].z[1] == w[1].z[0]),
                "TissueInput: layers are not contiguous",
                "Make each layer start where the previous one stops");

        let resolve = |key: Option<&str>, ops: &OpticalProperties| -> Result<PhaseFunction> {
            ensure!(ops.is_valid(),
                    format!("TissueInput: invalid optical properties {ops:?}"),
                    "Use mua, musp >= 0, -1 <= g <= 1 and n > 0");
            match key {
                None => Ok(PhaseFunction::HenyeyGreenstein { g: ops.g }),
                Some(key) => phase_functions.get(key)
                    .map(|pf| pf.resolve(ops.g))
                    .ok_or_else(|| Error::validation(
                        format!("TissueInput: unknown phase function key '{key}'"),
                        "Add the key to the tissue's phase_functions table")),
            }
        };

        let mut regions = layers.iter()
            .map(|l| Ok(Region {
                shape: Shape::Layer { z_start: l.z[0], z_stop: l.z[1] },
                ops: l.ops,
                phase_function: resolve(l.phase_function_key.as_deref(), &l.ops)?,
            }))
            .collect::<Result<Vec<_>>>()?;
        let n_layers = regions.len();

        let inclusion = match inclusion {
            None => None,
            Some(inc) => {
                let shape = match *inc {
                    InclusionInput::Ellipsoid { centre, a, b, c, .. } => {
                        ensure!(a > 0.0 && b > 0.0 && c > 0.0,
                                "TissueInput: ellipsoid has a non-positive semi-axis",
                                "Give a, b and c greater than zero");
                        Shape::Ellipsoid(Ellipsoid::new(centre, a, b, c))
                    }
                    InclusionInput::Voxel { min, max, .. } => {
                        ensure!(min.x < max.x && min.y < max.y && min.z < max.z,
                                "TissueInput: voxel has no volume",
                                "Make min smaller than max on every axis");
                        Shape::Voxel(Cuboid::new(min, max))
                    }
                };
                let region = Region {
                    shape,
                    ops: *inc.ops(),
                    phase_function: resolve(inc.phase_function_key(), inc.ops())?,
                };
                let (z_low, z_high) = region.z_extent();
                ensure!(z_low > layers[0].z[1] && z_high < layers[n_layers - 1].z[0],
                        "TissueInput: inclusion is not contained in the tissue layers",
                        "Keep the inclusion clear of the top and bottom surfaces");
                regions.push(region);
                Some(n_layers)
            }
        };

        let scatter_lengths = regions.iter()
            .map(|r| match weighting {
                AbsorptionWeighting::Continuous => r.ops.mus(),
                _                               => r.ops.mut_(),
            })
            .collect();

        Ok(Self { regions, n_layers, inclusion, weighting, scatter_lengths })
    }

    pub fn regions(&self) -> &[Region] { &self.regions }
    pub fn len(&self) -> usize { self.regions.len() }
    pub fn is_empty(&self) -> bool { self.regions.is_empty() }
    pub fn weighting(&self) -> AbsorptionWeighting { self.weighting }
    pub fn ops(&self, region: usize) -> &OpticalProperties { &self.regions[region].ops }
    pub fn n(&self, region: usize) -> f64 { self.regions[region].ops.n }
    pub fn scatter_length(&self, region: usize) -> f64 { self.scatter_lengths[region] }
    pub fn phase_function(&self, region: usize) -> &PhaseFunction { &self.regions[region].phase_function }

    pub fn all_ops(&self) -> Vec<OpticalProperties> { self.regions.iter().map(|r| r.ops).collect() }

    pub fn exterior_top(&self) -> usize { 0 }
    pub fn exterior_bottom(&self) -> usize { self.n_layers - 1 }
    pub fn is_exterior(&self, region: usize) -> bool {
        region == self.exterior_top() || region == self.exterior_bottom()
    }

    /// z of the tissue's upper surface
    pub fn top_surface(&self) -> f64 { self.layer_bounds(0).1 }
    /// z of the tissue's lower surface
    pub fn bottom_surface(&self) -> f64 { self.layer_bounds(self.n_layers - 1).0 }

    pub fn on_domain_boundary(&self, p: &Point) -> bool {
        p.z == self.top_surface() || p.z == self.bottom_surface()
    }

    fn layer_bounds(&self, layer: usize) -> (f64, f64) {
        match self.regions[layer].shape {
            Shape::Layer { z_start, z_stop } => (z_start, z_stop),
            _ => (f64::NAN, f64::NAN),
        }
    }

    /// Index of the layer whose half-open z-interval holds `z`
    pub fn layer_index(&self, z: f64) -> usize {
        (0..self.n_layers)
            .find(|&i| z < self.layer_bounds(i).1)
            .unwrap_or(self.n_layers - 1)
    }

    pub fn region_index(&self, p: &Point) -> usize {
        if let Some(i) = self.inclusion {
            if self.regions[i].contains(p) { return i }
        }
        self.layer_index(p.z)
    }

    /// Nearest region boundary ahead of a photon at `p` travelling along `d`
    /// inside `region`. Infinitely far if nothing lies ahead.
    pub fn distance_to_boundary(&self, p: &Point, d: &Direction, region: usize) -> Boundary {
        if Some(region) == self.inclusion {
            let Some((distance, normal)) = self.regions[region].exit(p, d) else { return Boundary::none() };
            let mut exit = *p;
            exit.advance(d, distance);
            return Boundary { distance, neighbor: self.layer_index(exit.z), normal, plane_z: None }
        }

        let (z_start, z_stop) = self.layer_bounds(region);
        let mut nearest =
            if d.uz > 0.0 {
                Boundary { distance: distance_to_z_plane(p, d, z_stop), neighbor: region + 1,
                           normal: Direction::along_z(), plane_z: Some(z_stop) }
            } else if d.uz < 0.0 {
                Boundary { distance: distance_to_z_plane(p, d, z_start), neighbor: region.wrapping_sub(1),
                           normal: Direction::along_z(), plane_z: Some(z_start) }
            } else { Boundary::none() };
        if nearest.distance == f64::INFINITY { nearest = Boundary::none() }

        if let Some(i) = self.inclusion {
            if let Some((distance, normal)) = self.regions[i].entry(p, d) {
                if distance < nearest.distance {
                    nearest = Boundary { distance, neighbor: i, normal, plane_z: None };
                }
            }
        }
        nearest
    }

    /// Cosine of the angle between `d` and the surface normal
    pub fn cos_to_normal(d: &Direction, boundary: &Boundary) -> f64 {
        d.dot(&boundary.normal).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tissue::LayerInput;
    use float_eq::assert_float_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn slab() -> Tissue {
        Tissue::new(&TissueInput::three_layer_slab(), AbsorptionWeighting::Discrete).unwrap()
    }

    #[fixture]
    fn ellipsoid() -> Tissue {
        Tissue::new(&TissueInput::single_ellipsoid(), AbsorptionWeighting::Discrete).unwrap()
    }

    #[rstest(/**/  z, expected,
             case(-1.0,  0),
             case( 0.0,  1),
             case(10.0,  1),
             case(20.0,  2),
             case(1e9,   2),
    )]
    fn layer_lookup(slab: Tissue, z: f64, expected: usize) {
        assert_eq!(slab.region_index(&Point::new(3.0, 4.0, z)), expected);
    }

    #[rstest(/**/  z,    uz,  distance,       neighbor,
             case( 5.0,  1.0,     15.0,              2),
             case( 5.0, -1.0,      5.0,              0),
             case( 5.0,  0.5,     30.0,              2),
             case(20.0,  1.0,      0.0,              2),
    )]
    fn distance_in_layer(slab: Tissue, z: f64, uz: f64, distance: f64, neighbor: usize) {
        let d = Direction::new((1.0 - uz * uz).sqrt(), 0.0, uz);
        let b = slab.distance_to_boundary(&Point::new(0.0, 0.0, z), &d, 1);
        assert_float_eq!(b.distance, distance, rmax <= 1e-14);
        assert_eq!(b.neighbor, neighbor);
    }

    #[rstest]
    fn parallel_photon_never_reaches_a_layer_boundary(slab: Tissue) {
        let d = Direction::new(1.0, 0.0, 0.0);
        assert_eq!(slab.distance_to_boundary(&Point::new(0.0, 0.0, 5.0), &d, 1).distance, f64::INFINITY);
    }

    #[rstest]
    fn photon_leaving_through_exterior_sees_nothing(slab: Tissue) {
        let d = Direction::new(0.0, 0.0, -1.0);
        assert_eq!(slab.distance_to_boundary(&Point::new(0.0, 0.0, 0.0), &d, 0).distance, f64::INFINITY);
    }

    #[rstest]
    fn ellipsoid_is_entered_before_layer_boundary(ellipsoid: Tissue) {
        let p = Point::new(0.0, 0.0, 0.2);
        let b = ellipsoid.distance_to_boundary(&p, &Direction::along_z(), 1);
        assert_float_eq!(b.distance, 0.3, rmax <= 1e-12);
        assert_eq!(b.neighbor, 3);
        assert_eq!(ellipsoid.region_index(&Point::new(0.0, 0.0, 1.0)), 3);
    }

    #[rstest]
    fn ellipsoid_exit_returns_to_surrounding_layer(ellipsoid: Tissue) {
        let p = Point::new(0.0, 0.0, 1.0);
        let b = ellipsoid.distance_to_boundary(&p, &Direction::new(0.0, 0.0, -1.0), 3);
        assert_float_eq!(b.distance, 0.5, rmax <= 1e-12);
        assert_eq!(b.neighbor, 1);
        assert_float_eq!(b.normal.uz, -1.0, abs <= 1e-12);
    }

    #[rstest(/**/ weighting,                         expected,
             case(AbsorptionWeighting::Discrete,   5.01),
             case(AbsorptionWeighting::Analog,     5.01),
             case(AbsorptionWeighting::Continuous, 5.0),
    )]
    fn step_coefficient_depends_on_weighting(weighting: AbsorptionWeighting, expected: f64) {
        let t = Tissue::new(&TissueInput::three_layer_slab(), weighting).unwrap();
        assert_float_eq!(t.scatter_length(1), expected, rmax <= 1e-14);
    }

    #[test]
    fn gaps_between_layers_are_rejected() {
        let mut input = TissueInput::three_layer_slab();
        input.layers[1].z = [0.5, 20.0];
        let err = Tissue::new(&input, AbsorptionWeighting::Discrete).unwrap_err();
        assert!(err.to_string().starts_with("TissueInput: layers are not contiguous"));
    }

    #[test]
    fn inclusion_touching_surface_is_rejected() {
        let mut input = TissueInput::single_ellipsoid();
        if let Some(InclusionInput::Ellipsoid { centre, .. }) = &mut input.inclusion { centre.z = 0.25 }
        assert!(Tissue::new(&input, AbsorptionWeighting::Discrete).is_err());
    }

    #[test]
    fn unknown_phase_function_key_is_rejected() {
        let mut input = TissueInput::three_layer_slab();
        input.layers[1].phase_function_key = Some("HenyeyGreensteinKey1".into());
        assert!(Tissue::new(&input, AbsorptionWeighting::Discrete).is_err());
        input.phase_functions.insert("HenyeyGreensteinKey1".into(), PhaseFunctionInput::Isotropic);
        let t = Tissue::new(&input, AbsorptionWeighting::Discrete).unwrap();
        assert_eq!(*t.phase_function(1), PhaseFunction::Isotropic);
    }

    #[test]
    fn too_few_layers() {
        let input = TissueInput {
            layers: vec![LayerInput::new(f64::NEG_INFINITY, f64::INFINITY, OpticalProperties::new(0.0, 1.0, 0.0, 1.0))],
            ..TissueInput::default()
        };
        assert!(Tissue::new(&input, AbsorptionWeighting::Discrete).is_err());
    }
}

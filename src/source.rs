//! Where photons are born, heading which way.
//!
//! Each source draws from the simulation's random stream in a fixed order, so
//! that a seed fixes the launch of every photon.

use std::f64::consts::{PI, TAU};

use geometry::{Direction, Point, Vector};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{ensure, Error, Result};
use crate::rng::SimRng;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SourceInput {
    /// Pencil beam from a point
    DirectionalPoint {
        position: Point,
        direction: Direction,
        #[serde(default)] initial_tissue_region_index: usize,
    },
    IsotropicPoint {
        position: Point,
        #[serde(default)] initial_tissue_region_index: usize,
    },
    /// Directions drawn uniformly (in solid angle) from a polar and an
    /// azimuthal range about `axis`. Angles in radians.
    CustomPoint {
        position: Point,
        #[serde(default = "along_z")] axis: Direction,
        polar_range: [f64; 2],
        azimuthal_range: [f64; 2],
        #[serde(default)] initial_tissue_region_index: usize,
    },
    /// Lambertian emission from the curved wall and the bottom face of a
    /// cylinder of `radius` whose axis runs from its top face down `height`
    #[serde(alias = "LambertianSurfaceEmittingCylindricalFiber")]
    LambertianCylindricalFiber {
        radius: f64,
        height: f64,
        curved_surface_efficiency: f64,
        bottom_surface_efficiency: f64,
        #[serde(default = "along_z")] axis: Direction,
        #[serde(default)] translation: Point,
        #[serde(default)] initial_tissue_region_index: usize,
    },
    /// Isotropic emission from within an ellipsoid with semi-axes `a`, `b`,
    /// `c`, centred at `translation`
    VolumetricEllipsoidal {
        a: f64,
        b: f64,
        c: f64,
        #[serde(default)] profile: Profile,
        #[serde(default = "along_z")] axis: Direction,
        #[serde(default)] translation: Point,
        #[serde(default)] initial_tissue_region_index: usize,
    },
}

/// Spatial distribution of emission within a volumetric source
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Profile {
    #[default]
    Flat,
    /// Normal along each semi-axis with the given full width at half maximum,
    /// truncated at the ellipsoid surface
    Gaussian { fwhm: f64 },
}

fn along_z() -> Direction { Direction::along_z() }

impl Default for SourceInput {
    fn default() -> Self {
        SourceInput::DirectionalPoint {
            position: Point::zero(),
            direction: Direction::along_z(),
            initial_tissue_region_index: 0,
        }
    }
}

impl SourceInput {
    pub fn initial_tissue_region_index(&self) -> usize {
        use SourceInput::*;
        match self {
            DirectionalPoint           { initial_tissue_region_index, .. } |
            IsotropicPoint             { initial_tissue_region_index, .. } |
            CustomPoint                { initial_tissue_region_index, .. } |
            LambertianCylindricalFiber { initial_tissue_region_index, .. } |
            VolumetricEllipsoidal      { initial_tissue_region_index, .. } => *initial_tissue_region_index,
        }
    }
}

/// Birth state of one photon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Launch {
    pub position: Point,
    pub direction: Direction,
    pub region: usize,
}

#[derive(Debug, Clone)]
pub struct Source {
    input: SourceInput,
    gaussian: Option<Normal<f64>>,
}

impl Source {

    pub fn new(input: &SourceInput, n_regions: usize) -> Result<Self> {
        let region = input.initial_tissue_region_index();
        ensure!(region < n_regions,
                format!("SourceInput: initial tissue region {region} does not exist"),
                format!("Choose a region index below {n_regions}"));

        let mut gaussian = None;
        match input {
            SourceInput::DirectionalPoint { direction, .. } => {
                ensure!(direction.is_unit(),
                        "SourceInput: direction is not a unit vector",
                        "Normalize the source direction");
            }
            SourceInput::CustomPoint { axis, polar_range, azimuthal_range, .. } => {
                ensure!(axis.is_unit(), "SourceInput: axis is not a unit vector", "Normalize the source axis");
                ensure!(0.0 <= polar_range[0] && polar_range[0] <= polar_range[1] && polar_range[1] <= PI,
                        "SourceInput: polar range out of order or outside [0, π]",
                        "Give polar_range as [min, max] radians within [0, π]");
                ensure!(azimuthal_range[0] <= azimuthal_range[1],
                        "SourceInput: azimuthal range out of order",
                        "Give azimuthal_range as [min, max] radians");
            }
            SourceInput::LambertianCylindricalFiber { radius, height, curved_surface_efficiency, bottom_surface_efficiency, axis, .. } => {
                ensure!(*radius > 0.0 && *height >= 0.0,
                        "SourceInput: fiber has no emitting surface",
                        "Give radius > 0 and height >= 0");
                ensure!((0.0..=1.0).contains(curved_surface_efficiency) && (0.0..=1.0).contains(bottom_surface_efficiency)
                        && curved_surface_efficiency + bottom_surface_efficiency > 0.0,
                        "SourceInput: fiber surface efficiencies out of range",
                        "Give efficiencies in [0, 1], not both zero");
                ensure!(axis.is_unit(), "SourceInput: axis is not a unit vector", "Normalize the source axis");
            }
            SourceInput::VolumetricEllipsoidal { a, b, c, profile, axis, .. } => {
                ensure!(*a > 0.0 && *b > 0.0 && *c > 0.0,
                        "SourceInput: ellipsoid has a non-positive semi-axis",
                        "Give a, b and c greater than zero");
                ensure!(axis.is_unit(), "SourceInput: axis is not a unit vector", "Normalize the source axis");
                if let Profile::Gaussian { fwhm } = profile {
                    let sigma = fwhm / (2.0 * (2.0 * 2f64.ln()).sqrt());
                    gaussian = Some(Normal::new(0.0, sigma).map_err(|e| Error::validation(
                        format!("SourceInput: Gaussian profile: {e}"),
                        "Give fwhm > 0"))?);
                }
            }
            SourceInput::IsotropicPoint { .. } => {}
        }
        Ok(Self { input: input.clone(), gaussian })
    }

    pub fn launch(&self, rng: &mut SimRng) -> Launch {
        use SourceInput::*;
        let region = self.input.initial_tissue_region_index();
        match &self.input {
            DirectionalPoint { position, direction, .. } => Launch { position: *position, direction: *direction, region },
            IsotropicPoint { position, .. } => Launch { position: *position, direction: isotropic(rng), region },
            &CustomPoint { position, axis, polar_range, azimuthal_range, .. } => {
                let cos_theta = draw_unless_degenerate(rng, polar_range[1].cos(), polar_range[0].cos());
                let phi       = draw_unless_degenerate(rng, azimuthal_range[0], azimuthal_range[1]);
                let local = Direction::from_angles(cos_theta.clamp(-1.0, 1.0).acos(), phi);
                Launch { position, direction: axis.rotate_from_z(&local), region }
            }
            &LambertianCylindricalFiber { radius, height, curved_surface_efficiency, bottom_surface_efficiency, axis, translation, .. } => {
                let curved = curved_surface_efficiency * TAU * radius * height;
                let bottom = bottom_surface_efficiency * PI * radius * radius;
                let (local_position, normal) = if rng.next_f64() * (curved + bottom) < curved {
                    let phi = TAU * rng.next_f64();
                    let z   = height * rng.next_f64();
                    let (sin, cos) = phi.sin_cos();
                    (Vector::new(radius * cos, radius * sin, z), Direction::new(cos, sin, 0.0))
                } else {
                    let r   = radius * rng.next_f64().sqrt();
                    let phi = TAU * rng.next_f64();
                    let (sin, cos) = phi.sin_cos();
                    (Vector::new(r * cos, r * sin, height), Direction::along_z())
                };
                let local_direction = normal.rotate_from_z(&lambertian(rng));
                Launch {
                    position:  translation + rotate(&axis, local_position),
                    direction: axis.rotate_from_z(&local_direction),
                    region,
                }
            }
            &VolumetricEllipsoidal { a, b, c, axis, translation, .. } => {
                let scales = Vector::new(a, b, c);
                let u = match &self.gaussian {
                    None => loop {
                        let u = Vector::new(rng.uniform(-1.0, 1.0), rng.uniform(-1.0, 1.0), rng.uniform(-1.0, 1.0));
                        if u.magnitude() <= 1.0 { break u }
                    },
                    Some(normal) => loop {
                        let v = Vector::new(normal.sample(rng), normal.sample(rng), normal.sample(rng));
                        let u = v.component_div(&scales);
                        if u.magnitude() <= 1.0 { break u }
                    },
                };
                let local_position = Vector::new(u.x * a, u.y * b, u.z * c);
                Launch {
                    position:  translation + rotate(&axis, local_position),
                    direction: isotropic(rng),
                    region,
                }
            }
        }
    }
}

fn draw_unless_degenerate(rng: &mut SimRng, low: f64, high: f64) -> f64 {
    if low == high { low } else { rng.uniform(low, high) }
}

fn isotropic(rng: &mut SimRng) -> Direction {
    let cos_theta = 2.0 * rng.next_f64() - 1.0;
    let phi = TAU * rng.next_f64();
    Direction::from_angles(cos_theta.acos(), phi)
}

/// Cosine-weighted about +z
fn lambertian(rng: &mut SimRng) -> Direction {
    let cos_theta = rng.next_f64().sqrt();
    let phi = TAU * rng.next_f64();
    Direction::from_angles(cos_theta.acos(), phi)
}

/// Rotate a displacement expressed in the frame whose pole is +z into the
/// frame whose pole is `axis`
fn rotate(axis: &Direction, v: Vector) -> Vector {
    let m = v.magnitude();
    if m == 0.0 { return v }
    let d = axis.rotate_from_z(&Direction::new(v.x / m, v.y / m, v.z / m));
    Vector::new(d.ux * m, d.uy * m, d.uz * m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::RngType;
    use float_eq::assert_float_eq;
    use geometry::Ellipsoid;
    use proptest::prelude::*;

    fn rng(seed: u32) -> SimRng { SimRng::new(RngType::MersenneTwister, seed) }

    #[test]
    fn directional_point_draws_nothing() {
        let source = Source::new(&SourceInput::default(), 3).unwrap();
        let mut a = rng(1);
        let launch = source.launch(&mut a);
        assert_eq!(launch.direction, Direction::along_z());
        assert_eq!(a.next_u32(), rng(1).next_u32());
    }

    #[test]
    fn region_out_of_range_is_rejected() {
        let input = SourceInput::IsotropicPoint { position: Point::zero(), initial_tissue_region_index: 3 };
        assert!(Source::new(&input, 3).is_err());
    }

    #[test]
    fn degenerate_custom_ranges_give_fixed_direction() {
        let theta = 0.3;
        let input = SourceInput::CustomPoint {
            position: Point::zero(), axis: Direction::along_z(),
            polar_range: [theta, theta], azimuthal_range: [0.0, 0.0],
            initial_tissue_region_index: 1,
        };
        let source = Source::new(&input, 3).unwrap();
        let mut r = rng(7);
        let d = source.launch(&mut r).direction;
        assert_float_eq!(d.uz, theta.cos(), abs <= 1e-12);
        assert_float_eq!(d.uy, 0.0,         abs <= 1e-12);
        assert_eq!(r.next_u32(), rng(7).next_u32());
    }

    use rand::RngCore;

    proptest! {
        #[test]
        fn custom_point_stays_within_polar_range(seed in 0..1000_u32) {
            let input = SourceInput::CustomPoint {
                position: Point::zero(), axis: Direction::along_z(),
                polar_range: [0.0, 0.5], azimuthal_range: [0.0, TAU],
                initial_tissue_region_index: 1,
            };
            let d = Source::new(&input, 3).unwrap().launch(&mut rng(seed)).direction;
            prop_assert!(d.is_unit());
            prop_assert!(d.theta() <= 0.5 + 1e-12);
        }

        #[test]
        fn volumetric_positions_lie_in_ellipsoid(seed in 0..1000_u32, gaussian in proptest::bool::ANY) {
            let translation = Point::new(1.0, 2.0, 5.0);
            let input = SourceInput::VolumetricEllipsoidal {
                a: 1.0, b: 2.0, c: 0.5,
                profile: if gaussian { Profile::Gaussian { fwhm: 1.0 } } else { Profile::Flat },
                axis: Direction::along_z(), translation,
                initial_tissue_region_index: 1,
            };
            let launch = Source::new(&input, 3).unwrap().launch(&mut rng(seed));
            let e = Ellipsoid::new(translation, 1.0 + 1e-9, 2.0 + 1e-9, 0.5 + 1e-9);
            prop_assert!(e.contains(&launch.position));
            prop_assert!(launch.direction.is_unit());
        }

        #[test]
        fn fiber_emits_outward(seed in 0..1000_u32) {
            let input = SourceInput::LambertianCylindricalFiber {
                radius: 0.5, height: 2.0,
                curved_surface_efficiency: 1.0, bottom_surface_efficiency: 1.0,
                axis: Direction::along_z(), translation: Point::zero(),
                initial_tissue_region_index: 1,
            };
            let launch = Source::new(&input, 3).unwrap().launch(&mut rng(seed));
            let p = launch.position;
            let d = launch.direction;
            prop_assert!(d.is_unit());
            if p.z < 2.0 - 1e-12 {
                // curved wall: heading away from the axis
                prop_assert!((p.x * d.ux + p.y * d.uy) >= -1e-12);
                prop_assert!((p.rho() - 0.5).abs() < 1e-9);
            } else {
                prop_assert!(d.uz >= 0.0);
                prop_assert!(p.rho() <= 0.5 + 1e-12);
            }
        }
    }
}

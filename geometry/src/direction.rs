use std::ops::{Mul, Neg};
use serde::{Deserialize, Serialize};
use crate::Vector;

// Below this |uz| is treated as pointing along the pole
const COSZERO: f64 = 1.0 - 1e-12;

/// Unit vector of travel, stored as direction cosines
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Direction {
    pub ux: f64,
    pub uy: f64,
    pub uz: f64,
}

impl Default for Direction {
    fn default() -> Self { Self::along_z() }
}

impl From<[f64; 3]> for Direction {
    fn from([ux, uy, uz]: [f64; 3]) -> Self { Self { ux, uy, uz } }
}

impl From<Direction> for [f64; 3] {
    fn from(d: Direction) -> Self { [d.ux, d.uy, d.uz] }
}

impl From<Direction> for Vector {
    fn from(d: Direction) -> Self { Vector::new(d.ux, d.uy, d.uz) }
}

impl Mul<f64> for Direction {
    type Output = Vector;
    fn mul(self, rhs: f64) -> Vector { Vector::new(self.ux * rhs, self.uy * rhs, self.uz * rhs) }
}

impl Neg for Direction {
    type Output = Self;
    fn neg(self) -> Self { Self::new(-self.ux, -self.uy, -self.uz) }
}

impl Direction {
    /// Trusts the caller to supply a unit vector
    pub fn new(ux: f64, uy: f64, uz: f64) -> Self { Self { ux, uy, uz } }

    pub fn along_z() -> Self { Self::new(0.0, 0.0, 1.0) }

    /// Scale `v` to unit length. A zero vector falls back to +z.
    pub fn normalized(v: Vector) -> Self {
        let m = v.magnitude();
        if m == 0.0 { return Self::along_z() }
        Self::new(v.x / m, v.y / m, v.z / m)
    }

    /// Unit vector with polar angle `theta` and azimuth `phi` about +z
    pub fn from_angles(theta: f64, phi: f64) -> Self {
        let (sin_t, cos_t) = theta.sin_cos();
        let (sin_p, cos_p) = phi.sin_cos();
        Self::new(sin_t * cos_p, sin_t * sin_p, cos_t)
    }

    pub fn dot(&self, other: &Direction) -> f64 {
        self.ux * other.ux + self.uy * other.uy + self.uz * other.uz
    }

    /// Polar angle with respect to +z, in [0, π]
    pub fn theta(&self) -> f64 { self.uz.clamp(-1.0, 1.0).acos() }

    /// Azimuthal angle in [0, 2π)
    pub fn phi(&self) -> f64 {
        let phi = self.uy.atan2(self.ux);
        if phi < 0.0 { phi + std::f64::consts::TAU } else { phi }
    }

    /// Express `local`, given in a frame whose pole is +z, in the frame whose
    /// pole is `self`.
    pub fn rotate_from_z(&self, local: &Direction) -> Direction {
        let &Direction { ux, uy, uz } = self;
        if uz.abs() > COSZERO {
            let sign = uz.signum();
            return Direction::new(local.ux, sign * local.uy, sign * local.uz)
        }
        let s = (1.0 - uz * uz).sqrt();
        Direction::new(
            local.ux * ux * uz / s - local.uy * uy / s + local.uz * ux,
            local.ux * uy * uz / s + local.uy * ux / s + local.uz * uy,
           -local.ux * s                               + local.uz * uz,
        )
    }

    /// Deflect by polar angle `acos(cos_theta)` and azimuth `phi` relative to
    /// the current direction of travel.
    pub fn deflect(&self, cos_theta: f64, phi: f64) -> Direction {
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
        let (sin_p, cos_p) = phi.sin_cos();
        self.rotate_from_z(&Direction::new(sin_theta * cos_p, sin_theta * sin_p, cos_theta))
    }

    /// Mirror reflection in a surface with the given normal (either
    /// orientation).
    pub fn reflect(&self, normal: &Direction) -> Direction {
        let c = 2.0 * self.dot(normal);
        Direction::new(self.ux - c * normal.ux, self.uy - c * normal.uy, self.uz - c * normal.uz)
    }

    /// Snell refraction from index `n1` into `n2`, where `cos_t` is the cosine
    /// of the transmission angle. The normal may have either orientation.
    pub fn refract(&self, normal: &Direction, n1: f64, n2: f64, cos_t: f64) -> Direction {
        let normal = if self.dot(normal) < 0.0 { -*normal } else { *normal };
        let eta = n1 / n2;
        let cos_i = self.dot(&normal);
        let k = cos_t - eta * cos_i;
        Direction::normalized(Vector::new(
            eta * self.ux + k * normal.ux,
            eta * self.uy + k * normal.uy,
            eta * self.uz + k * normal.uz,
        ))
    }

    pub fn is_unit(&self) -> bool {
        (self.dot(self) - 1.0).abs() < 1e-9
    }
}

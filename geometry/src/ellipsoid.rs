use serde::{Deserialize, Serialize};
use crate::{Direction, Dot, Point, Vector};

/// Axis-aligned ellipsoid with semi-axes `a`, `b`, `c` along x, y, z
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ellipsoid {
    pub centre: Point,
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Ellipsoid {

    pub fn new(centre: Point, a: f64, b: f64, c: f64) -> Self { Self { centre, a, b, c } }

    fn radii(&self) -> Vector { Vector::new(self.a, self.b, self.c) }

    /// Strictly inside the surface
    pub fn contains(&self, p: &Point) -> bool {
        let w = (p - &self.centre).component_div(&self.radii());
        w.dot(w) < 1.0
    }

    /// The two parameters along the ray from `p` in direction `d` at which it
    /// meets the surface, in increasing order. `None` if the ray misses.
    fn roots(&self, p: &Point, d: &Direction) -> Option<(f64, f64)> {
        // Map into the frame where the ellipsoid is the unit sphere
        let r = self.radii();
        let w = (p - &self.centre).component_div(&r);
        let v = Vector::from(*d).component_div(&r);
        // Viète coefficients
        let a = v.dot(v);
        let b = 2.0 * v.dot(w);
        let c = w.dot(w) - 1.0;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant <= 0.0 || a == 0.0 { return None }
        let root = discriminant.sqrt();
        Some(((-b - root) / (2.0 * a), (-b + root) / (2.0 * a)))
    }

    /// Distance to the surface for a ray starting inside the ellipsoid
    pub fn exit_distance(&self, p: &Point, d: &Direction) -> f64 {
        match self.roots(p, d) {
            Some((_, far)) if far > 0.0 => far,
            _ => 0.0,
        }
    }

    /// Distance at which a ray starting outside the ellipsoid enters it, if it
    /// does.
    pub fn entry_distance(&self, p: &Point, d: &Direction) -> Option<f64> {
        match self.roots(p, d) {
            Some((near, _)) if near > 0.0 => Some(near),
            _ => None,
        }
    }

    /// Outward unit normal at a point on the surface
    pub fn normal(&self, p: &Point) -> Direction {
        let Vector { x, y, z } = p - &self.centre;
        Direction::normalized(Vector::new(
            x / (self.a * self.a),
            y / (self.b * self.b),
            z / (self.c * self.c),
        ))
    }

    /// Lowest and highest z reached by the surface
    pub fn z_extent(&self) -> (f64, f64) { (self.centre.z - self.c, self.centre.z + self.c) }

    /// Uniformly scale a point from the unit ball onto this ellipsoid
    pub fn from_unit_ball(&self, u: Vector) -> Point {
        Point::new(
            self.centre.x + u.x * self.a,
            self.centre.y + u.y * self.b,
            self.centre.z + u.z * self.c,
        )
    }
}

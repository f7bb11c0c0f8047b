use std::ops::{Add, AddAssign, Index, Sub};
use serde::{Deserialize, Serialize};
use crate::{Direction, Vector};

/// Position in millimetres
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self { Self { x, y, z } }
    pub fn zero() -> Self { Self::new(0.0, 0.0, 0.0) }

    /// Distance from the z-axis
    pub fn rho(&self) -> f64 { self.x.hypot(self.y) }

    /// Move `distance` along `direction`
    pub fn advance(&mut self, direction: &Direction, distance: f64) {
        self.x += distance * direction.ux;
        self.y += distance * direction.uy;
        self.z += distance * direction.uz;
    }
}

impl From<[f64; 3]> for Point {
    fn from([x, y, z]: [f64; 3]) -> Self { Self { x, y, z } }
}

impl From<Point> for [f64; 3] {
    fn from(p: Point) -> Self { [p.x, p.y, p.z] }
}

impl Sub for Point {
    type Output = Vector;
    fn sub(self, rhs: Self) -> Self::Output {
        Vector {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl Sub for &Point {
    type Output = Vector;
    fn sub(self, rhs: Self) -> Self::Output { *self - *rhs }
}

impl Add<Vector> for Point {
    type Output = Point;
    fn add(self, rhs: Vector) -> Self::Output {
        Point::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign<Vector> for Point {
    fn add_assign(&mut self, rhs: Vector) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Index<usize> for Point {
    type Output = f64;
    fn index(&self, index: usize) -> &Self::Output {
        match index {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("index {index} is out of bounds [0,2]")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn point_minus_point_is_vector() {
        let lhs = Point::new(3.0, 20.0, 8.0);
        let rhs = Point::new(2.0, 40.0, 2.0);
        assert_eq!(lhs - rhs, Vector::new(1.0, -20.0, 6.0));
    }

    #[test]
    fn advance_along_direction() {
        let mut p = Point::new(1.0, 1.0, 0.0);
        p.advance(&Direction::new(0.6, 0.0, 0.8), 5.0);
        assert_float_eq!(p.x, 4.0, ulps <= 1);
        assert_float_eq!(p.y, 1.0, ulps <= 1);
        assert_float_eq!(p.z, 4.0, ulps <= 1);
    }

    #[test]
    fn rho_ignores_z() {
        assert_eq!(Point::new(3.0, -4.0, 99.0).rho(), 5.0);
    }
}

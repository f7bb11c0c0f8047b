use std::ops::{Index, Mul, Neg};

/// Displacement between two `Point`s
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

pub trait Dot<RHS> {
    type Output;
    fn dot(self, other: RHS) -> Self::Output;
}

impl Dot<Vector> for Vector {
    type Output = f64;
    fn dot(self, other: Vector) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
}

impl Mul<f64> for Vector {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Vector {
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
        }
    }
}

impl Neg for Vector {
    type Output = Self;
    fn neg(self) -> Self::Output { self * -1.0 }
}

impl Index<usize> for Vector {
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

impl Vector {
    pub fn new(x: f64, y: f64, z: f64) -> Self { Self { x, y, z } }

    pub fn magnitude(&self) -> f64 {
        let &Self { x, y, z } = self;
        (x*x + y*y + z*z).sqrt()
    }

    /// Component-wise division, used to map points into the unit sphere of an
    /// ellipsoid
    pub fn component_div(self, other: &Self) -> Self {
        Self::new(self.x / other.x, self.y / other.y, self.z / other.z)
    }
}

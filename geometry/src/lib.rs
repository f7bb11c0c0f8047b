mod point;
mod vector;
mod direction;

pub use point::Point;
pub use vector::{Vector, Dot};
pub use direction::Direction;

mod ellipsoid;
mod cuboid;

pub use ellipsoid::Ellipsoid;
pub use cuboid::Cuboid;

/// Distance along `d` from `p` to the plane `z = z_plane`, or infinity if the
/// plane is not ahead. Rays parallel to the plane never reach it.
pub fn distance_to_z_plane(p: &Point, d: &Direction, z_plane: f64) -> f64 {
    if d.uz == 0.0 { return f64::INFINITY }
    let t = (z_plane - p.z) / d.uz;
    if t >= 0.0 { t } else { f64::INFINITY }
}

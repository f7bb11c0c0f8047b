use serde::{Deserialize, Serialize};
use crate::{Direction, Point};

/// Axis-aligned box, `[min, max]` on every axis
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Cuboid {
    pub min: Point,
    pub max: Point,
}

/// Distance to a box face together with the axis (0, 1, 2) of that face
pub type FaceHit = (f64, usize);

impl Cuboid {

    pub fn new(min: Point, max: Point) -> Self { Self { min, max } }

    /// Strictly inside all three slabs
    pub fn contains(&self, p: &Point) -> bool {
        (0..3).all(|i| self.min[i] < p[i] && p[i] < self.max[i])
    }

    // Parameters at which the ray enters and leaves the slab on axis `i`
    fn slab(&self, p: &Point, d: &Direction, i: usize) -> (f64, f64) {
        let u = [d.ux, d.uy, d.uz][i];
        if u == 0.0 {
            return if self.min[i] <= p[i] && p[i] <= self.max[i] { (f64::NEG_INFINITY, f64::INFINITY) }
                   else                                           { (f64::INFINITY, f64::NEG_INFINITY) }
        }
        let t1 = (self.min[i] - p[i]) / u;
        let t2 = (self.max[i] - p[i]) / u;
        if t1 < t2 { (t1, t2) } else { (t2, t1) }
    }

    /// Distance to the face through which a ray starting inside leaves
    pub fn exit_distance(&self, p: &Point, d: &Direction) -> FaceHit {
        (0..3)
            .map(|i| (self.slab(p, d, i).1, i))
            .fold((f64::INFINITY, 2), |best, hit| if hit.0 < best.0 { hit } else { best })
    }

    /// Distance and face at which a ray starting outside enters the box
    pub fn entry_distance(&self, p: &Point, d: &Direction) -> Option<FaceHit> {
        let mut near: FaceHit = (f64::NEG_INFINITY, 2);
        let mut far = f64::INFINITY;
        for i in 0..3 {
            let (t1, t2) = self.slab(p, d, i);
            if t1 > near.0 { near = (t1, i) }
            far = far.min(t2);
        }
        if near.0 <= far && near.0 > 0.0 { Some(near) } else { None }
    }

    /// Outward normal of the face on `axis` nearest to `p`
    pub fn normal(&self, p: &Point, axis: usize) -> Direction {
        let mid = 0.5 * (self.min[axis] + self.max[axis]);
        let sign = if p[axis] >= mid { 1.0 } else { -1.0 };
        let mut n = [0.0; 3];
        n[axis] = sign;
        Direction::from(n)
    }

    pub fn z_extent(&self) -> (f64, f64) { (self.min.z, self.max.z) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn unit() -> Cuboid { Cuboid::new(Point::new(-1.0, -1.0, 1.0), Point::new(1.0, 1.0, 3.0)) }

    #[test]
    fn exit_through_top() {
        let (t, axis) = unit().exit_distance(&Point::new(0.0, 0.0, 2.0), &Direction::along_z());
        assert_eq!((t, axis), (1.0, 2));
    }

    #[test]
    fn entry_from_the_side() {
        let p = Point::new(-3.0, 0.0, 2.0);
        let hit = unit().entry_distance(&p, &Direction::new(1.0, 0.0, 0.0));
        assert_eq!(hit, Some((2.0, 0)));
        assert_eq!(unit().normal(&Point::new(-1.0, 0.0, 2.0), 0), Direction::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn parallel_ray_outside_slab_misses() {
        let p = Point::new(-3.0, 5.0, 2.0);
        assert_eq!(unit().entry_distance(&p, &Direction::new(1.0, 0.0, 0.0)), None);
    }

    #[test]
    fn leaving_from_a_face_does_not_reenter() {
        let p = Point::new(0.0, 0.0, 3.0);
        assert_eq!(unit().entry_distance(&p, &Direction::along_z()), None);
    }
}

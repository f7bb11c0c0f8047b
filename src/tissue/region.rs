use geometry::{Cuboid, Direction, Ellipsoid, Point};
use crate::optics::OpticalProperties;
use super::PhaseFunction;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Half-open slab `z_start <= z < z_stop`
    Layer { z_start: f64, z_stop: f64 },
    Ellipsoid(Ellipsoid),
    Voxel(Cuboid),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub shape: Shape,
    pub ops: OpticalProperties,
    pub phase_function: PhaseFunction,
}

impl Region {
    pub fn contains(&self, p: &Point) -> bool {
        match &self.shape {
            Shape::Layer { z_start, z_stop } => *z_start <= p.z && p.z < *z_stop,
            Shape::Ellipsoid(e) => e.contains(p),
            Shape::Voxel(v) => v.contains(p),
        }
    }

    /// Distance to leave an inclusion from inside, with the outward normal at
    /// the exit point. Layers are handled by the tissue, which knows their
    /// neighbours.
    pub(crate) fn exit(&self, p: &Point, d: &Direction) -> Option<(f64, Direction)> {
        match &self.shape {
            Shape::Layer { .. } => None,
            Shape::Ellipsoid(e) => {
                let t = e.exit_distance(p, d);
                let mut at = *p; at.advance(d, t);
                Some((t, e.normal(&at)))
            }
            Shape::Voxel(v) => {
                let (t, axis) = v.exit_distance(p, d);
                let mut at = *p; at.advance(d, t);
                Some((t, v.normal(&at, axis)))
            }
        }
    }

    /// Distance to enter an inclusion from outside, with the outward normal at
    /// the entry point
    pub(crate) fn entry(&self, p: &Point, d: &Direction) -> Option<(f64, Direction)> {
        match &self.shape {
            Shape::Layer { .. } => None,
            Shape::Ellipsoid(e) => e.entry_distance(p, d).map(|t| {
                let mut at = *p; at.advance(d, t);
                (t, e.normal(&at))
            }),
            Shape::Voxel(v) => v.entry_distance(p, d).map(|(t, axis)| {
                let mut at = *p; at.advance(d, t);
                (t, v.normal(&at, axis))
            }),
        }
    }

    pub fn z_extent(&self) -> (f64, f64) {
        match &self.shape {
            Shape::Layer { z_start, z_stop } => (*z_start, *z_stop),
            Shape::Ellipsoid(e) => e.z_extent(),
            Shape::Voxel(v) => v.z_extent(),
        }
    }
}

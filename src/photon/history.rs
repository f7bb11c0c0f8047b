use geometry::{Direction, Point};
use units::{Lengthf64, Ratiof64, Timef64, Weightf64};

/// What ended the segment leading to a trajectory point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Launch,
    Collision,
    TissueBoundary,
    VirtualBoundary,
}

/// Photon state at the end of one segment of its walk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryPoint {
    pub position: Point,
    /// Direction of travel along the segment
    pub direction: Direction,
    /// Weight on arrival, before any absorption at this point
    pub weight: Weightf64,
    /// Weight lost on this segment (continuous) or at this point (discrete, analog)
    pub absorbed: Weightf64,
    pub step: Lengthf64,
    pub total_time: Timef64,
    /// Region the segment ran through
    pub region: usize,
    pub event: Event,
    /// `1 - cos θ` of the scattering at this point; zero unless it scattered
    pub momentum_transfer: Ratiof64,
}

/// Per-region totals over one photon's life
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SubRegionInfo {
    pub path_length: Lengthf64,
    pub collisions: u64,
    pub momentum_transfer: Ratiof64,
}

/// Everything the volume and momentum-transfer detectors need to know about
/// a finished photon. The buffers are reused from one photon to the next.
#[derive(Debug, Clone, Default)]
pub struct PhotonHistory {
    pub sub_regions: Vec<SubRegionInfo>,
    pub trajectory: Vec<TrajectoryPoint>,
}

impl PhotonHistory {
    pub fn new(n_regions: usize) -> Self {
        Self { sub_regions: vec![SubRegionInfo::default(); n_regions], trajectory: Vec::new() }
    }

    pub fn clear(&mut self) {
        self.sub_regions.iter_mut().for_each(|s| *s = SubRegionInfo::default());
        self.trajectory.clear();
    }

    pub fn total_path_length(&self) -> Lengthf64 { self.sub_regions.iter().map(|s| s.path_length).sum() }
    pub fn total_collisions (&self) -> u64       { self.sub_regions.iter().map(|s| s.collisions ).sum() }
    pub fn total_momentum_transfer(&self) -> Ratiof64 {
        self.sub_regions.iter().map(|s| s.momentum_transfer).sum()
    }
    pub fn total_absorbed(&self) -> Weightf64 { self.trajectory.iter().map(|p| p.absorbed).sum() }

    /// Consecutive pairs of trajectory points: where each segment started and
    /// where it ended
    pub fn segments(&self) -> impl Iterator<Item = (&TrajectoryPoint, &TrajectoryPoint)> {
        self.trajectory.iter().zip(self.trajectory.iter().skip(1))
    }

    pub fn collisions(&self) -> impl Iterator<Item = &TrajectoryPoint> {
        self.trajectory.iter().filter(|p| p.event == Event::Collision)
    }
}

//! A single photon packet and the operations of its random walk.
//!
//! The driver calls these in a fixed order on every iteration:
//! `set_step_size`, `advance`, then `cross_region_or_reflect` after a tissue
//! boundary, or `absorb`, `scatter` and `roulette` after a real collision.
//! `test_death` decides when the walk is over.

mod history;
mod state;

pub use history::{Event, PhotonHistory, SubRegionInfo, TrajectoryPoint};
pub use state::PhotonState;

use geometry::{Direction, Point};
use units::{mm, ns_, time_delay, Lengthf64, Timef64, Weightf64};

use crate::optics::fresnel;
use crate::rng::SimRng;
use crate::tissue::{AbsorptionWeighting, Boundary, Tissue};

/// Position, direction, weight and standing of a photon at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhotonDataPoint {
    pub position: Point,
    pub direction: Direction,
    pub weight: Weightf64,
    pub total_time: Timef64,
    pub state: PhotonState,
}

/// Variance reduction and runaway protection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    /// Roulette is played below this weight; zero disables it
    pub roulette_threshold: Weightf64,
    /// Survivors of roulette have their weight multiplied by this
    pub roulette_factor: f64,
    pub max_path_length: Lengthf64,
    pub max_collisions: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            roulette_threshold: 0.0,
            roulette_factor: 10.0,
            max_path_length: f64::INFINITY,
            max_collisions: 1_000_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Photon {
    pub dp: PhotonDataPoint,
    pub region: usize,
    pub history: PhotonHistory,
    weighting: AbsorptionWeighting,
    limits: Limits,
    // Distance to the next collision in the current region
    s: Lengthf64,
    // Optical depth left over after pausing at a boundary
    s_left: f64,
    path_length: Lengthf64,
    collisions: u64,
}

impl Photon {

    pub fn new(tissue: &Tissue, limits: Limits) -> Self {
        Self {
            dp: PhotonDataPoint {
                position: Point::zero(),
                direction: Direction::along_z(),
                weight: 0.0,
                total_time: 0.0,
                state: PhotonState::default(),
            },
            region: 0,
            history: PhotonHistory::new(tissue.len()),
            weighting: tissue.weighting(),
            limits,
            s: 0.0,
            s_left: 0.0,
            path_length: 0.0,
            collisions: 0,
        }
    }

    /// Reuse this photon for a new history
    pub fn restart(&mut self, position: Point, direction: Direction, weight: Weightf64, region: usize) {
        self.dp = PhotonDataPoint { position, direction, weight, total_time: 0.0, state: PhotonState::ALIVE };
        self.region = region;
        self.s = 0.0;
        self.s_left = 0.0;
        self.path_length = 0.0;
        self.collisions = 0;
        self.history.clear();
        self.history.trajectory.push(TrajectoryPoint {
            position, direction, weight,
            absorbed: 0.0,
            step: 0.0,
            total_time: 0.0,
            region,
            event: Event::Launch,
            momentum_transfer: 0.0,
        });
    }

    pub fn is_alive(&self) -> bool { self.dp.state.is_alive() }

    /// Length of the flight about to be taken
    pub fn step(&self) -> Lengthf64 { self.s }

    pub fn path_length(&self) -> Lengthf64 { self.path_length }
    pub fn collisions(&self) -> u64 { self.collisions }

    /// Sample the distance to the next collision, unless optical depth is
    /// left over from a flight interrupted at a boundary
    pub fn set_step_size(&mut self, tissue: &Tissue, rng: &mut SimRng) {
        let tau = if self.s_left == 0.0 { -rng.next_positive_f64().ln() } else { self.s_left };
        self.s_left = 0.0;
        self.s = tau / tissue.scatter_length(self.region);
    }

    /// Fly towards the next collision, stopping after `distance` if that comes
    /// first. Returns whether the photon stopped short of the collision.
    pub fn advance(&mut self, distance: Lengthf64, stop_event: Event, tissue: &Tissue) -> bool {
        self.dp.state.clear_pseudo();
        let hit = self.s >= distance;
        if hit {
            self.s_left = (self.s - distance) * tissue.scatter_length(self.region);
            self.s = distance;
        }
        let s = self.s;
        let region = self.region;

        self.dp.position.advance(&self.dp.direction, s);
        self.dp.total_time += ns_(time_delay(mm(s), tissue.n(region)));
        self.path_length += s;

        let info = &mut self.history.sub_regions[region];
        info.path_length += s;
        if !hit {
            info.collisions += 1;
            self.collisions += 1;
        }

        let weight = self.dp.weight;
        let absorbed = if self.weighting == AbsorptionWeighting::Continuous {
            let absorbed = weight * (1.0 - (-tissue.ops(region).mua * s).exp());
            self.dp.weight -= absorbed;
            absorbed
        } else { 0.0 };

        self.history.trajectory.push(TrajectoryPoint {
            position: self.dp.position,
            direction: self.dp.direction,
            weight,
            absorbed,
            step: s,
            total_time: self.dp.total_time,
            region,
            event: if hit { stop_event } else { Event::Collision },
            momentum_transfer: 0.0,
        });
        hit
    }

    /// Put the photon exactly on a layer interface it has just reached
    pub fn snap_to_plane(&mut self, z: f64) {
        self.dp.position.z = z;
        if let Some(last) = self.history.trajectory.last_mut() { last.position.z = z }
    }

    /// Weight loss at a real collision
    pub fn absorb(&mut self, tissue: &Tissue, rng: &mut SimRng) {
        let ops = tissue.ops(self.region);
        let absorbed = match self.weighting {
            AbsorptionWeighting::Continuous => return,
            AbsorptionWeighting::Discrete => {
                let absorbed = self.dp.weight * ops.mua / ops.mut_();
                self.dp.weight -= absorbed;
                absorbed
            }
            AbsorptionWeighting::Analog => {
                if rng.next_f64() >= ops.mua / ops.mut_() { return }
                self.dp.state.kill(PhotonState::ABSORBED);
                self.dp.weight
            }
        };
        if let Some(last) = self.history.trajectory.last_mut() { last.absorbed += absorbed }
    }

    /// Change direction according to the region's phase function
    pub fn scatter(&mut self, tissue: &Tissue, rng: &mut SimRng) {
        let (cos_theta, phi) = tissue.phase_function(self.region).sample(rng);
        self.dp.direction = self.dp.direction.deflect(cos_theta, phi);
        let mt = 1.0 - cos_theta;
        self.history.sub_regions[self.region].momentum_transfer += mt;
        if let Some(last) = self.history.trajectory.last_mut() { last.momentum_transfer = mt }
    }

    /// Russian roulette: low-weight photons either die or carry on with their
    /// weight boosted, preserving the expected weight
    pub fn roulette(&mut self, rng: &mut SimRng) {
        let Limits { roulette_threshold, roulette_factor, .. } = self.limits;
        if roulette_threshold <= 0.0 || self.dp.weight >= roulette_threshold { return }
        if rng.next_f64() < 1.0 / roulette_factor {
            self.dp.weight *= roulette_factor;
        } else {
            self.dp.state.kill(PhotonState::KILLED_RUSSIAN_ROULETTE);
        }
    }

    /// Decide between Fresnel reflection and transmission at a tissue
    /// boundary. Interfaces between matched indices are crossed without a
    /// random draw.
    pub fn cross_region_or_reflect(&mut self, boundary: &Boundary, tissue: &Tissue, rng: &mut SimRng) {
        let n1 = tissue.n(self.region);
        let n2 = tissue.n(boundary.neighbor);
        if n1 == n2 {
            self.region = boundary.neighbor;
            return
        }
        let cos_i = Tissue::cos_to_normal(&self.dp.direction, boundary);
        let (reflectance, cos_t) = fresnel(n1, n2, cos_i);
        if rng.next_f64() < reflectance {
            self.dp.direction = self.dp.direction.reflect(&boundary.normal);
        } else {
            self.dp.direction = self.dp.direction.refract(&boundary.normal, n1, n2, cos_t);
            self.region = boundary.neighbor;
        }
    }

    /// Retire photons which have left the tissue or run for too long
    pub fn test_death(&mut self) {
        let state = &mut self.dp.state;
        if !state.is_alive() { return }
        if state.has(PhotonState::EXITED_OUT_TOP) || state.has(PhotonState::EXITED_OUT_BOTTOM) {
            state.remove(PhotonState::ALIVE);
        } else if self.path_length >= self.limits.max_path_length {
            state.kill(PhotonState::KILLED_OVER_MAXIMUM_PATH_LENGTH);
        } else if self.collisions >= self.limits.max_collisions {
            state.kill(PhotonState::KILLED_OVER_MAXIMUM_COLLISIONS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tissue::TissueInput;
    use crate::optics::OpticalProperties;
    use crate::rng::RngType;
    use float_eq::assert_float_eq;
    use rstest::rstest;

    fn tissue(weighting: AbsorptionWeighting) -> Tissue {
        Tissue::new(&TissueInput::three_layer_slab(), weighting).unwrap()
    }

    fn photon_at(tissue: &Tissue, z: f64) -> Photon {
        let mut p = Photon::new(tissue, Limits::default());
        p.restart(Point::new(0.0, 0.0, z), Direction::along_z(), 1.0, tissue.region_index(&Point::new(0.0, 0.0, z)));
        p
    }

    #[test]
    fn step_length_is_minus_log_of_the_draw_over_the_scatter_length() {
        let t = tissue(AbsorptionWeighting::Discrete);
        let mut p = photon_at(&t, 1.0);
        p.set_step_size(&t, &mut SimRng::new(RngType::MersenneTwister, 0));
        let xi = SimRng::new(RngType::MersenneTwister, 0).next_f64();
        assert_float_eq!(p.step(), -xi.ln() / t.scatter_length(1), ulps <= 1);
    }

    #[test]
    fn pause_keeps_remaining_optical_depth() {
        let t = tissue(AbsorptionWeighting::Discrete);
        let mut rng = SimRng::new(RngType::MersenneTwister, 0);
        let mut p = photon_at(&t, 0.0);
        p.set_step_size(&t, &mut rng);
        let full = p.step();
        let hit = p.advance(full / 4.0, Event::TissueBoundary, &t);
        assert!(hit);
        // Same medium: the rest of the flight is the remaining three quarters
        p.set_step_size(&t, &mut rng);
        assert_float_eq!(p.step(), 0.75 * full, rmax <= 1e-12);
        assert!(!p.advance(f64::INFINITY, Event::TissueBoundary, &t));
        assert_float_eq!(p.path_length(), full, rmax <= 1e-12);
        assert_eq!(p.collisions(), 1);
        assert_eq!(p.history.sub_regions[1].collisions, 1);
    }

    #[test]
    fn discrete_absorption_takes_albedo_fraction() {
        let t = tissue(AbsorptionWeighting::Discrete);
        let mut rng = SimRng::new(RngType::MersenneTwister, 0);
        let mut p = photon_at(&t, 1.0);
        p.set_step_size(&t, &mut rng);
        p.advance(f64::INFINITY, Event::TissueBoundary, &t);
        p.absorb(&t, &mut rng);
        let ops = t.ops(1);
        assert_float_eq!(p.dp.weight, 1.0 - ops.mua / ops.mut_(), ulps <= 1);
        assert_float_eq!(p.history.total_absorbed() + p.dp.weight, 1.0, ulps <= 1);
    }

    #[test]
    fn continuous_absorption_along_segment() {
        let t = tissue(AbsorptionWeighting::Continuous);
        let mut rng = SimRng::new(RngType::MersenneTwister, 3);
        let mut p = photon_at(&t, 1.0);
        p.set_step_size(&t, &mut rng);
        let s = p.step();
        p.advance(f64::INFINITY, Event::TissueBoundary, &t);
        p.absorb(&t, &mut rng);
        assert_float_eq!(p.dp.weight, (-0.01 * s).exp(), rmax <= 1e-12);
        assert_float_eq!(p.history.total_absorbed() + p.dp.weight, 1.0, rmax <= 1e-15);
    }

    #[rstest(/**/ threshold, weight, survives,
             case(0.0,        1e-9,     true),
             case(0.1,        0.5,      true),
    )]
    fn roulette_ignores_heavy_photons(threshold: f64, weight: f64, survives: bool) {
        let t = tissue(AbsorptionWeighting::Discrete);
        let mut p = Photon::new(&t, Limits { roulette_threshold: threshold, ..Limits::default() });
        p.restart(Point::zero(), Direction::along_z(), weight, 1);
        p.roulette(&mut SimRng::new(RngType::MersenneTwister, 0));
        assert_eq!(p.is_alive(), survives);
        assert_eq!(p.dp.weight, weight);
    }

    #[test]
    fn roulette_boosts_or_kills() {
        let t = tissue(AbsorptionWeighting::Discrete);
        let mut rng = SimRng::new(RngType::MersenneTwister, 0);
        let (mut alive, n) = (0, 10_000);
        for _ in 0..n {
            let mut p = Photon::new(&t, Limits { roulette_threshold: 0.01, ..Limits::default() });
            p.restart(Point::zero(), Direction::along_z(), 0.001, 1);
            p.roulette(&mut rng);
            if p.is_alive() {
                alive += 1;
                assert_float_eq!(p.dp.weight, 0.01, rmax <= 1e-12);
            } else {
                assert!(p.dp.state.has(PhotonState::KILLED_RUSSIAN_ROULETTE));
            }
        }
        assert!((alive as f64 / n as f64 - 0.1).abs() < 0.02);
    }

    #[test]
    fn matched_interface_is_crossed_without_drawing() {
        let input = TissueInput::slab(&[0.0, 1.0, 2.0], &[OpticalProperties::new(0.01, 1.0, 0.8, 1.4); 2]);
        let t = Tissue::new(&input, AbsorptionWeighting::Discrete).unwrap();
        let mut p = photon_at(&t, 0.5);
        let b = t.distance_to_boundary(&p.dp.position, &p.dp.direction, p.region);
        let mut rng = SimRng::new(RngType::MersenneTwister, 0);
        p.cross_region_or_reflect(&b, &t, &mut rng);
        assert_eq!(p.region, 2);
        assert_eq!(rng.next_f64(), SimRng::new(RngType::MersenneTwister, 0).next_f64());
    }

    #[test]
    fn grazing_photon_is_reflected() {
        let t = tissue(AbsorptionWeighting::Discrete);
        let mut p = photon_at(&t, 0.5);
        p.dp.direction = Direction::new((1.0 - 1e-14_f64).sqrt(), 0.0, -1e-7);
        let b = t.distance_to_boundary(&p.dp.position, &p.dp.direction, 1);
        p.cross_region_or_reflect(&b, &t, &mut SimRng::new(RngType::MersenneTwister, 0));
        assert_eq!(p.region, 1);
        assert!(p.dp.direction.uz > 0.0);
    }

    #[test]
    fn too_many_collisions_kill() {
        let t = tissue(AbsorptionWeighting::Discrete);
        let mut p = Photon::new(&t, Limits { max_collisions: 2, ..Limits::default() });
        p.restart(Point::new(0.0, 0.0, 10.0), Direction::along_z(), 1.0, 1);
        let mut rng = SimRng::new(RngType::MersenneTwister, 0);
        for _ in 0..2 {
            p.test_death();
            assert!(p.is_alive());
            p.set_step_size(&t, &mut rng);
            p.advance(f64::INFINITY, Event::TissueBoundary, &t);
        }
        p.test_death();
        assert!(p.dp.state.has(PhotonState::KILLED_OVER_MAXIMUM_COLLISIONS));
    }
}

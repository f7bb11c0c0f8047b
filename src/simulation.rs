//! The photon loop: launch, walk, tally, repeat, then normalize.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::boundary::{VirtualBoundaries, VirtualBoundaryKind};
use crate::config::SimulationInput;
use crate::database::DatabaseWriters;
use crate::detector::{Detector, DetectorOutput};
use crate::error::Result;
use crate::optics::specular;
use crate::photon::{Event, Photon, PhotonState};
use crate::rng::SimRng;
use crate::source::{Launch, Source};
use crate::tissue::{Boundary, Tissue};
use crate::utils::group_digits;

/// Whole-simulation energy balance, per launched photon
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregates {
    pub specular: f64,
    pub diffuse_reflectance: f64,
    pub diffuse_transmittance: f64,
    pub total_absorption: f64,
}

impl Aggregates {
    /// Everything accounted for, which is 1 in the absence of roulette and
    /// path or collision limits
    pub fn total(&self) -> f64 {
        self.specular + self.diffuse_reflectance + self.diffuse_transmittance + self.total_absorption
    }
}

/// How photons ended their walks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationStatistics {
    pub out_top: u64,
    pub out_bottom: u64,
    pub absorbed: u64,
    pub killed_over_max_path_length: u64,
    pub killed_over_max_collisions: u64,
    pub killed_russian_roulette: u64,
}

impl SimulationStatistics {
    pub fn track(&mut self, state: PhotonState) {
        if state.has(PhotonState::EXITED_OUT_TOP)                  { self.out_top += 1 }
        if state.has(PhotonState::EXITED_OUT_BOTTOM)               { self.out_bottom += 1 }
        if state.has(PhotonState::ABSORBED)                        { self.absorbed += 1 }
        if state.has(PhotonState::KILLED_OVER_MAXIMUM_PATH_LENGTH) { self.killed_over_max_path_length += 1 }
        if state.has(PhotonState::KILLED_OVER_MAXIMUM_COLLISIONS)  { self.killed_over_max_collisions += 1 }
        if state.has(PhotonState::KILLED_RUSSIAN_ROULETTE)         { self.killed_russian_roulette += 1 }
    }

    pub fn total(&self) -> u64 {
        self.out_top + self.out_bottom + self.absorbed +
            self.killed_over_max_path_length + self.killed_over_max_collisions + self.killed_russian_roulette
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, toml::to_string(self)?)?;
        Ok(())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(toml::from_str(&fs::read_to_string(path)?)?)
    }
}

pub const STATISTICS_FILE: &str = "statistics.toml";
/// Copy of the input, kept beside the results and databases it produced
pub const SIMULATION_INPUT_FILE: &str = "simulation.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutput {
    pub input: SimulationInput,
    pub detectors: Vec<DetectorOutput>,
    pub aggregates: Aggregates,
    pub statistics: Option<SimulationStatistics>,
}

impl SimulationOutput {
    pub fn detector(&self, name: &str) -> Option<&DetectorOutput> {
        self.detectors.iter().find(|d| d.name == name)
    }

    /// Write every detector into `dir`, along with the input and statistics.
    /// A file which cannot be written is reported and skipped.
    pub fn write(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        if let Err(e) = self.input.to_file(dir.join(SIMULATION_INPUT_FILE)) {
            warn!("Could not record the simulation input: {e}");
        }
        for detector in &self.detectors {
            if let Err(e) = crate::io::detector::write(dir, detector) {
                warn!("Could not write detector {} to {}: {e}", detector.name, dir.display());
            }
        }
        if let Some(statistics) = &self.statistics {
            if let Err(e) = statistics.to_file(dir.join(STATISTICS_FILE)) {
                warn!("Could not write simulation statistics: {e}");
            }
        }
        Ok(())
    }
}

/// What stopped the photon's last flight
enum Hit {
    Virtual(usize),
    Tissue(Boundary),
    None,
}

pub struct Simulation {
    input: SimulationInput,
    tissue: Tissue,
    source: Source,
    rng: SimRng,
    detectors: Vec<Detector>,
    boundaries: VirtualBoundaries,
    database_dir: PathBuf,
}

impl Simulation {

    /// Check the input and build everything the photon loop needs
    pub fn new(input: SimulationInput) -> Result<Self> {
        input.validate()?;
        let options = &input.options;
        let tissue = Tissue::new(&input.tissue, options.absorption_weighting)?;
        let source = Source::new(&input.source, tissue.len())?;
        let detectors = input.detectors.iter()
            .map(|d| Detector::new(d, &tissue))
            .collect::<Result<Vec<_>>>()?;
        let boundaries = VirtualBoundaries::new(&detectors);
        let rng = SimRng::new(options.rng, options.seed);
        let database_dir = PathBuf::from(&input.output_name);
        info!("{} photons, {} tissue regions, {} detectors, {:?} weighting",
              group_digits(input.n), tissue.len(), detectors.len(), options.absorption_weighting);
        Ok(Self { input, tissue, source, rng, detectors, boundaries, database_dir })
    }

    /// Where photon databases are written, if any were requested
    pub fn with_database_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.database_dir = dir.into();
        self
    }

    pub fn input (&self) -> &SimulationInput { &self.input }
    pub fn tissue(&self) -> &Tissue { &self.tissue }

    pub fn run(self) -> Result<SimulationOutput> { self.run_with_progress(|_| {}) }

    /// Run all photons, calling `progress` with the number completed after
    /// each one
    pub fn run_with_progress(self, mut progress: impl FnMut(u64)) -> Result<SimulationOutput> {
        let Self { input, tissue, source, mut rng, mut detectors, boundaries, database_dir } = self;
        let n = input.n;
        let options = &input.options;

        let mut writers = DatabaseWriters::open(&database_dir, &options.databases, tissue.len());
        let mut photon = Photon::new(&tissue, options.limits());
        let mut aggregates = Aggregates::default();
        let mut statistics = SimulationStatistics::default();
        let milestone = (n / 10).max(1);

        for i in 1..=n {
            aggregates.specular += launch(&mut photon, &source, &tissue, &mut rng);
            walk(&mut photon, &tissue, &boundaries, &mut detectors, &mut rng);

            writers.write(&photon);
            for &d in boundaries.history_detectors() {
                if detectors[d].contains_point(&photon) {
                    detectors[d].tally(&photon, &tissue, &mut rng);
                }
            }
            for detector in &mut detectors { detector.end_photon() }

            let state = photon.dp.state;
            if state.has(PhotonState::EXITED_OUT_TOP)    { aggregates.diffuse_reflectance   += photon.dp.weight }
            if state.has(PhotonState::EXITED_OUT_BOTTOM) { aggregates.diffuse_transmittance += photon.dp.weight }
            aggregates.total_absorption += photon.history.total_absorbed();
            statistics.track(state);

            if n >= 10 && i % milestone == 0 {
                info!("{:3}% of photons done", 100 * i / n);
            }
            progress(i);
        }
        writers.finish();

        let nf = n as f64;
        aggregates.specular              /= nf;
        aggregates.diffuse_reflectance   /= nf;
        aggregates.diffuse_transmittance /= nf;
        aggregates.total_absorption      /= nf;

        for detector in &mut detectors { detector.normalize(n) }
        let detectors = detectors.iter().map(Detector::output).collect::<Result<Vec<_>>>()?;
        let statistics = options.track_statistics.then_some(statistics);
        Ok(SimulationOutput { input, detectors, aggregates, statistics })
    }
}

/// Run independent simulations in parallel
pub fn run_many(inputs: &[SimulationInput]) -> Vec<Result<SimulationOutput>> {
    inputs.par_iter()
        .map(|input| Simulation::new(input.clone())?.run())
        .collect()
}

/// Start a new photon history. A photon born on the top surface in the
/// exterior enters the tissue at once, losing the specular reflection,
/// which is returned.
fn launch(photon: &mut Photon, source: &Source, tissue: &Tissue, rng: &mut SimRng) -> f64 {
    let Launch { position, direction, mut region } = source.launch(rng);
    let mut weight = 1.0;
    let mut reflected = 0.0;
    if region == tissue.exterior_top() && position.z == tissue.top_surface() {
        let next = region + 1;
        reflected = specular(tissue.n(region), tissue.n(next));
        weight -= reflected;
        region = next;
    }
    photon.restart(position, direction, weight, region);
    reflected
}

fn walk(photon: &mut Photon, tissue: &Tissue, boundaries: &VirtualBoundaries,
        detectors: &mut [Detector], rng: &mut SimRng) {
    while photon.is_alive() {
        photon.set_step_size(tissue, rng);
        let hit = step(photon, tissue, boundaries);
        if let Hit::Virtual(vb) = hit {
            for &d in &boundaries.get(vb).detectors {
                if detectors[d].contains_point(photon) {
                    detectors[d].tally(photon, tissue, rng);
                }
            }
        }
        photon.test_death();
        if !photon.is_alive() { break }
        match hit {
            Hit::Virtual(_) => continue,
            Hit::Tissue(boundary) => photon.cross_region_or_reflect(&boundary, tissue, rng),
            Hit::None => {
                photon.absorb(tissue, rng);
                if photon.is_alive() {
                    photon.scatter(tissue, rng);
                    photon.roulette(rng);
                }
            }
        }
    }
}

/// Fly to the sampled collision unless a boundary comes first. Virtual
/// boundaries win ties with tissue boundaries.
fn step(photon: &mut Photon, tissue: &Tissue, boundaries: &VirtualBoundaries) -> Hit {
    let boundary = tissue.distance_to_boundary(&photon.dp.position, &photon.dp.direction, photon.region);
    let (index, vb_distance) = boundaries.closest(photon, tissue);

    if vb_distance <= boundary.distance && vb_distance.is_finite() {
        if !photon.advance(vb_distance, Event::VirtualBoundary, tissue) { return Hit::None }
        let vb = boundaries.get(index);
        if let VirtualBoundaryKind::SurfaceRadiance { z } = vb.kind { photon.snap_to_plane(z) }
        photon.dp.state.add(vb.state);
        Hit::Virtual(index)
    } else {
        if !photon.advance(boundary.distance, Event::TissueBoundary, tissue) { return Hit::None }
        if let Some(z) = boundary.plane_z { photon.snap_to_plane(z) }
        Hit::Tissue(boundary)
    }
}

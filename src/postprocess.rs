//! Perturbation and derivative detectors evaluated over the photon databases
//! of a finished simulation, without launching any new photons.

use std::path::Path;

use log::info;

use crate::config::{PostProcessorInput, SimulationInput};
use crate::database::{replay, DatabaseReader};
use crate::detector::{Detector, DetectorOutput};
use crate::error::{ensure, Result};
use crate::photon::Photon;
use crate::rng::SimRng;
use crate::tissue::Tissue;
use crate::utils::group_digits;

pub struct PostProcessor {
    input: PostProcessorInput,
    tissue: Tissue,
    detectors: Vec<Detector>,
    limits: crate::photon::Limits,
    rng: SimRng,
}

impl PostProcessor {

    /// `simulation` must be the input of the run which recorded the databases
    pub fn new(simulation: &SimulationInput, input: &PostProcessorInput) -> Result<Self> {
        input.validate(simulation)?;
        let options = &simulation.options;
        let tissue = Tissue::new(&simulation.tissue, options.absorption_weighting)?;
        let detectors = input.detectors.iter()
            .map(|d| Detector::new(d, &tissue))
            .collect::<Result<Vec<_>>>()?;
        // pMC tallies make no draws, but the tally interface wants a stream
        let rng = SimRng::new(options.rng, options.seed);
        Ok(Self { input: input.clone(), tissue, detectors, limits: options.limits(), rng })
    }

    pub fn input(&self) -> &PostProcessorInput { &self.input }

    /// Reweight every recorded photon in `db_dir`. Results are normalized by
    /// the number of records read.
    pub fn run(mut self, db_dir: &Path) -> Result<Vec<DetectorOutput>> {
        let reader = DatabaseReader::open(db_dir)?;
        ensure!(reader.n_subregions() == self.tissue.len(),
                format!("PostProcessorInput: database has {} regions, tissue has {}",
                        reader.n_subregions(), self.tissue.len()),
                "Post-process with the simulation input which produced the database");

        let mut photon = Photon::new(&self.tissue, self.limits);
        let mut n = 0;
        for record in reader {
            let (exit, collisions) = record?;
            replay(&mut photon, &exit, &collisions);
            for detector in &mut self.detectors {
                if detector.contains_point(&photon) {
                    detector.tally(&photon, &self.tissue, &mut self.rng);
                }
                detector.end_photon();
            }
            n += 1;
        }
        ensure!(n > 0,
                format!("PostProcessorInput: no photons recorded in {}", db_dir.display()),
                "Post-process a simulation which launched photons and recorded both databases");
        info!("Reweighted {} recorded photons", group_digits(n));

        for detector in &mut self.detectors { detector.normalize(n) }
        self.detectors.iter().map(Detector::output).collect()
    }
}

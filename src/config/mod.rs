//! Declarative input of simulations and of perturbation post-processing,
//! read from TOML.

pub mod tissue;

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detector::{Bins, DetectorInput, TallyType};
use crate::error::{ensure, Result};
use crate::photon::Limits;
use crate::rng::RngType;
use crate::source::SourceInput;
use crate::tissue::AbsorptionWeighting;

pub use self::tissue::{InclusionInput, LayerInput, TissueInput};

/// Binary records which can be written for every photon
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DatabaseType {
    /// Exit position, direction, weight, time and state
    PhotonExit,
    /// Path length and collision count in every region
    CollisionInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationOptions {
    #[serde(default)]
    pub seed: u32,

    #[serde(default)]
    pub rng: RngType,

    #[serde(default)]
    pub absorption_weighting: AbsorptionWeighting,

    #[serde(default)]
    pub databases: Vec<DatabaseType>,

    #[serde(default)]
    pub track_statistics: bool,

    /// Zero disables Russian roulette
    #[serde(default)]
    pub russian_roulette_weight_threshold: f64,

    #[serde(default = "default_roulette_factor")]
    pub russian_roulette_factor: f64,

    #[serde(default = "default_max_path_length")]
    pub max_path_length: f64,

    #[serde(default = "default_max_collisions")]
    pub max_collisions: u64,
}

fn default_roulette_factor() -> f64 { 10.0 }
fn default_max_path_length() -> f64 { f64::INFINITY }
fn default_max_collisions() -> u64 { 1_000_000 }

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            rng: RngType::default(),
            absorption_weighting: AbsorptionWeighting::default(),
            databases: vec![],
            track_statistics: false,
            russian_roulette_weight_threshold: 0.0,
            russian_roulette_factor: default_roulette_factor(),
            max_path_length: default_max_path_length(),
            max_collisions: default_max_collisions(),
        }
    }
}

impl SimulationOptions {
    pub fn limits(&self) -> Limits {
        Limits {
            roulette_threshold: self.russian_roulette_weight_threshold,
            roulette_factor: self.russian_roulette_factor,
            max_path_length: self.max_path_length,
            max_collisions: self.max_collisions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationInput {
    /// Number of photons to launch
    #[serde(default = "default_n")]
    pub n: u64,

    /// Directory, under the output root, receiving the results
    #[serde(default = "default_output_name")]
    pub output_name: String,

    #[serde(default)]
    pub options: SimulationOptions,

    #[serde(default)]
    pub source: SourceInput,

    #[serde(default)]
    pub tissue: TissueInput,

    #[serde(default)]
    pub detectors: Vec<DetectorInput>,
}

fn default_n() -> u64 { 100 }
fn default_output_name() -> String { "results".into() }

impl Default for SimulationInput {
    fn default() -> Self {
        Self {
            n: default_n(),
            output_name: default_output_name(),
            options: SimulationOptions::default(),
            source: SourceInput::default(),
            tissue: TissueInput::default(),
            detectors: vec![],
        }
    }
}

impl SimulationInput {

    /// 100 photons launched straight down into 20 mm of tissue, with
    /// reflectance, transmittance and absorption detectors
    pub fn one_layer_example() -> Self {
        let rho = Bins::uniform(0.0, 10.0, 101);
        Self {
            source: SourceInput::DirectionalPoint {
                position: geometry::Point::zero(),
                direction: geometry::Direction::along_z(),
                initial_tissue_region_index: 1,
            },
            detectors: vec![
                DetectorInput::new(TallyType::RDiffuse),
                DetectorInput::new(TallyType::ROfRho { rho: rho.clone() }),
                DetectorInput::new(TallyType::TDiffuse),
                DetectorInput::new(TallyType::ATotal),
                DetectorInput::new(TallyType::FluenceOfRhoAndZ { rho, z: Bins::uniform(0.0, 20.0, 21) }),
            ],
            ..Self::default()
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(toml::from_str(&fs::read_to_string(path)?)?)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        // Via `toml::Value`, so that plain keys are emitted before tables
        fs::write(path, toml::to_string(&toml::Value::try_from(self)?)?)?;
        Ok(())
    }

    /// Checks which need only the input itself. The tissue, source and
    /// detectors check the rest as they are built.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.n > 0,
                "SimulationInput: N is zero",
                "Launch at least one photon");
        ensure!(self.options.russian_roulette_factor >= 1.0,
                "SimulationOptions: Russian roulette factor below one",
                "Give russian_roulette_factor >= 1");
        ensure!(self.options.max_path_length > 0.0 && self.options.max_collisions > 0,
                "SimulationOptions: photon lifetime limits are not positive",
                "Give max_path_length > 0 and max_collisions > 0");
        for d in &self.detectors {
            ensure!(!d.tally.is_pmc(),
                    format!("DetectorInput {}: perturbation detectors cannot be used during a simulation", d.name()),
                    "Move pMC and dMC detectors into a post-processor input");
        }
        unique_names(&self.detectors)
    }
}

fn unique_names(detectors: &[DetectorInput]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for d in detectors {
        let name = d.name();
        ensure!(seen.insert(name.clone()),
                format!("DetectorInput: detector name '{name}' used more than once"),
                "Give each detector a distinct name");
    }
    Ok(())
}

/// Reweighting of a recorded simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostProcessorInput {
    #[serde(default = "default_post_output_name")]
    pub output_name: String,

    #[serde(default)]
    pub detectors: Vec<DetectorInput>,
}

fn default_post_output_name() -> String { "pmc_results".into() }

impl PostProcessorInput {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(toml::from_str(&fs::read_to_string(path)?)?)
    }

    /// `simulation` is the input of the run which wrote the databases
    pub fn validate(&self, simulation: &SimulationInput) -> Result<()> {
        for d in &self.detectors {
            ensure!(d.tally.is_pmc(),
                    format!("DetectorInput {}: only perturbation detectors can be post-processed", d.name()),
                    "Use pMCROfRho, pMCROfRhoAndTime, dMCdROfRhodMua or dMCdROfRhodMus");
        }
        ensure!(simulation.options.absorption_weighting != AbsorptionWeighting::Analog,
                "PostProcessorInput: analog absorption weighting cannot be perturbed",
                "Rerun the simulation with Discrete or Continuous absorption weighting");
        let dbs = &simulation.options.databases;
        ensure!(dbs.contains(&DatabaseType::PhotonExit) && dbs.contains(&DatabaseType::CollisionInfo),
                "PostProcessorInput: simulation did not record photon exit and collision databases",
                "Rerun the simulation with databases = [\"PhotonExit\", \"CollisionInfo\"]");
        unique_names(&self.detectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optics::OpticalProperties;
    use pretty_assertions::assert_eq;

    // ----- Some helpers to make the tests more concise ---------------------------------
    fn parse<'d, D: Deserialize<'d>>(input: &'d str) -> D {
        toml::from_str(input).unwrap()
    }

    macro_rules! check {
        ($type:ident($text:expr).$field:ident = $expected:expr) => {
            let config: $type = parse::<$type>($text);
            assert_eq!(config.$field, $expected);
        };
        ($type:ident($text:expr) fields: $($field:ident = $expected:expr);+$(;)?) => {
            let config: $type = parse::<$type>($text);
            $(assert_eq!(config.$field, $expected);)*
        }
    }

    // ----- Defaults ---------------------------------------------------------------------
    #[test]
    fn empty_input_gets_defaults() {
        check!{SimulationInput("") fields:
               n = 100;
               output_name = "results";
               options = SimulationOptions::default();
               tissue = TissueInput::three_layer_slab();
        }
    }

    #[test]
    fn options() {
        check!{SimulationOptions(r#"
                 seed = 7
                 rng = "Isaac"
                 absorption_weighting = "Continuous"
                 databases = ["PhotonExit", "CollisionInfo"]
                 max_path_length = 1e3
               "#) fields:
               seed = 7;
               rng = RngType::Isaac;
               absorption_weighting = AbsorptionWeighting::Continuous;
               databases = vec![DatabaseType::PhotonExit, DatabaseType::CollisionInfo];
               max_path_length = 1e3;
               max_collisions = 1_000_000;
               russian_roulette_factor = 10.0;
        }
    }

    // ----- Make sure that unknown fields are not accepted -----------------------------
    #[test]
    #[should_panic]
    fn reject_unknown_field() {
        parse::<SimulationInput>("unknown_field = 666");
    }

    // ----- A complete input file --------------------------------------------------------
    #[test]
    fn full_input() {
        let input: SimulationInput = parse(r#"
            n = 1000
            output_name = "one_layer"

            [options]
            seed = 0
            absorption_weighting = "Discrete"

            [source]
            type = "DirectionalPoint"
            position = [0.0, 0.0, 0.0]
            direction = [0.0, 0.0, 1.0]
            initial_tissue_region_index = 1

            [[tissue.layers]]
            z = [-inf, 0.0]
            ops = { mua = 0.0, musp = 1e-10, g = 1.0, n = 1.0 }

            [[tissue.layers]]
            z = [0.0, 20.0]
            ops = { mua = 0.01, musp = 1.0, g = 0.8, n = 1.4 }

            [[tissue.layers]]
            z = [20.0, inf]
            ops = { mua = 0.0, musp = 1e-10, g = 1.0, n = 1.0 }

            [[detectors]]
            tally_type = "ROfRho"
            rho = { start = 0.0, stop = 10.0, count = 101 }

            [[detectors]]
            tally_type = "RDiffuse"
            name = "Rd"
            tally_second_moment = true
        "#);
        assert_eq!(input.n, 1000);
        assert_eq!(input.tissue, TissueInput::three_layer_slab());
        assert_eq!(input.tissue.layers[1].ops, OpticalProperties::new(0.01, 1.0, 0.8, 1.4));
        assert_eq!(input.detectors[1].name(), "Rd");
        assert_eq!(input.source.initial_tissue_region_index(), 1);
        input.validate().unwrap();
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut input = SimulationInput::one_layer_example();
        input.detectors.push(DetectorInput::new(TallyType::RDiffuse));
        let err = input.validate().unwrap_err();
        assert!(err.to_string().contains("'RDiffuse' used more than once"));
    }

    #[test]
    fn zero_photons_are_rejected() {
        let input = SimulationInput { n: 0, ..SimulationInput::one_layer_example() };
        assert!(input.validate().is_err());
    }

    #[test]
    fn post_processing_needs_databases() {
        let sim = SimulationInput::one_layer_example();
        let post = PostProcessorInput { output_name: "p".into(), detectors: vec![] };
        assert!(post.validate(&sim).is_err());
        let mut sim = sim;
        sim.options.databases = vec![DatabaseType::PhotonExit, DatabaseType::CollisionInfo];
        post.validate(&sim).unwrap();
        sim.options.absorption_weighting = AbsorptionWeighting::Analog;
        assert!(post.validate(&sim).is_err());
    }

    #[test]
    fn input_survives_a_trip_through_a_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("simulation.toml");
        let mut input = SimulationInput::one_layer_example();
        input.options.databases = vec![DatabaseType::PhotonExit];
        input.to_file(&path)?;
        assert_eq!(SimulationInput::from_file(&path)?, input);
        Ok(())
    }
}

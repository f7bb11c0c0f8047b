//! Monte Carlo simulation of light transport in layered tissue, with
//! perturbation and derivative post-processing of recorded photons.

mod error;
pub use error::{Error, Result};

pub mod rng;
pub mod optics;
pub mod tissue;
pub mod source;
pub mod photon;
pub mod boundary;
pub mod detector;
pub mod config;
pub mod database;
pub mod simulation;
pub mod postprocess;
pub mod io;
pub mod utils;

pub use config::{PostProcessorInput, SimulationInput};
pub use simulation::{run_many, Simulation, SimulationOutput};
pub use postprocess::PostProcessor;

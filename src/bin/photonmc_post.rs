/// Reweight the photon databases of a finished simulation
#[derive(Parser, Debug)]
#[command(name = "photonmc-post", about = "Perturbation Monte Carlo post-processing")]
struct Cli {
    /// Post-processor input file, listing pMC and dMC detectors
    input: PathBuf,

    /// Directory holding the photon exit and collision-info databases
    #[arg(short = 'd', long)]
    database: PathBuf,

    /// Input of the simulation which recorded the databases [default: <database>/simulation.toml]
    #[arg(short = 's', long)]
    simulation: Option<PathBuf>,

    /// Directory in which the `output_name` subdirectory is created
    #[arg(short, long, default_value = ".")]
    out: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Cli::parse();
    let mut progress = timing::Progress::new();

    progress.start("Reading inputs");
    let input = PostProcessorInput::from_file(&args.input)?;
    let simulation_path = args.simulation.clone().unwrap_or_else(|| args.database.join(SIMULATION_INPUT_FILE));
    let simulation = SimulationInput::from_file(&simulation_path)?;
    progress.done();

    progress.start("Reweighting recorded photons");
    let detectors = PostProcessor::new(&simulation, &input)?.run(&args.database)?;
    progress.done();

    let outdir = args.out.join(&input.output_name);
    progress.start(&format!("Writing {} detectors to {}", detectors.len(), outdir.display()));
    std::fs::create_dir_all(&outdir)?;
    for detector in &detectors {
        photonmc::io::detector::write(&outdir, detector)?;
    }
    progress.done();
    Ok(())
}

// ----- Imports -----------------------------------------------------------------------------------------
use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

use photonmc::{PostProcessor, PostProcessorInput, SimulationInput};
use photonmc::simulation::SIMULATION_INPUT_FILE;
use photonmc::utils::timing;

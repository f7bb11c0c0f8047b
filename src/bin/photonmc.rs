/// Run a photon transport simulation described by a TOML file
#[derive(Parser, Debug)]
#[command(name = "photonmc", about = "Monte Carlo light transport in layered tissue")]
struct Cli {
    /// Simulation input file
    input: PathBuf,

    /// Directory in which the `output_name` subdirectory is created
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Only check the input, then exit
    #[arg(long)]
    check: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Cli::parse();
    let mut progress = timing::Progress::new();

    progress.start("Reading input");
    let input = SimulationInput::from_file(&args.input)?;
    let outdir = args.out.join(&input.output_name);
    progress.done();

    progress.start("Building simulation");
    let simulation = Simulation::new(input)?.with_database_dir(&outdir);
    progress.done();
    if args.check { return Ok(()) }

    let n = simulation.input().n;
    let bar = ProgressBar::new(n);
    bar.set_style(ProgressStyle::default_bar()
                  .template("[{elapsed_precise}] {wide_bar} {pos}/{len} photons ({eta_precise})")?);
    let output = simulation.run_with_progress(|done| if done % 1000 == 0 || done == n { bar.set_position(done) })?;
    bar.finish();

    let a = &output.aggregates;
    println!("Rspecular {:.6}  Rdiffuse {:.6}  Tdiffuse {:.6}  Atotal {:.6}",
             a.specular, a.diffuse_reflectance, a.diffuse_transmittance, a.total_absorption);

    progress.start(&format!("Writing {} detectors to {}", output.detectors.len(), outdir.display()));
    output.write(&outdir)?;
    progress.done();
    Ok(())
}

// ----- Imports -----------------------------------------------------------------------------------------
use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use photonmc::{Simulation, SimulationInput};
use photonmc::utils::timing;

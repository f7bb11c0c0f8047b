use std::error::Error;
use std::path::PathBuf;
use clap::Parser;

/// Dump the records of a photon exit or collision-info database
#[derive(Parser, Debug)]
struct Args {
    /// Database file to parse
    file: PathBuf,

    /// Maximum number of records to show
    #[arg(short = 'n', long)]
    stop_after: Option<usize>,

    #[arg(value_enum, short = 't', long = "database-type", default_value_t = DatabaseType::Exit)]
    database_type: DatabaseType,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    match args.database_type {
        DatabaseType::Exit      => photondb::show_exits     (&args.file, args.stop_after)?,
        DatabaseType::Collision => photondb::show_collisions(&args.file, args.stop_after)?,
    }
    Ok(())
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum DatabaseType {
    Exit,
    Collision,
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseType::Exit      => f.write_str("exit"),
            DatabaseType::Collision => f.write_str("collision"),
        }
    }
}

//! Append-only binary databases of photon histories.
//!
//! Two files are written side by side during a simulation: the exit database
//! holds the final state of every terminated photon, and the collision-info
//! database holds, for the same photons in the same order, the path length
//! and number of collisions accumulated in every tissue region. Record N of
//! one file describes the same photon as record N of the other.

use std::fs::File;
use std::io::{BufReader, BufWriter, Seek};
use std::path::Path;

use binrw::{binrw, BinResult};

/// Bumped whenever a record layout changes
pub const FORMAT_VERSION: u32 = 1;

pub const EXIT_DATABASE: &str = "photonExitDatabase";
pub const COLLISION_DATABASE: &str = "collisionInfoDatabase";

// ----- Writing ----------------------------------------------------------------

pub(crate) struct Sink {
    file: BufWriter<File>,
    written: u64,
}

impl Sink {
    fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self { file: BufWriter::new(File::create(path)?), written: 0 })
    }

    fn finish(mut self) -> std::io::Result<u64> {
        use std::io::Write;
        self.file.flush()?;
        Ok(self.written)
    }
}

macro_rules! writer {
    ($name:ident $header:ident $record:ident) => {
        /// Sequential writer of one header followed by any number of records
        pub struct $name {
            sink: crate::Sink,
        }

        impl $name {
            pub fn create(path: impl AsRef<std::path::Path>, header: &$header) -> binrw::BinResult<Self> {
                let mut sink = crate::Sink::create(path)?;
                binrw::BinWrite::write_le(header, &mut sink.file)?;
                Ok(Self { sink })
            }

            pub fn write(&mut self, record: &$record) -> binrw::BinResult<()> {
                binrw::BinWrite::write_le(record, &mut self.sink.file)?;
                self.sink.written += 1;
                Ok(())
            }

            pub fn records_written(&self) -> u64 { self.sink.written }

            /// Flush buffered records and report how many were written.
            /// Dropping the writer also flushes, but swallows any error.
            pub fn finish(self) -> std::io::Result<u64> { self.sink.finish() }
        }
    };
}

// ----- Reading ----------------------------------------------------------------

pub(crate) struct Source {
    file: BufReader<File>,
    len: u64,
}

impl Source {
    fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self { file: BufReader::new(file), len })
    }

    fn exhausted(&mut self) -> bool {
        match self.file.stream_position() {
            Ok(position) => position >= self.len,
            Err(_) => true,
        }
    }
}

macro_rules! reader {
    ($name:ident $header:ident $record:ident) => {
        /// Iterates over the records of a database file, after checking its
        /// header
        pub struct $name {
            source: crate::Source,
            pub header: $header,
        }

        impl $name {
            pub fn open(path: impl AsRef<std::path::Path>) -> binrw::BinResult<Self> {
                let mut source = crate::Source::open(path)?;
                let header: $header = binrw::BinReaderExt::read_le(&mut source.file)?;
                Ok(Self { source, header })
            }
        }

        impl Iterator for $name {
            type Item = binrw::BinResult<$record>;
            fn next(&mut self) -> Option<Self::Item> {
                if self.source.exhausted() { return None }
                Some(binrw::BinReaderExt::read_le(&mut self.source.file))
            }
        }
    };
}

pub mod exit;
pub mod collision;

pub use exit::{ExitHeader, ExitRecord};
pub use collision::{CollisionHeader, CollisionRecord, SubRegionRecord};

#[binrw]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point192 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

// ----- Inspection -------------------------------------------------------------

pub fn show_exits(file: impl AsRef<Path>, stop_after: Option<usize>) -> BinResult<()> {
    let reader = exit::Reader::open(file)?;
    println!("exit database, format version {}", reader.header.version);
    for (count, record) in reader.enumerate() {
        if let Some(stop) = stop_after { if count >= stop { break } }
        let ExitRecord { position: Point192 { x, y, z }, direction: Point192 { x: ux, y: uy, z: uz }, weight, total_time, state } = record?;
        println!("{count:6}  ({x:8.3} {y:8.3} {z:8.3})  ({ux:6.3} {uy:6.3} {uz:6.3})  w:{weight:8.6}  t:{total_time:8.4} ns  state:{state:#06x}");
    }
    Ok(())
}

pub fn show_collisions(file: impl AsRef<Path>, stop_after: Option<usize>) -> BinResult<()> {
    let reader = collision::Reader::open(file)?;
    println!("collision-info database, {} subregions", reader.header.n_subregions);
    for (count, record) in reader.enumerate() {
        if let Some(stop) = stop_after { if count >= stop { break } }
        let record = record?;
        let cells = record.subregions.iter()
            .map(|SubRegionRecord { path_length, collisions }| format!("{path_length:9.3} mm /{collisions:6}"))
            .collect::<Vec<_>>()
            .join(" | ");
        println!("{count:6}  {cells}");
    }
    Ok(())
}

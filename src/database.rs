//! Recording photon exits and per-region collision summaries while a
//! simulation runs, and reading them back for post-processing.
//!
//! Recording is best effort: a writer which fails is reported and dropped,
//! and the simulation carries on without it.

use std::path::Path;

use log::{info, warn};
use photondb::{collision, exit, CollisionHeader, CollisionRecord, ExitHeader, ExitRecord,
               Point192, SubRegionRecord, COLLISION_DATABASE, EXIT_DATABASE, FORMAT_VERSION};

use crate::config::DatabaseType;
use crate::error::{Error, Result};
use crate::photon::{Photon, PhotonHistory, PhotonState, SubRegionInfo};
use geometry::{Direction, Point};

#[derive(Default)]
pub struct DatabaseWriters {
    exit: Option<exit::Writer>,
    collision: Option<collision::Writer>,
    collision_record: CollisionRecord,
}

impl DatabaseWriters {

    pub fn open(dir: &Path, types: &[DatabaseType], n_regions: usize) -> Self {
        let mut writers = Self::default();
        if types.is_empty() { return writers }
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!("Cannot create database directory {}: {e}", dir.display());
            return writers
        }
        if types.contains(&DatabaseType::PhotonExit) {
            let path = dir.join(EXIT_DATABASE);
            writers.exit = exit::Writer::create(&path, &ExitHeader { version: FORMAT_VERSION })
                .map_err(|e| warn!("Not recording photon exits to {}: {e}", path.display()))
                .ok();
        }
        if types.contains(&DatabaseType::CollisionInfo) {
            let path = dir.join(COLLISION_DATABASE);
            let header = CollisionHeader { n_subregions: n_regions as u32 };
            writers.collision = collision::Writer::create(&path, &header)
                .map_err(|e| warn!("Not recording collision info to {}: {e}", path.display()))
                .ok();
        }
        writers
    }

    pub fn write(&mut self, photon: &Photon) {
        if let Some(writer) = &mut self.exit {
            if let Err(e) = writer.write(&exit_record(photon)) {
                warn!("Photon exit database write failed, recording stopped: {e}");
                self.exit = None;
            }
        }
        if let Some(writer) = &mut self.collision {
            self.collision_record.subregions.clear();
            self.collision_record.subregions.extend(photon.history.sub_regions.iter().map(|s| SubRegionRecord {
                path_length: s.path_length,
                collisions: s.collisions,
            }));
            if let Err(e) = writer.write(&self.collision_record) {
                warn!("Collision info database write failed, recording stopped: {e}");
                self.collision = None;
            }
        }
    }

    pub fn finish(self) {
        for (name, result) in [
            ("photon exit",    self.exit     .map(exit::Writer::finish)),
            ("collision info", self.collision.map(collision::Writer::finish)),
        ] {
            match result {
                Some(Ok(n))  => info!("Wrote {n} records to {name} database"),
                Some(Err(e)) => warn!("Could not flush {name} database: {e}"),
                None         => {}
            }
        }
    }
}

fn exit_record(photon: &Photon) -> ExitRecord {
    let dp = &photon.dp;
    ExitRecord {
        position:  Point192 { x: dp.position.x,   y: dp.position.y,   z: dp.position.z   },
        direction: Point192 { x: dp.direction.ux, y: dp.direction.uy, z: dp.direction.uz },
        weight: dp.weight,
        total_time: dp.total_time,
        state: dp.state.0,
    }
}

/// Load one recorded photon into `photon`. Its trajectory is not recorded,
/// only its exit state and per-region totals.
pub fn replay(photon: &mut Photon, exit: &ExitRecord, collisions: &CollisionRecord) {
    let ExitRecord { position: p, direction: d, weight, total_time, state } = *exit;
    photon.restart(Point::new(p.x, p.y, p.z), Direction::new(d.x, d.y, d.z), weight, 0);
    photon.dp.total_time = total_time;
    photon.dp.state = PhotonState(state);
    let PhotonHistory { sub_regions, trajectory } = &mut photon.history;
    trajectory.clear();
    for (info, record) in sub_regions.iter_mut().zip(&collisions.subregions) {
        *info = SubRegionInfo { path_length: record.path_length, collisions: record.collisions, momentum_transfer: 0.0 };
    }
}

/// Both databases of a recorded simulation, read in step. One file running
/// out before the other is an error.
pub struct DatabaseReader {
    exits: exit::Reader,
    collisions: collision::Reader,
}

impl DatabaseReader {
    pub fn open(dir: &Path) -> Result<Self> {
        Ok(Self {
            exits:      exit::Reader::open(dir.join(EXIT_DATABASE))?,
            collisions: collision::Reader::open(dir.join(COLLISION_DATABASE))?,
        })
    }

    pub fn n_subregions(&self) -> usize { self.collisions.header.n_subregions as usize }
}

impl Iterator for DatabaseReader {
    type Item = Result<(ExitRecord, CollisionRecord)>;
    fn next(&mut self) -> Option<Self::Item> {
        match (self.exits.next(), self.collisions.next()) {
            (Some(Ok(e)), Some(Ok(c))) => Some(Ok((e, c))),
            (Some(Err(e)), _) | (_, Some(Err(e))) => Some(Err(e.into())),
            (None, None) => None,
            (Some(_), None) | (None, Some(_)) => Some(Err(Error::validation(
                format!("{EXIT_DATABASE} and {COLLISION_DATABASE} hold different numbers of photons"),
                "Re-run the simulation to record both databases again"))),
        }
    }
}

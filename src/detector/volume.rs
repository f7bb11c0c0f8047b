//! Tallies over a photon's whole walk, made once it has died.
//!
//! Under discrete and analog weighting the estimators are collisional: each
//! real collision scores the weight absorbed there and `w/μt` towards the
//! fluence. Under continuous weighting each segment scores the weight lost
//! along it and that loss over `μa` (or `w·s` in a non-absorbing region).

use super::{Binned, Histogram};
use crate::photon::{Event, Photon};
use crate::tissue::{AbsorptionWeighting, Tissue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Quantity {
    Absorption,
    /// Fluence, and radiance when direction is binned too
    Fluence,
}

pub(super) fn tally(quantity: Quantity, binned: &mut Binned, h: &mut Histogram<f64>, photon: &Photon, tissue: &Tissue) {
    let continuous = tissue.weighting() == AbsorptionWeighting::Continuous;
    for point in &photon.history.trajectory {
        let value = match (quantity, continuous) {
            (_, false) if point.event != Event::Collision => continue,
            (Quantity::Absorption, _) => point.absorbed,
            (Quantity::Fluence, false) => point.weight / tissue.ops(point.region).mut_(),
            (Quantity::Fluence, true) => {
                let mua = tissue.ops(point.region).mua;
                if mua > 0.0 { point.absorbed / mua } else { point.weight * point.step }
            }
        };
        if value == 0.0 { continue }
        if let Some(index) = binned.locate(&point.position, &point.direction, point.total_time) {
            h.add(index, value);
        }
    }
}

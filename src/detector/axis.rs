use std::f64::consts::TAU;

use ndhistogram::axis::{Axis, BinInterval};

use super::input::Bins;

/// Runtime binning along one detector axis
#[derive(Debug, Clone, PartialEq)]
pub enum Binning {
    /// `nbins` contiguous bins of width `delta` from `start`; out-of-range
    /// values are clamped into the first or last bin
    Uniform { start: f64, delta: f64, nbins: usize },
    /// Possibly disjoint bins of common `width`; out-of-range values have no bin
    Centres { centres: Vec<f64>, width: f64 },
    /// A list of values at which a quantity is evaluated rather than binned
    Points(Vec<f64>),
}

impl Binning {
    pub fn new(bins: &Bins) -> Self {
        match bins {
            &Bins::Uniform { start, stop, count } => Binning::Uniform {
                start,
                delta: (stop - start) / (count - 1) as f64,
                nbins: count - 1,
            },
            Bins::Centres { centres, width } => Binning::Centres { centres: centres.clone(), width: *width },
        }
    }

    /// `count` evenly spaced values from `start` to `stop` inclusive, or the
    /// listed centres
    pub fn points(bins: &Bins) -> Self {
        match bins {
            &Bins::Uniform { start, count: 1, .. } => Binning::Points(vec![start]),
            &Bins::Uniform { start, stop, count } => {
                let delta = (stop - start) / (count - 1) as f64;
                Binning::Points((0..count).map(|i| start + i as f64 * delta).collect())
            }
            Bins::Centres { centres, .. } => Binning::Points(centres.clone()),
        }
    }

    pub fn centre(&self, index: usize) -> f64 {
        match self {
            Binning::Uniform { start, delta, .. } => start + (index as f64 + 0.5) * delta,
            Binning::Centres { centres, .. }      => centres[index],
            Binning::Points(values)               => values[index],
        }
    }

    pub fn width(&self, _index: usize) -> f64 {
        match self {
            Binning::Uniform { delta, .. } => *delta,
            Binning::Centres { width, .. } => *width,
            Binning::Points(_)             => 1.0,
        }
    }

    pub fn centres(&self) -> Vec<f64> { (0..self.num_bins()).map(|i| self.centre(i)).collect() }

    pub fn widths(&self) -> Vec<f64> { (0..self.num_bins()).map(|i| self.width(i)).collect() }

    /// Annular area of each ring: 2πρΔρ
    pub fn ring_areas(&self) -> Vec<f64> {
        (0..self.num_bins()).map(|i| TAU * self.centre(i) * self.width(i)).collect()
    }

    /// Solid angle of each cone shell: 2π sinθ Δθ
    pub fn cone_solid_angles(&self) -> Vec<f64> {
        self.polar_weights().into_iter().map(|w| TAU * w).collect()
    }

    /// sinθ Δθ
    pub fn polar_weights(&self) -> Vec<f64> {
        (0..self.num_bins()).map(|i| self.centre(i).sin() * self.width(i)).collect()
    }
}

impl Axis for Binning {
    type Coordinate = f64;
    type BinInterval = BinInterval<f64>;

    fn index(&self, coordinate: &f64) -> Option<usize> {
        match self {
            Binning::Uniform { start, delta, nbins } => {
                let bin = ((coordinate - start) / delta).floor();
                Some(if bin < 0.0 || bin.is_nan() { 0 } else { (bin as usize).min(nbins - 1) })
            }
            Binning::Centres { centres, width } => {
                let half = width / 2.0;
                centres.iter().position(|c| c - half < *coordinate && *coordinate < c + half)
            }
            Binning::Points(_) => None,
        }
    }

    fn num_bins(&self) -> usize {
        match self {
            Binning::Uniform { nbins, .. } => *nbins,
            Binning::Centres { centres, .. } => centres.len(),
            Binning::Points(values) => values.len(),
        }
    }

    fn bin(&self, index: usize) -> Option<Self::BinInterval> {
        if index >= self.num_bins() { return None }
        let (c, w) = (self.centre(index), self.width(index));
        Some(match self {
            Binning::Points(_) => BinInterval::new(c, c),
            _                  => BinInterval::new(c - w / 2.0, c + w / 2.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use rstest::rstest;

    #[rstest(/**/ value, expected,
             case(-1.0,   0),
             case( 0.0,   0),
             case( 0.99,  0),
             case( 1.0,   1),
             case( 9.5,   9),
             case(10.0,   9),
             case(1e10,   9),
             case(f64::NAN, 0),
    )]
    fn uniform_bins_clamp(value: f64, expected: usize) {
        let axis = Binning::new(&Bins::uniform(0.0, 10.0, 11));
        assert_eq!(axis.num_bins(), 10);
        assert_eq!(axis.index(&value), Some(expected));
    }

    #[rstest(/**/ value, expected,
             case(0.95, Some(0)),
             case(2.0,  Some(1)),
             case(1.5,  None),
             case(0.9,  None), // edges belong to no bin
             case(9.0,  None),
    )]
    fn centred_bins_drop_strays(value: f64, expected: Option<usize>) {
        let axis = Binning::new(&Bins::centres(vec![1.0, 2.0], 0.2));
        assert_eq!(axis.index(&value), expected);
    }

    #[test]
    fn bin_intervals() {
        let axis = Binning::new(&Bins::uniform(0.0, 1.0, 5));
        assert_eq!(axis.bin(0), Some(BinInterval::new(0.00, 0.25)));
        assert_eq!(axis.bin(3), Some(BinInterval::new(0.75, 1.00)));
        assert_eq!(axis.bin(4), None);
    }

    #[test]
    fn frequency_points_include_both_ends() {
        let axis = Binning::points(&Bins::uniform(0.0, 1.0, 5));
        assert_eq!(axis.num_bins(), 5);
        assert_eq!(axis.centres(), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(axis.index(&0.25), None);
        assert_eq!(Binning::points(&Bins::uniform(0.1, 0.1, 1)).centres(), vec![0.1]);
        assert_eq!(Binning::points(&Bins::centres(vec![0.2], 0.0)).centres(), vec![0.2]);
    }

    #[test]
    fn ring_area_of_first_bin() {
        let axis = Binning::new(&Bins::uniform(0.0, 10.0, 11));
        assert_float_eq!(axis.ring_areas()[0], TAU * 0.5 * 1.0, ulps <= 1);
    }
}

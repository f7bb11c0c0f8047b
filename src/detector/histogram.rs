use std::ops::{AddAssign, DivAssign, Mul};

use ndarray::{ArrayD, IxDyn};
use num_complex::Complex64;
use num_traits::Zero;

use crate::error::Result;

/// What a histogram can accumulate: real weights, or complex phasors
pub trait Value: Copy + Zero + AddAssign + Mul<Output = Self> + DivAssign<f64> + PartialEq + Send + 'static {}
impl Value for f64 {}
impl Value for Complex64 {}

/// Dense row-major accumulator over the cartesian product of a detector's
/// axes, with optional second moment.
///
/// The second moment is the sum over photons of the square of each photon's
/// total contribution to a bin, so contributions are gathered per photon and
/// squared by `end_photon`.
#[derive(Debug, Clone)]
pub struct Histogram<T> {
    dims: Vec<usize>,
    factors: Vec<Vec<f64>>,
    mean: Vec<T>,
    second: Option<SecondMoment<T>>,
}

#[derive(Debug, Clone)]
struct SecondMoment<T> {
    sum: Vec<T>,
    photon: Vec<T>,
    touched: Vec<usize>,
}

impl<T: Value> Histogram<T> {

    /// `factors[axis][bin]` is the geometric normalization of each bin along
    /// each axis; its lengths fix the dimensions
    pub fn new(factors: Vec<Vec<f64>>, second_moment: bool) -> Self {
        let dims: Vec<usize> = factors.iter().map(Vec::len).collect();
        let size = dims.iter().product();
        let second = second_moment.then(|| SecondMoment {
            sum:    vec![T::zero(); size],
            photon: vec![T::zero(); size],
            touched: vec![],
        });
        Self { dims, factors, mean: vec![T::zero(); size], second }
    }

    /// Unit normalization along axes of the given sizes
    pub fn unnormalized(dims: &[usize], second_moment: bool) -> Self {
        Self::new(dims.iter().map(|&n| vec![1.0; n]).collect(), second_moment)
    }

    pub fn dims(&self) -> &[usize] { &self.dims }

    fn flat(&self, index: &[usize]) -> usize {
        index.iter().zip(&self.dims).fold(0, |acc, (i, n)| acc * n + i)
    }

    pub fn add(&mut self, index: &[usize], value: T) {
        let i = self.flat(index);
        self.mean[i] += value;
        if let Some(second) = &mut self.second {
            if second.photon[i] == T::zero() { second.touched.push(i) }
            second.photon[i] += value;
        }
    }

    /// Fold the contributions of the photon just tallied into the second moment
    pub fn end_photon(&mut self) {
        if let Some(SecondMoment { sum, photon, touched }) = &mut self.second {
            for i in touched.drain(..) {
                let x = photon[i];
                sum[i] += x * x;
                photon[i] = T::zero();
            }
        }
    }

    pub fn get(&self, index: &[usize]) -> T { self.mean[self.flat(index)] }

    pub fn values(&self) -> &[T] { &self.mean }

    pub fn second_moment_values(&self) -> Option<&[T]> { self.second.as_ref().map(|s| s.sum.as_slice()) }

    /// Product over axes of each bin's factor, in row-major order
    fn bin_factors(&self) -> Vec<f64> {
        self.factors.iter().fold(vec![1.0], |outer, axis| {
            outer.iter().flat_map(|a| axis.iter().map(move |b| a * b)).collect()
        })
    }

    /// Turn sums into per-photon, per-unit-bin estimates. Bins with zero
    /// geometric factor are only divided by `n`.
    pub fn normalize(&mut self, n: f64) {
        let factors = self.bin_factors();
        for (m, f) in self.mean.iter_mut().zip(&factors) {
            *m /= if *f == 0.0 { n } else { f * n };
        }
        if let Some(second) = &mut self.second {
            for (m, f) in second.sum.iter_mut().zip(&factors) {
                *m /= if *f == 0.0 { n } else { f * f * n };
            }
        }
    }

    pub fn mean_array(&self) -> Result<ArrayD<T>> {
        Ok(ArrayD::from_shape_vec(IxDyn(&self.dims), self.mean.clone())?)
    }

    pub fn second_moment_array(&self) -> Result<Option<ArrayD<T>>> {
        Ok(match &self.second {
            None => None,
            Some(s) => Some(ArrayD::from_shape_vec(IxDyn(&self.dims), s.sum.clone())?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn second_moment_squares_per_photon_totals() {
        let mut h = Histogram::<f64>::unnormalized(&[2, 3], true);
        h.add(&[1, 2], 0.5);
        h.add(&[1, 2], 0.25);
        h.add(&[0, 0], 1.0);
        h.end_photon();
        h.add(&[1, 2], 1.0);
        h.end_photon();
        assert_eq!(h.get(&[1, 2]), 1.75);
        let m2 = h.second_moment_array().unwrap().unwrap();
        assert_eq!(m2[[1, 2]], 0.75 * 0.75 + 1.0);
        assert_eq!(m2[[0, 0]], 1.0);
        assert_eq!(m2[[0, 1]], 0.0);
    }

    #[test]
    fn normalization_multiplies_axis_factors() {
        let mut h = Histogram::<f64>::new(vec![vec![1.0, 2.0], vec![3.0, 0.0]], true);
        for i in 0..2 { for j in 0..2 { h.add(&[i, j], 12.0); } }
        h.end_photon();
        h.normalize(2.0);
        let mean = h.mean_array().unwrap();
        assert_float_eq!(mean[[0, 0]], 2.0, ulps <= 1);
        assert_float_eq!(mean[[1, 0]], 1.0, ulps <= 1);
        assert_float_eq!(mean[[1, 1]], 6.0, ulps <= 1); // zero factor skipped
        let m2 = h.second_moment_array().unwrap().unwrap();
        assert_float_eq!(m2[[1, 0]], 144.0 / (36.0 * 2.0), ulps <= 1);
    }

    #[test]
    fn scalar_histogram() {
        let mut h = Histogram::<Complex64>::unnormalized(&[], true);
        h.add(&[], Complex64::new(0.0, 1.0));
        h.end_photon();
        assert_eq!(h.dims(), &[] as &[usize]);
        assert_eq!(h.second_moment_values().unwrap(), &[Complex64::new(-1.0, 0.0)]);
    }
}

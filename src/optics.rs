use serde::{Deserialize, Serialize};
use units::{PerLengthf64, Ratiof64};

// Cosine of an angle within 1e-6 rad of 90°
pub const COS90D: f64 = 1.0e-6;
// Cosine of an angle within 1e-6 rad of 0°
pub const COSZERO: f64 = 1.0 - 1.0e-12;

/// Bulk optical properties of one tissue region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpticalProperties {
    /// Absorption coefficient, per mm
    pub mua: PerLengthf64,
    /// Reduced scattering coefficient, per mm
    pub musp: PerLengthf64,
    /// Scattering anisotropy
    pub g: Ratiof64,
    /// Refractive index
    pub n: Ratiof64,
}

impl OpticalProperties {
    pub fn new(mua: f64, musp: f64, g: f64, n: f64) -> Self { Self { mua, musp, g, n } }

    /// Scattering coefficient. With g = 1 scattering is purely forward and
    /// the reduced coefficient is taken as is.
    pub fn mus(&self) -> PerLengthf64 {
        if self.g == 1.0 { self.musp } else { self.musp / (1.0 - self.g) }
    }

    pub fn mut_(&self) -> PerLengthf64 { self.mua + self.mus() }

    /// Build from μs rather than μs′
    pub fn from_mus(mua: f64, mus: f64, g: f64, n: f64) -> Self {
        let musp = if g == 1.0 { mus } else { mus * (1.0 - g) };
        Self { mua, musp, g, n }
    }

    pub fn is_valid(&self) -> bool {
        self.mua >= 0.0 && self.musp >= 0.0 && (-1.0..=1.0).contains(&self.g) && self.n > 0.0
            && [self.mua, self.musp, self.g, self.n].iter().all(|x| x.is_finite())
    }
}

/// Fraction of normally incident light reflected by the interface between
/// media of indices `n1` and `n2`
pub fn specular(n1: f64, n2: f64) -> f64 {
    let r = (n1 - n2) / (n1 + n2);
    r * r
}

/// Fresnel reflectance for unpolarized light arriving at an interface from
/// index `n1` into `n2`, with `cos_i` the cosine of the angle of incidence.
/// Returns the reflectance together with the cosine of the transmission
/// angle.
pub fn fresnel(n1: f64, n2: f64, cos_i: f64) -> (f64, f64) {
    let cos_i = cos_i.abs();
    if n1 == n2 { return (0.0, cos_i) }
    if cos_i > COSZERO { return (specular(n1, n2), cos_i) }
    if cos_i < COS90D  { return (1.0, 0.0) }

    let sin_i = (1.0 - cos_i * cos_i).sqrt();
    let sin_t = n1 * sin_i / n2;
    if sin_t >= 1.0 { return (1.0, 0.0) } // total internal reflection
    let cos_t = (1.0 - sin_t * sin_t).sqrt();

    let rs = (n1 * cos_i - n2 * cos_t) / (n1 * cos_i + n2 * cos_t);
    let rp = (n1 * cos_t - n2 * cos_i) / (n1 * cos_t + n2 * cos_i);
    (0.5 * (rs * rs + rp * rp), cos_t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest(/**/ mua,  musp,   g,   mus,
             case(0.01,  1.0,  0.8,  5.0),
             case(0.0,   1.0,  0.0,  1.0),
             case(0.0, 1e-10,  1.0, 1e-10),
    )]
    fn scattering_coefficient(mua: f64, musp: f64, g: f64, mus: f64) {
        let ops = OpticalProperties::new(mua, musp, g, 1.4);
        assert_float_eq!(ops.mus(), mus, rmax <= 1e-14);
        assert_float_eq!(ops.mut_(), mua + mus, rmax <= 1e-14);
    }

    #[test]
    fn normal_incidence_is_specular() {
        let (r, cos_t) = fresnel(1.4, 1.0, 1.0);
        assert_float_eq!(r, specular(1.4, 1.0), ulps <= 1);
        assert_eq!(cos_t, 1.0);
        assert_float_eq!(specular(1.0, 1.4), (0.4 / 2.4_f64).powi(2), rmax <= 1e-15);
    }

    #[test]
    fn matched_indices_never_reflect() {
        assert_eq!(fresnel(1.4, 1.4, 0.3), (0.0, 0.3));
    }

    #[test]
    fn total_internal_reflection() {
        // Critical angle for 1.4 -> 1.0 is about 45.6°
        let cos_i = 60.0_f64.to_radians().cos();
        assert_eq!(fresnel(1.4, 1.0, cos_i), (1.0, 0.0));
    }

    proptest! {
        #[test]
        fn reflectance_is_a_probability(
            n1    in 1.0 .. 2.0_f64,
            n2    in 1.0 .. 2.0_f64,
            cos_i in 0.0 .. 1.0_f64,
        ) {
            let (r, cos_t) = fresnel(n1, n2, cos_i);
            prop_assert!((0.0..=1.0).contains(&r));
            prop_assert!((0.0..=1.0).contains(&cos_t));
        }
    }
}

//! Physical units for light transport in tissue.
//!
//! Lengths are measured in millimetres and times in nanoseconds, so the base
//! system is built on those two units: the `value` stored in every quantity
//! is directly the number a tissue optics user expects to read.

mod plain;
pub use plain::*;

pub use uom;
pub use uom::si::Quantity;

pub mod mmns {

  use uom::si::{
    length::millimeter,
    mass::kilogram,
    time::nanosecond,
    electric_current::ampere,
    thermodynamic_temperature::kelvin,
    amount_of_substance::mole,
    luminous_intensity::candela,
  };

  // TODO: replace with system! macro, once it has been fixed in uom
  #[allow(unused)]
  type Units = dyn uom::si::Units<
      f64,
    length                    = millimeter,
    mass                      = kilogram,
    time                      = nanosecond,
    electric_current          = ampere,
    thermodynamic_temperature = kelvin,
    amount_of_substance       = mole,
    luminous_intensity        = candela>;

  pub mod f64 {
    use uom::{ISQ, system};
    ISQ!(uom::si, f64, (millimeter, kilogram, nanosecond, ampere, kelvin, mole, candela));

    /// The full circle constant (τ) Equal to 2π.
    pub const TWOPI: Angle = Angle {
      dimension: std::marker::PhantomData,
      units: std::marker::PhantomData,
      value: std::f64::consts::TAU,
    };

    /// Speed of light in vacuum. Stored in the base units, mm/ns.
    pub const C: Velocity = Velocity {
      dimension: std::marker::PhantomData,
      units: std::marker::PhantomData,
      value: 299.792_458,
    };
  }

}

pub use mmns::f64::{Angle, Frequency, Length, Ratio, Time, Velocity, C, TWOPI};

mod units {
  pub use uom::si::{length   ::{micrometer, millimeter, centimeter},
                    time     ::{nanosecond, picosecond},
                    frequency::{gigahertz, megahertz},
                    velocity ::meter_per_second,
                    ratio    ::ratio,
                    angle    ::{radian, degree},
  };
}

/// Generate a function called NAME which returns QUANTITY by interpreting its
/// argument as UNIT
///
/// wrap!(NAME QUANTITY UNIT);
macro_rules! wrap {
  ($name:ident $quantity:ident $unit:ident ) => {
    pub fn $name(x: f64) -> $quantity { $quantity::new::<units::$unit>(x) }
  };
}

wrap!(um     Length                  micrometer);
wrap!(mm     Length                  millimeter);
wrap!(cm     Length                  centimeter);
wrap!(ns     Time                    nanosecond);
wrap!(ps     Time                    picosecond);
wrap!(ghz    Frequency                gigahertz);
wrap!(mhz    Frequency                megahertz);
wrap!(m_s    Velocity          meter_per_second);
wrap!(ratio  Ratio                        ratio);
wrap!(radian Angle                       radian);
wrap!(degree Angle                       degree);

// Reverse direction of the above
pub fn mm_    (x: Length   ) -> f64 { x.get::<units::millimeter>() }
pub fn ns_    (x: Time     ) -> f64 { x.get::<units::nanosecond>() }
pub fn ps_    (x: Time     ) -> f64 { x.get::<units::picosecond>() }
pub fn ghz_   (x: Frequency) -> f64 { x.get::<units::gigahertz>() }
pub fn m_s_   (x: Velocity ) -> f64 { x.get::<units::meter_per_second>() }
pub fn ratio_ (x: Ratio    ) -> f64 { x.get::<units::ratio>() }
pub fn radian_(x: Angle    ) -> f64 { x.get::<units::radian>() }
pub fn degree_(x: Angle    ) -> f64 { x.get::<units::degree>() }

// One mm/ns is a million m/s
pub fn mm_ns (x: f64     ) -> Velocity { m_s(x * 1e6) }
pub fn mm_ns_(x: Velocity) -> f64      { m_s_(x) / 1e6 }

/// Time taken to travel `path` through a medium of refractive index `n`.
pub fn time_delay(path: Length, n: f64) -> Time { path * n / C }

/// Phase accumulated by a signal modulated at `frequency` over `time`, in
/// radians.
pub fn phase(frequency: Frequency, time: Time) -> f64 {
  radian_(TWOPI) * ratio_(frequency * time)
}

#[macro_export]
macro_rules! in_base_unit {
  ($value:expr) => {
    $crate::Quantity {
      dimension: std::marker::PhantomData,
      units: std::marker::PhantomData,
      value: $value,
    }
  };
}

#[macro_export]
macro_rules! assert_uom_eq {
  ($unit:ident, $lhs:expr, $rhs:expr, $algo:ident <= $tol:expr) => {
    float_eq::assert_float_eq!($lhs.get::<$unit>(), $rhs.get::<$unit>(), $algo <= $tol)
  };
}

#[cfg(test)]
mod tests {
  use super::*;
  use float_eq::assert_float_eq;
  use rstest::rstest;

  #[test]
  fn base_units_are_mm_and_ns() {
    assert_eq!(mm(12.5).value, 12.5);
    assert_eq!(ns(0.25).value, 0.25);
    assert_float_eq!(cm(1.0).value, 10.0, ulps <= 1);
    assert_float_eq!(ps(1000.0).value, 1.0, ulps <= 1);
  }

  #[test]
  fn speed_of_light_in_other_units() {
    use units::meter_per_second;
    assert_uom_eq!(meter_per_second, C, m_s(299_792_458.0), rmax <= 1e-14);
    assert_float_eq!(mm_ns_(C), 299.792_458, rmax <= 1e-14);
    assert_float_eq!(mm_ns(1.0).value, 1.0, rmax <= 1e-14);
  }

  #[rstest(/**/ path,   n,   expected_ns,
           case(  0.0, 1.0,  0.0),
           case(299.792_458, 1.0, 1.0),
           case(299.792_458, 1.4, 1.4),
           case( 10.0, 1.33, 10.0 * 1.33 / 299.792_458),
  )]
  fn time_delay_through_medium(path: f64, n: f64, expected_ns: f64) {
    assert_float_eq!(ns_(time_delay(mm(path), n)), expected_ns, rmax <= 1e-14);
  }

  #[test]
  fn phase_of_one_cycle() {
    // 1 GHz over 1 ns is a full cycle
    assert_float_eq!(phase(ghz(1.0), ns(1.0)), std::f64::consts::TAU, rmax <= 1e-14);
    assert_float_eq!(phase(mhz(500.0), ns(1.0)), std::f64::consts::PI, rmax <= 1e-14);
  }
}

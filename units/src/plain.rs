/// Quantities which travel through the transport loop as bare `f64`s rather
/// than as `uom` `Quantity`s.
///
/// The stepper touches these on every free flight, so they stay plain, but
/// the aliases still record what each number means and in which unit it is
/// expressed.

/// Millimetres
pub type Lengthf64 = f64;
/// Nanoseconds
pub type Timef64 = f64;
/// Per millimetre: absorption and scattering coefficients
pub type PerLengthf64 = f64;
/// Photon packet weight, in [0, 1] for an unperturbed photon
pub type Weightf64 = f64;
/// Dimensionless: refractive index, anisotropy, cosines, fractions
pub type Ratiof64 = f64;
/// Radians
pub type Anglef64 = f64;
/// Gigahertz
pub type Frequencyf64 = f64;

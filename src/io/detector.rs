//! Detector results on disk.
//!
//! Each detector `<name>` is stored as
//!
//! + `<name>.toml`: metadata (dimensions, flags, and the detector input)
//! + `<name>`: the mean, flat little-endian `f64` in row-major order, with
//!   complex values interleaved as (re, im)
//! + `<name>_2`: the second moment, if tallied
//! + `<name>_<Extra>`: each auxiliary array

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::detector::{DetectorInput, DetectorOutput, Values};
use crate::error::Result;

use super::raw;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Metadata {
    name: String,
    dims: Vec<usize>,
    complex: bool,
    second_moment: bool,
    tally_count: u64,
    #[serde(default)]
    extras: Vec<ExtraMetadata>,
    input: DetectorInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ExtraMetadata {
    name: String,
    dims: Vec<usize>,
}

fn path(dir: &Path, name: &str, suffix: &str) -> PathBuf { dir.join(format!("{name}{suffix}")) }

pub fn write(dir: &Path, detector: &DetectorOutput) -> Result<()> {
    let name = &detector.name;
    let metadata = Metadata {
        name: name.clone(),
        dims: detector.mean.shape().to_vec(),
        complex: matches!(detector.mean, Values::Complex(_)),
        second_moment: detector.second_moment.is_some(),
        tally_count: detector.tally_count,
        extras: detector.extras.iter()
            .map(|(extra, a)| ExtraMetadata { name: extra.clone(), dims: a.shape().to_vec() })
            .collect(),
        input: detector.input.clone(),
    };
    // Going through `toml::Value` emits plain keys before tables
    fs::write(path(dir, name, ".toml"), toml::to_string(&toml::Value::try_from(&metadata)?)?)?;

    write_values(&path(dir, name, ""), &detector.mean)?;
    if let Some(second) = &detector.second_moment {
        write_values(&path(dir, name, "_2"), second)?;
    }
    for (extra, array) in &detector.extras {
        raw::write_real(&path(dir, name, &format!("_{extra}")), array.iter().copied())?;
    }
    Ok(())
}

fn write_values(file: &Path, values: &Values) -> Result<()> {
    match values {
        Values::Real(a)    => raw::write_real(file, a.iter().copied()),
        Values::Complex(a) => raw::write_complex(file, a.iter().copied()),
    }
}

/// Load the detector called `name` from `dir`
pub fn read(dir: &Path, name: &str) -> Result<DetectorOutput> {
    let metadata: Metadata = toml::from_str(&fs::read_to_string(path(dir, name, ".toml"))?)?;
    let Metadata { dims, complex, second_moment, tally_count, extras, input, .. } = metadata;

    let mean = read_values(&path(dir, name, ""), &dims, complex)?;
    let second_moment = if second_moment {
        Some(read_values(&path(dir, name, "_2"), &dims, complex)?)
    } else { None };
    let extras = extras.into_iter()
        .map(|ExtraMetadata { name: extra, dims }| {
            let array = read_array(&path(dir, name, &format!("_{extra}")), &dims)?;
            Ok((extra, array))
        })
        .collect::<Result<_>>()?;

    Ok(DetectorOutput { name: name.into(), input, mean, second_moment, extras, tally_count })
}

fn read_values(file: &Path, dims: &[usize], complex: bool) -> Result<Values> {
    if !complex { return Ok(Values::Real(read_array(file, dims)?)) }
    let data = raw::read_complex(file, dims.iter().product())?;
    Ok(Values::Complex(ArrayD::from_shape_vec(IxDyn(dims), data)?))
}

fn read_array(file: &Path, dims: &[usize]) -> Result<ArrayD<f64>> {
    let data = raw::read_real(file, dims.iter().product())?;
    Ok(ArrayD::from_shape_vec(IxDyn(dims), data)?)
}

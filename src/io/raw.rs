//! Payload of a detector file: the bins in row-major order as little-endian
//! `f64`, complex bins as consecutive (re, im) pairs. There is no header; the
//! number of bins comes from the accompanying metadata.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use num_complex::Complex64;

use crate::error::{ensure, Result};

const F64_BYTES: usize = std::mem::size_of::<f64>();

pub fn write_real(path: &Path, values: impl IntoIterator<Item = f64>) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for v in values {
        out.write_all(&v.to_le_bytes())?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_complex(path: &Path, values: impl IntoIterator<Item = Complex64>) -> Result<()> {
    write_real(path, values.into_iter().flat_map(|c| [c.re, c.im]))
}

/// Exactly `len` values, or an error naming the file
pub fn read_real(path: &Path, len: usize) -> Result<Vec<f64>> {
    let bytes = fs::read(path)?;
    ensure!(bytes.len() == len * F64_BYTES,
            format!("{}: {} bytes where {len} values need {}", path.display(), bytes.len(), len * F64_BYTES),
            "Regenerate the detector output");
    Ok(bytes.chunks_exact(F64_BYTES)
        .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
        .collect())
}

pub fn read_complex(path: &Path, len: usize) -> Result<Vec<Complex64>> {
    let flat = read_real(path, 2 * len)?;
    Ok(flat.chunks_exact(2).map(|c| Complex64::new(c[0], c[1])).collect())
}

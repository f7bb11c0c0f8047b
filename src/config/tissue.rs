use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use geometry::Point;
use crate::optics::OpticalProperties;
use crate::tissue::PhaseFunctionInput;

/// Layers stacked along z, optionally with one inclusion embedded in the
/// interior layers. The first and last layers are the semi-infinite media
/// above and below the tissue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TissueInput {
    pub layers: Vec<LayerInput>,

    #[serde(default)]
    pub inclusion: Option<InclusionInput>,

    #[serde(default)]
    pub phase_functions: BTreeMap<String, PhaseFunctionInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerInput {
    /// `[z_start, z_stop]` in mm
    pub z: [f64; 2],
    pub ops: OpticalProperties,
    #[serde(default)]
    pub phase_function_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InclusionInput {
    Ellipsoid {
        centre: Point,
        a: f64,
        b: f64,
        c: f64,
        ops: OpticalProperties,
        #[serde(default)]
        phase_function_key: Option<String>,
    },
    Voxel {
        min: Point,
        max: Point,
        ops: OpticalProperties,
        #[serde(default)]
        phase_function_key: Option<String>,
    },
}

impl InclusionInput {
    pub fn ops(&self) -> &OpticalProperties {
        match self {
            InclusionInput::Ellipsoid { ops, .. } | InclusionInput::Voxel { ops, .. } => ops,
        }
    }

    pub fn phase_function_key(&self) -> Option<&str> {
        match self {
            InclusionInput::Ellipsoid { phase_function_key, .. } |
            InclusionInput::Voxel     { phase_function_key, .. } => phase_function_key.as_deref(),
        }
    }
}

fn ambient() -> OpticalProperties { OpticalProperties::new(0.0, 1e-10, 1.0, 1.0) }

impl LayerInput {
    pub fn new(z_start: f64, z_stop: f64, ops: OpticalProperties) -> Self {
        Self { z: [z_start, z_stop], ops, phase_function_key: None }
    }
}

impl TissueInput {

    /// Air above and below tissue layers whose boundaries lie at
    /// `interfaces`, with `ops[i]` between interfaces `i` and `i+1`.
    pub fn slab(interfaces: &[f64], ops: &[OpticalProperties]) -> Self {
        let mut layers = vec![LayerInput::new(f64::NEG_INFINITY, interfaces[0], ambient())];
        for (w, o) in interfaces.windows(2).zip(ops) {
            layers.push(LayerInput::new(w[0], w[1], *o));
        }
        layers.push(LayerInput::new(interfaces[interfaces.len() - 1], f64::INFINITY, ambient()));
        Self { layers, inclusion: None, phase_functions: BTreeMap::new() }
    }

    /// 20 mm of scattering tissue between air above and below
    pub fn three_layer_slab() -> Self {
        Self::slab(&[0.0, 20.0], &[OpticalProperties::new(0.01, 1.0, 0.8, 1.4)])
    }

    /// A 0.5 mm sphere centred 1 mm deep in 100 mm of tissue
    pub fn single_ellipsoid() -> Self {
        let mut tissue = Self::slab(&[0.0, 100.0], &[OpticalProperties::new(0.01, 1.0, 0.8, 1.4)]);
        tissue.inclusion = Some(InclusionInput::Ellipsoid {
            centre: Point::new(0.0, 0.0, 1.0),
            a: 0.5, b: 0.5, c: 0.5,
            ops: OpticalProperties::new(0.05, 1.0, 0.8, 1.4),
            phase_function_key: None,
        });
        tissue
    }
}

impl Default for TissueInput {
    fn default() -> Self { Self::three_layer_slab() }
}

//! Predicted physical properties and their positional contract with the model.

use serde::{Deserialize, Serialize};

use crate::error::{PredictError, PredictResult};

/// Model output order: `(name, unit)`. Index `i` of every prediction vector
/// is `TARGET_PROPERTIES[i]`.
pub const TARGET_PROPERTIES: [(&str, &str); 4] = [
    ("density", "g/cm³"),
    ("refractive_index", ""),
    ("dielectric_const_dc", ""),
    ("thermal_conductivity", "W/mK"),
];

/// The four predicted properties in physical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropertySet {
    pub density: f64,
    pub refractive_index: f64,
    pub dielectric_const_dc: f64,
    pub thermal_conductivity: f64,
}

impl PropertySet {
    /// Assemble from an unscaled prediction vector.
    pub fn from_prediction(values: &[f64]) -> PredictResult<Self> {
        match values {
            [density, refractive_index, dielectric_const_dc, thermal_conductivity] => Ok(Self {
                density: *density,
                refractive_index: *refractive_index,
                dielectric_const_dc: *dielectric_const_dc,
                thermal_conductivity: *thermal_conductivity,
            }),
            _ => Err(PredictError::Inference(format!(
                "expected {} outputs, got {}",
                TARGET_PROPERTIES.len(),
                values.len()
            ))),
        }
    }

    pub fn to_array(&self) -> [f64; 4] {
        [
            self.density,
            self.refractive_index,
            self.dielectric_const_dc,
            self.thermal_conductivity,
        ]
    }
}

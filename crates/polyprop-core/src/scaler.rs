//! Fitted affine scalers for model inputs and outputs.

use serde::{Deserialize, Serialize};

use crate::error::{PredictError, PredictResult};

/// A fitted per-column affine scaler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `x * scale + min`
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

impl Scaler {
    pub fn dim(&self) -> usize {
        match self {
            Scaler::Standard { scale, .. } | Scaler::MinMax { scale, .. } => scale.len(),
        }
    }

    /// Check internal consistency of the fitted parameters.
    pub fn validate(&self) -> Result<(), String> {
        let (offset, scale) = self.parameters();
        if offset.len() != scale.len() {
            return Err(format!(
                "offset has {} values but scale has {}",
                offset.len(),
                scale.len()
            ));
        }
        if scale.is_empty() {
            return Err("scaler has no columns".to_string());
        }
        if let Some(i) = scale.iter().position(|s| *s == 0.0 || !s.is_finite()) {
            return Err(format!("scale[{i}] is {}", scale[i]));
        }
        if let Some(i) = offset.iter().position(|v| !v.is_finite()) {
            return Err(format!("offset[{i}] is {}", offset[i]));
        }
        Ok(())
    }

    fn parameters(&self) -> (&[f64], &[f64]) {
        match self {
            Scaler::Standard { mean, scale } => (mean.as_slice(), scale.as_slice()),
            Scaler::MinMax { min, scale } => (min.as_slice(), scale.as_slice()),
        }
    }

    fn check_dim(&self, stage: &'static str, values: &[f64]) -> PredictResult<()> {
        if values.len() != self.dim() {
            return Err(PredictError::Scaling {
                stage,
                expected: self.dim(),
                actual: values.len(),
            });
        }
        Ok(())
    }

    pub fn transform(&self, values: &[f64]) -> PredictResult<Vec<f64>> {
        self.check_dim("transform", values)?;
        Ok(match self {
            Scaler::Standard { mean, scale } => values
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(x, (m, s))| (x - m) / s)
                .collect(),
            Scaler::MinMax { min, scale } => values
                .iter()
                .zip(min.iter().zip(scale))
                .map(|(x, (m, s))| x * s + m)
                .collect(),
        })
    }

    pub fn inverse_transform(&self, values: &[f64]) -> PredictResult<Vec<f64>> {
        self.check_dim("inverse_transform", values)?;
        Ok(match self {
            Scaler::Standard { mean, scale } => values
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(x, (m, s))| x * s + m)
                .collect(),
            Scaler::MinMax { min, scale } => values
                .iter()
                .zip(min.iter().zip(scale))
                .map(|(x, (m, s))| (x - m) / s)
                .collect(),
        })
    }
}

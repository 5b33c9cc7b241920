//! Alignment of descriptor vectors to the training-time column set.

use crate::descriptors::DescriptorVector;
use crate::error::{PredictError, PredictResult};

/// Selects and orders descriptor values by the fitted column set.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureAligner {
    columns: Vec<String>,
}

impl FeatureAligner {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Build the raw feature row. Every column must be present in the
    /// extraction; undefined values (NaN, ±inf) become 0.
    pub fn align(&self, descriptors: &DescriptorVector) -> PredictResult<Vec<f64>> {
        let mut row = Vec::with_capacity(self.columns.len());
        let mut missing = Vec::new();

        for column in &self.columns {
            match descriptors.get(column) {
                Some(value) if value.is_finite() => row.push(value),
                Some(_) => row.push(0.0),
                None => missing.push(column.clone()),
            }
        }

        if !missing.is_empty() {
            return Err(PredictError::SchemaMismatch { missing });
        }
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::extract;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reorders_to_column_set() {
        let descriptors = extract("CCO").unwrap();
        let aligner = FeatureAligner::new(columns(&["NumHDonors", "HeavyAtomCount"]));
        assert_eq!(aligner.align(&descriptors).unwrap(), vec![1.0, 3.0]);
    }

    #[test]
    fn undefined_values_become_zero() {
        let descriptors = extract("O").unwrap();
        let aligner = FeatureAligner::new(columns(&["FractionCSP3", "NOCount"]));
        assert_eq!(aligner.align(&descriptors).unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn absent_column_is_schema_mismatch() {
        let descriptors = extract("CCO").unwrap();
        let aligner = FeatureAligner::new(columns(&["MolWt", "LabuteASA", "qed"]));
        match aligner.align(&descriptors) {
            Err(PredictError::SchemaMismatch { missing }) => {
                assert_eq!(missing, columns(&["LabuteASA", "qed"]));
            }
            other => panic!("expected schema mismatch, got {other:?}"),
        }
    }
}

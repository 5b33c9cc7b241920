//! The prediction pipeline: extract → align → scale → predict → unscale.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::artifacts::ModelArtifacts;
use crate::descriptors::{extract, DescriptorVector};
use crate::error::{ArtifactResult, PredictResult};
use crate::features::FeatureAligner;
use crate::properties::PropertySet;

/// Predicts physical properties from SMILES strings.
///
/// Cheap to clone; artifacts are shared read-only.
#[derive(Debug, Clone)]
pub struct PredictionService {
    artifacts: Arc<ModelArtifacts>,
    aligner: FeatureAligner,
}

impl PredictionService {
    pub fn new(artifacts: Arc<ModelArtifacts>) -> Self {
        let aligner = FeatureAligner::new(artifacts.columns().to_vec());
        Self { artifacts, aligner }
    }

    /// Load artifacts from a model directory.
    pub fn load(dir: impl AsRef<Path>) -> ArtifactResult<Self> {
        Ok(Self::new(Arc::new(ModelArtifacts::load(dir)?)))
    }

    pub fn artifacts(&self) -> &ModelArtifacts {
        &self.artifacts
    }

    pub fn model_version(&self) -> &str {
        self.artifacts.version()
    }

    /// Run the full pipeline for one molecule.
    pub fn predict(&self, smiles: &str) -> PredictResult<PropertySet> {
        let descriptors = extract(smiles)?;
        let properties = self.predict_descriptors(&descriptors)?;
        debug!(smiles, ?properties, "prediction_complete");
        Ok(properties)
    }

    /// Run the pipeline from an already extracted descriptor vector.
    pub fn predict_descriptors(&self, descriptors: &DescriptorVector) -> PredictResult<PropertySet> {
        let raw = self.aligner.align(descriptors)?;
        let scaled = self.scale_features(&raw)?;
        let prediction = self.artifacts.model().predict(&scaled)?;
        let physical = self.unscale_predictions(&prediction)?;
        PropertySet::from_prediction(&physical)
    }

    /// Apply the fitted input scaler.
    pub fn scale_features(&self, raw: &[f64]) -> PredictResult<Vec<f64>> {
        self.artifacts.feature_scaler().transform(raw)
    }

    /// Apply the inverse of the fitted output scaler.
    pub fn unscale_predictions(&self, raw: &[f64]) -> PredictResult<Vec<f64>> {
        self.artifacts.target_scaler().inverse_transform(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PredictError;
    use crate::fixtures;

    #[test]
    fn predicts_four_finite_properties() {
        let service = PredictionService::new(Arc::new(fixtures::linear_artifacts()));
        let props = service.predict("*CC(*)c1ccccc1").unwrap();
        assert!(props.to_array().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn predictions_are_deterministic() {
        let service = PredictionService::new(Arc::new(fixtures::tree_artifacts()));
        let first = service.predict("CC(C)C(=O)OC").unwrap();
        let second = service.predict("CC(C)C(=O)OC").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unscaled_dimension_matches_target_scaler() {
        let service = PredictionService::new(Arc::new(fixtures::linear_artifacts()));
        let unscaled = service.unscale_predictions(&[0.0; 4]).unwrap();
        assert_eq!(unscaled.len(), service.artifacts().target_scaler().dim());
        assert!(matches!(
            service.unscale_predictions(&[0.0; 3]),
            Err(PredictError::Scaling { .. })
        ));
    }

    #[test]
    fn zero_scaled_output_maps_to_target_means() {
        let service = PredictionService::new(Arc::new(fixtures::linear_artifacts()));
        let unscaled = service.unscale_predictions(&[0.0; 4]).unwrap();
        assert_eq!(unscaled, fixtures::TARGET_MEANS.to_vec());
    }

    #[test]
    fn invalid_molecule_fails_before_alignment() {
        let service = PredictionService::new(Arc::new(fixtures::drifted_artifacts()));
        assert!(matches!(
            service.predict("C1CC"),
            Err(PredictError::InvalidMolecule { .. })
        ));
    }

    #[test]
    fn drifted_column_set_is_schema_mismatch() {
        let service = PredictionService::new(Arc::new(fixtures::drifted_artifacts()));
        match service.predict("CCO") {
            Err(PredictError::SchemaMismatch { missing }) => {
                assert_eq!(missing, vec![fixtures::DRIFTED_COLUMN.to_string()]);
            }
            other => panic!("expected schema mismatch, got {other:?}"),
        }
    }
}

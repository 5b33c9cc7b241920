//! Loading of the fitted model directory.
//!
//! ## File Structure
//!
//! ```text
//! models/
//! ├── descriptor_columns.json  # Ordered training-time descriptor names
//! ├── feature_scaler.json      # Input scaler
//! ├── target_scaler.json       # Output scaler
//! ├── model.json               # Multi-output regressor
//! └── manifest.json            # Optional {"version": "..."}
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::descriptors::descriptor_names;
use crate::error::{ArtifactError, ArtifactResult};
use crate::model::RegressionModel;
use crate::properties::TARGET_PROPERTIES;
use crate::scaler::Scaler;

pub const COLUMNS_FILE: &str = "descriptor_columns.json";
pub const FEATURE_SCALER_FILE: &str = "feature_scaler.json";
pub const TARGET_SCALER_FILE: &str = "target_scaler.json";
pub const MODEL_FILE: &str = "model.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Version reported when the directory has no manifest.
pub const UNVERSIONED: &str = "unversioned";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

/// Column set, scalers and model. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub(crate) columns: Vec<String>,
    pub(crate) feature_scaler: Scaler,
    pub(crate) target_scaler: Scaler,
    pub(crate) model: RegressionModel,
    pub(crate) version: String,
}

impl ModelArtifacts {
    /// Assemble and validate artifacts.
    pub fn new(
        columns: Vec<String>,
        feature_scaler: Scaler,
        target_scaler: Scaler,
        model: RegressionModel,
        version: impl Into<String>,
    ) -> ArtifactResult<Self> {
        let artifacts = Self {
            columns,
            feature_scaler,
            target_scaler,
            model,
            version: version.into(),
        };
        artifacts.validate()?;
        Ok(artifacts)
    }

    /// Load every artifact from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> ArtifactResult<Self> {
        let dir = dir.as_ref();
        let columns: Vec<String> = read_json(&dir.join(COLUMNS_FILE))?;
        let feature_scaler: Scaler = read_json(&dir.join(FEATURE_SCALER_FILE))?;
        let target_scaler: Scaler = read_json(&dir.join(TARGET_SCALER_FILE))?;
        let model: RegressionModel = read_json(&dir.join(MODEL_FILE))?;

        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest: Manifest = if manifest_path.exists() {
            read_json(&manifest_path)?
        } else {
            debug!(path = %manifest_path.display(), "No model manifest");
            Manifest::default()
        };
        let version = manifest.version.unwrap_or_else(|| UNVERSIONED.to_string());

        let artifacts = Self::new(columns, feature_scaler, target_scaler, model, version)?;
        info!(
            path = %dir.display(),
            columns = artifacts.columns.len(),
            version = %artifacts.version,
            "model_artifacts_loaded"
        );
        Ok(artifacts)
    }

    /// Write every artifact into `dir`, creating it if needed.
    pub fn save(&self, dir: impl AsRef<Path>) -> ArtifactResult<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|source| ArtifactError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        write_json(&dir.join(COLUMNS_FILE), &self.columns)?;
        write_json(&dir.join(FEATURE_SCALER_FILE), &self.feature_scaler)?;
        write_json(&dir.join(TARGET_SCALER_FILE), &self.target_scaler)?;
        write_json(&dir.join(MODEL_FILE), &self.model)?;
        if self.version != UNVERSIONED {
            let manifest = Manifest {
                version: Some(self.version.clone()),
            };
            write_json(&dir.join(MANIFEST_FILE), &manifest)?;
        }
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn feature_scaler(&self) -> &Scaler {
        &self.feature_scaler
    }

    pub fn target_scaler(&self) -> &Scaler {
        &self.target_scaler
    }

    pub fn model(&self) -> &RegressionModel {
        &self.model
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    fn validate(&self) -> ArtifactResult<()> {
        if self.columns.is_empty() {
            return Err(ArtifactError::invalid(COLUMNS_FILE, "column set is empty"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(ArtifactError::invalid(
                COLUMNS_FILE,
                format!("duplicate column '{dup}'"),
            ));
        }

        self.feature_scaler
            .validate()
            .map_err(|m| ArtifactError::invalid(FEATURE_SCALER_FILE, m))?;
        self.target_scaler
            .validate()
            .map_err(|m| ArtifactError::invalid(TARGET_SCALER_FILE, m))?;
        self.model
            .validate()
            .map_err(|m| ArtifactError::invalid(MODEL_FILE, m))?;

        let n_columns = self.columns.len();
        if self.feature_scaler.dim() != n_columns {
            return Err(ArtifactError::invalid(
                FEATURE_SCALER_FILE,
                format!(
                    "fitted on {} columns but the column set has {n_columns}",
                    self.feature_scaler.dim()
                ),
            ));
        }
        if self.model.n_features() != n_columns {
            return Err(ArtifactError::invalid(
                MODEL_FILE,
                format!(
                    "expects {} features but the column set has {n_columns}",
                    self.model.n_features()
                ),
            ));
        }

        let n_targets = TARGET_PROPERTIES.len();
        if self.model.n_outputs() != n_targets {
            return Err(ArtifactError::invalid(
                MODEL_FILE,
                format!("has {} outputs, expected {n_targets}", self.model.n_outputs()),
            ));
        }
        if self.target_scaler.dim() != n_targets {
            return Err(ArtifactError::invalid(
                TARGET_SCALER_FILE,
                format!(
                    "fitted on {} targets, expected {n_targets}",
                    self.target_scaler.dim()
                ),
            ));
        }

        // Unknown columns are allowed here; requests fail with a schema mismatch.
        let known: HashSet<&str> = descriptor_names().collect();
        let unknown: Vec<&str> = self
            .columns
            .iter()
            .map(String::as_str)
            .filter(|c| !known.contains(c))
            .collect();
        if !unknown.is_empty() {
            warn!(columns = ?unknown, "descriptor_columns_not_in_registry");
        }
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> ArtifactResult<T> {
    let text = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> ArtifactResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, text).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use tempfile::TempDir;

    #[test]
    fn save_then_load_preserves_version_and_columns() {
        let temp = TempDir::new().unwrap();
        let artifacts = fixtures::linear_artifacts();
        artifacts.save(temp.path()).unwrap();

        let loaded = ModelArtifacts::load(temp.path()).unwrap();
        assert_eq!(loaded.columns(), artifacts.columns());
        assert_eq!(loaded.version(), fixtures::FIXTURE_VERSION);
        assert_eq!(loaded.model(), artifacts.model());
    }

    #[test]
    fn missing_manifest_is_unversioned() {
        let temp = TempDir::new().unwrap();
        fixtures::linear_artifacts().save(temp.path()).unwrap();
        std::fs::remove_file(temp.path().join(MANIFEST_FILE)).unwrap();

        let loaded = ModelArtifacts::load(temp.path()).unwrap();
        assert_eq!(loaded.version(), UNVERSIONED);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let temp = TempDir::new().unwrap();
        let err = ModelArtifacts::load(temp.path().join("absent")).unwrap_err();
        assert!(matches!(err, ArtifactError::Io { .. }));
    }

    #[test]
    fn corrupt_model_is_parse_error() {
        let temp = TempDir::new().unwrap();
        fixtures::linear_artifacts().save(temp.path()).unwrap();
        std::fs::write(temp.path().join(MODEL_FILE), "{not json").unwrap();

        let err = ModelArtifacts::load(temp.path()).unwrap_err();
        assert!(matches!(err, ArtifactError::Parse { .. }));
    }

    #[test]
    fn target_scaler_must_cover_every_property() {
        let artifacts = fixtures::linear_artifacts();
        let err = ModelArtifacts::new(
            artifacts.columns().to_vec(),
            artifacts.feature_scaler().clone(),
            Scaler::Standard {
                mean: vec![0.0; 3],
                scale: vec![1.0; 3],
            },
            artifacts.model().clone(),
            "v",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::Invalid {
                artifact: TARGET_SCALER_FILE,
                ..
            }
        ));
    }

    #[test]
    fn column_count_must_match_feature_scaler() {
        let artifacts = fixtures::linear_artifacts();
        let mut columns = artifacts.columns().to_vec();
        columns.pop();
        let err = ModelArtifacts::new(
            columns,
            artifacts.feature_scaler().clone(),
            artifacts.target_scaler().clone(),
            artifacts.model().clone(),
            "v",
        )
        .unwrap_err();
        assert!(err.to_string().contains(FEATURE_SCALER_FILE));
    }
}

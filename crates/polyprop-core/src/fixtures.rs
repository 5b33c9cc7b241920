//! Small deterministic artifacts and data for tests and local demos.
//!
//! These are not trained models; the numbers only keep outputs in a
//! physically plausible range.

use serde_json::{json, Map, Value};

use crate::artifacts::ModelArtifacts;
use crate::dataset::ReferenceDataset;
use crate::model::{RegressionModel, Tree, TreeEstimator};
use crate::scaler::Scaler;

pub const FIXTURE_VERSION: &str = "fixture-1";

pub const FIXTURE_COLUMNS: [&str; 6] = [
    "MolWt",
    "HeavyAtomCount",
    "NumRotatableBonds",
    "NumAromaticRings",
    "TPSA",
    "FractionCSP3",
];

/// A column name the descriptor registry never produces.
pub const DRIFTED_COLUMN: &str = "LabuteASA";

/// Target scaler means: density, refractive index, dielectric constant, thermal conductivity.
pub const TARGET_MEANS: [f64; 4] = [1.12, 1.52, 3.10, 0.21];

const TARGET_SCALES: [f64; 4] = [0.15, 0.06, 0.80, 0.05];

fn columns() -> Vec<String> {
    FIXTURE_COLUMNS.iter().map(|c| c.to_string()).collect()
}

fn feature_scaler() -> Scaler {
    Scaler::Standard {
        mean: vec![150.0, 10.0, 3.0, 0.5, 25.0, 0.5],
        scale: vec![80.0, 6.0, 3.0, 0.7, 20.0, 0.3],
    }
}

fn target_scaler() -> Scaler {
    Scaler::Standard {
        mean: TARGET_MEANS.to_vec(),
        scale: TARGET_SCALES.to_vec(),
    }
}

/// Linear model over [`FIXTURE_COLUMNS`].
pub fn linear_artifacts() -> ModelArtifacts {
    ModelArtifacts {
        columns: columns(),
        feature_scaler: feature_scaler(),
        target_scaler: target_scaler(),
        model: RegressionModel::Linear {
            coefficients: vec![
                vec![0.30, 0.10, -0.20, 0.25, 0.40, -0.15],
                vec![0.20, 0.05, -0.10, 0.60, 0.10, -0.30],
                vec![0.10, 0.00, 0.05, 0.20, 0.70, -0.10],
                vec![0.05, 0.15, -0.25, 0.30, 0.10, 0.20],
            ],
            intercepts: vec![0.0; 4],
        },
        version: FIXTURE_VERSION.to_string(),
    }
}

fn stump(feature: i64, threshold: f64, low: f64, high: f64) -> Tree {
    Tree {
        feature: vec![feature, -2, -2],
        threshold: vec![threshold, 0.0, 0.0],
        left: vec![1, -1, -1],
        right: vec![2, -1, -1],
        value: vec![0.0, low, high],
    }
}

/// Gradient-boosted stumps over [`FIXTURE_COLUMNS`].
pub fn tree_artifacts() -> ModelArtifacts {
    let estimator = |feature: i64, a: f64, b: f64| TreeEstimator {
        init_score: 0.0,
        trees: vec![stump(feature, 0.0, -a, a), stump(4, 0.0, -b, b)],
    };
    ModelArtifacts {
        columns: columns(),
        feature_scaler: feature_scaler(),
        target_scaler: target_scaler(),
        model: RegressionModel::TreeEnsemble {
            n_features: FIXTURE_COLUMNS.len(),
            estimators: vec![
                estimator(0, 0.4, 0.2),
                estimator(3, 0.5, 0.1),
                estimator(5, -0.3, 0.6),
                estimator(2, -0.2, 0.1),
            ],
        },
        version: FIXTURE_VERSION.to_string(),
    }
}

/// Linear artifacts whose column set includes [`DRIFTED_COLUMN`].
pub fn drifted_artifacts() -> ModelArtifacts {
    let mut artifacts = linear_artifacts();
    artifacts.columns[4] = DRIFTED_COLUMN.to_string();
    artifacts
}

/// Rows shaped like the polymer training table.
pub fn dataset_rows(n: usize) -> Vec<Map<String, Value>> {
    const UNITS: [&str; 5] = [
        "*CC(*)c1ccccc1",
        "*CC(*)C",
        "*CC(*)(C)C(=O)OC",
        "*OCC*",
        "*CC(*)Cl",
    ];
    (0..n)
        .filter_map(|i| {
            let row = json!({
                "SMILES": UNITS[i % UNITS.len()],
                "Density": 1.0 + (i % 7) as f64 * 0.05,
                "Refractive_Index": 1.45 + (i % 5) as f64 * 0.02,
                "DC": 2.5 + (i % 3) as f64 * 0.3,
                "Thermal_Conductivity": 0.15 + (i % 4) as f64 * 0.02,
            });
            match row {
                Value::Object(map) => Some(map),
                _ => None,
            }
        })
        .collect()
}

pub fn dataset(n: usize) -> ReferenceDataset {
    ReferenceDataset::from_rows(dataset_rows(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_artifacts_pass_validation() {
        for artifacts in [linear_artifacts(), tree_artifacts(), drifted_artifacts()] {
            ModelArtifacts::new(
                artifacts.columns().to_vec(),
                artifacts.feature_scaler().clone(),
                artifacts.target_scaler().clone(),
                artifacts.model().clone(),
                artifacts.version(),
            )
            .unwrap();
        }
    }

    #[test]
    fn dataset_has_requested_rows() {
        assert_eq!(dataset(12).len(), 12);
    }
}

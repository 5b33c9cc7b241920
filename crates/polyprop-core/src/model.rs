//! Fitted multi-output regression models.

use serde::{Deserialize, Serialize};

use crate::error::{PredictError, PredictResult};

/// A fitted regressor mapping one scaled feature row to one raw output per target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressionModel {
    /// One coefficient row and intercept per output.
    Linear {
        coefficients: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
    },
    /// One gradient-boosted tree ensemble per output.
    TreeEnsemble {
        n_features: usize,
        estimators: Vec<TreeEstimator>,
    },
}

/// Boosted trees for a single output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEstimator {
    #[serde(default)]
    pub init_score: f64,
    pub trees: Vec<Tree>,
}

/// A flattened binary regression tree. Node `i` is a leaf when `left[i] == -1`;
/// otherwise rows with `x[feature[i]] <= threshold[i]` go to `left[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub left: Vec<i64>,
    pub right: Vec<i64>,
    pub value: Vec<f64>,
}

const LEAF: i64 = -1;

impl Tree {
    fn validate(&self, n_features: usize) -> Result<(), String> {
        let n = self.value.len();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if [
            self.feature.len(),
            self.threshold.len(),
            self.left.len(),
            self.right.len(),
        ]
        .iter()
        .any(|len| *len != n)
        {
            return Err("tree node arrays differ in length".to_string());
        }
        for node in 0..n {
            if self.left[node] == LEAF {
                continue;
            }
            let in_range = |child: i64| child > node as i64 && (child as usize) < n;
            if !in_range(self.left[node]) || !in_range(self.right[node]) {
                return Err(format!("node {node} has an out-of-range child"));
            }
            if self.feature[node] < 0 || self.feature[node] as usize >= n_features {
                return Err(format!(
                    "node {node} splits on feature {} of {n_features}",
                    self.feature[node]
                ));
            }
        }
        Ok(())
    }

    /// Children always have a larger index than their parent, so this terminates.
    fn predict(&self, row: &[f64]) -> f64 {
        let mut node = 0usize;
        while self.left[node] != LEAF {
            let feature = self.feature[node] as usize;
            node = if row[feature] <= self.threshold[node] {
                self.left[node] as usize
            } else {
                self.right[node] as usize
            };
        }
        self.value[node]
    }
}

impl RegressionModel {
    pub fn n_features(&self) -> usize {
        match self {
            RegressionModel::Linear { coefficients, .. } => {
                coefficients.first().map_or(0, Vec::len)
            }
            RegressionModel::TreeEnsemble { n_features, .. } => *n_features,
        }
    }

    pub fn n_outputs(&self) -> usize {
        match self {
            RegressionModel::Linear { coefficients, .. } => coefficients.len(),
            RegressionModel::TreeEnsemble { estimators, .. } => estimators.len(),
        }
    }

    /// Check internal consistency of the fitted parameters.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            RegressionModel::Linear {
                coefficients,
                intercepts,
            } => {
                let width = self.n_features();
                if width == 0 {
                    return Err("linear model has no coefficients".to_string());
                }
                if let Some(i) = coefficients.iter().position(|row| row.len() != width) {
                    return Err(format!("coefficient row {i} has the wrong width"));
                }
                if intercepts.len() != coefficients.len() {
                    return Err(format!(
                        "{} intercepts for {} outputs",
                        intercepts.len(),
                        coefficients.len()
                    ));
                }
                Ok(())
            }
            RegressionModel::TreeEnsemble {
                n_features,
                estimators,
            } => {
                if *n_features == 0 {
                    return Err("tree ensemble has no features".to_string());
                }
                for (output, estimator) in estimators.iter().enumerate() {
                    for (index, tree) in estimator.trees.iter().enumerate() {
                        tree.validate(*n_features)
                            .map_err(|e| format!("output {output}, tree {index}: {e}"))?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Predict raw (scaled) outputs for one scaled feature row.
    pub fn predict(&self, row: &[f64]) -> PredictResult<Vec<f64>> {
        if row.len() != self.n_features() {
            return Err(PredictError::Inference(format!(
                "model expects {} features, got {}",
                self.n_features(),
                row.len()
            )));
        }

        let outputs: Vec<f64> = match self {
            RegressionModel::Linear {
                coefficients,
                intercepts,
            } => coefficients
                .iter()
                .zip(intercepts)
                .map(|(weights, intercept)| {
                    intercept + weights.iter().zip(row).map(|(w, x)| w * x).sum::<f64>()
                })
                .collect(),
            RegressionModel::TreeEnsemble { estimators, .. } => estimators
                .iter()
                .map(|e| e.init_score + e.trees.iter().map(|t| t.predict(row)).sum::<f64>())
                .collect(),
        };

        if let Some(i) = outputs.iter().position(|v| !v.is_finite()) {
            return Err(PredictError::Inference(format!(
                "output {i} is not finite ({})",
                outputs[i]
            )));
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: i64, threshold: f64, low: f64, high: f64) -> Tree {
        Tree {
            feature: vec![feature, -2, -2],
            threshold: vec![threshold, 0.0, 0.0],
            left: vec![1, -1, -1],
            right: vec![2, -1, -1],
            value: vec![0.0, low, high],
        }
    }

    #[test]
    fn linear_model_predicts_each_output() {
        let model = RegressionModel::Linear {
            coefficients: vec![vec![1.0, 0.0], vec![0.5, 0.5]],
            intercepts: vec![0.0, 1.0],
        };
        model.validate().unwrap();
        assert_eq!(model.predict(&[2.0, 4.0]).unwrap(), vec![2.0, 4.0]);
    }

    #[test]
    fn tree_ensemble_sums_leaves_and_init_score() {
        let model = RegressionModel::TreeEnsemble {
            n_features: 2,
            estimators: vec![TreeEstimator {
                init_score: 1.0,
                trees: vec![stump(0, 0.5, -1.0, 1.0), stump(1, 0.0, 0.25, 0.75)],
            }],
        };
        model.validate().unwrap();
        assert_eq!(model.predict(&[0.5, 1.0]).unwrap(), vec![0.75]);
        assert_eq!(model.predict(&[0.6, -1.0]).unwrap(), vec![2.25]);
    }

    #[test]
    fn rejects_split_on_unknown_feature() {
        let model = RegressionModel::TreeEnsemble {
            n_features: 1,
            estimators: vec![TreeEstimator {
                init_score: 0.0,
                trees: vec![stump(3, 0.0, 0.0, 0.0)],
            }],
        };
        assert!(model.validate().unwrap_err().contains("feature 3"));
    }

    #[test]
    fn wrong_row_width_is_inference_error() {
        let model = RegressionModel::Linear {
            coefficients: vec![vec![1.0]],
            intercepts: vec![0.0],
        };
        assert!(matches!(
            model.predict(&[1.0, 2.0]),
            Err(PredictError::Inference(_))
        ));
    }
}

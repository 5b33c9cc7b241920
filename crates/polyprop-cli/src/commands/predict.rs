//! Predict command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use polyprop_core::{PredictionService, PropertySet, TARGET_PROPERTIES};
use tracing::warn;

use crate::config::Config;

pub fn execute(config: &Config, smiles: &[String], json: bool) -> Result<()> {
    let predictor = PredictionService::load(&config.model_dir).with_context(|| {
        format!(
            "Failed to load model artifacts from {}",
            config.model_dir.display()
        )
    })?;

    let mut predictions: BTreeMap<&str, PropertySet> = BTreeMap::new();
    let mut failures = 0usize;
    for s in smiles {
        match predictor.predict(s) {
            Ok(properties) => {
                predictions.insert(s.as_str(), properties);
            }
            Err(e) => {
                failures += 1;
                warn!(smiles = %s, code = e.code(), "prediction_failed");
                eprintln!("❌ {}: {}", s, e);
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&predictions)?);
    } else {
        for s in smiles {
            if let Some(properties) = predictions.get(s.as_str()) {
                print_table(s, properties);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} predictions failed", failures, smiles.len());
    }
    Ok(())
}

fn print_table(smiles: &str, properties: &PropertySet) {
    println!("🧪 {}", smiles);
    for ((name, unit), value) in TARGET_PROPERTIES.iter().zip(properties.to_array()) {
        println!("   {:<24} {:>10.4} {}", name, value, unit);
    }
    println!();
}

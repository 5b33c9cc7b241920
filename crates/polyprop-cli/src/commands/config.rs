//! Config command implementation.
//!
//! Manages CLI configuration.

use std::path::Path;

use anyhow::Result;

use crate::config::Config;

fn masked(key: Option<&str>) -> String {
    key.map(|k| format!("{}...", &k[..k.char_indices().nth(4).map_or(k.len(), |(i, _)| i)]))
        .unwrap_or_else(|| "(not set)".to_string())
}

/// Show current configuration.
pub fn show(config: &Config, path: Option<&Path>) {
    println!("polyprop Configuration");
    println!("{:-<40}", "");

    println!("Model Directory:     {}", config.model_dir.display());
    println!("Cache File:          {}", config.cache_path.display());
    println!(
        "Reference Dataset:   {}",
        config
            .dataset
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(disabled)".to_string())
    );
    println!("Port:                {}", config.port);
    println!("LLM Backend:         {}", config.llm_backend);
    println!("LLM URL:             {}", config.llm_url);
    println!("LLM Model:           {}", config.llm_model);
    println!("LLM API Key:         {}", masked(config.llm_api_key.as_deref()));
    println!("Replay Delay:        {} ms", config.replay_delay_ms);

    if let Some(config_path) = path
        .map(Path::to_path_buf)
        .or_else(Config::config_file_path)
    {
        println!("\nConfig file: {}", config_path.display());
    }
}

/// Set a configuration value and save it.
pub fn set(config: &mut Config, key: &str, value: &str, path: Option<&Path>) -> Result<()> {
    match key {
        "model-dir" => config.model_dir = value.into(),
        "cache-path" | "cache" => config.cache_path = value.into(),
        "dataset" => config.dataset = (!value.is_empty()).then(|| value.into()),
        "port" => config.port = value.parse()?,
        "llm-backend" => config.llm_backend = value.parse().map_err(anyhow::Error::msg)?,
        "llm-url" => config.llm_url = value.to_string(),
        "llm-model" => config.llm_model = value.to_string(),
        "replay-delay-ms" => config.replay_delay_ms = value.parse()?,
        "llm-api-key" => {
            anyhow::bail!("llm-api-key is not stored in the config file. Use POLYPROP_LLM_API_KEY.")
        }
        _ => {
            anyhow::bail!(
                "Unknown config key: {}. Valid keys: model-dir, cache-path, dataset, port, llm-backend, llm-url, llm-model, replay-delay-ms",
                key
            );
        }
    }

    let written = config.save(path)?;
    println!("Set {} to: {} ({})", key, value, written.display());
    Ok(())
}

/// Reset configuration to defaults.
pub fn reset(path: Option<&Path>) -> Result<()> {
    let written = Config::default().save(path)?;
    println!("Configuration reset to defaults ({})", written.display());
    Ok(())
}

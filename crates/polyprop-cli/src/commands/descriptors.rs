//! Descriptors command implementation.

use anyhow::Result;
use polyprop_core::{descriptor_names, extract};

/// List the registry, or compute every descriptor for `smiles`.
pub fn execute(smiles: Option<&str>, json: bool) -> Result<()> {
    let Some(smiles) = smiles else {
        let names: Vec<&str> = descriptor_names().collect();
        if json {
            println!("{}", serde_json::to_string_pretty(&names)?);
        } else {
            for (i, name) in names.iter().enumerate() {
                println!("{:>3}  {}", i, name);
            }
        }
        return Ok(());
    };

    let descriptors = extract(smiles)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
    } else {
        println!("🧪 {}", smiles);
        for (name, value) in descriptors.iter() {
            println!("   {:<24} {:>12.4}", name, value);
        }
    }
    Ok(())
}

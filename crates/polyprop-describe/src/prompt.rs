//! Prompt construction for description generation.

use polyprop_core::PropertySet;

/// Build the generation prompt. Values use fixed 4-decimal formatting so the
/// same properties always yield the same prompt.
pub fn build_prompt(properties: &PropertySet) -> String {
    format!(
        "Based on the following properties:\n\
         - **Density**: {:.4} g/cm³\n\
         - **Refractive Index**: {:.4}\n\
         - **Dielectric Constant (DC)**: {:.4}\n\
         - **Thermal Conductivity**: {:.4} W/mK\n\
         Provide a detailed description of the polymer in only 4-5 lines that includes:\n\
         1. **Description**: Key characteristics and features\n\
         2. **Applications**: Potential use cases",
        properties.density,
        properties.refractive_index,
        properties.dielectric_const_dc,
        properties.thermal_conductivity,
    )
}

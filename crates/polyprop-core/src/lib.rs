//! polyprop core
//!
//! Everything needed to turn a polymer SMILES string into predicted physical
//! properties, with no I/O beyond loading artifacts at startup.
//!
//! ## Pipeline
//!
//! - **Parse**: [`parse_smiles`] builds a validated molecular graph
//! - **Extract**: [`extract`] computes the ordered descriptor vector
//! - **Align**: [`FeatureAligner`] selects the training-time columns
//! - **Scale / Predict / Unscale**: [`PredictionService`] applies the fitted artifacts
//!
//! ## Usage
//!
//! ```rust,no_run
//! use polyprop_core::PredictionService;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = PredictionService::load("models")?;
//!     let properties = service.predict("*CC(*)c1ccccc1")?;
//!     println!("density = {:.4}", properties.density);
//!     Ok(())
//! }
//! ```

mod artifacts;
mod dataset;
mod descriptors;
mod element;
mod error;
mod features;
pub mod fixtures;
mod model;
mod molecule;
mod predictor;
mod properties;
mod scaler;
mod smiles;

pub use artifacts::{
    ModelArtifacts, COLUMNS_FILE, FEATURE_SCALER_FILE, MANIFEST_FILE, MODEL_FILE,
    TARGET_SCALER_FILE, UNVERSIONED,
};
pub use dataset::{ReferenceDataset, SAMPLE_SIZE};
pub use descriptors::{compute_all, descriptor_names, extract, registry, Descriptor, DescriptorVector};
pub use element::{element_by_number, element_by_symbol, Element};
pub use error::{
    ArtifactError, ArtifactResult, DatasetError, DatasetResult, PredictError, PredictResult,
};
pub use features::FeatureAligner;
pub use model::{RegressionModel, Tree, TreeEstimator};
pub use molecule::{Atom, Bond, BondOrder, Chirality, Molecule, Neighbor, Skeleton};
pub use predictor::PredictionService;
pub use properties::{PropertySet, TARGET_PROPERTIES};
pub use scaler::Scaler;
pub use smiles::{parse_smiles, SmilesError, MAX_ATOMS, MAX_SMILES_LEN};

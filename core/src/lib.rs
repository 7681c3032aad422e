//! Data preparation for binned gamma-ray likelihood analyses.
//!
//! Photon events are binned into a `[spectral bin][sky pixel]` count cube,
//! sky regions are selected with analysis masks, and emission-model
//! templates are corrected for the instrument response so they share the
//! binning and units of the data.

pub mod analysis;
pub mod binning;
pub mod interface;
pub mod math;
pub mod prelude;
pub mod response;
pub mod telemetry;
pub mod templates;

pub use analysis::{Analysis, Collaborators};
pub use prelude::{AnalysisConfig, AnalysisError, AnalysisResult};

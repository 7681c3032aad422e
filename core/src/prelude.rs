use serde::{Deserialize, Serialize};

/// Binning configuration shared by every pipeline component.
///
/// Defaults follow the Calore et al. (2014) binning used for the Galactic
/// centre excess analyses: five manual low-energy edges followed by twenty
/// equal-flux bins between 500 MeV and 500 GeV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub e_min: f64,
    pub e_max: f64,
    pub nside: usize,
    pub gamma: f64,
    pub n_bins: usize,
    pub prefix_bins: Vec<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            e_min: 5e2,
            e_max: 5e5,
            nside: 256,
            gamma: 1.45,
            n_bins: 20,
            prefix_bins: vec![300.0, 350.0, 400.0, 450.0, 500.0],
        }
    }
}

/// Common error type for the analysis core.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("shape mismatch for {context}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        context: String,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("template not found: {0}")]
    NotFound(String),
    #[error("upstream data error: {0}")]
    UpstreamData(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

use crate::generator::events::GeneratorConfig;
use anyhow::Context;
use gammacore::binning::SquareRegion;
use gammacore::prelude::AnalysisConfig;
use gammacore::response::{ExposureTable, GaussianPsfParams};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One square-mask step, applied in order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaskStep {
    #[serde(flatten)]
    pub region: SquareRegion,
    #[serde(default)]
    pub merge: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub analysis: AnalysisConfig,
    pub psf: GaussianPsfParams,
    pub exposure: ExposureTable,
    pub sky: GeneratorConfig,
    pub masks: Vec<MaskStep>,
    /// JSON photon list to bin instead of the synthetic sky.
    pub events_file: Option<PathBuf>,
    /// Whitespace-separated `energy flux flux_unc` table; a synthetic
    /// power law is used when absent.
    pub isotropic_spectrum: Option<PathBuf>,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Small all-sky run: default binning at the requested resolution with a
    /// 10 degree plane cut.
    pub fn from_args(nside: usize, n_bins: usize, seed: u64, events: Option<usize>) -> Self {
        let mut sky = GeneratorConfig {
            seed,
            ..Default::default()
        };
        if let Some(total) = events {
            sky.isotropic_photons = total * 2 / 5;
            sky.disk_photons = total - sky.isotropic_photons;
        }
        Self {
            analysis: AnalysisConfig {
                nside,
                n_bins,
                ..Default::default()
            },
            sky,
            masks: vec![MaskStep {
                region: SquareRegion::new((0.0, 360.0), (-90.0, 90.0), 10.0),
                merge: false,
            }],
            ..Default::default()
        }
    }
}

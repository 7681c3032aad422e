use crate::interface::ExposureModel;
use crate::math::interp::LogLogInterpolator;
use crate::math::stats::StatsHelper;
use crate::prelude::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};

/// Exposure (cm² s) tabulated against energy (MeV).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureTable {
    pub energies: Vec<f64>,
    pub exposure: Vec<f64>,
    #[serde(default = "default_spectral_index")]
    pub spectral_index: f64,
}

fn default_spectral_index() -> f64 {
    2.4
}

impl Default for ExposureTable {
    fn default() -> Self {
        // rough all-sky average for ~5 years of survey-mode observations
        Self {
            energies: vec![100.0, 300.0, 1e3, 1e4, 1e5, 1e6],
            exposure: vec![2.0e10, 4.5e10, 6.5e10, 7.5e10, 7.0e10, 6.0e10],
            spectral_index: default_spectral_index(),
        }
    }
}

/// Spatially uniform exposure, averaged over each bin with an `E^-index`
/// spectrum and log-log interpolation between table entries.
#[derive(Debug, Clone)]
pub struct TabulatedExposure {
    interp: LogLogInterpolator,
    spectral_index: f64,
}

impl TabulatedExposure {
    pub fn new(table: &ExposureTable) -> AnalysisResult<Self> {
        if !table.spectral_index.is_finite() {
            return Err(AnalysisError::Configuration(format!(
                "exposure spectral index must be finite, got {}",
                table.spectral_index
            )));
        }
        Ok(Self {
            interp: LogLogInterpolator::new(&table.energies, &table.exposure)?,
            spectral_index: table.spectral_index,
        })
    }

    pub fn constant(value: f64) -> AnalysisResult<Self> {
        Self::new(&ExposureTable {
            energies: vec![1.0, 1e9],
            exposure: vec![value, value],
            spectral_index: default_spectral_index(),
        })
    }

    pub fn bin_exposure(&self, e_min: f64, e_max: f64) -> f64 {
        StatsHelper::spectral_mean(|e| self.interp.eval(e), e_min, e_max, self.spectral_index)
    }
}

impl ExposureModel for TabulatedExposure {
    fn exposure(
        &self,
        e_min: f64,
        e_max: f64,
        lon: &[f64],
        lat: &[f64],
    ) -> AnalysisResult<Vec<f64>> {
        if lon.len() != lat.len() {
            return Err(AnalysisError::UpstreamData(format!(
                "{} longitudes but {} latitudes",
                lon.len(),
                lat.len()
            )));
        }
        Ok(vec![self.bin_exposure(e_min, e_max); lon.len()])
    }
}

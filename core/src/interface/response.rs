use crate::prelude::AnalysisResult;
use ndarray::{Array1, ArrayView1};

/// Point-spread smoothing for one energy bin.
///
/// Implementations own whatever instrument data they need and must return
/// a map with the same length as the input.
pub trait PsfModel: Send + Sync {
    fn apply_psf(&self, map: ArrayView1<f64>, e_min: f64, e_max: f64)
        -> AnalysisResult<Array1<f64>>;
}

/// Exposure (effective area times livetime) for one energy bin, evaluated
/// at each of the given sky positions.
pub trait ExposureModel: Send + Sync {
    fn exposure(&self, e_min: f64, e_max: f64, lon: &[f64], lat: &[f64])
        -> AnalysisResult<Vec<f64>>;
}

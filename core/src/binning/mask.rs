use crate::interface::Pixelization;
use crate::prelude::{AnalysisError, AnalysisResult};
use crate::telemetry::PipelineLog;
use ndarray::{Array1, Zip};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Rectangular region in Galactic coordinates (degrees) with an optional
/// cut around the Galactic plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SquareRegion {
    pub l_range: (f64, f64),
    pub b_range: (f64, f64),
    #[serde(default)]
    pub plane_mask: f64,
}

impl SquareRegion {
    pub fn new(l_range: (f64, f64), b_range: (f64, f64), plane_mask: f64) -> Self {
        Self {
            l_range,
            b_range,
            plane_mask,
        }
    }

    pub fn full_sky() -> Self {
        Self::new((0.0, 360.0), (-90.0, 90.0), 0.0)
    }

    /// Longitude test is a union so that regions may straddle `l = 0`:
    /// `l_range = (-30, 30)` keeps `l < 30` and `l > 330`.
    pub fn contains(&self, l: f64, b: f64) -> bool {
        let (l_min, l_max) = self.l_range;
        let (b_min, b_max) = self.b_range;
        b < b_max
            && b > b_min
            && b.abs() >= self.plane_mask
            && (l < l_max || l > l_min + 360.0)
    }

    fn validate(&self) -> AnalysisResult<()> {
        let values = [
            self.l_range.0,
            self.l_range.1,
            self.b_range.0,
            self.b_range.1,
            self.plane_mask,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::Configuration(format!(
                "mask region has non-finite bounds: {:?}",
                self
            )));
        }
        if self.plane_mask < 0.0 {
            return Err(AnalysisError::Configuration(format!(
                "plane_mask must be >= 0, got {}",
                self.plane_mask
            )));
        }
        if self.b_range.0 >= self.b_range.1 {
            return Err(AnalysisError::Configuration(format!(
                "latitude range {:?} is empty",
                self.b_range
            )));
        }
        Ok(())
    }
}

/// Per-pixel analysis weights: 0 excluded, 1 included, in between partial.
pub struct SkyMask {
    pixelization: Arc<dyn Pixelization>,
    current: Option<Array1<f64>>,
    logger: PipelineLog,
}

impl SkyMask {
    pub fn new(pixelization: Arc<dyn Pixelization>) -> Self {
        Self {
            pixelization,
            current: None,
            logger: PipelineLog::new("sky-mask"),
        }
    }

    pub fn mask(&self) -> Option<&Array1<f64>> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Builds the 0/1 mask for `region` and stores it.
    ///
    /// With `merge` the stored mask only shrinks: every pixel the new mask
    /// excludes is zeroed, other pixels keep their current weight. Merging
    /// into an empty mask stores the new one as is. The newly generated
    /// mask is returned either way.
    pub fn generate_square_mask(
        &mut self,
        region: SquareRegion,
        merge: bool,
    ) -> AnalysisResult<Array1<f64>> {
        region.validate()?;

        let (lon, lat) = self.pixelization.pixel_centres()?;
        let mask: Array1<f64> = lon
            .iter()
            .zip(&lat)
            .map(|(&l, &b)| if region.contains(l, b) { 1.0 } else { 0.0 })
            .collect();

        let included = mask.iter().filter(|&&v| v > 0.0).count();
        self.logger.record(&format!(
            "square mask l={:?} b={:?} |b|>={} keeps {} of {} pixels (merge={})",
            region.l_range,
            region.b_range,
            region.plane_mask,
            included,
            mask.len(),
            merge
        ));

        match (&mut self.current, merge) {
            (Some(existing), true) => {
                Zip::from(existing).and(&mask).for_each(|weight, &new| {
                    if new == 0.0 {
                        *weight = 0.0;
                    }
                });
            }
            (current, _) => *current = Some(mask.clone()),
        }

        Ok(mask)
    }

    /// Installs an externally computed weight map.
    pub fn set_weights(&mut self, weights: Array1<f64>) -> AnalysisResult<()> {
        let npix = self.pixelization.npix();
        if weights.len() != npix {
            return Err(AnalysisError::ShapeMismatch {
                context: "mask weights".into(),
                expected: (1, npix),
                found: (1, weights.len()),
            });
        }
        if let Some(bad) = weights.iter().find(|w| !(0.0..=1.0).contains(*w)) {
            return Err(AnalysisError::Configuration(format!(
                "mask weights must lie in [0, 1], found {}",
                bad
            )));
        }
        self.current = Some(weights);
        Ok(())
    }
}

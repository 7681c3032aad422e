use crate::interface::pixelization::Pixelization;
use crate::prelude::{AnalysisError, AnalysisResult};
use ndarray::{Array2, Array3, Axis};

/// Source of externally generated count maps that must be resampled onto
/// the analysis pixelization.
///
/// The returned cube carries one more row than there are spectral bins:
/// maps are produced on the bin edges and the trailing plane is discarded
/// by the caller.
pub trait ProjectionConverter {
    fn convert_to_pixelization(&self, pixelization: &dyn Pixelization)
        -> AnalysisResult<Array2<f64>>;
}

/// Plate-carrée (CAR) count cube indexed `[plane][row][column]`.
///
/// Row `r`, column `c` is centred on
/// `(lon_ref + c * lon_step, lat_ref + r * lat_step)` in degrees.
#[derive(Debug, Clone)]
pub struct CarCountMap {
    counts: Array3<f64>,
    lon_ref: f64,
    lat_ref: f64,
    lon_step: f64,
    lat_step: f64,
}

impl CarCountMap {
    pub fn new(
        counts: Array3<f64>,
        lon_ref: f64,
        lat_ref: f64,
        lon_step: f64,
        lat_step: f64,
    ) -> AnalysisResult<Self> {
        for (label, step) in [("longitude", lon_step), ("latitude", lat_step)] {
            if !step.is_finite() || step == 0.0 {
                return Err(AnalysisError::UpstreamData(format!(
                    "CAR map {} step must be finite and non-zero, got {}",
                    label, step
                )));
            }
        }
        Ok(Self {
            counts,
            lon_ref,
            lat_ref,
            lon_step,
            lat_step,
        })
    }

    pub fn planes(&self) -> usize {
        self.counts.len_of(Axis(0))
    }

    fn centres(&self) -> (Vec<f64>, Vec<f64>) {
        let (_, rows, cols) = self.counts.dim();
        let mut lon = Vec::with_capacity(rows * cols);
        let mut lat = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                lon.push(self.lon_ref + col as f64 * self.lon_step);
                lat.push(self.lat_ref + row as f64 * self.lat_step);
            }
        }
        (lon, lat)
    }
}

impl ProjectionConverter for CarCountMap {
    fn convert_to_pixelization(
        &self,
        pixelization: &dyn Pixelization,
    ) -> AnalysisResult<Array2<f64>> {
        let (lon, lat) = self.centres();
        let pixels = pixelization.angle_to_pixel(&lon, &lat)?;
        let npix = pixelization.npix();

        let mut cube = Array2::zeros((self.planes(), npix));
        for (plane, mut row) in self
            .counts
            .axis_iter(Axis(0))
            .zip(cube.axis_iter_mut(Axis(0)))
        {
            for (&value, &pix) in plane.iter().zip(&pixels) {
                if pix >= npix {
                    return Err(AnalysisError::UpstreamData(format!(
                        "pixelization returned index {} for {} pixels",
                        pix, npix
                    )));
                }
                row[pix] += value;
            }
        }
        Ok(cube)
    }
}

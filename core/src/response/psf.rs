use crate::interface::{Pixelization, PsfModel};
use crate::math::stats::StatsHelper;
use crate::prelude::{AnalysisError, AnalysisResult};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Ratio between the 68 % containment radius and sigma of a 2-D Gaussian.
const R68_PER_SIGMA: f64 = 1.509_596_4;

/// Parameters of an energy-dependent Gaussian point-spread function.
///
/// The 68 % containment radius follows
/// `sqrt((c68 * (E / E_ref)^-index)^2 + floor^2)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaussianPsfParams {
    pub containment_68_deg: f64,
    pub reference_energy: f64,
    pub index: f64,
    pub floor_deg: f64,
    /// Index of the `E^-index` spectrum used to average over a bin.
    pub spectral_index: f64,
    /// Kernel is cut beyond this many sigma.
    pub truncation_sigma: f64,
}

impl Default for GaussianPsfParams {
    fn default() -> Self {
        Self {
            containment_68_deg: 3.5,
            reference_energy: 100.0,
            index: 0.8,
            floor_deg: 0.1,
            spectral_index: 2.4,
            truncation_sigma: 5.0,
        }
    }
}

/// Spectrally weighted Gaussian smoothing on the sphere.
///
/// Uses direct summation over pixel pairs, so it is meant for the coarse
/// grids of tests and synthetic workflows rather than full-resolution maps.
pub struct GaussianPsf {
    params: GaussianPsfParams,
    directions: Vec<[f64; 3]>,
}

impl GaussianPsf {
    pub fn new(params: GaussianPsfParams, pixelization: &dyn Pixelization) -> AnalysisResult<Self> {
        let positive = [
            params.containment_68_deg,
            params.reference_energy,
            params.truncation_sigma,
        ];
        if positive.iter().any(|v| !(v.is_finite() && *v > 0.0))
            || !(params.floor_deg.is_finite() && params.floor_deg >= 0.0)
        {
            return Err(AnalysisError::Configuration(format!(
                "invalid PSF parameters: {:?}",
                params
            )));
        }

        let (lon, lat) = pixelization.pixel_centres()?;
        let directions = lon
            .iter()
            .zip(&lat)
            .map(|(&l, &b)| {
                let (l, b) = (l.to_radians(), b.to_radians());
                [b.cos() * l.cos(), b.cos() * l.sin(), b.sin()]
            })
            .collect();

        Ok(Self { params, directions })
    }

    pub fn containment_68(&self, energy: f64) -> f64 {
        let p = &self.params;
        let scaled = p.containment_68_deg * (energy / p.reference_energy).powf(-p.index);
        (scaled * scaled + p.floor_deg * p.floor_deg).sqrt()
    }

    /// Gaussian sigma (degrees) of the kernel applied to `[e_min, e_max]`.
    pub fn effective_sigma_deg(&self, e_min: f64, e_max: f64) -> f64 {
        StatsHelper::spectral_mean(
            |e| self.containment_68(e),
            e_min,
            e_max,
            self.params.spectral_index,
        ) / R68_PER_SIGMA
    }
}

impl PsfModel for GaussianPsf {
    fn apply_psf(
        &self,
        map: ArrayView1<f64>,
        e_min: f64,
        e_max: f64,
    ) -> AnalysisResult<Array1<f64>> {
        if map.len() != self.directions.len() {
            return Err(AnalysisError::UpstreamData(format!(
                "PSF expects maps of {} pixels, got {}",
                self.directions.len(),
                map.len()
            )));
        }

        let sigma = self.effective_sigma_deg(e_min, e_max).to_radians();
        let two_sigma_sq = 2.0 * sigma * sigma;
        let cos_cut = (self.params.truncation_sigma * sigma).min(PI).cos();

        let mut smoothed = Array1::<f64>::zeros(map.len());
        let mut weights: Vec<(usize, f64)> = Vec::new();
        for (j, &value) in map.iter().enumerate() {
            if value == 0.0 {
                continue;
            }
            let source = self.directions[j];
            weights.clear();
            let mut norm = 0.0;
            for (i, target) in self.directions.iter().enumerate() {
                let dot = (source[0] * target[0] + source[1] * target[1] + source[2] * target[2])
                    .clamp(-1.0, 1.0);
                if dot < cos_cut {
                    continue;
                }
                let theta = dot.acos();
                let w = (-theta * theta / two_sigma_sq).exp();
                norm += w;
                weights.push((i, w));
            }
            // norm > 0: the source pixel always passes the cut
            for &(i, w) in &weights {
                smoothed[i] += value * w / norm;
            }
        }
        Ok(smoothed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::healpix::RingPixelization;
    use approx::assert_relative_eq;

    fn psf(nside: usize, params: GaussianPsfParams) -> GaussianPsf {
        GaussianPsf::new(params, &RingPixelization::new(nside).unwrap()).unwrap()
    }

    #[test]
    fn containment_shrinks_with_energy_down_to_floor() {
        let psf = psf(1, GaussianPsfParams::default());
        assert!(psf.containment_68(100.0) > psf.containment_68(1000.0));
        assert_relative_eq!(psf.containment_68(1e12), 0.1, max_relative = 1e-3);
    }

    #[test]
    fn smoothing_conserves_total_and_spreads_point() {
        let psf = psf(8, GaussianPsfParams::default());
        let mut map = Array1::<f64>::zeros(768);
        map[300] = 100.0;
        let smoothed = psf.apply_psf(map.view(), 100.0, 200.0).unwrap();

        assert_eq!(smoothed.len(), 768);
        assert_relative_eq!(smoothed.sum(), 100.0, max_relative = 1e-10);
        assert!(smoothed[300] < 100.0);
        assert!(smoothed.iter().filter(|&&v| v > 0.0).count() > 1);
    }

    #[test]
    fn narrow_kernel_leaves_map_untouched() {
        let params = GaussianPsfParams {
            containment_68_deg: 1e-4,
            floor_deg: 0.0,
            ..Default::default()
        };
        let psf = psf(2, params);
        let map = Array1::from_iter((0..48).map(|v| v as f64));
        let smoothed = psf.apply_psf(map.view(), 1e4, 2e4).unwrap();
        for (a, b) in map.iter().zip(smoothed.iter()) {
            assert_relative_eq!(a, b, max_relative = 1e-12);
        }
    }

    #[test]
    fn wrong_map_length_is_upstream_error() {
        let psf = psf(1, GaussianPsfParams::default());
        let err = psf
            .apply_psf(Array1::zeros(5).view(), 100.0, 200.0)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UpstreamData(_)));
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let params = GaussianPsfParams {
            containment_68_deg: -1.0,
            ..Default::default()
        };
        assert!(GaussianPsf::new(params, &RingPixelization::new(1).unwrap()).is_err());
    }
}

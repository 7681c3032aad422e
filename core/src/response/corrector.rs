use crate::binning::edges::BinningScheme;
use crate::interface::{ExposureModel, Pixelization, PsfModel};
use crate::prelude::{AnalysisError, AnalysisResult};
use crate::telemetry::PipelineLog;
use crate::templates::template::SourceClass;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rayon::prelude::*;
use std::sync::Arc;

/// Converts intensity maps into expected counts: optional PSF smoothing
/// followed by per-pixel exposure weighting.
pub struct ResponseCorrector {
    binning: BinningScheme,
    psf: Arc<dyn PsfModel>,
    exposure: Arc<dyn ExposureModel>,
    lon: Vec<f64>,
    lat: Vec<f64>,
    logger: PipelineLog,
}

impl ResponseCorrector {
    pub fn new(
        binning: BinningScheme,
        pixelization: &dyn Pixelization,
        psf: Arc<dyn PsfModel>,
        exposure: Arc<dyn ExposureModel>,
    ) -> AnalysisResult<Self> {
        if pixelization.npix() != binning.npix() {
            return Err(AnalysisError::Configuration(format!(
                "pixelization has {} pixels but binning expects {}",
                pixelization.npix(),
                binning.npix()
            )));
        }
        let (lon, lat) = pixelization.pixel_centres()?;
        Ok(Self {
            binning,
            psf,
            exposure,
            lon,
            lat,
            logger: PipelineLog::new("response"),
        })
    }

    pub fn binning(&self) -> &BinningScheme {
        &self.binning
    }

    /// Corrects the map of a single energy bin `[e_min, e_max]`.
    pub fn apply_response(
        &self,
        map: ArrayView1<f64>,
        e_min: f64,
        e_max: f64,
        apply_psf: bool,
    ) -> AnalysisResult<Array1<f64>> {
        let npix = self.lon.len();
        if map.len() != npix {
            return Err(AnalysisError::ShapeMismatch {
                context: format!("response map for [{}, {}]", e_min, e_max),
                expected: (1, npix),
                found: (1, map.len()),
            });
        }

        let mut corrected = if apply_psf {
            let smoothed = self.psf.apply_psf(map, e_min, e_max)?;
            if smoothed.len() != npix {
                return Err(AnalysisError::UpstreamData(format!(
                    "PSF returned {} pixels for a {} pixel map",
                    smoothed.len(),
                    npix
                )));
            }
            smoothed
        } else {
            map.to_owned()
        };

        let exposure = self.exposure.exposure(e_min, e_max, &self.lon, &self.lat)?;
        if exposure.len() != npix {
            return Err(AnalysisError::UpstreamData(format!(
                "exposure map has {} pixels, expected {}",
                exposure.len(),
                npix
            )));
        }
        corrected
            .iter_mut()
            .zip(&exposure)
            .for_each(|(value, &exp)| *value *= exp);

        self.logger.detail(&format!(
            "corrected [{:.1}, {:.1}] psf={}",
            e_min, e_max, apply_psf
        ));
        Ok(corrected)
    }

    /// Corrects every energy bin of `cube`; bins run in parallel.
    pub fn apply_to_cube(
        &self,
        cube: &Array2<f64>,
        source_class: SourceClass,
    ) -> AnalysisResult<Array2<f64>> {
        self.binning.check_shape(cube.dim(), "response cube")?;
        let apply_psf = source_class.applies_psf();

        let rows = (0..self.binning.n_spectral_bins())
            .into_par_iter()
            .map(|bin| {
                let (e_min, e_max) = self.binning.bin_bounds(bin);
                self.apply_response(cube.row(bin), e_min, e_max, apply_psf)
            })
            .collect::<AnalysisResult<Vec<_>>>()?;

        let mut corrected = Array2::zeros(cube.dim());
        for (mut target, row) in corrected.axis_iter_mut(Axis(0)).zip(rows) {
            target.assign(&row);
        }
        Ok(corrected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::healpix::RingPixelization;
    use crate::response::exposure::TabulatedExposure;
    use std::sync::Mutex;

    /// Records every PSF invocation and returns the map doubled.
    #[derive(Default)]
    struct RecordingPsf {
        calls: Mutex<Vec<(f64, f64)>>,
    }

    impl PsfModel for RecordingPsf {
        fn apply_psf(
            &self,
            map: ArrayView1<f64>,
            e_min: f64,
            e_max: f64,
        ) -> AnalysisResult<Array1<f64>> {
            self.calls.lock().unwrap().push((e_min, e_max));
            Ok(map.mapv(|v| v * 2.0))
        }
    }

    struct TruncatingPsf;

    impl PsfModel for TruncatingPsf {
        fn apply_psf(&self, map: ArrayView1<f64>, _: f64, _: f64) -> AnalysisResult<Array1<f64>> {
            Ok(map.slice(ndarray::s![..1]).to_owned())
        }
    }

    struct MissingExposure;

    impl ExposureModel for MissingExposure {
        fn exposure(&self, _: f64, _: f64, _: &[f64], _: &[f64]) -> AnalysisResult<Vec<f64>> {
            Err(AnalysisError::UpstreamData("exposure cube not found".into()))
        }
    }

    /// Exposure equal to the bin's lower edge, so bins are distinguishable.
    struct EdgeExposure;

    impl ExposureModel for EdgeExposure {
        fn exposure(&self, e_min: f64, _: f64, lon: &[f64], _: &[f64]) -> AnalysisResult<Vec<f64>> {
            Ok(vec![e_min; lon.len()])
        }
    }

    /// Exposure equal to the longitude it is evaluated at.
    struct LongitudeExposure;

    impl ExposureModel for LongitudeExposure {
        fn exposure(&self, _: f64, _: f64, lon: &[f64], _: &[f64]) -> AnalysisResult<Vec<f64>> {
            Ok(lon.to_vec())
        }
    }

    fn corrector(psf: Arc<dyn PsfModel>, exposure: Arc<dyn ExposureModel>) -> ResponseCorrector {
        let binning = BinningScheme::new(vec![100.0, 200.0, 300.0], 1).unwrap();
        ResponseCorrector::new(binning, &RingPixelization::new(1).unwrap(), psf, exposure)
            .unwrap()
    }

    #[test]
    fn exposure_multiplies_every_pixel() {
        let corrector = corrector(
            Arc::new(RecordingPsf::default()),
            Arc::new(TabulatedExposure::constant(4.0).unwrap()),
        );
        let map = Array1::from_elem(12, 1.5);
        let out = corrector
            .apply_response(map.view(), 100.0, 200.0, false)
            .unwrap();
        assert_eq!(out.len(), 12);
        for v in out.iter() {
            approx::assert_relative_eq!(*v, 6.0, max_relative = 1e-9);
        }
    }

    #[test]
    fn exposure_is_evaluated_at_each_pixel_centre() {
        let corrector = corrector(Arc::new(RecordingPsf::default()), Arc::new(LongitudeExposure));
        let map = Array1::from_shape_fn(12, |p| p as f64 + 1.0);
        let out = corrector
            .apply_response(map.view(), 100.0, 200.0, false)
            .unwrap();

        let (lon, _) = RingPixelization::new(1).unwrap().pixel_centres().unwrap();
        approx::assert_relative_eq!(lon[7], 270.0, epsilon = 1e-9);
        for p in 0..12 {
            approx::assert_relative_eq!(out[p], map[p] * lon[p], epsilon = 1e-9);
        }
    }

    #[test]
    fn psf_is_applied_before_exposure_when_requested() {
        let psf = Arc::new(RecordingPsf::default());
        let corrector = corrector(psf.clone(), Arc::new(EdgeExposure));
        let out = corrector
            .apply_response(Array1::ones(12).view(), 100.0, 200.0, true)
            .unwrap();
        assert!(out.iter().all(|&v| v == 200.0));
        assert_eq!(psf.calls.lock().unwrap().as_slice(), &[(100.0, 200.0)]);
    }

    #[test]
    fn isotropic_cube_skips_psf() {
        let psf = Arc::new(RecordingPsf::default());
        let corrector = corrector(psf.clone(), Arc::new(EdgeExposure));
        let cube = Array2::ones((2, 12));
        let out = corrector.apply_to_cube(&cube, SourceClass::Iso).unwrap();
        assert!(psf.calls.lock().unwrap().is_empty());
        assert!(out.row(0).iter().all(|&v| v == 100.0));
        assert!(out.row(1).iter().all(|&v| v == 200.0));
    }

    #[test]
    fn generic_cube_smooths_every_bin_with_its_edges() {
        let psf = Arc::new(RecordingPsf::default());
        let corrector = corrector(psf.clone(), Arc::new(EdgeExposure));
        let out = corrector
            .apply_to_cube(&Array2::ones((2, 12)), SourceClass::Gen)
            .unwrap();
        let mut calls = psf.calls.lock().unwrap().clone();
        calls.sort_by(|a, b| a.0.total_cmp(&b.0));
        assert_eq!(calls, vec![(100.0, 200.0), (200.0, 300.0)]);
        assert!(out.row(1).iter().all(|&v| v == 400.0));
    }

    #[test]
    fn exposure_failure_propagates() {
        let corrector = corrector(Arc::new(RecordingPsf::default()), Arc::new(MissingExposure));
        let err = corrector
            .apply_to_cube(&Array2::ones((2, 12)), SourceClass::Gen)
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::UpstreamData("exposure cube not found".into())
        );
    }

    #[test]
    fn psf_changing_shape_is_rejected() {
        let corrector = corrector(Arc::new(TruncatingPsf), Arc::new(EdgeExposure));
        let err = corrector
            .apply_response(Array1::ones(12).view(), 100.0, 200.0, true)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UpstreamData(_)));
    }

    #[test]
    fn wrong_cube_shape_is_rejected() {
        let corrector = corrector(Arc::new(RecordingPsf::default()), Arc::new(EdgeExposure));
        let err = corrector
            .apply_to_cube(&Array2::ones((3, 12)), SourceClass::Gen)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::ShapeMismatch { .. }));
    }
}

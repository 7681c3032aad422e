use crate::binning::{BinningScheme, PhotonBinner, SkyMask, SquareRegion};
use crate::interface::{EventSource, ExposureModel, Pixelization, ProjectionConverter, PsfModel};
use crate::math::healpix::RingPixelization;
use crate::prelude::{AnalysisConfig, AnalysisError, AnalysisResult};
use crate::response::{
    ExposureTable, GaussianPsf, GaussianPsfParams, ResponseCorrector, TabulatedExposure,
};
use crate::telemetry::{MetricsSnapshot, PipelineLog, PipelineMetrics};
use crate::templates::{SpectrumTable, Template, TemplateParams, TemplateRegistry, TemplateSummary};
use ndarray::{Array1, Array2, Axis};
use std::sync::Arc;

/// Largest resolution the reference collaborators are sized for.
pub const REFERENCE_MAX_NSIDE: usize = 64;

/// External collaborators an analysis is built on.
#[derive(Clone)]
pub struct Collaborators {
    pub pixelization: Arc<dyn Pixelization>,
    pub psf: Arc<dyn PsfModel>,
    pub exposure: Arc<dyn ExposureModel>,
}

impl Collaborators {
    /// HEALPix RING grid with the in-crate Gaussian PSF and tabulated
    /// exposure.
    ///
    /// The Gaussian PSF sums over every pixel pair, so this set is meant for
    /// coarse grids (`nside <= REFERENCE_MAX_NSIDE`); full-resolution maps
    /// need an external PSF implementation.
    pub fn reference(
        nside: usize,
        psf: GaussianPsfParams,
        exposure: &ExposureTable,
    ) -> AnalysisResult<Self> {
        if nside > REFERENCE_MAX_NSIDE {
            PipelineLog::new("analysis").caution(&format!(
                "reference PSF at nside {} is quadratic in {} pixels",
                nside,
                12 * nside * nside
            ));
        }
        let pixelization = Arc::new(RingPixelization::new(nside)?);
        let psf = Arc::new(GaussianPsf::new(psf, pixelization.as_ref())?);
        let exposure = Arc::new(TabulatedExposure::new(exposure)?);
        Ok(Self {
            pixelization,
            psf,
            exposure,
        })
    }
}

/// Settings and state of one binned likelihood analysis: the binning, the
/// observed count cube, the analysis mask and the template library.
pub struct Analysis {
    binning: BinningScheme,
    pixelization: Arc<dyn Pixelization>,
    binned_data: Option<Array2<f64>>,
    sky_mask: SkyMask,
    templates: TemplateRegistry,
    metrics: Arc<PipelineMetrics>,
    logger: PipelineLog,
}

impl Analysis {
    pub fn new(config: &AnalysisConfig, collaborators: Collaborators) -> AnalysisResult<Self> {
        Self::with_binning(BinningScheme::from_config(config)?, collaborators)
    }

    pub fn with_binning(
        binning: BinningScheme,
        collaborators: Collaborators,
    ) -> AnalysisResult<Self> {
        let Collaborators {
            pixelization,
            psf,
            exposure,
        } = collaborators;

        let metrics = Arc::new(PipelineMetrics::new());
        let corrector =
            ResponseCorrector::new(binning.clone(), pixelization.as_ref(), psf, exposure)?;
        let templates = TemplateRegistry::new(corrector, pixelization.clone(), metrics.clone())?;
        let logger = PipelineLog::new("analysis");
        logger.record(&format!(
            "{} spectral bins over [{:.1}, {:.1}] MeV, nside {} ({} pixels)",
            binning.n_spectral_bins(),
            binning.bin_edges()[0],
            binning.bin_edges()[binning.n_spectral_bins()],
            binning.nside(),
            binning.npix()
        ));

        Ok(Self {
            sky_mask: SkyMask::new(pixelization.clone()),
            binning,
            pixelization,
            binned_data: None,
            templates,
            metrics,
            logger,
        })
    }

    pub fn binning(&self) -> &BinningScheme {
        &self.binning
    }

    /// Loads the events and replaces the observed count cube.
    pub fn bin_photons<S>(&mut self, source: &S) -> AnalysisResult<&Array2<f64>>
    where
        S: EventSource + ?Sized,
    {
        let events = source.load_photon_events()?;
        let counts =
            PhotonBinner::new(&self.binning, self.pixelization.as_ref()).bin_photons(&events)?;
        self.metrics
            .record_binning(events.len() - counts.dropped, counts.dropped);
        Ok(&*self.binned_data.insert(counts.cube))
    }

    pub fn binned_data(&self) -> Option<&Array2<f64>> {
        self.binned_data.as_ref()
    }

    pub fn generate_square_mask(
        &mut self,
        region: SquareRegion,
        merge: bool,
    ) -> AnalysisResult<Array1<f64>> {
        self.sky_mask.generate_square_mask(region, merge)
    }

    pub fn mask(&self) -> Option<&Array1<f64>> {
        self.sky_mask.mask()
    }

    pub fn sky_mask_mut(&mut self) -> &mut SkyMask {
        &mut self.sky_mask
    }

    /// Weights every spatial pixel of `cube` by the current mask. Without a
    /// mask the cube is returned unchanged.
    pub fn apply_mask(&self, cube: &Array2<f64>) -> AnalysisResult<Array2<f64>> {
        self.binning.check_shape(cube.dim(), "masked cube")?;
        match self.sky_mask.mask() {
            Some(mask) => Ok(cube * &mask.view().insert_axis(Axis(0))),
            None => Ok(cube.clone()),
        }
    }

    /// Observed counts per spectral bin inside the mask.
    pub fn masked_counts_per_bin(&self) -> AnalysisResult<Array1<f64>> {
        let data = self
            .binned_data
            .as_ref()
            .ok_or_else(|| AnalysisError::NotFound("binned photon data".into()))?;
        Ok(self.apply_mask(data)?.sum_axis(Axis(1)))
    }

    pub fn add_template(
        &mut self,
        name: &str,
        cube: Array2<f64>,
        params: TemplateParams,
    ) -> AnalysisResult<&Template> {
        self.templates.add_template(name, cube, params)
    }

    pub fn add_point_source_template(
        &mut self,
        source: &dyn ProjectionConverter,
        name: &str,
        params: TemplateParams,
    ) -> AnalysisResult<&Template> {
        self.templates.add_point_source_template(source, name, params)
    }

    pub fn add_isotropic_template(&mut self, table: &SpectrumTable) -> AnalysisResult<&Template> {
        self.templates.add_isotropic_template(table)
    }

    pub fn remove_template(&mut self, name: &str) -> AnalysisResult<Template> {
        self.templates.remove_template(name)
    }

    pub fn list_templates(&self) -> impl Iterator<Item = TemplateSummary<'_>> + '_ {
        self.templates.list_templates()
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

use crate::binning::edges::BinningScheme;
use crate::interface::{Pixelization, ProjectionConverter};
use crate::prelude::{AnalysisError, AnalysisResult};
use crate::response::corrector::ResponseCorrector;
use crate::telemetry::{PipelineLog, PipelineMetrics};
use crate::templates::isotropic::{isotropic_cube, SpectrumTable};
use crate::templates::point_source::scale_point_source_cube;
use crate::templates::template::{SourceClass, Template, TemplateParams, TemplateSummary};
use ndarray::Array2;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const ISOTROPIC_TEMPLATE_NAME: &str = "Isotropic";

/// Named emission-model templates, all sharing the binning of the data.
pub struct TemplateRegistry {
    corrector: ResponseCorrector,
    pixelization: Arc<dyn Pixelization>,
    templates: BTreeMap<String, Template>,
    metrics: Arc<PipelineMetrics>,
    logger: PipelineLog,
}

impl TemplateRegistry {
    pub fn new(
        corrector: ResponseCorrector,
        pixelization: Arc<dyn Pixelization>,
        metrics: Arc<PipelineMetrics>,
    ) -> AnalysisResult<Self> {
        let npix = corrector.binning().npix();
        if pixelization.npix() != npix {
            return Err(AnalysisError::Configuration(format!(
                "pixelization has {} pixels but binning expects {}",
                pixelization.npix(),
                npix
            )));
        }
        Ok(Self {
            corrector,
            pixelization,
            templates: BTreeMap::new(),
            metrics,
            logger: PipelineLog::new("templates"),
        })
    }

    pub fn binning(&self) -> &BinningScheme {
        self.corrector.binning()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.binning().cube_shape()
    }

    /// Validates and stores a template, applying the instrument response
    /// first when `params.apply_response` is set. An existing entry with
    /// the same name is replaced.
    ///
    /// Nothing is inserted on error.
    pub fn add_template(
        &mut self,
        name: &str,
        cube: Array2<f64>,
        params: TemplateParams,
    ) -> AnalysisResult<&Template> {
        self.binning()
            .check_shape(cube.dim(), &format!("template '{}'", name))?;
        validate_params(name, &params)?;

        let cube = if params.apply_response {
            let corrected = self.corrector.apply_to_cube(&cube, params.source_class)?;
            self.metrics.record_corrected_bins(corrected.nrows());
            corrected
        } else {
            cube
        };

        Ok(self.insert(name, Template::new(cube, &params)))
    }

    /// Resamples an external point-source count map and stores it with
    /// class `PSC`. The map is taken to be in counts already, so no
    /// response is applied.
    pub fn add_point_source_template(
        &mut self,
        source: &dyn ProjectionConverter,
        name: &str,
        params: TemplateParams,
    ) -> AnalysisResult<&Template> {
        let converted = source.convert_to_pixelization(self.pixelization.as_ref())?;
        let cube = scale_point_source_cube(converted, self.binning())?;
        let params = TemplateParams {
            apply_response: false,
            source_class: SourceClass::Psc,
            ..params
        };
        self.add_template(name, cube, params)
    }

    /// Builds the isotropic background from a tabulated spectrum and stores
    /// it as `"Isotropic"` with both normalisations fixed.
    pub fn add_isotropic_template(&mut self, table: &SpectrumTable) -> AnalysisResult<&Template> {
        let iso = isotropic_cube(table, self.binning())?;
        self.add_template(ISOTROPIC_TEMPLATE_NAME, iso.cube, TemplateParams::isotropic())?;

        let template = self
            .templates
            .get_mut(ISOTROPIC_TEMPLATE_NAME)
            .ok_or_else(|| AnalysisError::NotFound(ISOTROPIC_TEMPLATE_NAME.into()))?;
        template.flux_uncertainty = Some(iso.uncertainty);
        Ok(template)
    }

    pub fn remove_template(&mut self, name: &str) -> AnalysisResult<Template> {
        let removed = self
            .templates
            .remove(name)
            .ok_or_else(|| AnalysisError::NotFound(name.to_string()))?;
        self.logger.record(&format!("removed template '{}'", name));
        Ok(removed)
    }

    /// Summaries in name order. Each call starts a fresh iteration.
    pub fn list_templates(&self) -> impl Iterator<Item = TemplateSummary<'_>> + '_ {
        self.templates.iter().map(|(name, t)| TemplateSummary {
            name,
            limits: t.limits,
            value: t.value,
            fix_norm: t.fix_norm,
            fix_spectrum: t.fix_spectrum,
            source_class: t.source_class,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    fn insert(&mut self, name: &str, template: Template) -> &Template {
        self.logger.record(&format!(
            "stored template '{}' class={} total={:.4e}",
            name,
            template.source_class,
            template.total_counts()
        ));
        if self.templates.contains_key(name) {
            self.logger
                .caution(&format!("template '{}' replaced", name));
        }
        self.metrics.record_template();

        self.templates.insert(name.to_string(), template);
        &self.templates[name]
    }
}

fn validate_params(name: &str, params: &TemplateParams) -> AnalysisResult<()> {
    if params.fix_norm && !params.fix_spectrum {
        return Err(AnalysisError::Configuration(format!(
            "template '{}': fix_norm requires fix_spectrum",
            name
        )));
    }
    let (low, high) = params.limits;
    if !(low.is_finite() && high.is_finite()) || low > high {
        return Err(AnalysisError::Configuration(format!(
            "template '{}': invalid limits ({}, {})",
            name, low, high
        )));
    }
    if !params.value.is_finite() {
        return Err(AnalysisError::Configuration(format!(
            "template '{}': initial value must be finite",
            name
        )));
    }
    Ok(())
}

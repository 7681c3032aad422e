use crate::generator::events::generate_events;
use crate::generator::sky::{disk_template, isotropic_spectrum, point_source_map};
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use gammacore::analysis::{Analysis, Collaborators};
use gammacore::interface::JsonEventFile;
use gammacore::telemetry::MetricsSnapshot;
use gammacore::templates::{SourceClass, SpectrumTable, TemplateParams};
use serde::Serialize;
use std::f64::consts::PI;

/// Isotropic intensity at 100 MeV, ph cm⁻² s⁻¹ sr⁻¹ MeV⁻¹.
const ISOTROPIC_NORM: f64 = 1e-7;
/// Disk intensity integrated over the analysis range, ph cm⁻² s⁻¹ sr⁻¹.
const DISK_INTENSITY: f64 = 1e-6;

#[derive(Debug, Clone, Serialize)]
pub struct TemplateRow {
    pub name: String,
    pub limits: (f64, f64),
    pub value: f64,
    pub fix_norm: bool,
    pub fix_spectrum: bool,
    pub source_class: SourceClass,
    pub total_counts: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub bin_edges: Vec<f64>,
    pub counts_per_bin: Vec<f64>,
    pub masked_counts_per_bin: Vec<f64>,
    pub mask_fraction: f64,
    pub templates: Vec<TemplateRow>,
    pub metrics: MetricsSnapshot,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> anyhow::Result<WorkflowResult> {
        let config = &self.config;
        let collaborators =
            Collaborators::reference(config.analysis.nside, config.psf.clone(), &config.exposure)
                .context("building reference collaborators")?;
        let pixelization = collaborators.pixelization.clone();
        let mut analysis =
            Analysis::new(&config.analysis, collaborators).context("creating analysis")?;

        let edges = analysis.binning().bin_edges().to_vec();
        let (e_low, e_high) = (edges[0], edges[edges.len() - 1]);
        let binned = match &config.events_file {
            Some(path) => analysis
                .bin_photons(&JsonEventFile::new(path))
                .with_context(|| format!("binning photons from {}", path.display()))?,
            None => {
                let events =
                    generate_events(&config.sky, e_low, e_high).context("generating photons")?;
                analysis.bin_photons(&events).context("binning photons")?
            }
        };
        let counts_per_bin = binned.sum_axis(ndarray::Axis(1)).to_vec();

        for (step, mask) in config.masks.iter().enumerate() {
            analysis
                .generate_square_mask(mask.region, mask.merge)
                .with_context(|| format!("applying mask step {}", step))?;
        }
        let mask_fraction = analysis.mask().map_or(1.0, |m| m.mean().unwrap_or(0.0));
        let masked_counts_per_bin = analysis
            .masked_counts_per_bin()
            .context("summing masked counts")?
            .to_vec();

        let spectrum = match &config.isotropic_spectrum {
            Some(path) => SpectrumTable::load(path)
                .with_context(|| format!("loading isotropic spectrum {}", path.display()))?,
            None => isotropic_spectrum(&config.sky, ISOTROPIC_NORM)?,
        };
        analysis
            .add_isotropic_template(&spectrum)
            .context("adding isotropic template")?;

        let pixel_area = 4.0 * PI / analysis.binning().npix() as f64;
        let disk = disk_template(
            &config.sky,
            analysis.binning(),
            pixelization.as_ref(),
            DISK_INTENSITY * pixel_area,
        )?;
        analysis
            .add_template("disk", disk, TemplateParams::default())
            .context("adding disk template")?;

        if !config.sky.point_sources.is_empty() {
            let map = point_source_map(&config.sky.point_sources, &config.sky, analysis.binning())?;
            analysis
                .add_point_source_template(&map, "point_sources", TemplateParams::point_source())
                .context("adding point-source template")?;
        }

        let templates = analysis
            .list_templates()
            .map(|summary| TemplateRow {
                name: summary.name.to_string(),
                limits: summary.limits,
                value: summary.value,
                fix_norm: summary.fix_norm,
                fix_spectrum: summary.fix_spectrum,
                source_class: summary.source_class,
                total_counts: analysis
                    .templates()
                    .get(summary.name)
                    .map_or(0.0, |t| t.total_counts()),
            })
            .collect();

        log::info!(
            "workflow finished: {} templates, {} photons binned",
            analysis.templates().len(),
            counts_per_bin.iter().sum::<f64>()
        );

        Ok(WorkflowResult {
            bin_edges: edges,
            counts_per_bin,
            masked_counts_per_bin,
            mask_fraction,
            templates,
            metrics: analysis.metrics(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gammacore::interface::PhotonEvent;

    #[test]
    fn runner_executes_workflow() {
        let cfg = WorkflowConfig::from_args(2, 3, 7, Some(500));
        let runner = Runner::new(cfg.clone());
        let result = runner.execute().unwrap();

        assert_eq!(result.bin_edges.len(), 8);
        assert_eq!(result.counts_per_bin.len(), 7);
        assert_eq!(result.masked_counts_per_bin.len(), 7);

        let binned: f64 = result.counts_per_bin.iter().sum();
        let masked: f64 = result.masked_counts_per_bin.iter().sum();
        assert_eq!(
            result.metrics.events_binned + result.metrics.events_dropped,
            cfg.sky.total_photons()
        );
        assert_eq!(binned, result.metrics.events_binned as f64);
        assert!(masked < binned);
        assert!(result.mask_fraction > 0.0 && result.mask_fraction < 1.0);

        let names: Vec<_> = result.templates.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Isotropic", "disk", "point_sources"]);
        assert_eq!(result.templates[0].source_class, SourceClass::Iso);
        assert_eq!(result.templates[2].source_class, SourceClass::Psc);
        assert!(result.templates.iter().all(|t| t.total_counts > 0.0));
        assert_eq!(result.metrics.templates_ingested, 3);
    }

    #[test]
    fn recorded_events_replace_synthetic_sky() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let events = vec![
            PhotonEvent::new(1_000.0, 30.0, 45.0),
            PhotonEvent::new(2_000.0, 200.0, -60.0),
            PhotonEvent::new(10.0, 0.0, 0.0),
        ];
        JsonEventFile::write(temp.path(), &events).unwrap();

        let mut cfg = WorkflowConfig::from_args(2, 3, 0, None);
        cfg.events_file = Some(temp.path().to_path_buf());
        let result = Runner::new(cfg).execute().unwrap();
        assert_eq!(result.metrics.events_binned, 2);
        assert_eq!(result.metrics.events_dropped, 1);
        assert_eq!(result.masked_counts_per_bin.iter().sum::<f64>(), 2.0);
    }

    #[test]
    fn missing_spectrum_file_fails_with_context() {
        let mut cfg = WorkflowConfig::from_args(1, 2, 0, Some(10));
        cfg.isotropic_spectrum = Some("/nonexistent/iso.txt".into());
        let err = Runner::new(cfg).execute().unwrap_err();
        assert!(format!("{:#}", err).contains("isotropic spectrum"));
    }
}

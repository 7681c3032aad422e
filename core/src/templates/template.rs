use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Emission-model category; decides how the instrument response is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SourceClass {
    /// Generic diffuse model: PSF smoothing and exposure.
    #[default]
    #[serde(rename = "GEN")]
    Gen,
    /// Isotropic background: exposure only.
    #[serde(rename = "ISO")]
    Iso,
    /// Point-source map, already in counts.
    #[serde(rename = "PSC")]
    Psc,
}

impl SourceClass {
    pub fn applies_psf(self) -> bool {
        self != SourceClass::Iso
    }

    pub fn tag(self) -> &'static str {
        match self {
            SourceClass::Gen => "GEN",
            SourceClass::Iso => "ISO",
            SourceClass::Psc => "PSC",
        }
    }
}

impl fmt::Display for SourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.tag())
    }
}

/// Fit metadata supplied when a template is ingested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateParams {
    /// Freeze the relative normalisation of the energy bins.
    pub fix_spectrum: bool,
    /// Freeze the overall normalisation; requires `fix_spectrum`.
    pub fix_norm: bool,
    pub limits: (f64, f64),
    pub value: f64,
    pub apply_response: bool,
    pub source_class: SourceClass,
}

impl Default for TemplateParams {
    fn default() -> Self {
        Self {
            fix_spectrum: false,
            fix_norm: false,
            limits: (0.0, 1e5),
            value: 1.0,
            apply_response: true,
            source_class: SourceClass::Gen,
        }
    }
}

impl TemplateParams {
    pub fn point_source() -> Self {
        Self {
            limits: (0.0, 1e2),
            apply_response: false,
            source_class: SourceClass::Psc,
            ..Default::default()
        }
    }

    pub fn isotropic() -> Self {
        Self {
            fix_spectrum: true,
            fix_norm: true,
            source_class: SourceClass::Iso,
            ..Default::default()
        }
    }
}

/// A calibrated emission-model component.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub healpix_cube: Array2<f32>,
    pub fix_spectrum: bool,
    pub fix_norm: bool,
    pub limits: (f64, f64),
    pub value: f64,
    pub source_class: SourceClass,
    /// Per-bin integrated flux uncertainty times pixel solid angle, for
    /// templates built from a spectral table. Not propagated into the cube.
    pub flux_uncertainty: Option<Array1<f64>>,
}

impl Template {
    pub(crate) fn new(cube: Array2<f64>, params: &TemplateParams) -> Self {
        Self {
            healpix_cube: cube.mapv(|v| v as f32),
            fix_spectrum: params.fix_spectrum,
            fix_norm: params.fix_norm,
            limits: params.limits,
            value: params.value,
            source_class: params.source_class,
            flux_uncertainty: None,
        }
    }

    /// Expected counts summed over the whole cube at unit normalisation.
    pub fn total_counts(&self) -> f64 {
        self.healpix_cube.iter().map(|&v| v as f64).sum()
    }
}

/// One row of the template listing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemplateSummary<'a> {
    pub name: &'a str,
    pub limits: (f64, f64),
    pub value: f64,
    pub fix_norm: bool,
    pub fix_spectrum: bool,
    pub source_class: SourceClass,
}

impl TemplateSummary<'_> {
    pub fn header() -> String {
        format!(
            "{:>20} {:>25} {:>10} {:>10} {:>10} {:>10}",
            "NAME", "LIMITS", "VALUE", "FIXNORM", "FIXSPEC", "SRCCLASS"
        )
    }
}

impl fmt::Display for TemplateSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let limits = format!("[{}, {}]", self.limits.0, self.limits.1);
        write!(
            f,
            "{:>20} {:>25} {:>10} {:>10} {:>10} {:>10}",
            self.name,
            limits,
            self.value,
            self.fix_norm,
            self.fix_spectrum,
            self.source_class
        )
    }
}

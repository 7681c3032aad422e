use crate::binning::edges::BinningScheme;
use crate::math::interp::LogLogInterpolator;
use crate::math::quadrature::Quadrature;
use crate::prelude::{AnalysisError, AnalysisResult};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fs;
use std::path::Path;

/// One row of an isotropic spectrum file: energy (MeV), intensity
/// (ph cm^-2 s^-1 MeV^-1 sr^-1) and its uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumPoint {
    pub energy: f64,
    pub flux: f64,
    pub flux_unc: f64,
}

/// Tabulated isotropic spectrum, sorted by energy.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumTable {
    points: Vec<SpectrumPoint>,
}

impl SpectrumTable {
    pub fn new(points: Vec<SpectrumPoint>) -> AnalysisResult<Self> {
        if points.len() < 2 {
            return Err(AnalysisError::UpstreamData(format!(
                "spectrum table needs at least 2 rows, got {}",
                points.len()
            )));
        }
        if let Some(bad) = points.iter().find(|p| {
            [p.energy, p.flux, p.flux_unc]
                .iter()
                .any(|v| !(v.is_finite() && *v > 0.0))
        }) {
            return Err(AnalysisError::UpstreamData(format!(
                "spectrum row {:?} has non-positive values",
                bad
            )));
        }
        if points.windows(2).any(|w| w[1].energy <= w[0].energy) {
            return Err(AnalysisError::UpstreamData(
                "spectrum energies must be strictly increasing".into(),
            ));
        }
        Ok(Self { points })
    }

    /// Parses whitespace-separated `energy flux flux_unc` rows. Blank lines
    /// and lines starting with `#` are skipped.
    pub fn parse(text: &str) -> AnalysisResult<Self> {
        let mut points = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let values = line
                .split_whitespace()
                .map(str::parse::<f64>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| {
                    AnalysisError::UpstreamData(format!("line {}: {}", line_no + 1, err))
                })?;
            match values.as_slice() {
                [energy, flux, flux_unc] => points.push(SpectrumPoint {
                    energy: *energy,
                    flux: *flux,
                    flux_unc: *flux_unc,
                }),
                other => {
                    return Err(AnalysisError::UpstreamData(format!(
                        "line {}: expected 3 columns, found {}",
                        line_no + 1,
                        other.len()
                    )))
                }
            }
        }
        Self::new(points)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> AnalysisResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| {
            AnalysisError::UpstreamData(format!("reading {}: {}", path.display(), err))
        })?;
        Self::parse(&contents).map_err(|err| match err {
            AnalysisError::UpstreamData(reason) => {
                AnalysisError::UpstreamData(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })
    }

    pub fn points(&self) -> &[SpectrumPoint] {
        &self.points
    }

    fn column(&self, pick: impl Fn(&SpectrumPoint) -> f64) -> Vec<f64> {
        self.points.iter().map(pick).collect()
    }

    pub fn flux_interpolator(&self) -> AnalysisResult<LogLogInterpolator> {
        LogLogInterpolator::new(&self.column(|p| p.energy), &self.column(|p| p.flux))
    }

    pub fn uncertainty_interpolator(&self) -> AnalysisResult<LogLogInterpolator> {
        LogLogInterpolator::new(&self.column(|p| p.energy), &self.column(|p| p.flux_unc))
    }
}

/// Per-pixel isotropic intensity integrated over each energy bin.
#[derive(Debug, Clone)]
pub struct IsotropicCube {
    pub cube: Array2<f64>,
    pub uncertainty: Array1<f64>,
}

/// Integrates the interpolated spectrum over every bin and multiplies by
/// the solid angle of one pixel, `4π / npix`. The result is uniform over
/// the sky and still in intensity units (no exposure).
pub fn isotropic_cube(
    table: &SpectrumTable,
    binning: &BinningScheme,
) -> AnalysisResult<IsotropicCube> {
    let flux = table.flux_interpolator()?;
    let flux_unc = table.uncertainty_interpolator()?;
    let quad = Quadrature::default();
    let solid_angle = 4.0 * PI / binning.npix() as f64;

    let mut cube = Array2::zeros(binning.cube_shape());
    let mut uncertainty = Array1::zeros(binning.n_spectral_bins());
    for ((bin, low, high), mut row) in binning.bins().zip(cube.rows_mut()) {
        row.fill(quad.integrate_log(|e| flux.eval(e), low, high) * solid_angle);
        uncertainty[bin] = quad.integrate_log(|e| flux_unc.eval(e), low, high) * solid_angle;
    }
    Ok(IsotropicCube { cube, uncertainty })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn power_law_table(index: f64) -> SpectrumTable {
        let points = [50.0, 100.0, 1e3, 1e4, 1e5, 1e6]
            .iter()
            .map(|&energy: &f64| SpectrumPoint {
                energy,
                flux: 1e-3 * energy.powf(-index),
                flux_unc: 1e-4 * energy.powf(-index),
            })
            .collect();
        SpectrumTable::new(points).unwrap()
    }

    #[test]
    fn parse_skips_comments_and_blank_lines() {
        let text = "# E flux unc\n\n100 1e-5 1e-6\n  1000 1e-7 1e-8  \n";
        let table = SpectrumTable::parse(text).unwrap();
        assert_eq!(table.points().len(), 2);
        assert_eq!(table.points()[1].energy, 1000.0);
    }

    #[test]
    fn parse_rejects_wrong_column_count() {
        let err = SpectrumTable::parse("100 1e-5\n200 1e-6\n").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn parse_rejects_non_numeric_fields() {
        assert!(SpectrumTable::parse("100 abc 1e-6\n200 1e-6 1e-7\n").is_err());
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"100 1e-5 1e-6\n1000 1e-7 1e-8\n").unwrap();
        let table = SpectrumTable::load(temp.path()).unwrap();
        assert_eq!(table.points().len(), 2);
    }

    #[test]
    fn load_missing_file_is_upstream_error() {
        assert!(matches!(
            SpectrumTable::load("/nonexistent/iso.txt"),
            Err(AnalysisError::UpstreamData(_))
        ));
    }

    #[test]
    fn cube_matches_analytic_power_law_integral() {
        let table = power_law_table(2.0);
        let binning = BinningScheme::new(vec![200.0, 2_000.0, 20_000.0], 2).unwrap();
        let iso = isotropic_cube(&table, &binning).unwrap();
        let solid_angle = 4.0 * PI / 48.0;

        assert_eq!(iso.cube.dim(), (2, 48));
        for (bin, low, high) in binning.bins() {
            let expected = 1e-3 * (1.0 / low - 1.0 / high) * solid_angle;
            assert!(iso.cube.row(bin).iter().all(|&v| v == iso.cube[[bin, 0]]));
            assert_relative_eq!(iso.cube[[bin, 0]], expected, max_relative = 1e-7);
            assert_relative_eq!(iso.uncertainty[bin], expected / 10.0, max_relative = 1e-7);
        }
    }

    #[test]
    fn flux_is_held_constant_outside_table() {
        let table = power_law_table(2.0);
        let binning = BinningScheme::new(vec![1e6, 2e6], 1).unwrap();
        let iso = isotropic_cube(&table, &binning).unwrap();
        let edge_flux = 1e-3 * 1e6f64.powf(-2.0);
        let expected = edge_flux * 1e6 * 4.0 * PI / 12.0;
        assert_relative_eq!(iso.cube[[0, 0]], expected, max_relative = 1e-7);
    }
}

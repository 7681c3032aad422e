use crate::prelude::{AnalysisConfig, AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};

/// Energy bin edges plus the spatial resolution shared by every cube.
///
/// Built once at configuration time and never mutated afterwards.
/// Deserialisation goes through [`BinningScheme::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBinning")]
pub struct BinningScheme {
    bin_edges: Vec<f64>,
    nside: usize,
}

#[derive(Deserialize)]
struct RawBinning {
    bin_edges: Vec<f64>,
    nside: usize,
}

impl TryFrom<RawBinning> for BinningScheme {
    type Error = AnalysisError;

    fn try_from(raw: RawBinning) -> AnalysisResult<Self> {
        Self::new(raw.bin_edges, raw.nside)
    }
}

impl BinningScheme {
    pub fn from_config(config: &AnalysisConfig) -> AnalysisResult<Self> {
        let edges = Self::generate_edges(
            config.e_min,
            config.e_max,
            config.gamma,
            config.n_bins,
            &config.prefix_bins,
        )?;
        Self::new(edges, config.nside)
    }

    /// Wraps an explicit edge list. Edges must be positive, finite and
    /// strictly increasing, and describe at least one spectral bin.
    pub fn new(bin_edges: Vec<f64>, nside: usize) -> AnalysisResult<Self> {
        if nside == 0 {
            return Err(AnalysisError::Configuration("nside must be >= 1".into()));
        }
        if bin_edges.len() < 2 {
            return Err(AnalysisError::Configuration(format!(
                "need at least 2 bin edges, got {}",
                bin_edges.len()
            )));
        }
        check_monotonic(&bin_edges)?;
        Ok(Self { bin_edges, nside })
    }

    /// Manual prefix edges followed by `n_bins` edges of equal integrated
    /// flux under an `E^-gamma` spectrum between `e_min` and `e_max`
    /// (Calore et al. 2014, eq. 2.3).
    ///
    /// The first recursive edge lies above `e_min`; the last equals `e_max`
    /// up to rounding. The concatenated sequence must be strictly
    /// increasing, so the prefix has to end at or below `e_min`.
    pub fn generate_edges(
        e_min: f64,
        e_max: f64,
        gamma: f64,
        n_bins: usize,
        prefix_edges: &[f64],
    ) -> AnalysisResult<Vec<f64>> {
        if !(e_min.is_finite() && e_max.is_finite()) || e_min <= 0.0 || e_max <= 0.0 {
            return Err(AnalysisError::Configuration(format!(
                "energy range must be positive and finite, got [{}, {}]",
                e_min, e_max
            )));
        }
        if e_min >= e_max {
            return Err(AnalysisError::Configuration(format!(
                "e_min ({}) must be below e_max ({})",
                e_min, e_max
            )));
        }
        if !gamma.is_finite() || (1.0 - gamma).abs() < f64::EPSILON {
            return Err(AnalysisError::Configuration(format!(
                "spectral index gamma must be finite and != 1, got {}",
                gamma
            )));
        }
        if n_bins < 1 {
            return Err(AnalysisError::Configuration("n_bins must be >= 1".into()));
        }

        let exponent = 1.0 - gamma;
        let step = (e_min.powf(exponent) - e_max.powf(exponent)) / n_bins as f64;

        let mut edges = Vec::with_capacity(prefix_edges.len() + n_bins);
        edges.extend_from_slice(prefix_edges);
        let mut e_j = e_min;
        for _ in 0..n_bins {
            e_j = (e_j.powf(exponent) - step).powf(1.0 / exponent);
            edges.push(e_j);
        }

        check_monotonic(&edges)?;
        Ok(edges)
    }

    pub fn bin_edges(&self) -> &[f64] {
        &self.bin_edges
    }

    pub fn nside(&self) -> usize {
        self.nside
    }

    pub fn npix(&self) -> usize {
        12 * self.nside * self.nside
    }

    pub fn n_spectral_bins(&self) -> usize {
        self.bin_edges.len() - 1
    }

    /// `(spectral bins, spatial pixels)`, the shape of every count cube.
    pub fn cube_shape(&self) -> (usize, usize) {
        (self.n_spectral_bins(), self.npix())
    }

    /// `(low, high)` edges of spectral bin `bin`.
    ///
    /// # Panics
    ///
    /// Panics if `bin >= self.n_spectral_bins()`.
    pub fn bin_bounds(&self, bin: usize) -> (f64, f64) {
        (self.bin_edges[bin], self.bin_edges[bin + 1])
    }

    /// `(index, low, high)` for every spectral bin.
    pub fn bins(&self) -> impl Iterator<Item = (usize, f64, f64)> + '_ {
        self.bin_edges
            .windows(2)
            .enumerate()
            .map(|(idx, pair)| (idx, pair[0], pair[1]))
    }

    pub fn check_shape(&self, found: (usize, usize), context: &str) -> AnalysisResult<()> {
        let expected = self.cube_shape();
        if found != expected {
            return Err(AnalysisError::ShapeMismatch {
                context: context.to_string(),
                expected,
                found,
            });
        }
        Ok(())
    }
}

fn check_monotonic(edges: &[f64]) -> AnalysisResult<()> {
    if let Some(bad) = edges.iter().find(|e| !(e.is_finite() && **e > 0.0)) {
        return Err(AnalysisError::Configuration(format!(
            "bin edges must be positive and finite, found {}",
            bad
        )));
    }
    if let Some(pos) = edges.windows(2).position(|pair| pair[1] <= pair[0]) {
        return Err(AnalysisError::Configuration(format!(
            "bin edges must be strictly increasing: edge {} ({}) >= edge {} ({})",
            pos,
            edges[pos],
            pos + 1,
            edges[pos + 1]
        )));
    }
    Ok(())
}

use crate::binning::edges::BinningScheme;
use crate::interface::{PhotonEvent, Pixelization};
use crate::prelude::{AnalysisError, AnalysisResult};
use crate::telemetry::PipelineLog;
use ndarray::parallel::prelude::*;
use ndarray::{Array2, Axis};

/// Histograms photon events into a `[spectral bin][pixel]` count cube.
pub struct PhotonBinner<'a> {
    binning: &'a BinningScheme,
    pixelization: &'a dyn Pixelization,
    logger: PipelineLog,
}

/// Count cube plus the number of events that fell in no spectral bin.
#[derive(Debug, Clone)]
pub struct BinnedCounts {
    pub cube: Array2<f64>,
    pub dropped: usize,
}

impl<'a> PhotonBinner<'a> {
    pub fn new(binning: &'a BinningScheme, pixelization: &'a dyn Pixelization) -> Self {
        Self {
            binning,
            pixelization,
            logger: PipelineLog::new("photon-binner"),
        }
    }

    /// Bins every event with `low < energy < high` for one of the spectral
    /// intervals. Events sitting exactly on an edge, or outside the edge
    /// range, are not counted.
    ///
    /// Events are bucketed by bin in a single pass; each spectral row is
    /// then filled by its own rayon task.
    pub fn bin_photons(&self, events: &[PhotonEvent]) -> AnalysisResult<BinnedCounts> {
        if self.pixelization.npix() != self.binning.npix() {
            return Err(AnalysisError::Configuration(format!(
                "pixelization has {} pixels but binning expects {}",
                self.pixelization.npix(),
                self.binning.npix()
            )));
        }

        let npix = self.binning.npix();
        let edges = self.binning.bin_edges();
        let mut buckets = vec![(Vec::new(), Vec::new()); self.binning.n_spectral_bins()];
        for event in events {
            if let Some(bin) = spectral_bin(edges, event.energy) {
                buckets[bin].0.push(event.lon);
                buckets[bin].1.push(event.lat);
            }
        }

        let mut cube = Array2::<f64>::zeros(self.binning.cube_shape());
        cube.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .try_for_each(|(bin, mut row)| -> AnalysisResult<()> {
                let (lon, lat) = &buckets[bin];
                let pixels = self.pixelization.angle_to_pixel(lon, lat)?;
                for pix in pixels {
                    if pix >= npix {
                        return Err(AnalysisError::UpstreamData(format!(
                            "pixelization returned index {} for {} pixels",
                            pix, npix
                        )));
                    }
                    row[pix] += 1.0;
                }
                self.logger.detail(&format!(
                    "bin {} [{:.1}, {:.1}] -> {} photons",
                    bin,
                    edges[bin],
                    edges[bin + 1],
                    lon.len()
                ));
                Ok(())
            })?;

        let binned = cube.sum() as usize;
        let dropped = events.len() - binned;
        self.logger.record(&format!(
            "binned {} of {} photons into {} x {} cube",
            binned,
            events.len(),
            cube.nrows(),
            cube.ncols()
        ));
        if dropped > 0 {
            self.logger
                .caution(&format!("{} photons outside every spectral bin", dropped));
        }

        Ok(BinnedCounts { cube, dropped })
    }
}

/// Index of the bin with `edges[i] < energy < edges[i + 1]`. Exact edge
/// hits, out-of-range and NaN energies have none.
fn spectral_bin(edges: &[f64], energy: f64) -> Option<usize> {
    let upper = edges.partition_point(|&edge| edge < energy);
    if upper == 0 || upper == edges.len() || edges[upper] == energy {
        None
    } else {
        Some(upper - 1)
    }
}

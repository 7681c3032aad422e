use crate::generator::events::{GeneratorConfig, InjectedSource};
use anyhow::Context;
use gammacore::binning::BinningScheme;
use gammacore::interface::{CarCountMap, Pixelization};
use gammacore::templates::{SpectrumPoint, SpectrumTable, POINT_SOURCE_NORMALIZATION};
use ndarray::{Array2, Array3};

/// Resolution of the synthetic plate-carrée point-source map.
const CAR_STEP_DEG: f64 = 1.0;

/// Fraction of an `E^-index` spectrum on `[e_low, e_high]` falling in
/// `[lo, hi]`.
fn power_law_fraction(lo: f64, hi: f64, e_low: f64, e_high: f64, index: f64) -> f64 {
    let integral = |a: f64, b: f64| {
        if (index - 1.0).abs() < 1e-9 {
            (b / a).ln()
        } else {
            let k = 1.0 - index;
            (b.powf(k) - a.powf(k)) / k
        }
    };
    integral(lo, hi) / integral(e_low, e_high)
}

/// Intensity model of an exponential Galactic disk,
/// `amplitude * exp(-|b| / h) * ∫ E^-index dE` per pixel and bin.
pub fn disk_template(
    config: &GeneratorConfig,
    binning: &BinningScheme,
    pixelization: &dyn Pixelization,
    amplitude: f64,
) -> anyhow::Result<Array2<f64>> {
    let (_, lat) = pixelization
        .pixel_centres()
        .context("computing pixel centres for disk template")?;
    let edges = binning.bin_edges();
    let (e_low, e_high) = (edges[0], edges[edges.len() - 1]);

    let mut cube = Array2::zeros(binning.cube_shape());
    for ((_, lo, hi), mut row) in binning.bins().zip(cube.rows_mut()) {
        let spectral = power_law_fraction(lo, hi, e_low, e_high, config.spectral_index);
        for (value, b) in row.iter_mut().zip(&lat) {
            *value = amplitude * spectral * (-b.abs() / config.disk_scale_height_deg).exp();
        }
    }
    Ok(cube)
}

/// Isotropic spectrum shaped like the generator's power law, tabulated on
/// a logarithmic grid with a 10 % uncertainty column.
pub fn isotropic_spectrum(config: &GeneratorConfig, norm_at_100mev: f64) -> anyhow::Result<SpectrumTable> {
    let points = (0..=20)
        .map(|i| {
            let energy = 50.0 * 10f64.powf(i as f64 * 0.22);
            let flux = norm_at_100mev * (energy / 100.0).powf(-config.spectral_index);
            SpectrumPoint {
                energy,
                flux,
                flux_unc: 0.1 * flux,
            }
        })
        .collect();
    SpectrumTable::new(points).context("building synthetic isotropic spectrum")
}

/// All-sky CAR count cube holding the configured point sources, sampled on
/// the bin edges plus one trailing plane, in the units the point-source
/// ingestion expects: plane `i` is pre-multiplied by the normalisation and
/// the upper-edge ratio so that the ingested template holds the expected
/// photon counts per bin.
pub fn point_source_map(
    sources: &[InjectedSource],
    config: &GeneratorConfig,
    binning: &BinningScheme,
) -> anyhow::Result<CarCountMap> {
    let rows = (180.0 / CAR_STEP_DEG) as usize;
    let cols = (360.0 / CAR_STEP_DEG) as usize;
    let edges = binning.bin_edges();
    let bins = binning.n_spectral_bins();
    let (e_low, e_high) = (edges[0], edges[bins]);

    let mut counts = Array3::zeros((bins + 1, rows, cols));
    for source in sources {
        let col = ((source.lon.rem_euclid(360.0)) / CAR_STEP_DEG) as usize % cols;
        let row = (((source.lat + 90.0) / CAR_STEP_DEG) as usize).min(rows - 1);
        for bin in 0..bins {
            let (lo, hi) = binning.bin_bounds(bin);
            let expected = source.photons as f64
                * power_law_fraction(lo, hi, e_low, e_high, config.spectral_index);
            counts[[bin, row, col]] += expected * POINT_SOURCE_NORMALIZATION * (hi / edges[1]);
        }
    }

    let half = 0.5 * CAR_STEP_DEG;
    CarCountMap::new(counts, half, -90.0 + half, CAR_STEP_DEG, CAR_STEP_DEG)
        .context("building synthetic point-source map")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gammacore::interface::ProjectionConverter;
    use gammacore::math::RingPixelization;
    use gammacore::templates::scale_point_source_cube;

    fn binning() -> BinningScheme {
        BinningScheme::new(vec![100.0, 300.0, 1_000.0, 10_000.0], 4).unwrap()
    }

    #[test]
    fn power_law_fractions_sum_to_one() {
        let b = binning();
        let total: f64 = b
            .bins()
            .map(|(_, lo, hi)| power_law_fraction(lo, hi, 100.0, 1e4, 2.2))
            .sum();
        assert_relative_eq!(total, 1.0, max_relative = 1e-12);
    }

    #[test]
    fn disk_peaks_on_the_plane() {
        let pix = RingPixelization::new(4).unwrap();
        let cube = disk_template(&GeneratorConfig::default(), &binning(), &pix, 1.0).unwrap();
        let (_, lat) = pix.pixel_centres().unwrap();
        let (plane, _) = lat
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .unwrap();
        let (pole, _) = lat
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .unwrap();
        assert!(cube[[0, plane]] > cube[[0, pole]]);
    }

    #[test]
    fn point_source_map_round_trips_to_injected_counts() {
        let config = GeneratorConfig::default();
        let b = binning();
        let pix = RingPixelization::new(4).unwrap();
        let map = point_source_map(&config.point_sources, &config, &b).unwrap();
        assert_eq!(map.planes(), 4);

        let converted = map.convert_to_pixelization(&pix).unwrap();
        let cube = scale_point_source_cube(converted, &b).unwrap();
        let injected: usize = config.point_sources.iter().map(|s| s.photons).sum();
        assert_relative_eq!(cube.sum(), injected as f64, max_relative = 1e-9);
    }

    #[test]
    fn isotropic_spectrum_is_valid_table() {
        let table = isotropic_spectrum(&GeneratorConfig::default(), 1e-7).unwrap();
        assert_eq!(table.points().len(), 21);
        assert!(table.points()[20].energy > 1e6);
    }
}

use crate::binning::edges::BinningScheme;
use crate::prelude::{AnalysisError, AnalysisResult};
use ndarray::{s, Array2, Axis};

/// Fixed scale applied to converted point-source count maps.
pub const POINT_SOURCE_NORMALIZATION: f64 = 1e9;

/// Turns a converted point-source map (one plane per bin edge) into a
/// template cube.
///
/// The trailing plane is dropped, everything is divided by
/// [`POINT_SOURCE_NORMALIZATION`], and bin `i` is further divided by
/// `upper_edge(i) / upper_edge(0)`.
pub fn scale_point_source_cube(
    converted: Array2<f64>,
    binning: &BinningScheme,
) -> AnalysisResult<Array2<f64>> {
    let (bins, npix) = binning.cube_shape();
    if converted.dim() != (bins + 1, npix) {
        return Err(AnalysisError::ShapeMismatch {
            context: "converted point-source map".into(),
            expected: (bins + 1, npix),
            found: converted.dim(),
        });
    }

    let edges = binning.bin_edges();
    let first_upper = edges[1];
    let mut cube = converted.slice(s![..bins, ..]).to_owned();
    cube /= POINT_SOURCE_NORMALIZATION;
    for (bin, mut row) in cube.axis_iter_mut(Axis(0)).enumerate() {
        row /= edges[bin + 1] / first_upper;
    }
    Ok(cube)
}

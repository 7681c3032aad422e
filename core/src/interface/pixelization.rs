use crate::prelude::AnalysisResult;

/// Bidirectional mapping between sky coordinates and a hierarchical
/// equal-area pixelization with `12 * nside^2` cells.
///
/// Coordinates are Galactic longitude and latitude in degrees. Longitudes
/// returned by [`Pixelization::pixel_to_angle`] lie in `[0, 360)`.
pub trait Pixelization: Send + Sync {
    fn nside(&self) -> usize;

    fn npix(&self) -> usize {
        12 * self.nside() * self.nside()
    }

    fn angle_to_pixel(&self, lon: &[f64], lat: &[f64]) -> AnalysisResult<Vec<usize>>;

    fn pixel_to_angle(&self, pixels: &[usize]) -> AnalysisResult<(Vec<f64>, Vec<f64>)>;

    /// Coordinates of every pixel centre, in pixel order.
    fn pixel_centres(&self) -> AnalysisResult<(Vec<f64>, Vec<f64>)> {
        let pixels: Vec<usize> = (0..self.npix()).collect();
        self.pixel_to_angle(&pixels)
    }
}

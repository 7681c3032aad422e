pub mod corrector;
pub mod exposure;
pub mod psf;

pub use corrector::ResponseCorrector;
pub use exposure::{ExposureTable, TabulatedExposure};
pub use psf::{GaussianPsf, GaussianPsfParams};

pub mod healpix;
pub mod interp;
pub mod quadrature;
pub mod stats;

pub use healpix::RingPixelization;
pub use interp::LogLogInterpolator;
pub use quadrature::Quadrature;
pub use stats::StatsHelper;

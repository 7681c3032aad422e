pub mod edges;
pub mod mask;
pub mod photons;

pub use edges::BinningScheme;
pub use mask::{SkyMask, SquareRegion};
pub use photons::{BinnedCounts, PhotonBinner};

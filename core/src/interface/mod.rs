//! Contracts for the collaborators the core consumes: sky pixelization,
//! instrument response, photon events and projection-map conversion.

pub mod events;
pub mod pixelization;
pub mod projection;
pub mod response;

pub use events::{EventSource, JsonEventFile, PhotonEvent};
pub use pixelization::Pixelization;
pub use projection::{CarCountMap, ProjectionConverter};
pub use response::{ExposureModel, PsfModel};

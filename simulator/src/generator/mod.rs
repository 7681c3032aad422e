pub mod events;
pub mod sky;

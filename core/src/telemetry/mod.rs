pub mod log;
pub mod metrics;

pub use self::log::PipelineLog;
pub use metrics::{MetricsSnapshot, PipelineMetrics};

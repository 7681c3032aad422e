use log::{debug, info, warn};

/// Thin wrapper over the `log` facade that tags every line with the
/// pipeline component emitting it.
#[derive(Debug, Clone, Copy)]
pub struct PipelineLog {
    component: &'static str,
}

impl PipelineLog {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.component, message);
    }

    pub fn detail(&self, message: &str) {
        debug!("[{}] {}", self.component, message);
    }

    pub fn caution(&self, message: &str) {
        warn!("[{}] {}", self.component, message);
    }

    pub fn component(&self) -> &'static str {
        self.component
    }
}

impl Default for PipelineLog {
    fn default() -> Self {
        Self::new("analysis")
    }
}

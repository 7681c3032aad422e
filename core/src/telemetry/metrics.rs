use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Counters accumulated over the lifetime of an analysis context.
///
/// Response correction runs bins on rayon workers, so the counters sit
/// behind a mutex rather than requiring `&mut` access.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub events_binned: usize,
    pub events_dropped: usize,
    pub templates_ingested: usize,
    pub bins_corrected: usize,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_binning(&self, binned: usize, dropped: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.events_binned += binned;
            metrics.events_dropped += dropped;
        }
    }

    pub fn record_template(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.templates_ingested += 1;
        }
    }

    pub fn record_corrected_bins(&self, bins: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.bins_corrected += bins;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner
            .lock()
            .map(|metrics| *metrics)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = PipelineMetrics::new();
        metrics.record_binning(10, 2);
        metrics.record_binning(5, 0);
        metrics.record_template();
        metrics.record_corrected_bins(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.events_binned, 15);
        assert_eq!(snapshot.events_dropped, 2);
        assert_eq!(snapshot.templates_ingested, 1);
        assert_eq!(snapshot.bins_corrected, 3);
    }
}

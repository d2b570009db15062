use std::sync::Mutex;

/// Batch counters shared between decode workers.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub processed: usize,
    pub errors: usize,
    pub lines: usize,
}

struct Metrics {
    processed: usize,
    errors: usize,
    lines: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics {
                processed: 0,
                errors: 0,
                lines: 0,
            }),
        }
    }

    pub fn record_processed(&self, lines: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.processed += 1;
            metrics.lines += lines;
        }
    }

    pub fn record_error(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.errors += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            MetricsSnapshot {
                processed: metrics.processed,
                errors: metrics.errors,
                lines: metrics.lines,
            }
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

use log::{debug, info};

/// Stage-scoped logging facade over the `log` crate.
pub struct LogManager {
    scope: &'static str,
}

impl LogManager {
    pub fn new() -> Self {
        Self { scope: "aptcore" }
    }

    pub fn for_stage(scope: &'static str) -> Self {
        Self { scope }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.scope, message);
    }

    pub fn detail(&self, message: &str) {
        debug!("[{}] {}", self.scope, message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}

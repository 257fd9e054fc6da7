use tracing::Level;

/// Sink for the human-readable log lines components emit at documented
/// points. Handed to each component at construction.
pub trait LogPort: Send + Sync {
    fn emit(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.emit(Level::INFO, message);
    }

    fn warning(&self, message: &str) {
        self.emit(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.emit(Level::ERROR, message);
    }
}

/// Forwards every line to `tracing`, tagged with the emitting component.
#[derive(Debug, Clone)]
pub struct TracingLog {
    component: String,
}

impl TracingLog {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }
}

impl LogPort for TracingLog {
    fn emit(&self, level: Level, message: &str) {
        forward(level, &self.component, message);
    }
}

/// Shared by every port that mirrors its lines to `tracing`.
pub fn forward(level: Level, component: &str, message: &str) {
    match level {
        Level::ERROR => tracing::error!(component, "{message}"),
        Level::WARN => tracing::warn!(component, "{message}"),
        Level::INFO => tracing::info!(component, "{message}"),
        Level::DEBUG => tracing::debug!(component, "{message}"),
        _ => tracing::trace!(component, "{message}"),
    }
}

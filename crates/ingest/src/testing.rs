//! Logging port that keeps every line for later assertions.

use std::sync::{Mutex, PoisonError};

use tracing::Level;

use crate::logging::LogPort;

#[derive(Debug, Default)]
pub struct RecordingLog {
    lines: Mutex<Vec<(Level, String)>>,
}

impl RecordingLog {
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(lvl, line)| *lvl == level && line.contains(needle))
    }
}

impl LogPort for RecordingLog {
    fn emit(&self, level: Level, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }
}

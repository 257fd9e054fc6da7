use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Local;
use tabload_ingest::{forward, LogPort};
use tracing::Level;

/// In-memory buffer of formatted log lines, shared by every port it hands
/// out and written to disk once at the end of a run.
#[derive(Debug, Clone, Default)]
pub struct LogBook {
    lines: Arc<Mutex<Vec<String>>>,
}

impl LogBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// A logging port whose lines are tagged with `component`.
    pub fn port(&self, component: &str) -> Arc<dyn LogPort> {
        Arc::new(BookPort {
            component: component.to_string(),
            lines: self.lines.clone(),
        })
    }

    pub fn lines(&self) -> Vec<String> {
        self.guard().clone()
    }

    pub fn clear(&self) {
        self.guard().clear();
    }

    /// Appends all buffered lines to `path`, creating parent directories.
    pub fn flush_to(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        for line in self.guard().iter() {
            writeln!(file, "{line}")?;
        }
        file.flush()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<String>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct BookPort {
    component: String,
    lines: Arc<Mutex<Vec<String>>>,
}

impl LogPort for BookPort {
    fn emit(&self, level: Level, message: &str) {
        forward(level, &self.component, message);
        let line = format!(
            "{} | {} | {} | {}",
            Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            level_name(level),
            self.component,
            message
        );
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }
}

fn level_name(level: Level) -> &'static str {
    match level {
        Level::WARN => "WARNING",
        Level::ERROR => "ERROR",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        _ => "TRACE",
    }
}

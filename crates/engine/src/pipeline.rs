use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tabload_ingest::{LogPort, ReadError, TabularSource};
use thiserror::Error;

use crate::driver::DriverFactory;
use crate::request::{Destination, LoadRequest, Source};
use crate::sink::{ConnectionReport, RelationalSink};
use crate::target::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Transforming,
    Succeeded,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Transforming => "transforming",
            Stage::Succeeded => "succeeded",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Envelope returned for every request. A connection failure carries the
/// sink's own report next to the error message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LoadResponse {
    Success {
        environment: Option<String>,
        result: bool,
    },
    Failed {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        connection: Option<ConnectionReport>,
    },
}

impl LoadResponse {
    pub fn stage(&self) -> Stage {
        match self {
            LoadResponse::Success { .. } => Stage::Succeeded,
            LoadResponse::Failed { .. } => Stage::Failed,
        }
    }
}

#[derive(Debug, Error)]
enum PipelineError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

enum Outcome {
    Written(bool),
    ConnectionFailed(ConnectionReport),
}

/// Reads the request's source, then writes it to its destination.
pub struct Pipeline<'a> {
    reader: &'a dyn TabularSource,
    drivers: &'a dyn DriverFactory,
    log: Arc<dyn LogPort>,
    sink_log: Arc<dyn LogPort>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        reader: &'a dyn TabularSource,
        drivers: &'a dyn DriverFactory,
        log: Arc<dyn LogPort>,
        sink_log: Arc<dyn LogPort>,
    ) -> Self {
        Self {
            reader,
            drivers,
            log,
            sink_log,
        }
    }

    pub fn handle(&self, request: &LoadRequest) -> LoadResponse {
        self.enter(Stage::Received);
        self.log.info(&format!(
            "Environment: {}",
            request.environment.as_deref().unwrap_or_default()
        ));
        self.log.info(&format!(
            "Source type: {}",
            request.source.kind.as_deref().unwrap_or_default()
        ));
        self.log.info(&format!(
            "Destination type: {}",
            request.destination.kind.as_deref().unwrap_or_default()
        ));

        self.enter(Stage::Transforming);
        let response = match self.transform(&request.source, &request.destination) {
            Ok(Outcome::Written(result)) => LoadResponse::Success {
                environment: request.environment.clone(),
                result,
            },
            Ok(Outcome::ConnectionFailed(report)) => LoadResponse::Failed {
                error: report.message.clone(),
                connection: Some(report),
            },
            Err(err) => {
                self.log.error(&format!("Error in load pipeline: {err}"));
                LoadResponse::Failed {
                    error: err.to_string(),
                    connection: None,
                }
            }
        };
        self.enter(response.stage());
        response
    }

    fn transform(&self, source: &Source, destination: &Destination) -> Result<Outcome, PipelineError> {
        let path = source.path.as_deref().unwrap_or_default();
        self.log.info(&format!("Source path: {path}"));
        self.log.info(&format!(
            "Destination table: {}",
            destination.table.as_deref().unwrap_or_default()
        ));

        let table = self.reader.read(path)?;
        let mut sink = RelationalSink::create_with(destination, self.sink_log.clone(), self.drivers)?;

        let report = sink.test_connection();
        if !report.success {
            sink.close();
            return Ok(Outcome::ConnectionFailed(report));
        }

        let written = sink.write(&table, destination.table.as_deref(), None).is_ok();
        sink.close();
        Ok(Outcome::Written(written))
    }

    fn enter(&self, stage: Stage) {
        self.log.info(&format!("Pipeline stage: {stage}"));
    }
}

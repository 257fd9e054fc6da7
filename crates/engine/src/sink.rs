use std::sync::Arc;

use serde::Serialize;
use tabload_ingest::{LogPort, ReadError, Table, TabularSource};
use thiserror::Error;

use crate::driver::{Driver, DriverError, DriverFactory, DriverResult, NativeDrivers};
use crate::identifiers::validate_table_name;
use crate::request::{Destination, IfExists};
use crate::target::{ConfigError, ConnectionTarget};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionReport {
    pub success: bool,
    pub message: String,
    pub db_type: String,
    pub database: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub table_name: String,
    pub columns: Vec<String>,
    pub column_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub table_name: String,
    pub policy: IfExists,
    pub rows: usize,
}

/// Why a write did not happen. Every variant has already been logged by the
/// time the caller sees it.
#[derive(Debug, Error)]
pub enum WriteFailure {
    #[error("Table name must be provided in parameter or destination config")]
    MissingTableName,
    #[error("no rows to load into table '{0}'")]
    EmptyInput(String),
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error("failed to load table '{table_name}': {source}")]
    Driver {
        table_name: String,
        #[source]
        source: DriverError,
    },
}

/// Owns one database handle and performs writes and metadata queries on it.
///
/// Per-operation failures are logged and converted into return values; only
/// construction can fail with an error.
pub struct RelationalSink {
    destination: Destination,
    target: ConnectionTarget,
    driver: Option<Box<dyn Driver>>,
    log: Arc<dyn LogPort>,
}

impl RelationalSink {
    pub fn create(destination: &Destination, log: Arc<dyn LogPort>) -> Result<Self, ConfigError> {
        Self::create_with(destination, log, &NativeDrivers)
    }

    pub fn create_with(
        destination: &Destination,
        log: Arc<dyn LogPort>,
        drivers: &dyn DriverFactory,
    ) -> Result<Self, ConfigError> {
        let opened = ConnectionTarget::from_destination(destination).and_then(|target| {
            let driver = drivers
                .open(&target)
                .map_err(|err| ConfigError::Driver(err.to_string()))?;
            Ok((target, driver))
        });
        let (target, driver) = match opened {
            Ok(opened) => opened,
            Err(err) => {
                log.error(&format!("Failed to initialize database engine: {err}"));
                return Err(err);
            }
        };

        log.info(&format!(
            "Database engine initialized for {} database: {}",
            destination.db_type, destination.database_name
        ));
        Ok(Self {
            destination: destination.clone(),
            target,
            driver: Some(driver),
            log,
        })
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    pub fn test_connection(&mut self) -> ConnectionReport {
        let db_type = self.destination.db_type.clone();
        let database = self.destination.database_name.clone();

        let ping = self.driver().and_then(|driver| driver.ping());
        let (success, message) = match ping {
            Ok(()) => {
                self.log
                    .info(&format!("Database connection test successful for {db_type}"));
                (
                    true,
                    format!("Successfully connected to {db_type} database: {database}"),
                )
            }
            Err(err) => {
                let message = if err.is_database_error() {
                    format!("Database connection test failed: {err}")
                } else {
                    format!("Unexpected error during connection test: {err}")
                };
                self.log.error(&message);
                (false, message)
            }
        };

        ConnectionReport {
            success,
            message,
            db_type,
            database,
        }
    }

    /// Writes `table` into `table_name` (or the configured table) under
    /// `if_exists` (or the configured policy, or `replace`).
    pub fn write(
        &mut self,
        table: &Table,
        table_name: Option<&str>,
        if_exists: Option<IfExists>,
    ) -> Result<WriteSummary, WriteFailure> {
        let Some(table_name) = table_name
            .filter(|name| !name.is_empty())
            .or(self.destination.table.as_deref())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
        else {
            self.log.error(&WriteFailure::MissingTableName.to_string());
            return Err(WriteFailure::MissingTableName);
        };
        let policy = if_exists
            .or(self.destination.if_exists)
            .unwrap_or_default();

        if table.is_empty() {
            self.log.warning(&format!(
                "Table is empty. No data will be loaded to table '{table_name}'"
            ));
            return Err(WriteFailure::EmptyInput(table_name));
        }

        self.log.info(&format!(
            "Starting to load {} rows to table '{table_name}' (if_exists={policy})",
            table.row_count()
        ));
        let chunk_size = self.destination.chunk_size;
        let result = validate_table_name(&table_name).and_then(|()| {
            self.driver()?
                .write_table(table, &table_name, policy, chunk_size)
        });

        match result {
            Ok(rows) => {
                self.log.info(&format!(
                    "Successfully loaded {rows} rows to table '{table_name}'"
                ));
                Ok(WriteSummary {
                    table_name,
                    policy,
                    rows,
                })
            }
            Err(source) => {
                if source.is_database_error() {
                    self.log
                        .error(&format!("Database error while loading data: {source}"));
                } else {
                    self.log
                        .error(&format!("Unexpected error while loading data: {source}"));
                }
                Err(WriteFailure::Driver { table_name, source })
            }
        }
    }

    /// Reads `path` through `reader` and writes the result.
    pub fn load_csv(
        &mut self,
        reader: &dyn TabularSource,
        path: &str,
        table_name: Option<&str>,
        if_exists: Option<IfExists>,
    ) -> Result<WriteSummary, WriteFailure> {
        let table = match reader.read(path) {
            Ok(table) => table,
            Err(err) => {
                self.log
                    .error(&format!("Failed to read CSV file '{path}': {err}"));
                return Err(err.into());
            }
        };
        self.log.info(&format!(
            "CSV file loaded successfully with {} rows",
            table.row_count()
        ));
        self.write(&table, table_name, if_exists)
    }

    pub fn table_info(&mut self, table_name: &str) -> Option<TableInfo> {
        match self.inspect_table(table_name) {
            Ok(Some(info)) => {
                self.log.info(&format!(
                    "Table '{table_name}' has {} columns",
                    info.column_count
                ));
                Some(info)
            }
            Ok(None) => {
                self.log.warning(&format!(
                    "Table '{table_name}' does not exist in the database"
                ));
                None
            }
            Err(err) => {
                self.log
                    .error(&format!("Error inspecting table '{table_name}': {err}"));
                None
            }
        }
    }

    pub fn list_tables(&mut self) -> Vec<String> {
        let listed = self.driver().and_then(|driver| driver.table_names());
        match listed {
            Ok(tables) => {
                self.log.info(&format!(
                    "Database contains {} table(s): {tables:?}",
                    tables.len()
                ));
                tables
            }
            Err(err) => {
                self.log.error(&format!("Error listing tables: {err}"));
                Vec::new()
            }
        }
    }

    /// Releases the handle. Safe to call more than once.
    pub fn close(&mut self) {
        let Some(mut driver) = self.driver.take() else {
            return;
        };
        match driver.dispose() {
            Ok(()) => self.log.info("Database connection closed successfully"),
            Err(err) => self
                .log
                .error(&format!("Error closing database connection: {err}")),
        }
    }

    fn driver(&mut self) -> DriverResult<&mut (dyn Driver + 'static)> {
        match self.driver.as_mut() {
            Some(driver) => Ok(driver.as_mut()),
            None => Err(DriverError::Closed),
        }
    }

    fn inspect_table(&mut self, table_name: &str) -> DriverResult<Option<TableInfo>> {
        let driver = self.driver()?;
        if !driver.has_table(table_name)? {
            return Ok(None);
        }
        let columns = driver.columns(table_name)?;
        Ok(Some(TableInfo {
            table_name: table_name.to_string(),
            column_count: columns.len(),
            columns,
        }))
    }
}

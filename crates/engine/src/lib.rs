mod dialect;
mod driver;
mod executor;
mod identifiers;
mod logbook;
mod mssql;
mod pipeline;
mod postgres;
mod request;
mod sink;
mod sqlite;
mod target;
#[cfg(test)]
mod testing;
mod types;

pub use dialect::Dialect;
pub use driver::{Driver, DriverError, DriverFactory, DriverResult, NativeDrivers};
pub use executor::execute_command;
pub use identifiers::validate_table_name;
pub use logbook::LogBook;
pub use mssql::MssqlDriver;
pub use pipeline::{LoadResponse, Pipeline, Stage};
pub use postgres::PostgresDriver;
pub use request::{ConnectionConfig, Destination, IfExists, LoadRequest, Source};
pub use sink::{ConnectionReport, RelationalSink, TableInfo, WriteFailure, WriteSummary};
pub use sqlite::SqliteDriver;
pub use target::{ConfigError, ConnectionTarget, Engine, ServerTarget};
pub use types::EngineResult;

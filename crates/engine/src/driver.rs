use tabload_ingest::{Scalar, ScalarKind, Table};
use thiserror::Error;
use tokio::runtime::{Builder, Runtime};

use crate::dialect::Dialect;
use crate::request::IfExists;
use crate::target::ConnectionTarget;
use crate::{mssql, postgres, sqlite};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Mssql(#[from] tiberius::error::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Table '{0}' already exists.")]
    TableExists(String),
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("database connection is closed")]
    Closed,
    #[error("{0}")]
    Other(String),
}

impl DriverError {
    /// Errors raised by the database layer itself, as opposed to misuse or
    /// failures around it.
    pub fn is_database_error(&self) -> bool {
        matches!(
            self,
            DriverError::Sqlx(_) | DriverError::Mssql(_) | DriverError::Io(_)
        )
    }
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Blocking handle to one database. Implementations own whatever pool,
/// client config and runtime they need.
pub trait Driver {
    /// Round-trips `SELECT 1`.
    fn ping(&mut self) -> DriverResult<()>;

    fn has_table(&mut self, table_name: &str) -> DriverResult<bool>;

    /// Column names in ordinal order.
    fn columns(&mut self, table_name: &str) -> DriverResult<Vec<String>>;

    fn table_names(&mut self) -> DriverResult<Vec<String>>;

    /// Writes every row of `table` under `policy`; returns rows inserted.
    fn write_table(
        &mut self,
        table: &Table,
        table_name: &str,
        policy: IfExists,
        chunk_size: Option<usize>,
    ) -> DriverResult<usize>;

    fn dispose(&mut self) -> DriverResult<()>;
}

pub trait DriverFactory {
    fn open(&self, target: &ConnectionTarget) -> DriverResult<Box<dyn Driver>>;
}

/// sqlx for SQLite and PostgreSQL, tiberius for SQL Server.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeDrivers;

impl DriverFactory for NativeDrivers {
    fn open(&self, target: &ConnectionTarget) -> DriverResult<Box<dyn Driver>> {
        let driver: Box<dyn Driver> = match target {
            ConnectionTarget::Sqlite { file } => Box::new(sqlite::SqliteDriver::open(file)?),
            ConnectionTarget::Postgres(server) => {
                Box::new(postgres::PostgresDriver::open(server)?)
            }
            ConnectionTarget::Mssql(server) => Box::new(mssql::MssqlDriver::open(server)?),
        };
        Ok(driver)
    }
}

pub(crate) fn current_thread_runtime() -> DriverResult<Runtime> {
    Ok(Builder::new_current_thread().enable_all().build()?)
}

/// DDL to run before inserting, given whether the table already exists.
pub(crate) fn ddl_plan(
    dialect: &Dialect,
    table: &Table,
    table_name: &str,
    policy: IfExists,
    exists: bool,
) -> DriverResult<Vec<String>> {
    let create = dialect.create_table(table_name, table.columns());
    match (policy, exists) {
        (IfExists::Fail, true) => Err(DriverError::TableExists(table_name.to_string())),
        (IfExists::Replace, true) => Ok(vec![dialect.drop_table(table_name), create]),
        (IfExists::Append, true) => Ok(Vec::new()),
        (_, false) => Ok(vec![create]),
    }
}

/// One multi-row INSERT and the cells it binds, row by row.
pub(crate) struct InsertBatch<'t> {
    pub sql: String,
    pub params: Vec<(&'t Scalar, ScalarKind)>,
}

/// Splits `table` into INSERT statements sized for the dialect. Every cell
/// travels with its column kind so nulls can be bound with a concrete type.
pub(crate) fn insert_batches<'t>(
    dialect: Dialect,
    table: &'t Table,
    table_name: &'t str,
    chunk_size: Option<usize>,
) -> impl Iterator<Item = InsertBatch<'t>> + 't {
    let per_chunk = dialect.rows_per_chunk(table.columns().len(), chunk_size);
    chunks(table.row_count(), per_chunk).map(move |(start, end)| InsertBatch {
        sql: dialect.insert(table_name, table.columns(), end - start),
        params: (start..end)
            .flat_map(move |row| {
                table
                    .columns()
                    .iter()
                    .zip(table.row(row))
                    .map(|(column, value)| (value, column.kind))
            })
            .collect(),
    })
}

/// Row ranges `[start, end)` for chunked inserts.
fn chunks(row_count: usize, per_chunk: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..row_count)
        .step_by(per_chunk.max(1))
        .map(move |start| (start, (start + per_chunk.max(1)).min(row_count)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Engine;
    use tabload_ingest::Column;

    fn table() -> Table {
        Table::new(vec![Column::infer("id", vec!["1".into(), "2".into()])])
    }

    #[test]
    fn plan_per_policy() {
        let dialect = Dialect::new(Engine::Sqlite);
        let table = table();

        let err = ddl_plan(&dialect, &table, "t", IfExists::Fail, true).expect_err("exists");
        assert_eq!(err.to_string(), "Table 't' already exists.");

        let plan = ddl_plan(&dialect, &table, "t", IfExists::Replace, true).expect("replace");
        assert_eq!(plan[0], "DROP TABLE IF EXISTS \"t\"");
        assert!(plan[1].starts_with("CREATE TABLE"));

        let plan = ddl_plan(&dialect, &table, "t", IfExists::Append, true).expect("append");
        assert!(plan.is_empty());

        for policy in [IfExists::Fail, IfExists::Replace, IfExists::Append] {
            let plan = ddl_plan(&dialect, &table, "t", policy, false).expect("fresh");
            assert_eq!(plan.len(), 1);
        }
    }

    #[test]
    fn chunks_cover_all_rows() {
        let ranges: Vec<_> = chunks(5, 2).collect();
        assert_eq!(ranges, vec![(0, 2), (2, 4), (4, 5)]);
        assert_eq!(chunks(0, 10).count(), 0);
    }

    #[test]
    fn batches_carry_row_major_params() {
        let table = Table::new(vec![
            Column::infer("id", vec!["1".into(), "2".into(), "3".into()]),
            Column::infer("name", vec!["a".into(), String::new(), "c".into()]),
        ]);
        let dialect = Dialect::new(Engine::Postgres);

        let batches: Vec<_> = insert_batches(dialect, &table, "t", Some(2)).collect();

        assert_eq!(batches.len(), 2);
        assert!(batches[0].sql.ends_with("VALUES ($1, $2), ($3, $4)"));
        assert_eq!(batches[0].params.len(), 4);
        assert_eq!(batches[0].params[2], (&Scalar::Int(2), ScalarKind::Int));
        assert_eq!(batches[0].params[3], (&Scalar::Null, ScalarKind::Text));
        assert_eq!(batches[1].params, vec![
            (&Scalar::Int(3), ScalarKind::Int),
            (&Scalar::Text("c".into()), ScalarKind::Text),
        ]);
    }

    #[test]
    fn database_errors_are_distinguished() {
        let io = DriverError::Io(std::io::Error::other("refused"));
        assert!(io.is_database_error());
        assert!(!DriverError::Closed.is_database_error());
        assert!(!DriverError::Other("boom".into()).is_database_error());
    }
}

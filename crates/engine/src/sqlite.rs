use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Sqlite;
use tabload_ingest::{Scalar, ScalarKind, Table};
use tokio::runtime::Runtime;

use crate::dialect::Dialect;
use crate::driver::{
    current_thread_runtime, ddl_plan, insert_batches, Driver, DriverError, DriverResult,
};
use crate::request::IfExists;
use crate::target::Engine;

// SQLite resolves table names case-insensitively, so the lookup must too.
const HAS_TABLE: &str =
    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ? COLLATE NOCASE";

pub struct SqliteDriver {
    runtime: Runtime,
    pool: SqlitePool,
    dialect: Dialect,
}

impl SqliteDriver {
    /// Creates the pool without connecting; the file is created on first use.
    pub fn open(file: &str) -> DriverResult<Self> {
        let runtime = current_thread_runtime()?;
        let options = SqliteConnectOptions::new()
            .filename(file)
            .create_if_missing(true);
        let pool = {
            let _guard = runtime.enter();
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect_lazy_with(options)
        };
        Ok(Self {
            runtime,
            pool,
            dialect: Dialect::new(Engine::Sqlite),
        })
    }
}

impl Driver for SqliteDriver {
    fn ping(&mut self) -> DriverResult<()> {
        self.runtime
            .block_on(sqlx::query("SELECT 1").execute(&self.pool))?;
        Ok(())
    }

    fn has_table(&mut self, table_name: &str) -> DriverResult<bool> {
        let count = self.runtime.block_on(
            sqlx::query_scalar::<_, i64>(HAS_TABLE)
                .bind(table_name)
                .fetch_one(&self.pool),
        )?;
        Ok(count > 0)
    }

    fn columns(&mut self, table_name: &str) -> DriverResult<Vec<String>> {
        let names = self.runtime.block_on(
            sqlx::query_scalar::<_, String>("SELECT name FROM pragma_table_info(?) ORDER BY cid")
                .bind(table_name)
                .fetch_all(&self.pool),
        )?;
        Ok(names)
    }

    fn table_names(&mut self) -> DriverResult<Vec<String>> {
        let names = self.runtime.block_on(
            sqlx::query_scalar::<_, String>(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .fetch_all(&self.pool),
        )?;
        Ok(names)
    }

    fn write_table(
        &mut self,
        table: &Table,
        table_name: &str,
        policy: IfExists,
        chunk_size: Option<usize>,
    ) -> DriverResult<usize> {
        let dialect = self.dialect;
        let pool = &self.pool;
        self.runtime.block_on(async move {
            let mut tx = pool.begin().await?;
            let existing = sqlx::query_scalar::<_, i64>(HAS_TABLE)
                .bind(table_name)
                .fetch_one(&mut *tx)
                .await?;
            for statement in ddl_plan(&dialect, table, table_name, policy, existing > 0)? {
                sqlx::query(&statement).execute(&mut *tx).await?;
            }

            let mut written = 0usize;
            for batch in insert_batches(dialect, table, table_name, chunk_size) {
                let query = batch
                    .params
                    .iter()
                    .fold(sqlx::query(&batch.sql), |query, &(value, kind)| {
                        bind(query, value, kind)
                    });
                written += query.execute(&mut *tx).await?.rows_affected() as usize;
            }

            tx.commit().await?;
            Ok::<usize, DriverError>(written)
        })
    }

    fn dispose(&mut self) -> DriverResult<()> {
        self.runtime.block_on(self.pool.close());
        Ok(())
    }
}

fn bind<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Scalar,
    kind: ScalarKind,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match (value, kind) {
        (Scalar::Int(v), _) => query.bind(*v),
        (Scalar::Float(v), _) => query.bind(*v),
        (Scalar::Bool(v), _) => query.bind(*v),
        (Scalar::Text(v), _) => query.bind(v.clone()),
        (Scalar::Null, ScalarKind::Int) => query.bind(None::<i64>),
        (Scalar::Null, ScalarKind::Float) => query.bind(None::<f64>),
        (Scalar::Null, ScalarKind::Bool) => query.bind(None::<bool>),
        (Scalar::Null, ScalarKind::Text) => query.bind(None::<String>),
    }
}

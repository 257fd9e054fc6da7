use std::time::Duration;

use sqlx::postgres::{PgArguments, PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::query::Query;
use sqlx::Postgres;
use tabload_ingest::{Scalar, ScalarKind, Table};
use tokio::runtime::Runtime;

use crate::dialect::Dialect;
use crate::driver::{
    current_thread_runtime, ddl_plan, insert_batches, Driver, DriverError, DriverResult,
};
use crate::request::IfExists;
use crate::target::{Engine, ServerTarget};

const HAS_TABLE: &str = "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
     WHERE table_schema = current_schema() AND table_name = $1)";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct PostgresDriver {
    runtime: Runtime,
    pool: PgPool,
    dialect: Dialect,
}

impl PostgresDriver {
    pub fn open(server: &ServerTarget) -> DriverResult<Self> {
        let runtime = current_thread_runtime()?;
        let mut options = PgConnectOptions::new()
            .host(&server.host)
            .port(server.port)
            .username(&server.user)
            .database(&server.database);
        if let Some(password) = &server.password {
            options = options.password(password);
        }
        let pool = {
            let _guard = runtime.enter();
            PgPoolOptions::new()
                .max_connections(1)
                .acquire_timeout(CONNECT_TIMEOUT)
                .connect_lazy_with(options)
        };
        Ok(Self {
            runtime,
            pool,
            dialect: Dialect::new(Engine::Postgres),
        })
    }
}

impl Driver for PostgresDriver {
    fn ping(&mut self) -> DriverResult<()> {
        self.runtime
            .block_on(sqlx::query("SELECT 1").execute(&self.pool))?;
        Ok(())
    }

    fn has_table(&mut self, table_name: &str) -> DriverResult<bool> {
        let exists = self.runtime.block_on(
            sqlx::query_scalar::<_, bool>(HAS_TABLE)
                .bind(table_name)
                .fetch_one(&self.pool),
        )?;
        Ok(exists)
    }

    fn columns(&mut self, table_name: &str) -> DriverResult<Vec<String>> {
        let names = self.runtime.block_on(
            sqlx::query_scalar::<_, String>(
                "SELECT column_name::text FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = $1 \
                 ORDER BY ordinal_position",
            )
            .bind(table_name)
            .fetch_all(&self.pool),
        )?;
        Ok(names)
    }

    fn table_names(&mut self) -> DriverResult<Vec<String>> {
        let names = self.runtime.block_on(
            sqlx::query_scalar::<_, String>(
                "SELECT table_name::text FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
                 ORDER BY table_name",
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
            let exists = sqlx::query_scalar::<_, bool>(HAS_TABLE)
                .bind(table_name)
                .fetch_one(&mut *tx)
                .await?;
            for statement in ddl_plan(&dialect, table, table_name, policy, exists)? {
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

// Nulls are bound with the column's type so the server does not have to
// guess a parameter type from an untyped NULL.
fn bind<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Scalar,
    kind: ScalarKind,
) -> Query<'q, Postgres, PgArguments> {
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

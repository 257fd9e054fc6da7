use std::borrow::Cow;

use tabload_ingest::{Scalar, ScalarKind, Table};
use tiberius::{AuthMethod, Client, ColumnData, Config, ToSql};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::dialect::Dialect;
use crate::driver::{
    current_thread_runtime, ddl_plan, insert_batches, Driver, DriverError, DriverResult,
};
use crate::request::IfExists;
use crate::target::{Engine, ServerTarget};

type MssqlClient = Client<Compat<TcpStream>>;

const HAS_TABLE: &str = "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES \
     WHERE TABLE_TYPE = 'BASE TABLE' AND TABLE_NAME = @P1";

/// SQL Server over TDS. Holds only the client config; each operation opens
/// its own connection and closes it before returning.
pub struct MssqlDriver {
    runtime: Runtime,
    config: Config,
    dialect: Dialect,
}

impl MssqlDriver {
    pub fn open(server: &ServerTarget) -> DriverResult<Self> {
        let mut config = Config::new();
        config.host(&server.host);
        config.port(server.port);
        config.database(&server.database);
        config.authentication(AuthMethod::sql_server(
            &server.user,
            server.password.as_deref().unwrap_or_default(),
        ));
        config.trust_cert();
        Ok(Self {
            runtime: current_thread_runtime()?,
            config,
            dialect: Dialect::new(Engine::Mssql),
        })
    }
}

async fn connect(config: &Config) -> DriverResult<MssqlClient> {
    let tcp = TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true)?;
    Ok(Client::connect(config.clone(), tcp.compat_write()).await?)
}

async fn table_exists(client: &mut MssqlClient, table_name: &str) -> DriverResult<bool> {
    let rows = client
        .query(HAS_TABLE, &[&table_name])
        .await?
        .into_first_result()
        .await?;
    let count = rows
        .first()
        .and_then(|row| row.get::<i32, _>(0))
        .unwrap_or_default();
    Ok(count > 0)
}

async fn string_column(
    client: &mut MssqlClient,
    sql: &str,
    params: &[&dyn ToSql],
) -> DriverResult<Vec<String>> {
    let rows = client.query(sql, params).await?.into_first_result().await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.get::<&str, _>(0).map(str::to_string))
        .collect())
}

async fn insert_rows(
    client: &mut MssqlClient,
    dialect: Dialect,
    table: &Table,
    table_name: &str,
    policy: IfExists,
    chunk_size: Option<usize>,
) -> DriverResult<usize> {
    let exists = table_exists(client, table_name).await?;
    for statement in ddl_plan(&dialect, table, table_name, policy, exists)? {
        client.execute(statement.as_str(), &[]).await?;
    }

    let mut written = 0usize;
    for batch in insert_batches(dialect, table, table_name, chunk_size) {
        let params: Vec<Param<'_>> = batch
            .params
            .iter()
            .map(|&(value, kind)| Param { value, kind })
            .collect();
        let refs: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
        let result = client.execute(batch.sql.as_str(), &refs).await?;
        written += result.rows_affected().iter().sum::<u64>() as usize;
    }
    Ok(written)
}

impl Driver for MssqlDriver {
    fn ping(&mut self) -> DriverResult<()> {
        let config = &self.config;
        self.runtime.block_on(async move {
            let mut client = connect(config).await?;
            client.simple_query("SELECT 1").await?.into_results().await?;
            client.close().await?;
            Ok::<_, DriverError>(())
        })
    }

    fn has_table(&mut self, table_name: &str) -> DriverResult<bool> {
        let config = &self.config;
        self.runtime.block_on(async move {
            let mut client = connect(config).await?;
            let exists = table_exists(&mut client, table_name).await?;
            client.close().await?;
            Ok::<_, DriverError>(exists)
        })
    }

    fn columns(&mut self, table_name: &str) -> DriverResult<Vec<String>> {
        let config = &self.config;
        self.runtime.block_on(async move {
            let mut client = connect(config).await?;
            let names = string_column(
                &mut client,
                "SELECT COLUMN_NAME FROM INFORMATION_SCHEMA.COLUMNS \
                 WHERE TABLE_NAME = @P1 ORDER BY ORDINAL_POSITION",
                &[&table_name],
            )
            .await?;
            client.close().await?;
            Ok::<_, DriverError>(names)
        })
    }

    fn table_names(&mut self) -> DriverResult<Vec<String>> {
        let config = &self.config;
        self.runtime.block_on(async move {
            let mut client = connect(config).await?;
            let names = string_column(
                &mut client,
                "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
                 WHERE TABLE_TYPE = 'BASE TABLE' ORDER BY TABLE_NAME",
                &[],
            )
            .await?;
            client.close().await?;
            Ok::<_, DriverError>(names)
        })
    }

    fn write_table(
        &mut self,
        table: &Table,
        table_name: &str,
        policy: IfExists,
        chunk_size: Option<usize>,
    ) -> DriverResult<usize> {
        let config = &self.config;
        let dialect = self.dialect;
        self.runtime.block_on(async move {
            let mut client = connect(config).await?;
            client.simple_query("BEGIN TRANSACTION").await?.into_results().await?;
            match insert_rows(&mut client, dialect, table, table_name, policy, chunk_size).await {
                Ok(written) => {
                    client.simple_query("COMMIT").await?.into_results().await?;
                    client.close().await?;
                    Ok::<_, DriverError>(written)
                }
                Err(err) => {
                    if let Ok(stream) = client.simple_query("ROLLBACK").await {
                        let _ = stream.into_results().await;
                    }
                    Err(err)
                }
            }
        })
    }

    fn dispose(&mut self) -> DriverResult<()> {
        Ok(())
    }
}

/// A cell bound with its column's type, so nulls carry a concrete TDS type.
struct Param<'a> {
    value: &'a Scalar,
    kind: ScalarKind,
}

impl ToSql for Param<'_> {
    fn to_sql(&self) -> ColumnData<'_> {
        match (self.value, self.kind) {
            (Scalar::Int(v), _) => ColumnData::I64(Some(*v)),
            (Scalar::Float(v), _) => ColumnData::F64(Some(*v)),
            (Scalar::Bool(v), _) => ColumnData::Bit(Some(*v)),
            (Scalar::Text(v), _) => ColumnData::String(Some(Cow::Borrowed(v.as_str()))),
            (Scalar::Null, ScalarKind::Int) => ColumnData::I64(None),
            (Scalar::Null, ScalarKind::Float) => ColumnData::F64(None),
            (Scalar::Null, ScalarKind::Bool) => ColumnData::Bit(None),
            (Scalar::Null, ScalarKind::Text) => ColumnData::String(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_params_keep_column_type() {
        let null = Scalar::Null;
        let param = Param {
            value: &null,
            kind: ScalarKind::Int,
        };
        assert!(matches!(param.to_sql(), ColumnData::I64(None)));

        let text = Scalar::Text("Ada".into());
        let param = Param {
            value: &text,
            kind: ScalarKind::Text,
        };
        assert!(matches!(param.to_sql(), ColumnData::String(Some(ref s)) if s == "Ada"));
    }

    #[test]
    fn ping_against_closed_port_is_database_error() {
        let server = ServerTarget {
            user: "sa".to_string(),
            password: Some("pw".to_string()),
            host: "127.0.0.1".to_string(),
            port: 1,
            database: "master".to_string(),
        };
        let mut driver = MssqlDriver::open(&server).expect("open never connects");

        let err = driver.ping().expect_err("nothing listens on port 1");
        assert!(err.is_database_error());
    }
}

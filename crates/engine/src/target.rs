use std::fmt;

use thiserror::Error;
use url::form_urlencoded;

use crate::request::Destination;

/// Construction-time failures. These abort the pipeline.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unsupported database type: {0}")]
    UnsupportedEngine(String),
    #[error("database driver error: {0}")]
    Driver(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Sqlite,
    Postgres,
    Mssql,
}

impl Engine {
    pub fn parse(db_type: &str) -> Result<Self, ConfigError> {
        match db_type.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Engine::Sqlite),
            "postgresql" => Ok(Engine::Postgres),
            "mssql" => Ok(Engine::Mssql),
            _ => Err(ConfigError::UnsupportedEngine(db_type.to_string())),
        }
    }
}

/// Host-based connection settings after defaults have been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTarget {
    pub user: String,
    pub password: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    Sqlite { file: String },
    Postgres(ServerTarget),
    Mssql(ServerTarget),
}

impl ConnectionTarget {
    pub fn from_destination(destination: &Destination) -> Result<Self, ConfigError> {
        let conn = &destination.connection;
        let password = conn.password.clone().filter(|p| !p.is_empty());
        let database = conn
            .database
            .clone()
            .unwrap_or_else(|| destination.database_name.clone());
        let host = conn.host.clone().unwrap_or_else(|| "localhost".to_string());

        let target = match Engine::parse(&destination.db_type)? {
            Engine::Sqlite => {
                let file = conn
                    .database
                    .clone()
                    .filter(|db| !db.is_empty())
                    .unwrap_or_else(|| format!("{}.db", destination.database_name));
                ConnectionTarget::Sqlite { file }
            }
            Engine::Postgres => ConnectionTarget::Postgres(ServerTarget {
                user: conn.user.clone().unwrap_or_else(|| "postgres".to_string()),
                password,
                host,
                port: conn.port.unwrap_or(5432),
                database,
            }),
            Engine::Mssql => ConnectionTarget::Mssql(ServerTarget {
                user: conn.user.clone().unwrap_or_else(|| "root".to_string()),
                password,
                host,
                port: conn.port.unwrap_or(1433),
                database,
            }),
        };
        Ok(target)
    }

    pub fn engine(&self) -> Engine {
        match self {
            ConnectionTarget::Sqlite { .. } => Engine::Sqlite,
            ConnectionTarget::Postgres(_) => Engine::Postgres,
            ConnectionTarget::Mssql(_) => Engine::Mssql,
        }
    }

    /// URL-style connection string, e.g. `postgresql://user@host:5432/db`.
    pub fn connection_string(&self) -> String {
        match self {
            ConnectionTarget::Sqlite { file } => format!("sqlite:///{file}"),
            ConnectionTarget::Postgres(server) => {
                server_url("postgresql", &server.user, server.password.as_deref(), server)
            }
            ConnectionTarget::Mssql(server) => {
                let user = encode(&server.user);
                let password = server.password.as_deref().map(encode);
                server_url("mssql+pymssql", &user, password.as_deref(), server)
            }
        }
    }
}

impl fmt::Display for ConnectionTarget {
    /// Same as the connection string with any password masked.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked = |server: &ServerTarget| server.password.as_ref().map(|_| "***");
        let url = match self {
            ConnectionTarget::Sqlite { .. } => self.connection_string(),
            ConnectionTarget::Postgres(server) => {
                server_url("postgresql", &server.user, masked(server), server)
            }
            ConnectionTarget::Mssql(server) => {
                server_url("mssql+pymssql", &encode(&server.user), masked(server), server)
            }
        };
        f.write_str(&url)
    }
}

fn server_url(scheme: &str, user: &str, password: Option<&str>, server: &ServerTarget) -> String {
    let ServerTarget {
        host,
        port,
        database,
        ..
    } = server;
    match password {
        Some(password) => format!("{scheme}://{user}:{password}@{host}:{port}/{database}"),
        None => format!("{scheme}://{user}@{host}:{port}/{database}"),
    }
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

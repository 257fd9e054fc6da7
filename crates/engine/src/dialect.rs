use tabload_ingest::{Column, ScalarKind};

use crate::identifiers::quote_with;
use crate::target::Engine;

/// SQL text generation for one engine. Values are always bound as
/// parameters; only identifiers are spliced into the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    engine: Engine,
}

impl Dialect {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub fn quote(&self, name: &str) -> String {
        match self.engine {
            Engine::Mssql => quote_with(name, '[', ']'),
            Engine::Sqlite | Engine::Postgres => quote_with(name, '"', '"'),
        }
    }

    pub fn column_type(&self, kind: ScalarKind) -> &'static str {
        match (self.engine, kind) {
            (Engine::Sqlite, ScalarKind::Int) => "INTEGER",
            (Engine::Sqlite, ScalarKind::Float) => "REAL",
            (Engine::Sqlite, ScalarKind::Bool) => "BOOLEAN",
            (Engine::Sqlite, ScalarKind::Text) => "TEXT",
            (Engine::Postgres, ScalarKind::Int) => "BIGINT",
            (Engine::Postgres, ScalarKind::Float) => "DOUBLE PRECISION",
            (Engine::Postgres, ScalarKind::Bool) => "BOOLEAN",
            (Engine::Postgres, ScalarKind::Text) => "TEXT",
            (Engine::Mssql, ScalarKind::Int) => "BIGINT",
            (Engine::Mssql, ScalarKind::Float) => "FLOAT",
            (Engine::Mssql, ScalarKind::Bool) => "BIT",
            (Engine::Mssql, ScalarKind::Text) => "NVARCHAR(MAX)",
        }
    }

    /// 1-based positional parameter marker.
    pub fn placeholder(&self, position: usize) -> String {
        match self.engine {
            Engine::Sqlite => "?".to_string(),
            Engine::Postgres => format!("${position}"),
            Engine::Mssql => format!("@P{position}"),
        }
    }

    pub fn drop_table(&self, table_name: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote(table_name))
    }

    pub fn create_table(&self, table_name: &str, columns: &[Column]) -> String {
        let defs = columns
            .iter()
            .map(|col| format!("{} {}", self.quote(&col.name), self.column_type(col.kind)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE {} ({defs})", self.quote(table_name))
    }

    /// Multi-row insert with `rows` tuples of positional parameters.
    pub fn insert(&self, table_name: &str, columns: &[Column], rows: usize) -> String {
        let names = columns
            .iter()
            .map(|col| self.quote(&col.name))
            .collect::<Vec<_>>()
            .join(", ");
        let width = columns.len();
        let tuples = (0..rows)
            .map(|row| {
                let markers = (0..width)
                    .map(|col| self.placeholder(row * width + col + 1))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({markers})")
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({names}) VALUES {tuples}",
            self.quote(table_name)
        )
    }

    /// Rows per insert statement, honoring the caller's chunk size and the
    /// engine's bind-parameter and row-constructor limits.
    pub fn rows_per_chunk(&self, column_count: usize, requested: Option<usize>) -> usize {
        let (max_params, max_rows) = match self.engine {
            Engine::Sqlite => (32_766, usize::MAX),
            Engine::Postgres => (65_535, usize::MAX),
            Engine::Mssql => (2_000, 1_000),
        };
        let by_params = max_params / column_count.max(1);
        let limit = by_params.min(max_rows).max(1);
        match requested {
            Some(size) if size > 0 => size.min(limit),
            _ => limit,
        }
    }
}

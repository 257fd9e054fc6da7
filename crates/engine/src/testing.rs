//! Test doubles shared by the sink and pipeline tests.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use tabload_ingest::{Column, Table};

use crate::driver::{Driver, DriverError, DriverFactory, DriverResult};
use crate::request::IfExists;
use crate::target::ConnectionTarget;

pub use tabload_ingest::testing::RecordingLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Raised by the database layer.
    Database,
    /// Anything else.
    Unexpected,
}

impl Fault {
    fn raise(self) -> DriverError {
        match self {
            Fault::Database => DriverError::Io(io::Error::other("connection refused")),
            Fault::Unexpected => DriverError::Other("weird error".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Script {
    pub open: Option<Fault>,
    pub ping: Option<Fault>,
    pub write: Option<Fault>,
    pub inspect: Option<Fault>,
    pub dispose: Option<Fault>,
    /// Existing tables and their columns.
    pub tables: Vec<(String, Vec<String>)>,
}

#[derive(Debug, Default)]
pub struct Calls {
    pub opened: Vec<String>,
    pub pings: usize,
    pub writes: Vec<(String, IfExists, usize)>,
    pub disposed: usize,
}

#[derive(Clone, Default)]
pub struct ScriptedDrivers {
    script: Script,
    calls: Arc<Mutex<Calls>>,
}

impl ScriptedDrivers {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> MutexGuard<'_, Calls> {
        self.calls.lock().expect("calls lock")
    }
}

impl DriverFactory for ScriptedDrivers {
    fn open(&self, target: &ConnectionTarget) -> DriverResult<Box<dyn Driver>> {
        if let Some(fault) = self.script.open {
            return Err(fault.raise());
        }
        self.calls().opened.push(target.connection_string());
        Ok(Box::new(ScriptedDriver {
            script: self.script.clone(),
            calls: self.calls.clone(),
        }))
    }
}

struct ScriptedDriver {
    script: Script,
    calls: Arc<Mutex<Calls>>,
}

impl ScriptedDriver {
    fn inspect<T>(&self, found: impl FnOnce(&Script) -> T) -> DriverResult<T> {
        match self.script.inspect {
            Some(fault) => Err(fault.raise()),
            None => Ok(found(&self.script)),
        }
    }
}

impl Driver for ScriptedDriver {
    fn ping(&mut self) -> DriverResult<()> {
        self.calls.lock().expect("calls lock").pings += 1;
        self.script.ping.map_or(Ok(()), |fault| Err(fault.raise()))
    }

    fn has_table(&mut self, table_name: &str) -> DriverResult<bool> {
        self.inspect(|script| script.tables.iter().any(|(name, _)| name == table_name))
    }

    fn columns(&mut self, table_name: &str) -> DriverResult<Vec<String>> {
        self.inspect(|script| {
            script
                .tables
                .iter()
                .find(|(name, _)| name == table_name)
                .map(|(_, columns)| columns.clone())
                .unwrap_or_default()
        })
    }

    fn table_names(&mut self) -> DriverResult<Vec<String>> {
        self.inspect(|script| script.tables.iter().map(|(name, _)| name.clone()).collect())
    }

    fn write_table(
        &mut self,
        table: &Table,
        table_name: &str,
        policy: IfExists,
        _chunk_size: Option<usize>,
    ) -> DriverResult<usize> {
        self.calls.lock().expect("calls lock").writes.push((
            table_name.to_string(),
            policy,
            table.row_count(),
        ));
        match self.script.write {
            Some(fault) => Err(fault.raise()),
            None => Ok(table.row_count()),
        }
    }

    fn dispose(&mut self) -> DriverResult<()> {
        self.calls.lock().expect("calls lock").disposed += 1;
        self.script.dispose.map_or(Ok(()), |fault| Err(fault.raise()))
    }
}

pub fn ids(count: usize) -> Table {
    Table::new(vec![Column::infer(
        "id",
        (1..=count).map(|i| i.to_string()).collect(),
    )])
}

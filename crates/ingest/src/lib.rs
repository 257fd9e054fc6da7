mod logging;
mod reader;
mod table;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use logging::{forward, LogPort, TracingLog};
pub use reader::{CsvReader, ReadError, TabularSource};
pub use table::{Column, Scalar, ScalarKind, Table};

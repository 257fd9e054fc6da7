use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::logging::LogPort;
use crate::table::{Column, Table};

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Error parsing CSV file '{path}': {detail}")]
    Parse { path: String, detail: String },
    #[error("I/O error while reading CSV: {0}")]
    Io(String),
}

/// Anything that can turn a path into a [`Table`].
pub trait TabularSource {
    fn read(&self, path: &str) -> Result<Table, ReadError>;
}

/// Reads comma-delimited UTF-8 files whose first line is the header.
pub struct CsvReader {
    log: Arc<dyn LogPort>,
}

impl CsvReader {
    pub fn new(log: Arc<dyn LogPort>) -> Self {
        Self { log }
    }

    fn read_table(&self, path: &str) -> Result<Table, ReadError> {
        let file = File::open(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => ReadError::NotFound(path.to_string()),
            _ => ReadError::Io(err.to_string()),
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(file);

        let headers = dedupe_headers(
            reader
                .headers()
                .map_err(|err| classify(path, err))?
                .iter()
                .map(str::to_string)
                .collect(),
        );
        if headers.is_empty() {
            return Err(ReadError::Parse {
                path: path.to_string(),
                detail: "No columns to parse from file".to_string(),
            });
        }

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record.map_err(|err| classify(path, err))?;
            for (column, field) in cells.iter_mut().zip(record.iter()) {
                column.push(field.to_string());
            }
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, values)| Column::infer(name, values))
            .collect();
        Ok(Table::new(columns))
    }
}

impl TabularSource for CsvReader {
    fn read(&self, path: &str) -> Result<Table, ReadError> {
        self.log.info(&format!("Reading CSV file: {path}"));
        match self.read_table(path) {
            Ok(table) => {
                self.log.info(&format!(
                    "Successfully read {} rows from CSV",
                    table.row_count()
                ));
                Ok(table)
            }
            Err(ReadError::NotFound(path)) => {
                self.log.error(&format!("CSV file not found: {path}"));
                Err(ReadError::NotFound(path))
            }
            Err(err) => {
                self.log.error(&format!("Error loading CSV file: {err}"));
                Err(err)
            }
        }
    }
}

/// Renames repeated header names to `name.1`, `name.2`, ... If a suffixed
/// name is already taken the suffix is applied again (`a.1.1`), so every
/// column name ends up unique.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .into_iter()
        .map(|header| {
            let mut name = header;
            let mut count = seen.get(&name).copied().unwrap_or(0);
            while count > 0 {
                seen.insert(name.clone(), count + 1);
                name = format!("{name}.{count}");
                count = seen.get(&name).copied().unwrap_or(0);
            }
            seen.insert(name.clone(), 1);
            name
        })
        .collect()
}

fn classify(path: &str, err: csv::Error) -> ReadError {
    if err.is_io_error() {
        ReadError::Io(err.to_string())
    } else {
        ReadError::Parse {
            path: path.to_string(),
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Scalar, ScalarKind};
    use crate::testing::RecordingLog;
    use std::fs;
    use std::io::Write;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tracing::Level;

    fn reader() -> (CsvReader, Arc<RecordingLog>) {
        let log = Arc::new(RecordingLog::default());
        (CsvReader::new(log.clone()), log)
    }

    #[test]
    fn reads_header_and_rows_in_file_order() {
        let path = write_csv("name,age\nAlice,25\nBob,30\n");
        let (reader, log) = reader();

        let table = reader.read(&path).expect("read");

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_names(), vec!["name", "age"]);
        assert_eq!(table.columns()[1].kind, ScalarKind::Int);
        assert_eq!(table.columns()[0].values[1], Scalar::Text("Bob".into()));
        assert!(log.contains(Level::INFO, "Successfully read 2 rows"));
        cleanup(&path);
    }

    #[test]
    fn header_only_file_yields_zero_rows() {
        let path = write_csv("id,name\n");
        let (reader, _) = reader();

        let table = reader.read(&path).expect("read");

        assert!(table.is_empty());
        assert_eq!(table.column_names(), vec!["id", "name"]);
        cleanup(&path);
    }

    #[test]
    fn repeated_headers_get_numeric_suffixes() {
        let path = write_csv("a,a,b,a\n1,2,3,4\n");
        let (reader, _) = reader();

        let table = reader.read(&path).expect("read");

        assert_eq!(table.column_names(), vec!["a", "a.1", "b", "a.2"]);
        assert_eq!(table.columns()[3].values[0], Scalar::Int(4));
        cleanup(&path);
    }

    #[test]
    fn suffix_already_in_header_is_skipped() {
        fn names(raw: &[&str]) -> Vec<String> {
            dedupe_headers(raw.iter().map(|h| h.to_string()).collect())
        }

        assert_eq!(names(&["a", "a.1", "a"]), vec!["a", "a.1", "a.1.1"]);
        assert_eq!(names(&["a", "a", "a.1"]), vec!["a", "a.1", "a.1.1"]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let (reader, log) = reader();

        let err = reader
            .read("/tmp/tabload_definitely_missing.csv")
            .expect_err("should fail");

        assert!(matches!(err, ReadError::NotFound(_)));
        assert!(err.to_string().contains("File not found"));
        assert!(log.contains(Level::ERROR, "CSV file not found"));
    }

    #[test]
    fn ragged_row_is_parse_error() {
        let path = write_csv("a,b\n1,2\n3,4,5\n");
        let (reader, _) = reader();

        let err = reader.read(&path).expect_err("should fail");

        assert!(matches!(err, ReadError::Parse { .. }), "got {err:?}");
        cleanup(&path);
    }

    #[test]
    fn empty_file_is_parse_error() {
        let path = write_csv("");
        let (reader, _) = reader();

        let err = reader.read(&path).expect_err("should fail");

        assert!(err.to_string().contains("No columns to parse"));
        cleanup(&path);
    }

    #[test]
    fn directory_is_io_error() {
        let (reader, log) = reader();

        let err = reader.read("/tmp").expect_err("should fail");

        assert!(matches!(err, ReadError::Io(_)), "got {err:?}");
        assert!(log.contains(Level::ERROR, "Error loading CSV file"));
    }

    fn write_csv(contents: &str) -> String {
        let path = format!("/tmp/tabload_reader_test_{}.csv", unique_suffix());
        let mut file = fs::File::create(&path).expect("create csv");
        file.write_all(contents.as_bytes()).expect("write csv");
        path
    }

    fn cleanup(path: &str) {
        let _ = fs::remove_file(path);
    }

    fn unique_suffix() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos()
    }
}

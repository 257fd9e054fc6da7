use crate::driver::DriverError;

/// Table names end up quoted inside generated DDL/DML, so anything printable
/// is allowed; empty names and control characters are not.
pub fn validate_table_name(table_name: &str) -> Result<(), DriverError> {
    if table_name.trim().is_empty() {
        return Err(DriverError::InvalidIdentifier("table name is empty".into()));
    }
    if table_name.chars().any(char::is_control) {
        return Err(DriverError::InvalidIdentifier(format!(
            "table name {table_name:?} contains control characters"
        )));
    }
    Ok(())
}

/// Wraps `name` in `open`/`close`, doubling any embedded `close` delimiter.
pub fn quote_with(name: &str, open: char, close: char) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push(open);
    for ch in name.chars() {
        if ch == close {
            quoted.push(close);
        }
        quoted.push(ch);
    }
    quoted.push(close);
    quoted
}

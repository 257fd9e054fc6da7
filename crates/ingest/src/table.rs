/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Int,
    Float,
    Bool,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ScalarKind,
    pub values: Vec<Scalar>,
}

impl Column {
    /// Builds a column from raw cell text, inferring one kind for the whole
    /// column. Empty cells become `Null` and do not take part in inference.
    pub fn infer(name: impl Into<String>, cells: Vec<String>) -> Self {
        let kind = infer_kind(&cells);
        let values = cells
            .into_iter()
            .map(|cell| parse_cell(cell, kind))
            .collect();
        Self {
            name: name.into(),
            kind,
            values,
        }
    }
}

/// Column-major in-memory table. Every column holds the same number of values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        debug_assert!(
            columns
                .windows(2)
                .all(|pair| pair[0].values.len() == pair[1].values.len()),
            "columns must have equal length"
        );
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|col| col.name.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |col| col.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Cells of row `index` in column order.
    pub fn row(&self, index: usize) -> impl Iterator<Item = &Scalar> + '_ {
        self.columns.iter().map(move |col| &col.values[index])
    }
}

fn infer_kind(cells: &[String]) -> ScalarKind {
    let mut present = cells.iter().filter(|cell| !cell.is_empty()).peekable();
    if present.peek().is_none() {
        return ScalarKind::Text;
    }
    let present: Vec<&String> = present.collect();
    if present.iter().all(|cell| cell.parse::<i64>().is_ok()) {
        ScalarKind::Int
    } else if present.iter().all(|cell| cell.parse::<f64>().is_ok()) {
        ScalarKind::Float
    } else if present.iter().all(|cell| parse_bool(cell).is_some()) {
        ScalarKind::Bool
    } else {
        ScalarKind::Text
    }
}

fn parse_cell(cell: String, kind: ScalarKind) -> Scalar {
    if cell.is_empty() {
        return Scalar::Null;
    }
    match kind {
        ScalarKind::Int => cell.parse().map_or(Scalar::Null, Scalar::Int),
        ScalarKind::Float => cell.parse().map_or(Scalar::Null, Scalar::Float),
        ScalarKind::Bool => parse_bool(&cell).map_or(Scalar::Null, Scalar::Bool),
        ScalarKind::Text => Scalar::Text(cell),
    }
}

fn parse_bool(cell: &str) -> Option<bool> {
    if cell.eq_ignore_ascii_case("true") {
        Some(true)
    } else if cell.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn integer_column_with_gap() {
        let col = Column::infer("age", cells(&["25", "", "30"]));
        assert_eq!(col.kind, ScalarKind::Int);
        assert_eq!(
            col.values,
            vec![Scalar::Int(25), Scalar::Null, Scalar::Int(30)]
        );
    }

    #[test]
    fn mixed_numbers_widen_to_float() {
        let col = Column::infer("score", cells(&["1", "2.5"]));
        assert_eq!(col.kind, ScalarKind::Float);
        assert_eq!(col.values, vec![Scalar::Float(1.0), Scalar::Float(2.5)]);
    }

    #[test]
    fn booleans_ignore_case() {
        let col = Column::infer("active", cells(&["True", "false"]));
        assert_eq!(col.kind, ScalarKind::Bool);
        assert_eq!(col.values, vec![Scalar::Bool(true), Scalar::Bool(false)]);
    }

    #[test]
    fn anything_else_is_text() {
        let col = Column::infer("name", cells(&["Alice", "42"]));
        assert_eq!(col.kind, ScalarKind::Text);
        assert_eq!(col.values[1], Scalar::Text("42".to_string()));
    }

    #[test]
    fn all_empty_column_is_text_of_nulls() {
        let col = Column::infer("note", cells(&["", ""]));
        assert_eq!(col.kind, ScalarKind::Text);
        assert_eq!(col.values, vec![Scalar::Null, Scalar::Null]);
    }

    #[test]
    fn table_without_columns_is_empty() {
        let table = Table::default();
        assert_eq!(table.row_count(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn row_walks_columns_in_order() {
        let table = Table::new(vec![
            Column::infer("id", cells(&["1", "2"])),
            Column::infer("name", cells(&["a", "b"])),
        ]);
        let second: Vec<&Scalar> = table.row(1).collect();
        assert_eq!(
            second,
            vec![&Scalar::Int(2), &Scalar::Text("b".to_string())]
        );
        assert_eq!(table.column_names(), vec!["id", "name"]);
    }
}

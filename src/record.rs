//! Catalog rows: opaque header-keyed cells plus the typed `Product` projection.

use crate::config::Columns;
use ahash::AHashMap;
use serde::Serialize;
use std::fmt;

/// A single spreadsheet cell. Numbers keep their JSON representation so that
/// identifiers such as `1001` stringify without a fractional part.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(serde_json::Number),
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Map a JSON value onto a cell. Nested values are kept as compact JSON text.
    pub fn from_json(v: &serde_json::Value) -> Self {
        use serde_json::Value;
        match v {
            Value::Null => Cell::Empty,
            Value::String(s) => Cell::Text(s.clone()),
            Value::Number(n) => Cell::Number(n.clone()),
            Value::Bool(b) => Cell::Text(b.to_string()),
            other => Cell::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Cell::Empty => serde_json::Value::String(String::new()),
            Cell::Text(s) => serde_json::Value::String(s.clone()),
            Cell::Number(n) => serde_json::Value::Number(n.clone()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => {
                // 1001.0 from a float-typed source still means id 1001
                if let Some(x) = n.as_f64().filter(|_| n.is_f64()) {
                    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 {
                        return write!(f, "{}", x as i64);
                    }
                }
                write!(f, "{}", n)
            }
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() { Cell::Empty } else { Cell::Text(s.to_string()) }
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        if s.is_empty() { Cell::Empty } else { Cell::Text(s) }
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Number(n.into())
    }
}

impl From<i32> for Cell {
    fn from(n: i32) -> Self {
        Cell::Number(n.into())
    }
}

/// One catalog row keyed by header name. Header order lives on the `Table`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    cells: AHashMap<String, Cell>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, header: impl Into<String>, cell: impl Into<Cell>) -> Self {
        self.set(header, cell);
        self
    }

    pub fn set(&mut self, header: impl Into<String>, cell: impl Into<Cell>) {
        self.cells.insert(header.into(), cell.into());
    }

    pub fn get(&self, header: &str) -> Option<&Cell> {
        self.cells.get(header)
    }

    /// Stringified cell, empty when the header is absent.
    pub fn text(&self, header: &str) -> String {
        self.cells.get(header).map(|c| c.to_string()).unwrap_or_default()
    }

    pub fn is_blank(&self) -> bool {
        self.cells.values().all(Cell::is_blank)
    }
}

/// Ordered header names plus ordered rows, as produced by the sheet codecs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Required headers not present in this table.
    pub fn missing_headers<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required.iter().copied().filter(|r| !self.has_header(r)).collect()
    }
}

/// The fields of a catalog row the model sees. All identifiers are opaque strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub parent_id: String,
    pub child_id: String,
    pub title: String,
    pub category: String,
}

impl Product {
    pub fn from_row(row: &Row, columns: &Columns) -> Self {
        Self {
            parent_id: row.text(&columns.parent_id),
            child_id: row.text(&columns.child_id),
            title: row.text(&columns.title),
            category: row.text(&columns.category),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_cells_stringify_like_identifiers() {
        assert_eq!(Cell::from(1001).to_string(), "1001");
        let float_id = Cell::from_json(&serde_json::json!(1001.0));
        assert_eq!(float_id.to_string(), "1001");
        let price = Cell::from_json(&serde_json::json!(12.5));
        assert_eq!(price.to_string(), "12.5");
    }

    #[test]
    fn product_projection_reads_configured_columns() {
        let cols = Columns::default();
        let row = Row::new()
            .with("VS Parent ID", 77)
            .with("VS Child ID", "77-A")
            .with("Parent Product Title", "Faro Basin Tap")
            .with("Colour", "Chrome");
        let p = Product::from_row(&row, &cols);
        assert_eq!(p.parent_id, "77");
        assert_eq!(p.child_id, "77-A");
        assert_eq!(p.category, "");
        assert_eq!(row.text("Colour"), "Chrome");
    }
}

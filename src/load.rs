use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::JoinError;
use crate::model::{Relation, Value};

/// How to parse a CSV column's cells. Columns without an entry in the kind
/// map default to `Text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    Number,
    Date,
}

/// Parse CSV text (header row required) into a `Relation`. Empty cells
/// become `Value::Null`. Dates use `%Y-%m-%d`.
pub fn relation_from_csv(
    data: &str,
    kinds: &HashMap<String, ColumnKind>,
) -> Result<Relation, JoinError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| JoinError::Io(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let column_kinds: Vec<ColumnKind> = columns
        .iter()
        .map(|c| kinds.get(c).copied().unwrap_or(ColumnKind::Text))
        .collect();

    let mut rows = Vec::new();
    for (ri, record) in reader.records().enumerate() {
        let record = record.map_err(|e| JoinError::Io(e.to_string()))?;
        let mut row = Vec::with_capacity(columns.len());
        for (ci, column) in columns.iter().enumerate() {
            let cell = record.get(ci).unwrap_or("");
            row.push(parse_cell(cell, column_kinds[ci], ri, column)?);
        }
        rows.push(row);
    }

    Relation::new(columns, rows)
}

fn parse_cell(
    cell: &str,
    kind: ColumnKind,
    row: usize,
    column: &str,
) -> Result<Value, JoinError> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(Value::Null);
    }
    match kind {
        ColumnKind::Text => Ok(Value::from(cell)),
        ColumnKind::Number => cell
            .parse::<f64>()
            .map(Value::num)
            .map_err(|_| JoinError::NumberParse {
                row,
                column: column.to_string(),
                value: cell.to_string(),
            }),
        ColumnKind::Date => NaiveDate::parse_from_str(cell, "%Y-%m-%d")
            .map(Value::from)
            .map_err(|_| JoinError::DateParse {
                row,
                column: column.to_string(),
                value: cell.to_string(),
            }),
    }
}

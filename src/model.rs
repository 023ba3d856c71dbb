use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::error::JoinError;

// ---------------------------------------------------------------------------
// Scalar values
// ---------------------------------------------------------------------------

/// A single cell value. Closed set of kinds; the distance strategy for a
/// fuzzy key is picked once from the kind of its values.
///
/// Numbers are wrapped in `OrderedFloat` so value tuples have a total order
/// and can key B-tree maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Str(String),
    Num(OrderedFloat<f64>),
    Date(NaiveDate),
}

impl Value {
    pub fn num(v: f64) -> Self {
        Self::Num(OrderedFloat(v))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Kind name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Str(_) => "string",
            Self::Num(_) => "number",
            Self::Date(_) => "date",
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Num(OrderedFloat(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Num(OrderedFloat(v as f64))
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

/// An in-memory table: named columns, row-major cells. Immutable input to
/// the join engines; merge outputs are built as fresh relations.
#[derive(Debug, Clone, Serialize)]
pub struct Relation {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Relation {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, JoinError> {
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].contains(col) {
                return Err(JoinError::DuplicateColumn(col.clone()));
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(JoinError::RowWidth {
                    row: i,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub(crate) fn require_column(&self, name: &str, side: &'static str) -> Result<usize, JoinError> {
        self.column_index(name).ok_or_else(|| JoinError::UnknownColumn {
            side,
            column: name.to_string(),
        })
    }

    pub(crate) fn require_columns(
        &self,
        names: &[String],
        side: &'static str,
    ) -> Result<Vec<usize>, JoinError> {
        names.iter().map(|n| self.require_column(n, side)).collect()
    }
}

// ---------------------------------------------------------------------------
// Match results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchType {
    #[serde(rename = "exact")]
    Exact,
    #[serde(rename = "top1 left")]
    Top1Left,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Top1Left => write!(f, "top1 left"),
        }
    }
}

/// One matched value pair. The diagnostics side-channel: keyed by
/// (block, left value) rather than smuggled through sentinel columns.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRecord {
    /// Blocking key values this match was scoped to (empty when unblocked).
    pub block: Vec<Value>,
    pub left: Value,
    pub right: Value,
    pub distance: f64,
    pub match_type: MatchType,
    /// True when another right value attains the same minimum distance.
    pub tied: bool,
}

/// Value-level match table for one key, ordered by (block, left, right).
#[derive(Debug, Clone, Serialize)]
pub struct Top1Table {
    pub records: Vec<MatchRecord>,
    /// `Some(true)` when any left value tied. `None` when the strategy
    /// cannot tie (sorted nearest-neighbor path).
    pub duplicates: Option<bool>,
}

impl Top1Table {
    /// First record for a left value, ignoring blocks. Test/audit helper.
    pub fn record_for(&self, left: &Value) -> Option<&MatchRecord> {
        self.records.iter().find(|r| &r.left == left)
    }
}

// ---------------------------------------------------------------------------
// Merge outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MergeOutput {
    pub merged: Relation,
    pub top1: Top1Table,
    pub duplicates: Option<bool>,
}

/// Multi-key merge output. `top1` preserves key-level order.
#[derive(Debug, Clone, Serialize)]
pub struct MultiMergeOutput {
    pub merged: Relation,
    pub top1: Vec<(String, Top1Table)>,
    pub duplicates: Option<bool>,
}

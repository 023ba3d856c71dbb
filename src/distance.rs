use std::fmt;

use crate::error::JoinError;
use crate::model::{Relation, Value};

/// Caller-supplied string distance. Must be deterministic, non-negative,
/// and zero iff the inputs are equal.
pub type DistanceFn = Box<dyn Fn(&str, &str) -> f64>;

/// Distance strategy for one fuzzy key, selected once at configuration
/// time from the kind of the key's values.
pub enum KeyStrategy {
    /// Levenshtein edit distance.
    Text,
    /// Absolute difference.
    Numeric,
    /// Absolute difference in days.
    Temporal,
    /// Custom string distance.
    Custom(DistanceFn),
}

impl fmt::Debug for KeyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "Text",
            Self::Numeric => "Numeric",
            Self::Temporal => "Temporal",
            Self::Custom(_) => "Custom(..)",
        })
    }
}

impl KeyStrategy {
    /// Infer a strategy from the first non-null value of a column. A column
    /// with no non-null values has no usable strategy.
    pub fn infer(rel: &Relation, column: &str, side: &'static str) -> Result<Self, JoinError> {
        let idx = rel.require_column(column, side)?;
        for row in rel.rows() {
            match &row[idx] {
                Value::Null => continue,
                Value::Str(_) => return Ok(Self::Text),
                Value::Num(_) => return Ok(Self::Numeric),
                Value::Date(_) => return Ok(Self::Temporal),
            }
        }
        Err(JoinError::UnsupportedKeyType {
            column: column.to_string(),
            kind: "null",
        })
    }

    pub fn is_ordered(&self) -> bool {
        matches!(self, Self::Numeric | Self::Temporal)
    }

    /// Kind of value this strategy scores, for error messages.
    pub fn value_kind(&self) -> &'static str {
        match self {
            Self::Text | Self::Custom(_) => "string",
            Self::Numeric => "number",
            Self::Temporal => "date",
        }
    }

    /// Distance between two key values. Mixed or mismatched kinds have no
    /// defined distance and fail.
    pub fn distance(&self, column: &str, left: &Value, right: &Value) -> Result<f64, JoinError> {
        match (self, left, right) {
            (Self::Text, Value::Str(a), Value::Str(b)) => Ok(strsim::levenshtein(a, b) as f64),
            (Self::Custom(f), Value::Str(a), Value::Str(b)) => Ok(f(a, b)),
            (Self::Numeric, Value::Num(a), Value::Num(b)) => Ok((a.0 - b.0).abs()),
            (Self::Temporal, Value::Date(a), Value::Date(b)) => {
                Ok((*a - *b).num_days().abs() as f64)
            }
            (_, l, r) => Err(JoinError::UnsupportedKeyType {
                column: column.to_string(),
                kind: if l.kind() == r.kind() { l.kind() } else { "mixed" },
            }),
        }
    }
}

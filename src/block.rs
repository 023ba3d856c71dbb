use std::collections::{BTreeMap, BTreeSet};

use crate::error::JoinError;
use crate::model::{Relation, Value};

/// Blocking key values, one per exact key column. Empty when unblocked.
pub type BlockKey = Vec<Value>;

/// Distinct fuzzy key values per block. With an empty blocking list the
/// whole relation is one implicit block keyed by the empty tuple.
pub type KeyedValues = BTreeMap<BlockKey, BTreeSet<Value>>;

/// Extract the distinct (block tuple, fuzzy value) pairs of one side.
/// Rows with a null fuzzy value or a null blocking component carry no
/// matchable key and are skipped.
pub fn keyed_values(
    rel: &Relation,
    exact_on: &[String],
    fuzzy_on: &str,
    side: &'static str,
) -> Result<KeyedValues, JoinError> {
    let block_idx = rel.require_columns(exact_on, side)?;
    let fuzzy_idx = rel.require_column(fuzzy_on, side)?;

    let mut out = KeyedValues::new();
    for row in rel.rows() {
        let value = &row[fuzzy_idx];
        if value.is_null() {
            continue;
        }
        let block: BlockKey = block_idx.iter().map(|&i| row[i].clone()).collect();
        if block.iter().any(Value::is_null) {
            continue;
        }
        out.entry(block).or_default().insert(value.clone());
    }
    Ok(out)
}

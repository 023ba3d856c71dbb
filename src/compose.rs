use std::collections::BTreeMap;

use crate::block::BlockKey;
use crate::error::JoinError;
use crate::model::{MatchRecord, Relation, Top1Table, Value};

/// Key columns a row-level merge joins on.
pub struct ComposeKeys<'a> {
    pub fuzzy_left: &'a str,
    pub fuzzy_right: &'a str,
    pub exact_left: &'a [String],
    pub exact_right: &'a [String],
}

/// Expand a value-level match table back to row level: left rows fan out
/// across their match records (ties multiply rows), each record fans out
/// across the right rows holding the matched value in the same block.
/// Left rows with no match record produce nothing.
///
/// Diagnostic columns are appended only when `keep_debug` is set — there
/// is nothing to strip otherwise.
pub fn compose(
    left: &Relation,
    right: &Relation,
    top1: &Top1Table,
    keys: &ComposeKeys<'_>,
    keep_debug: bool,
) -> Result<Relation, JoinError> {
    let left_fuzzy = left.require_column(keys.fuzzy_left, "left")?;
    let left_block = left.require_columns(keys.exact_left, "left")?;
    let right_fuzzy = right.require_column(keys.fuzzy_right, "right")?;
    let right_block = right.require_columns(keys.exact_right, "right")?;

    let mut by_left: BTreeMap<(BlockKey, Value), Vec<&MatchRecord>> = BTreeMap::new();
    for rec in &top1.records {
        by_left
            .entry((rec.block.clone(), rec.left.clone()))
            .or_default()
            .push(rec);
    }

    let mut right_rows: BTreeMap<(BlockKey, Value), Vec<usize>> = BTreeMap::new();
    for (i, row) in right.rows().iter().enumerate() {
        let block: BlockKey = right_block.iter().map(|&j| row[j].clone()).collect();
        right_rows
            .entry((block, row[right_fuzzy].clone()))
            .or_default()
            .push(i);
    }

    let mut columns = left.columns().to_vec();
    if keep_debug {
        for name in ["top1_left", "top1_right", "top1_diff", "top1_matchtype"] {
            columns.push(unique_name(&columns, name));
        }
    }
    for col in right.columns() {
        columns.push(unique_name(&columns, col));
    }

    let mut rows = Vec::new();
    for lrow in left.rows() {
        let block: BlockKey = left_block.iter().map(|&j| lrow[j].clone()).collect();
        let key = (block, lrow[left_fuzzy].clone());
        let Some(records) = by_left.get(&key) else {
            continue;
        };
        for rec in records {
            let rkey = (rec.block.clone(), rec.right.clone());
            let Some(indices) = right_rows.get(&rkey) else {
                continue;
            };
            for &ri in indices {
                let mut row = lrow.clone();
                if keep_debug {
                    row.push(rec.left.clone());
                    row.push(rec.right.clone());
                    row.push(Value::num(rec.distance));
                    row.push(Value::Str(rec.match_type.to_string()));
                }
                row.extend(right.rows()[ri].iter().cloned());
                rows.push(row);
            }
        }
    }

    Relation::new(columns, rows)
}

/// Suffix a right-side column name until it no longer collides.
pub(crate) fn unique_name(taken: &[String], name: &str) -> String {
    let mut out = name.to_string();
    while taken.contains(&out) {
        out.push_str("_right");
    }
    out
}

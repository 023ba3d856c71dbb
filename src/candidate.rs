use crate::block::{BlockKey, KeyedValues};
use crate::model::Value;

/// A (left, right) value pair awaiting scoring, scoped to its block.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub block: BlockKey,
    pub left: Value,
    pub right: Value,
}

/// Candidate pairs for one key. Exact pairs (value present verbatim on
/// both sides of a block) are pre-classified and never scored.
#[derive(Debug, Default)]
pub struct CandidateSet {
    pub exact: Vec<(BlockKey, Value)>,
    pub fuzzy: Vec<Candidate>,
}

/// Generate candidates per matched block: exact = L ∩ R, fuzzy pairs =
/// (L − R) × R. A block present on only one side yields nothing — its
/// left values cannot be matched.
pub fn generate(left: &KeyedValues, right: &KeyedValues) -> CandidateSet {
    let mut out = CandidateSet::default();
    for (block, left_values) in left {
        let Some(right_values) = right.get(block) else {
            continue;
        };
        for value in left_values {
            if right_values.contains(value) {
                out.exact.push((block.clone(), value.clone()));
            } else {
                for rv in right_values {
                    out.fuzzy.push(Candidate {
                        block: block.clone(),
                        left: value.clone(),
                        right: rv.clone(),
                    });
                }
            }
        }
    }
    out
}

use std::collections::BTreeMap;

use crate::block::BlockKey;
use crate::candidate::{Candidate, CandidateSet};
use crate::distance::KeyStrategy;
use crate::error::JoinError;
use crate::model::{MatchRecord, MatchType, Top1Table, Value};

/// Score fuzzy candidates and keep, per (block, left value), every pair
/// attaining the minimum distance. Ties are all kept and flagged; picking
/// a winner is the caller's business. Exact pairs bypass scoring.
pub fn select_top1(
    candidates: &CandidateSet,
    strategy: &KeyStrategy,
    key: &str,
) -> Result<Top1Table, JoinError> {
    let mut records: Vec<MatchRecord> = candidates
        .exact
        .iter()
        .map(|(block, value)| MatchRecord {
            block: block.clone(),
            left: value.clone(),
            right: value.clone(),
            distance: 0.0,
            match_type: MatchType::Exact,
            tied: false,
        })
        .collect();

    let mut any_tied = false;

    // Group candidates by (block, left) regardless of arrival order, then
    // keep each group's minimum-distance subset.
    let mut groups: BTreeMap<(&BlockKey, &Value), Vec<&Candidate>> = BTreeMap::new();
    for c in &candidates.fuzzy {
        groups.entry((&c.block, &c.left)).or_default().push(c);
    }

    for group in groups.values() {
        let mut distances = Vec::with_capacity(group.len());
        let mut min = f64::INFINITY;
        for c in group {
            let d = strategy.distance(key, &c.left, &c.right)?;
            if d < min {
                min = d;
            }
            distances.push(d);
        }

        let winners: Vec<usize> = (0..group.len())
            .filter(|&i| distances[i] == min)
            .collect();
        let tied = winners.len() > 1;
        any_tied |= tied;

        for i in winners {
            records.push(MatchRecord {
                block: group[i].block.clone(),
                left: group[i].left.clone(),
                right: group[i].right.clone(),
                distance: distances[i],
                match_type: MatchType::Top1Left,
                tied,
            });
        }
    }

    if any_tied {
        log::warn!("top1 join on '{key}' has duplicate minimum-distance matches");
    }

    records.sort_by(|a, b| {
        (&a.block, &a.left, &a.right).cmp(&(&b.block, &b.left, &b.right))
    });

    Ok(Top1Table {
        records,
        duplicates: Some(any_tied),
    })
}

use crate::block::KeyedValues;
use crate::config::Direction;
use crate::distance::KeyStrategy;
use crate::error::JoinError;
use crate::model::{MatchRecord, MatchType, Value};

/// Sorted-merge nearest-neighbor join for ordered (numeric/temporal) keys.
/// Linear-ish per block: distinct values are already sorted, each left
/// value does one binary search. At most one match per left value; a left
/// value with no admissible right value under the direction constraint
/// emits no record.
pub fn nearest_join(
    left: &KeyedValues,
    right: &KeyedValues,
    direction: Direction,
    strategy: &KeyStrategy,
    key: &str,
) -> Result<Vec<MatchRecord>, JoinError> {
    let mut records = Vec::new();
    for (block, left_values) in left {
        let Some(right_values) = right.get(block) else {
            continue;
        };
        let sorted: Vec<&Value> = right_values.iter().collect();
        for lv in left_values {
            let Some(rv) = pick(lv, &sorted, direction, strategy, key)? else {
                continue;
            };
            let distance = strategy.distance(key, lv, rv)?;
            records.push(MatchRecord {
                block: block.clone(),
                left: lv.clone(),
                right: rv.clone(),
                distance,
                match_type: if lv == rv {
                    MatchType::Exact
                } else {
                    MatchType::Top1Left
                },
                tied: false,
            });
        }
    }
    Ok(records)
}

fn pick<'a>(
    left: &Value,
    sorted: &[&'a Value],
    direction: Direction,
    strategy: &KeyStrategy,
    key: &str,
) -> Result<Option<&'a Value>, JoinError> {
    // First right value >= left.
    let idx = sorted.partition_point(|rv| **rv < *left);
    match direction {
        Direction::Forward => Ok(sorted.get(idx).copied()),
        Direction::Backward => {
            if idx < sorted.len() && *sorted[idx] == *left {
                Ok(Some(sorted[idx]))
            } else if idx > 0 {
                Ok(Some(sorted[idx - 1]))
            } else {
                Ok(None)
            }
        }
        Direction::Nearest => {
            let below = if idx > 0 { Some(sorted[idx - 1]) } else { None };
            let above = sorted.get(idx).copied();
            match (below, above) {
                (None, above) => Ok(above),
                (below, None) => Ok(below),
                (Some(b), Some(a)) => {
                    let db = strategy.distance(key, left, b)?;
                    let da = strategy.distance(key, left, a)?;
                    // Tie goes to the earlier value in sorted right order.
                    if db <= da {
                        Ok(Some(b))
                    } else {
                        Ok(Some(a))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::{BTreeMap, BTreeSet};

    fn keyed_nums(values: Vec<f64>) -> KeyedValues {
        let set: BTreeSet<Value> = values.into_iter().map(Value::num).collect();
        BTreeMap::from([(Vec::new(), set)])
    }

    fn run(
        left: Vec<f64>,
        right: Vec<f64>,
        direction: Direction,
    ) -> Vec<MatchRecord> {
        nearest_join(
            &keyed_nums(left),
            &keyed_nums(right),
            direction,
            &KeyStrategy::Numeric,
            "n",
        )
        .unwrap()
    }

    #[test]
    fn nearest_picks_minimum_absolute_difference() {
        let records = run(vec![1.0, 10.0], vec![0.0, 5.0, 9.0], Direction::Nearest);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].left, Value::num(1.0));
        assert_eq!(records[0].right, Value::num(0.0));
        assert_eq!(records[0].distance, 1.0);
        assert_eq!(records[1].left, Value::num(10.0));
        assert_eq!(records[1].right, Value::num(9.0));
        assert_eq!(records[1].distance, 1.0);
    }

    #[test]
    fn nearest_tie_goes_to_earlier_right_value() {
        let records = run(vec![5.0], vec![0.0, 10.0], Direction::Nearest);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].right, Value::num(0.0));
        assert_eq!(records[0].distance, 5.0);
    }

    #[test]
    fn forward_takes_smallest_greater_or_equal() {
        let records = run(vec![4.0, 9.0, 12.0], vec![5.0, 9.0], Direction::Forward);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].right, Value::num(5.0));
        assert_eq!(records[0].match_type, MatchType::Top1Left);
        assert_eq!(records[1].right, Value::num(9.0));
        assert_eq!(records[1].match_type, MatchType::Exact);
        // 12.0 has no right value >= it: no record.
        assert!(records.iter().all(|r| r.left != Value::num(12.0)));
    }

    #[test]
    fn backward_takes_largest_less_or_equal() {
        let records = run(vec![4.0, 9.0, 1.0], vec![2.0, 9.0], Direction::Backward);
        assert_eq!(records.len(), 2);
        // 1.0 has no right value <= it: dropped. Output sorted by left value.
        assert_eq!(records[0].left, Value::num(4.0));
        assert_eq!(records[0].right, Value::num(2.0));
        assert_eq!(records[1].left, Value::num(9.0));
        assert_eq!(records[1].match_type, MatchType::Exact);
    }

    #[test]
    fn blocks_do_not_leak_candidates() {
        let left: KeyedValues = BTreeMap::from([(
            vec![Value::from("A")],
            BTreeSet::from([Value::num(7.0)]),
        )]);
        let right: KeyedValues = BTreeMap::from([
            (vec![Value::from("A")], BTreeSet::from([Value::num(50.0)])),
            (vec![Value::from("B")], BTreeSet::from([Value::num(7.0)])),
        ]);
        let records =
            nearest_join(&left, &right, Direction::Nearest, &KeyStrategy::Numeric, "n").unwrap();
        // The exact value in block B is invisible from block A.
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].right, Value::num(50.0));
    }

    #[test]
    fn temporal_keys_join_on_day_distance() {
        let d = |y, m, dd| Value::from(NaiveDate::from_ymd_opt(y, m, dd).unwrap());
        let left: KeyedValues =
            BTreeMap::from([(Vec::new(), BTreeSet::from([d(2026, 1, 17)]))]);
        let right: KeyedValues = BTreeMap::from([(
            Vec::new(),
            BTreeSet::from([d(2026, 1, 15), d(2026, 1, 18)]),
        )]);
        let records =
            nearest_join(&left, &right, Direction::Nearest, &KeyStrategy::Temporal, "d").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].right, d(2026, 1, 18));
        assert_eq!(records[0].distance, 1.0);
    }
}

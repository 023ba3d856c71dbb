use std::collections::BTreeMap;

use crate::asof::nearest_join;
use crate::block::{keyed_values, BlockKey};
use crate::candidate::generate;
use crate::compose::unique_name;
use crate::config::{Direction, JoinSpec};
use crate::distance::KeyStrategy;
use crate::error::JoinError;
use crate::model::{MatchRecord, MultiMergeOutput, Relation, Top1Table, Value};
use crate::top1::select_top1;

/// Chained multi-key top-1 join. Key levels run in order; each level's
/// matched right value becomes an extra blocking key for the next, so a
/// later level only scores candidates that already agree on every earlier
/// match ("progressive narrowing").
///
/// Strategy per level is fixed by the key's value kind: string keys score
/// with Levenshtein over the cross product, numeric/temporal keys take the
/// sorted nearest-neighbor path with the configured direction. No custom
/// distance function is accepted in chained mode.
pub struct Top1Merge<'a> {
    left: &'a Relation,
    right: &'a Relation,
    fuzzy_left: Vec<String>,
    fuzzy_right: Vec<String>,
    exact_left: Vec<String>,
    exact_right: Vec<String>,
    direction: Direction,
    keep_debug: bool,
}

/// Immutable snapshot of the fold after each key level.
struct LevelState {
    acc: Relation,
    exact_left: Vec<String>,
    exact_right: Vec<String>,
    debug_cols: Vec<String>,
}

impl<'a> Top1Merge<'a> {
    pub fn new(
        left: &'a Relation,
        right: &'a Relation,
        spec: &JoinSpec,
    ) -> Result<Self, JoinError> {
        spec.validate()?;
        let fuzzy_left = spec.fuzzy_left_on.as_vec();
        let fuzzy_right = spec.fuzzy_right_on.as_vec();
        for col in &fuzzy_left {
            left.require_column(col, "left")?;
        }
        for col in &fuzzy_right {
            right.require_column(col, "right")?;
        }
        left.require_columns(&spec.exact_left_on, "left")?;
        right.require_columns(&spec.exact_right_on, "right")?;
        Ok(Self {
            left,
            right,
            fuzzy_left,
            fuzzy_right,
            exact_left: spec.exact_left_on.clone(),
            exact_right: spec.exact_right_on.clone(),
            direction: spec.direction,
            keep_debug: spec.keep_debug,
        })
    }

    /// Per-level match tables, in key order, without the terminal join.
    pub fn top1_diff(&self) -> Result<Vec<(String, Top1Table)>, JoinError> {
        Ok(self.fold()?.1)
    }

    pub fn merge(&self) -> Result<MultiMergeOutput, JoinError> {
        let (state, by_level) = self.fold()?;

        let mut merged = self.final_join(&state)?;
        if !self.keep_debug {
            merged = drop_columns(&merged, &state.debug_cols)?;
        }

        Ok(MultiMergeOutput {
            merged,
            top1: by_level,
            duplicates: None,
        })
    }

    fn fold(&self) -> Result<(LevelState, Vec<(String, Top1Table)>), JoinError> {
        let mut state = LevelState {
            acc: self.left.clone(),
            exact_left: self.exact_left.clone(),
            exact_right: self.exact_right.clone(),
            debug_cols: Vec::new(),
        };
        let mut by_level = Vec::new();

        for (key_left, key_right) in self.fuzzy_left.iter().zip(&self.fuzzy_right) {
            let table = self.level_table(&state, key_left, key_right)?;
            state = self.advance(state, key_left, key_right, &table)?;
            by_level.push((key_left.clone(), table));
        }

        Ok((state, by_level))
    }

    /// Run the single-key match for one level, scoped to the blocking keys
    /// accumulated so far. The strategy comes from the original left
    /// relation: the accumulator may be empty after an unmatched level,
    /// which is a valid no-match state, not a type error.
    fn level_table(
        &self,
        state: &LevelState,
        key_left: &str,
        key_right: &str,
    ) -> Result<Top1Table, JoinError> {
        let strategy = KeyStrategy::infer(self.left, key_left, "left")?;
        let left = keyed_values(&state.acc, &state.exact_left, key_left, "left")?;
        let right = keyed_values(self.right, &state.exact_right, key_right, "right")?;

        if strategy.is_ordered() {
            let records = nearest_join(&left, &right, self.direction, &strategy, key_left)?;
            Ok(Top1Table {
                records,
                duplicates: None,
            })
        } else {
            let candidates = generate(&left, &right);
            select_top1(&candidates, &strategy, key_left)
        }
    }

    /// Fold one level's matches into the accumulator: join on the blocking
    /// keys plus the level's fuzzy key, append the level's diagnostic
    /// columns, then grow both blocking key lists by one.
    fn advance(
        &self,
        state: LevelState,
        key_left: &str,
        key_right: &str,
        table: &Top1Table,
    ) -> Result<LevelState, JoinError> {
        let block_idx = state.acc.require_columns(&state.exact_left, "left")?;
        let fuzzy_idx = state.acc.require_column(key_left, "left")?;

        let mut by_left: BTreeMap<(BlockKey, Value), Vec<&MatchRecord>> = BTreeMap::new();
        for rec in &table.records {
            by_left
                .entry((rec.block.clone(), rec.left.clone()))
                .or_default()
                .push(rec);
        }

        let mut columns = state.acc.columns().to_vec();
        let level_cols: Vec<String> = [
            format!("top1_left_{key_left}"),
            format!("top1_right_{key_left}"),
            format!("top1_diff_{key_left}"),
            format!("top1_matchtype_{key_left}"),
        ]
        .into_iter()
        .map(|name| {
            let unique = unique_name(&columns, &name);
            columns.push(unique.clone());
            unique
        })
        .collect();

        let mut rows = Vec::new();
        for row in state.acc.rows() {
            let block: BlockKey = block_idx.iter().map(|&i| row[i].clone()).collect();
            let key = (block, row[fuzzy_idx].clone());
            let Some(records) = by_left.get(&key) else {
                continue;
            };
            for rec in records {
                let mut out = row.clone();
                out.push(rec.left.clone());
                out.push(rec.right.clone());
                out.push(Value::num(rec.distance));
                out.push(Value::Str(rec.match_type.to_string()));
                rows.push(out);
            }
        }

        let mut exact_left = state.exact_left;
        exact_left.push(level_cols[1].clone());
        let mut exact_right = state.exact_right;
        exact_right.push(key_right.to_string());
        let mut debug_cols = state.debug_cols;
        debug_cols.extend(level_cols);

        Ok(LevelState {
            acc: Relation::new(columns, rows)?,
            exact_left,
            exact_right,
            debug_cols,
        })
    }

    /// Terminal join of the accumulator against the full right relation on
    /// the fully accumulated blocking key lists.
    fn final_join(&self, state: &LevelState) -> Result<Relation, JoinError> {
        let left_idx = state.acc.require_columns(&state.exact_left, "left")?;
        let right_idx = self.right.require_columns(&state.exact_right, "right")?;

        let mut right_rows: BTreeMap<BlockKey, Vec<usize>> = BTreeMap::new();
        for (i, row) in self.right.rows().iter().enumerate() {
            let key: BlockKey = right_idx.iter().map(|&j| row[j].clone()).collect();
            right_rows.entry(key).or_default().push(i);
        }

        let mut columns = state.acc.columns().to_vec();
        for col in self.right.columns() {
            columns.push(unique_name(&columns, col));
        }

        let mut rows = Vec::new();
        for row in state.acc.rows() {
            let key: BlockKey = left_idx.iter().map(|&j| row[j].clone()).collect();
            let Some(indices) = right_rows.get(&key) else {
                continue;
            };
            for &ri in indices {
                let mut out = row.clone();
                out.extend(self.right.rows()[ri].iter().cloned());
                rows.push(out);
            }
        }

        Relation::new(columns, rows)
    }
}

fn drop_columns(rel: &Relation, names: &[String]) -> Result<Relation, JoinError> {
    let keep: Vec<usize> = rel
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| !names.contains(c))
        .map(|(i, _)| i)
        .collect();
    let columns = keep.iter().map(|&i| rel.columns()[i].clone()).collect();
    let rows = rel
        .rows()
        .iter()
        .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
        .collect();
    Relation::new(columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> Value {
        Value::from(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn left_rel() -> Relation {
        Relation::new(
            vec!["city".into(), "date".into(), "sales".into()],
            vec![
                vec![Value::from("Bostn"), date(2026, 1, 2), Value::num(100.0)],
                vec![Value::from("Chcago"), date(2026, 1, 5), Value::num(200.0)],
            ],
        )
        .unwrap()
    }

    fn right_rel() -> Relation {
        Relation::new(
            vec!["city".into(), "date".into(), "qty".into()],
            vec![
                vec![Value::from("Boston"), date(2026, 1, 1), Value::num(1.0)],
                vec![Value::from("Boston"), date(2026, 2, 1), Value::num(2.0)],
                // Closer in time to both left rows, but belongs to Chicago:
                // level 2 must not see it from the Boston block.
                vec![Value::from("Chicago"), date(2026, 1, 2), Value::num(9.0)],
                vec![Value::from("Chicago"), date(2026, 1, 6), Value::num(3.0)],
            ],
        )
        .unwrap()
    }

    fn spec() -> JoinSpec {
        JoinSpec::new(vec!["city", "date"], vec!["city", "date"])
    }

    #[test]
    fn chained_levels_narrow_candidates() {
        let left = left_rel();
        let right = right_rel();
        let out = Top1Merge::new(&left, &right, &spec()).unwrap().merge().unwrap();

        assert_eq!(out.duplicates, None);
        assert_eq!(out.top1.len(), 2);
        assert_eq!(out.top1[0].0, "city");
        assert_eq!(out.top1[1].0, "date");

        // Level 1: global string match.
        let cities = &out.top1[0].1;
        assert_eq!(cities.record_for(&Value::from("Bostn")).unwrap().right, Value::from("Boston"));
        assert_eq!(cities.record_for(&Value::from("Chcago")).unwrap().right, Value::from("Chicago"));

        // Level 2: date match blocked by the matched city. Bostn's date
        // lands on Boston's 2026-01-01, not Chicago's same-day 2026-01-02.
        let dates = &out.top1[1].1;
        let bostn_date = dates
            .records
            .iter()
            .find(|r| r.block == vec![Value::from("Boston")])
            .unwrap();
        assert_eq!(bostn_date.right, date(2026, 1, 1));
        assert_eq!(bostn_date.distance, 1.0);
        let chcago_date = dates
            .records
            .iter()
            .find(|r| r.block == vec![Value::from("Chicago")])
            .unwrap();
        assert_eq!(chcago_date.right, date(2026, 1, 6));

        // Terminal join lands each left row on exactly one right row.
        assert_eq!(out.merged.len(), 2);
        assert_eq!(
            out.merged.columns(),
            &["city", "date", "sales", "city_right", "date_right", "qty"]
        );
        let row = &out.merged.rows()[0];
        assert_eq!(row[0], Value::from("Bostn"));
        assert_eq!(row[5], Value::num(1.0));
    }

    #[test]
    fn keep_debug_retains_level_diagnostics() {
        let left = left_rel();
        let right = right_rel();
        let out = Top1Merge::new(&left, &right, &spec().with_debug(true))
            .unwrap()
            .merge()
            .unwrap();
        let columns = out.merged.columns();
        assert!(columns.contains(&"top1_right_city".to_string()));
        assert!(columns.contains(&"top1_diff_date".to_string()));
        assert!(columns.contains(&"top1_matchtype_city".to_string()));

        let matchtype_city = out.merged.column_index("top1_matchtype_city").unwrap();
        assert_eq!(out.merged.rows()[0][matchtype_city], Value::from("top1 left"));
    }

    #[test]
    fn top1_diff_skips_terminal_join() {
        let left = left_rel();
        let right = right_rel();
        let tables = Top1Merge::new(&left, &right, &spec()).unwrap().top1_diff().unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].1.records.len(), 2);
        assert_eq!(tables[1].1.records.len(), 2);
    }

    #[test]
    fn initial_blocking_keys_are_honored() {
        // Same city name in two regions; blocking on region keeps them apart.
        let left = Relation::new(
            vec!["region".into(), "city".into()],
            vec![vec![Value::from("A"), Value::from("Bostn")]],
        )
        .unwrap();
        let right = Relation::new(
            vec!["region".into(), "city".into()],
            vec![
                vec![Value::from("A"), Value::from("Boston")],
                vec![Value::from("B"), Value::from("Bostn")],
            ],
        )
        .unwrap();
        let spec = JoinSpec::new("city", "city").with_exact(vec!["region"], vec!["region"]);
        let out = Top1Merge::new(&left, &right, &spec).unwrap().merge().unwrap();
        assert_eq!(out.merged.len(), 1);
        let table = &out.top1[0].1;
        assert_eq!(table.records[0].right, Value::from("Boston"));
        assert_eq!(table.records[0].distance, 1.0);
    }

    #[test]
    fn unmatched_block_yields_empty_merge_across_levels() {
        // Left's only block has no counterpart on the right: level 1 matches
        // nothing and every later level runs over an empty accumulator. That
        // is a no-match result, not an error.
        let left = Relation::new(
            vec!["region".into(), "city".into(), "posted".into()],
            vec![vec![Value::from("A"), Value::from("Bostn"), date(2026, 1, 2)]],
        )
        .unwrap();
        let right = Relation::new(
            vec!["region".into(), "city".into(), "posted".into()],
            vec![vec![Value::from("B"), Value::from("Boston"), date(2026, 1, 1)]],
        )
        .unwrap();
        let spec = JoinSpec::new(vec!["city", "posted"], vec!["city", "posted"])
            .with_exact(vec!["region"], vec!["region"]);

        let out = Top1Merge::new(&left, &right, &spec).unwrap().merge().unwrap();
        assert!(out.merged.is_empty());
        assert_eq!(out.top1.len(), 2);
        assert!(out.top1[0].1.records.is_empty());
        assert!(out.top1[1].1.records.is_empty());
    }

    #[test]
    fn single_level_multikey_matches_single_key_engine() {
        let left = left_rel();
        let right = right_rel();
        let multi = Top1Merge::new(&left, &right, &JoinSpec::new("city", "city"))
            .unwrap()
            .top1_diff()
            .unwrap();
        let single = crate::engine::Top1Diff::new(
            &left,
            &right,
            &JoinSpec::new("city", "city"),
            None,
        )
        .unwrap()
        .top1_diff()
        .unwrap();
        assert_eq!(multi[0].1.records.len(), single.records.len());
        for (a, b) in multi[0].1.records.iter().zip(&single.records) {
            assert_eq!(a.left, b.left);
            assert_eq!(a.right, b.right);
            assert_eq!(a.distance, b.distance);
        }
    }
}

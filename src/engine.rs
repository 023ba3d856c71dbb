use crate::asof::nearest_join;
use crate::block::keyed_values;
use crate::candidate::generate;
use crate::compose::{compose, ComposeKeys};
use crate::config::{Direction, JoinSpec};
use crate::distance::{DistanceFn, KeyStrategy};
use crate::error::JoinError;
use crate::model::{MergeOutput, Relation, Top1Table};
use crate::top1::select_top1;

// ---------------------------------------------------------------------------
// Shared single-key plumbing
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct SingleKey<'a> {
    left: &'a Relation,
    right: &'a Relation,
    fuzzy_left: String,
    fuzzy_right: String,
    exact_left: Vec<String>,
    exact_right: Vec<String>,
    keep_debug: bool,
}

impl<'a> SingleKey<'a> {
    fn new(left: &'a Relation, right: &'a Relation, spec: &JoinSpec) -> Result<Self, JoinError> {
        spec.validate()?;
        let (fuzzy_left, fuzzy_right) = spec.single_fuzzy()?;
        left.require_column(fuzzy_left, "left")?;
        right.require_column(fuzzy_right, "right")?;
        left.require_columns(&spec.exact_left_on, "left")?;
        right.require_columns(&spec.exact_right_on, "right")?;
        Ok(Self {
            left,
            right,
            fuzzy_left: fuzzy_left.to_string(),
            fuzzy_right: fuzzy_right.to_string(),
            exact_left: spec.exact_left_on.clone(),
            exact_right: spec.exact_right_on.clone(),
            keep_debug: spec.keep_debug,
        })
    }

    fn compose(&self, top1: &Top1Table) -> Result<Relation, JoinError> {
        compose(
            self.left,
            self.right,
            top1,
            &ComposeKeys {
                fuzzy_left: &self.fuzzy_left,
                fuzzy_right: &self.fuzzy_right,
                exact_left: &self.exact_left,
                exact_right: &self.exact_right,
            },
            self.keep_debug,
        )
    }
}

// ---------------------------------------------------------------------------
// Generic cross-product engine
// ---------------------------------------------------------------------------

/// Single-key top-1 join over an explicit candidate cross product. Works
/// for string keys (Levenshtein or a caller-supplied distance) and, via
/// absolute difference, for numeric/temporal keys. Ties are kept and
/// reported.
#[derive(Debug)]
pub struct Top1Diff<'a> {
    inner: SingleKey<'a>,
    strategy: KeyStrategy,
}

impl<'a> Top1Diff<'a> {
    /// `fun_diff` overrides the built-in strategy (string keys only: a
    /// custom function on a numeric/temporal key is rejected here, before
    /// any data scan). Without it the strategy is inferred from the left
    /// key's values.
    pub fn new(
        left: &'a Relation,
        right: &'a Relation,
        spec: &JoinSpec,
        fun_diff: Option<DistanceFn>,
    ) -> Result<Self, JoinError> {
        let inner = SingleKey::new(left, right, spec)?;
        let strategy = match fun_diff {
            Some(f) => match KeyStrategy::infer(left, &inner.fuzzy_left, "left") {
                // An all-null key has nothing to score; the custom
                // function is harmless there.
                Ok(KeyStrategy::Text) | Err(_) => KeyStrategy::Custom(f),
                Ok(other) => {
                    return Err(JoinError::CustomDiffNonString {
                        column: inner.fuzzy_left,
                        kind: other.value_kind(),
                    })
                }
            },
            None => KeyStrategy::infer(left, &inner.fuzzy_left, "left")?,
        };
        Ok(Self { inner, strategy })
    }

    /// Value-level match table without the row-level join.
    pub fn top1_diff(&self) -> Result<Top1Table, JoinError> {
        let left = keyed_values(
            self.inner.left,
            &self.inner.exact_left,
            &self.inner.fuzzy_left,
            "left",
        )?;
        let right = keyed_values(
            self.inner.right,
            &self.inner.exact_right,
            &self.inner.fuzzy_right,
            "right",
        )?;
        let candidates = generate(&left, &right);
        select_top1(&candidates, &self.strategy, &self.inner.fuzzy_left)
    }

    pub fn merge(&self) -> Result<MergeOutput, JoinError> {
        let top1 = self.top1_diff()?;
        let merged = self.inner.compose(&top1)?;
        let duplicates = top1.duplicates;
        Ok(MergeOutput {
            merged,
            top1,
            duplicates,
        })
    }
}

// ---------------------------------------------------------------------------
// Sorted nearest-neighbor engine
// ---------------------------------------------------------------------------

/// Single-key asof join for numeric/temporal keys. Honors the configured
/// direction and never ties, so `duplicates` is always `None`.
#[derive(Debug)]
pub struct Top1Nearest<'a> {
    inner: SingleKey<'a>,
    direction: Direction,
    strategy: KeyStrategy,
}

impl<'a> Top1Nearest<'a> {
    pub fn new(
        left: &'a Relation,
        right: &'a Relation,
        spec: &JoinSpec,
    ) -> Result<Self, JoinError> {
        let inner = SingleKey::new(left, right, spec)?;
        let strategy = KeyStrategy::infer(left, &inner.fuzzy_left, "left")?;
        if !strategy.is_ordered() {
            return Err(JoinError::UnsupportedKeyType {
                column: inner.fuzzy_left,
                kind: "string",
            });
        }
        Ok(Self {
            inner,
            direction: spec.direction,
            strategy,
        })
    }

    pub fn top1_diff(&self) -> Result<Top1Table, JoinError> {
        let left = keyed_values(
            self.inner.left,
            &self.inner.exact_left,
            &self.inner.fuzzy_left,
            "left",
        )?;
        let right = keyed_values(
            self.inner.right,
            &self.inner.exact_right,
            &self.inner.fuzzy_right,
            "right",
        )?;
        let records = nearest_join(
            &left,
            &right,
            self.direction,
            &self.strategy,
            &self.inner.fuzzy_left,
        )?;
        Ok(Top1Table {
            records,
            duplicates: None,
        })
    }

    pub fn merge(&self) -> Result<MergeOutput, JoinError> {
        let top1 = self.top1_diff()?;
        let merged = self.inner.compose(&top1)?;
        Ok(MergeOutput {
            merged,
            top1,
            duplicates: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

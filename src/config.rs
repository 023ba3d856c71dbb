use serde::{Deserialize, Serialize};

use crate::error::JoinError;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Nearest-neighbor search direction for numeric/temporal keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Smallest right value >= left value.
    Forward,
    /// Largest right value <= left value.
    Backward,
    /// Minimum absolute difference; ties go to the earlier (smaller) right value.
    Nearest,
}

impl Default for Direction {
    fn default() -> Self {
        Self::Nearest
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Backward => write!(f, "backward"),
            Self::Nearest => write!(f, "nearest"),
        }
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// A single column name or an ordered list of names. A list of more than
/// one name puts `Top1Merge` into chained multi-key mode.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Keys {
    One(String),
    Many(Vec<String>),
}

impl Keys {
    pub fn as_vec(&self) -> Vec<String> {
        match self {
            Self::One(k) => vec![k.clone()],
            Self::Many(ks) => ks.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(ks) => ks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The single key name, when there is exactly one.
    pub fn single(&self) -> Option<&str> {
        match self {
            Self::One(k) => Some(k),
            Self::Many(ks) if ks.len() == 1 => Some(&ks[0]),
            Self::Many(_) => None,
        }
    }
}

impl From<&str> for Keys {
    fn from(k: &str) -> Self {
        Self::One(k.to_string())
    }
}

impl From<Vec<String>> for Keys {
    fn from(ks: Vec<String>) -> Self {
        Self::Many(ks)
    }
}

impl From<Vec<&str>> for Keys {
    fn from(ks: Vec<&str>) -> Self {
        Self::Many(ks.into_iter().map(str::to_string).collect())
    }
}

// ---------------------------------------------------------------------------
// Join spec
// ---------------------------------------------------------------------------

/// Declarative join configuration. Validation is eager: engines reject a
/// bad spec at construction, before any data scan.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinSpec {
    pub fuzzy_left_on: Keys,
    pub fuzzy_right_on: Keys,
    #[serde(default)]
    pub exact_left_on: Vec<String>,
    #[serde(default)]
    pub exact_right_on: Vec<String>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub keep_debug: bool,
}

impl JoinSpec {
    /// Single-key spec with no blocking.
    pub fn new(fuzzy_left_on: impl Into<Keys>, fuzzy_right_on: impl Into<Keys>) -> Self {
        Self {
            fuzzy_left_on: fuzzy_left_on.into(),
            fuzzy_right_on: fuzzy_right_on.into(),
            exact_left_on: Vec::new(),
            exact_right_on: Vec::new(),
            direction: Direction::default(),
            keep_debug: false,
        }
    }

    pub fn with_exact(mut self, left: Vec<&str>, right: Vec<&str>) -> Self {
        self.exact_left_on = left.into_iter().map(str::to_string).collect();
        self.exact_right_on = right.into_iter().map(str::to_string).collect();
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_debug(mut self, keep_debug: bool) -> Self {
        self.keep_debug = keep_debug;
        self
    }

    pub fn from_toml(input: &str) -> Result<Self, JoinError> {
        let spec: JoinSpec =
            toml::from_str(input).map_err(|e| JoinError::ConfigParse(e.to_string()))?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), JoinError> {
        if self.exact_left_on.is_empty() != self.exact_right_on.is_empty() {
            return Err(JoinError::ExactKeysOneSided);
        }
        if self.exact_left_on.len() != self.exact_right_on.len() {
            return Err(JoinError::ExactKeyMismatch {
                left: self.exact_left_on.len(),
                right: self.exact_right_on.len(),
            });
        }
        if self.fuzzy_left_on.is_empty() || self.fuzzy_right_on.is_empty() {
            return Err(JoinError::NoFuzzyKeys);
        }
        if self.fuzzy_left_on.len() != self.fuzzy_right_on.len() {
            return Err(JoinError::FuzzyKeyMismatch {
                left: self.fuzzy_left_on.len(),
                right: self.fuzzy_right_on.len(),
            });
        }
        Ok(())
    }

    pub fn is_blocked(&self) -> bool {
        !self.exact_left_on.is_empty()
    }

    /// The (left, right) fuzzy key pair for single-key engines.
    pub(crate) fn single_fuzzy(&self) -> Result<(&str, &str), JoinError> {
        match (self.fuzzy_left_on.single(), self.fuzzy_right_on.single()) {
            (Some(l), Some(r)) => Ok((l, r)),
            _ => Err(JoinError::SingleKeyRequired {
                found: self.fuzzy_left_on.len().max(self.fuzzy_right_on.len()),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

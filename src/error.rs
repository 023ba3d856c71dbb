use std::fmt;

#[derive(Debug)]
pub enum JoinError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Exact keys supplied for one side only.
    ExactKeysOneSided,
    /// Exact key lists have different lengths.
    ExactKeyMismatch { left: usize, right: usize },
    /// Fuzzy key lists have different lengths.
    FuzzyKeyMismatch { left: usize, right: usize },
    /// No fuzzy key supplied.
    NoFuzzyKeys,
    /// A single-key engine was given a multi-key spec.
    SingleKeyRequired { found: usize },
    /// A referenced column does not exist in the relation.
    UnknownColumn { side: &'static str, column: String },
    /// Two columns in one relation share a name.
    DuplicateColumn(String),
    /// A row's width does not match the column list.
    RowWidth { row: usize, expected: usize, found: usize },
    /// No built-in distance strategy for the key's value type.
    UnsupportedKeyType { column: String, kind: &'static str },
    /// A custom distance function was supplied for a non-string key.
    CustomDiffNonString { column: String, kind: &'static str },
    /// Number parse error while loading CSV.
    NumberParse { row: usize, column: String, value: String },
    /// Date parse error while loading CSV.
    DateParse { row: usize, column: String, value: String },
    /// IO error (CSV read, etc.).
    Io(String),
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ExactKeysOneSided => {
                write!(f, "need exact keys for both sides or neither")
            }
            Self::ExactKeyMismatch { left, right } => {
                write!(f, "need the same number of exact keys on both sides, got {left} and {right}")
            }
            Self::FuzzyKeyMismatch { left, right } => {
                write!(f, "need the same number of fuzzy keys on both sides, got {left} and {right}")
            }
            Self::NoFuzzyKeys => write!(f, "at least one fuzzy key is required"),
            Self::SingleKeyRequired { found } => {
                write!(f, "single-key engine takes exactly one fuzzy key, got {found}")
            }
            Self::UnknownColumn { side, column } => {
                write!(f, "{side} relation: unknown column '{column}'")
            }
            Self::DuplicateColumn(column) => {
                write!(f, "duplicate column name '{column}'")
            }
            Self::RowWidth { row, expected, found } => {
                write!(f, "row {row}: expected {expected} columns, found {found}")
            }
            Self::UnsupportedKeyType { column, kind } => {
                write!(f, "column '{column}': no distance strategy for {kind} values")
            }
            Self::CustomDiffNonString { column, kind } => {
                write!(f, "column '{column}': custom distance function requires string values, got {kind}")
            }
            Self::NumberParse { row, column, value } => {
                write!(f, "row {row}, column '{column}': cannot parse number '{value}'")
            }
            Self::DateParse { row, column, value } => {
                write!(f, "row {row}, column '{column}': cannot parse date '{value}'")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for JoinError {}

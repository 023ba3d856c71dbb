//! `fuzzymerge` — Top-1 fuzzy join engine for tabular relations.
//!
//! For each distinct left join-key value, finds the single best-matching
//! right value under a distance function (edit distance for strings,
//! nearest value for numbers and dates), optionally scoped to rows that
//! agree on exact "blocking" keys. Returns the row-level merged relation
//! plus a per-key match table with distances, match types and tie flags.
//!
//! Pure engine crate: receives pre-loaded relations, returns relations.
//! The only IO is an optional CSV loader in [`load`].

pub mod asof;
pub mod block;
pub mod candidate;
pub mod compose;
pub mod config;
pub mod distance;
pub mod engine;
pub mod error;
pub mod load;
pub mod model;
pub mod multikey;
pub mod top1;

pub use config::{Direction, JoinSpec, Keys};
pub use distance::{DistanceFn, KeyStrategy};
pub use engine::{Top1Diff, Top1Nearest};
pub use error::JoinError;
pub use load::{relation_from_csv, ColumnKind};
pub use model::{
    MatchRecord, MatchType, MergeOutput, MultiMergeOutput, Relation, Top1Table, Value,
};
pub use multikey::Top1Merge;

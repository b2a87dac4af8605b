//! Result deduplication: name folding, hierarchy comparison, pairwise
//! matching, survivor selection and the merge engine tying them together.

pub mod config;
pub mod engine;
pub mod hierarchy;
pub mod matcher;
pub mod names;
pub mod winner;


pub use config::{ConfigError, DedupeConfig, LayerClass, Policy};
pub use engine::{DedupeStats, Deduplicator, Merged};
pub use hierarchy::{Ancestry, Hierarchy};
pub use matcher::{Candidate, Matcher, Verdict};
pub use names::{fold, name_tokens, names_match};
pub use winner::{select_winner, Preference};

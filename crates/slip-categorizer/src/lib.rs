//! Prediction Categorizer / Slip Assembler
//!
//! Buckets per-fixture picks into the `2_odds`, `5_odds` and `10_odds` singles
//! slips and searches the rollover pool for accumulators whose combined odds
//! land in a target band. Categories are evaluated independently and may share
//! fixtures.

pub mod categorizer;
pub mod error;
pub mod rollover;
pub mod rules;

pub use categorizer::{compare_picks, CategorizedSlips, CategorySlip, SlipCategorizer};
pub use error::{CategorizerError, CategorizerResult};
pub use rollover::{search_combinations, RolloverCombination, RolloverSearch};
pub use rules::{CategoryKey, CategoryRules, OddsCategoryRule};

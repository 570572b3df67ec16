#![warn(missing_docs)]
//! A multi-objective search engine for the set-expression synthesis problem:
//! recovering a short set-algebra expression over a family of base sets that
//! reproduces a target set, scored on Jaccard similarity, operator count and
//! the number of base sets used.

pub mod bitset;
pub mod cli;
pub mod driver;
pub mod error;
pub mod expr;
pub mod instance;
pub mod metrics;
pub mod solution;
pub mod solver;

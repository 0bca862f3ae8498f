//! Analysis of a persisted question table.

pub mod aggregator;

pub use aggregator::*;

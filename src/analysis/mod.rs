//! Derived metrics and cross-project statistics.
//!
//! `color` and `density` compute the display metrics stored on a
//! [`crate::project::Project`]; `aggregator` summarizes a set of projects
//! for reporting.

pub mod aggregator;
pub mod color;
pub mod density;

pub use aggregator::*;

//! Obtaining a FrameworkBenchmarks checkout.

pub mod cloner;

pub use cloner::*;

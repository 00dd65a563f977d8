//! Extracts OpenRewrite recipe classes from Java source trees and turns them
//! into datasets: a flat CSV collection, a normalized JSON document with
//! statistics, and instruction-tuning examples.

pub mod builders;
pub mod core;
pub mod utils;

//! Analysis modules.
//!
//! Pure data shaping: comparison aggregation and county list ordering.

pub mod aggregator;
pub mod listing;

pub use aggregator::*;
pub use listing::*;

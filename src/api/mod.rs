//! Statistics backend access.
//!
//! This module provides the typed REST client and its error type.

pub mod client;
pub mod error;

pub use client::{CountyFilters, InterviewQuery, StatsClient, YearRange};
pub use error::{ApiError, ApiResult};

//! Rendered view state and the load-failure policy.
//!
//! A transport failure replaces the panel with a failure message. An
//! unsuccessful or malformed response, or a valid but empty result, is logged
//! and the previous panel stays in place. Nothing is retried.

use crate::api::{ApiError, ApiResult};
use crate::models::{CountyDetail, Overview};
use serde::Serialize;
use tracing::{error, info, warn};

/// Shown when the backend cannot be reached.
pub const LOAD_FAILED_MESSAGE: &str = "加载失败，请检查后端API是否运行";

/// State of one rendered area of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "content", rename_all = "snake_case")]
pub enum Panel<T> {
    /// Nothing loaded yet.
    Empty,
    Ready(T),
    Failed(String),
}

impl<T> Default for Panel<T> {
    fn default() -> Self {
        Panel::Empty
    }
}

/// What applying a result did to a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Updated,
    Kept,
    Failed,
    /// A newer request for the same view was issued; the result was dropped.
    Stale,
}

impl Applied {
    /// Combine the outcomes of sibling fetches; a failure outranks everything.
    pub fn merge(self, other: Applied) -> Applied {
        use Applied::*;
        match (self, other) {
            (Failed, _) | (_, Failed) => Failed,
            (Stale, _) | (_, Stale) => Stale,
            (Updated, _) | (_, Updated) => Updated,
            _ => Kept,
        }
    }
}

/// Results that can be "valid but empty".
pub trait EmptyResult {
    fn is_empty_result(&self) -> bool;
}

impl<T> EmptyResult for Vec<T> {
    fn is_empty_result(&self) -> bool {
        self.is_empty()
    }
}

impl EmptyResult for Overview {
    fn is_empty_result(&self) -> bool {
        false
    }
}

impl EmptyResult for CountyDetail {
    fn is_empty_result(&self) -> bool {
        false
    }
}

impl<T> Panel<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Panel::Failed(_))
    }

    /// Apply a fetch result, building the view with `build` on success.
    pub fn apply<R: EmptyResult>(
        &mut self,
        label: &str,
        result: ApiResult<R>,
        build: impl FnOnce(R) -> T,
    ) -> Applied {
        match result {
            Ok(data) if data.is_empty_result() => {
                info!("{}: no data returned, keeping previous view", label);
                Applied::Kept
            }
            Ok(data) => {
                *self = Panel::Ready(build(data));
                Applied::Updated
            }
            Err(e) => self.fail(label, &e),
        }
    }

    /// Apply a failure alone, following the same policy as [`Panel::apply`].
    pub fn fail(&mut self, label: &str, err: &ApiError) -> Applied {
        if err.is_transport() {
            error!("Failed to load {}: {}", label, err);
            *self = Panel::Failed(LOAD_FAILED_MESSAGE.to_string());
            Applied::Failed
        } else {
            warn!("Failed to load {}: {}", label, err);
            Applied::Kept
        }
    }
}

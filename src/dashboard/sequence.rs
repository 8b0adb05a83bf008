//! Request sequencing.
//!
//! Each view hands out increasing tokens. A response may only be applied if
//! its token is still the latest one issued for that view, so a slow response
//! can never overwrite the result of a newer request.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Views that fetch independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Overview,
    Provinces,
    Counties,
    CountyDetail,
    Interviews,
    Comparison,
}

impl View {
    const COUNT: usize = 6;

    fn index(self) -> usize {
        match self {
            View::Overview => 0,
            View::Provinces => 1,
            View::Counties => 2,
            View::CountyDetail => 3,
            View::Interviews => 4,
            View::Comparison => 5,
        }
    }
}

/// Identifies one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    view: View,
    seq: u64,
}

#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: [AtomicU64; View::COUNT],
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new token for `view`, superseding all earlier ones.
    pub fn issue(&self, view: View) -> RequestToken {
        let seq = self.latest[view.index()].fetch_add(1, Ordering::SeqCst) + 1;
        RequestToken { view, seq }
    }

    /// Whether no newer token has been issued for the token's view.
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest[token.view.index()].load(Ordering::SeqCst) == token.seq
    }

    /// Pass `value` through only if `token` is still current.
    pub fn accept<T>(&self, token: RequestToken, value: T) -> Option<T> {
        if self.is_current(token) {
            Some(value)
        } else {
            debug!(
                "Discarding stale {:?} response (seq {})",
                token.view, token.seq
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_token_is_current() {
        let seq = RequestSequencer::new();
        let first = seq.issue(View::Comparison);
        assert!(seq.is_current(first));

        let second = seq.issue(View::Comparison);
        assert!(!seq.is_current(first));
        assert!(seq.is_current(second));
        assert!(second.seq > first.seq);
    }

    #[test]
    fn test_views_are_independent() {
        let seq = RequestSequencer::new();
        let compare = seq.issue(View::Comparison);
        let _detail = seq.issue(View::CountyDetail);
        assert!(seq.is_current(compare));
    }

    #[test]
    fn test_stale_response_discarded() {
        let seq = RequestSequencer::new();
        let a = seq.issue(View::Interviews);
        let b = seq.issue(View::Interviews);

        // B resolves first, then A arrives late.
        assert_eq!(seq.accept(b, "B"), Some("B"));
        assert_eq!(seq.accept(a, "A"), None);
    }
}

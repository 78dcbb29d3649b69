//! Cooperative cancellation and per-search budgets
//!
//! A [`CancellationToken`] is shared by the consumer and the scanner; the
//! scanner checks it before scheduling a read and before yielding a result.
//! [`ScanBudget`] counts files dispatched and blocks aggregated, and cancels
//! its token once either cap is reached.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Clonable stop signal. Cancelling never interrupts work in progress.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// File and match counters for one search
#[derive(Debug, Clone)]
pub struct ScanBudget {
    inner: Arc<BudgetCounters>,
    token: CancellationToken,
}

#[derive(Debug)]
struct BudgetCounters {
    max_files: usize,
    max_matches: usize,
    files: AtomicUsize,
    matches: AtomicUsize,
}

impl ScanBudget {
    pub fn new(max_files: usize, max_matches: usize, token: CancellationToken) -> Self {
        Self {
            inner: Arc::new(BudgetCounters {
                max_files,
                max_matches,
                files: AtomicUsize::new(0),
                matches: AtomicUsize::new(0),
            }),
            token,
        }
    }

    /// Reserve one file read. Returns false once the file cap is spent.
    pub fn claim_file(&self) -> bool {
        let claimed = self.inner.files.fetch_add(1, Ordering::Relaxed);
        if claimed < self.inner.max_files {
            true
        } else {
            self.inner.files.fetch_sub(1, Ordering::Relaxed);
            false
        }
    }

    /// Room left before the match cap is reached
    pub fn remaining_matches(&self) -> usize {
        self.inner
            .max_matches
            .saturating_sub(self.inner.matches.load(Ordering::Relaxed))
    }

    /// Record aggregated matches; cancels the token when the cap is reached.
    /// Returns true if the budget is now exhausted.
    pub fn record_matches(&self, count: usize) -> bool {
        let total = self.inner.matches.fetch_add(count, Ordering::Relaxed) + count;
        let exhausted = total >= self.inner.max_matches;
        if exhausted {
            self.token.cancel();
        }
        exhausted
    }

    pub fn files_claimed(&self) -> usize {
        self.inner.files.load(Ordering::Relaxed)
    }

    pub fn matches_recorded(&self) -> usize {
        self.inner.matches.load(Ordering::Relaxed)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_file_claims_stop_at_cap() {
        let budget = ScanBudget::new(2, 10, CancellationToken::new());

        assert!(budget.claim_file());
        assert!(budget.claim_file());
        assert!(!budget.claim_file());
        assert_eq!(budget.files_claimed(), 2);
    }

    #[test]
    fn test_match_cap_cancels_token() {
        let token = CancellationToken::new();
        let budget = ScanBudget::new(100, 3, token.clone());

        assert!(!budget.record_matches(2));
        assert_eq!(budget.remaining_matches(), 1);
        assert!(!token.is_cancelled());

        assert!(budget.record_matches(1));
        assert!(token.is_cancelled());
        assert_eq!(budget.remaining_matches(), 0);
    }

    #[test]
    fn test_concurrent_claims_never_exceed_cap() {
        let budget = ScanBudget::new(50, 10, CancellationToken::new());
        let claimed = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..20 {
                        if budget.claim_file() {
                            claimed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        assert_eq!(claimed.load(Ordering::Relaxed), 50);
    }
}

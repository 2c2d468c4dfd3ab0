//! Brute-force lockout policy.

use doorward_core::constants::BRUTE_FORCE_LIMIT;
use tracing::warn;

/// Consecutive-failure counter.
///
/// # Examples
///
/// ```
/// use doorward_security::BruteForceGuard;
///
/// let mut guard = BruteForceGuard::new(3);
/// assert!(!guard.record_failure());
/// assert!(!guard.record_failure());
/// assert!(guard.record_failure());
/// assert_eq!(guard.failed_attempts(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BruteForceGuard {
    failed: u8,
    limit: u8,
}

impl Default for BruteForceGuard {
    fn default() -> Self {
        Self::new(BRUTE_FORCE_LIMIT)
    }
}

impl BruteForceGuard {
    /// A limit of zero is treated as one.
    pub fn new(limit: u8) -> Self {
        Self {
            failed: 0,
            limit: limit.max(1),
        }
    }

    /// Count one rejected credential. Returns `true` once the limit is
    /// reached.
    pub fn record_failure(&mut self) -> bool {
        self.failed = self.failed.saturating_add(1).min(self.limit);
        warn!(attempts = self.failed, limit = self.limit, "Invalid credential");
        self.is_exhausted()
    }

    pub fn reset(&mut self) {
        self.failed = 0;
    }

    pub fn is_exhausted(&self) -> bool {
        self.failed >= self.limit
    }

    pub fn failed_attempts(&self) -> u8 {
        self.failed
    }

    pub fn limit(&self) -> u8 {
        self.limit
    }
}

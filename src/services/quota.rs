//! Vendor-call quota tracking
//!
//! A single bounded counter gating how many paid vendor calls the process
//! may make. Credits are only spent on calls that actually reach a vendor;
//! cache hits are free. There is no in-process reset — the counter clears
//! on restart.

use std::sync::Mutex;

use crate::models::QuotaStatus;

/// Process-wide vendor credit counter
pub struct QuotaTracker {
    limit: u32,
    used: Mutex<u32>,
}

impl QuotaTracker {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            used: Mutex::new(0),
        }
    }

    /// True if at least one credit remains
    pub fn can_analyze(&self) -> bool {
        *self.used.lock().unwrap() < self.limit
    }

    /// Consume one credit. Returns false (state unchanged) if none remain.
    ///
    /// Check and increment happen under one lock so concurrent callers
    /// cannot push `used` past `limit`.
    pub fn use_credit(&self) -> bool {
        let mut used = self.used.lock().unwrap();
        if *used < self.limit {
            *used += 1;
            true
        } else {
            false
        }
    }

    pub fn status(&self) -> QuotaStatus {
        let used = *self.used.lock().unwrap();
        QuotaStatus {
            used,
            remaining: self.limit.saturating_sub(used),
            limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credits_exhaust_at_limit() {
        let quota = QuotaTracker::new(3);
        assert!(quota.can_analyze());

        for _ in 0..3 {
            assert!(quota.use_credit());
        }

        assert!(!quota.can_analyze());
        assert!(!quota.use_credit());
        assert!(!quota.use_credit());

        let status = quota.status();
        assert_eq!(status.used, 3);
        assert_eq!(status.remaining, 0);
        assert_eq!(status.limit, 3);
    }

    #[test]
    fn test_status_snapshot() {
        let quota = QuotaTracker::new(10);
        quota.use_credit();
        quota.use_credit();

        let status = quota.status();
        assert_eq!(status.used, 2);
        assert_eq!(status.remaining, 8);
        assert_eq!(status.limit, 10);
    }

    #[test]
    fn test_zero_limit_never_allows() {
        let quota = QuotaTracker::new(0);
        assert!(!quota.can_analyze());
        assert!(!quota.use_credit());
        assert_eq!(quota.status().remaining, 0);
    }

    #[test]
    fn test_concurrent_use_never_exceeds_limit() {
        use std::sync::Arc;

        let quota = Arc::new(QuotaTracker::new(50));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let quota = quota.clone();
            handles.push(std::thread::spawn(move || {
                let mut granted = 0;
                for _ in 0..20 {
                    if quota.use_credit() {
                        granted += 1;
                    }
                }
                granted
            }));
        }

        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 50);
        assert_eq!(quota.status().used, 50);
    }
}

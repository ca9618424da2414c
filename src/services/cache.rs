//! In-memory decision cache keyed by media fingerprint
//!
//! Entries carry a 24-hour TTL but are only evicted by the periodic
//! sweep, which runs every Nth insertion. A stale entry that has not
//! been swept yet is still served on `get` — reads never check age.
//! That matches the service's long-standing behavior and keeps the
//! read path to a single map lookup.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::constants::{CACHE_SWEEP_EVERY, CACHE_TTL_HOURS};
use crate::fingerprint::MediaFingerprint;
use crate::models::DetectionResult;

struct CacheEntry {
    result: DetectionResult,
    created_at: DateTime<Utc>,
}

struct CacheState {
    entries: HashMap<MediaFingerprint, CacheEntry>,
    insertions: u64,
}

/// Fingerprint -> verdict cache with time-based expiry
pub struct DecisionCache {
    state: Mutex<CacheState>,
    ttl: Duration,
    sweep_every: u64,
}

impl DecisionCache {
    pub fn new() -> Self {
        Self::with_policy(Duration::hours(CACHE_TTL_HOURS), CACHE_SWEEP_EVERY)
    }

    pub fn with_policy(ttl: Duration, sweep_every: u64) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                insertions: 0,
            }),
            ttl,
            sweep_every: sweep_every.max(1),
        }
    }

    pub fn get(&self, fingerprint: &MediaFingerprint) -> Option<DetectionResult> {
        let state = self.state.lock().unwrap();
        state.entries.get(fingerprint).map(|entry| entry.result)
    }

    /// Insert or overwrite, stamping with the current time.
    ///
    /// Every `sweep_every`-th insertion also sweeps expired entries, so
    /// the map cannot grow without bound under steady traffic.
    pub fn put(&self, fingerprint: MediaFingerprint, result: DetectionResult) {
        let now = Utc::now();
        let mut state = self.state.lock().unwrap();
        state.entries.insert(
            fingerprint,
            CacheEntry {
                result,
                created_at: now,
            },
        );
        state.insertions += 1;

        if state.insertions % self.sweep_every == 0 {
            let removed = Self::sweep(&mut state, now, self.ttl);
            if removed > 0 {
                println!("[cache] swept {} expired entries", removed);
            }
        }
    }

    /// Remove every entry older than the TTL. Returns how many were removed.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.state.lock().unwrap();
        Self::sweep(&mut state, now, self.ttl)
    }

    fn sweep(state: &mut CacheState, now: DateTime<Utc>, ttl: Duration) -> usize {
        let before = state.entries.len();
        state.entries.retain(|_, entry| now - entry.created_at <= ttl);
        before - state.entries.len()
    }

    /// Drop all entries. Returns the new size (always 0).
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock().unwrap();
        state.entries.clear();
        state.entries.len()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }
}

impl Default for DecisionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NsfwCategory;

    fn ai_result(confidence: f64) -> DetectionResult {
        DetectionResult::Ai {
            is_ai: true,
            confidence,
        }
    }

    #[test]
    fn test_put_then_get_round_trips() {
        let cache = DecisionCache::new();
        let fp = MediaFingerprint::compute(b"media");

        assert_eq!(cache.get(&fp), None);
        cache.put(fp.clone(), ai_result(87.5));
        assert_eq!(cache.get(&fp), Some(ai_result(87.5)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_put_overwrites_existing_entry() {
        let cache = DecisionCache::new();
        let fp = MediaFingerprint::compute(b"media");

        cache.put(fp.clone(), ai_result(10.0));
        cache.put(
            fp.clone(),
            DetectionResult::Nsfw {
                is_nsfw: true,
                score: 0.9,
                category: NsfwCategory::Nudity,
            },
        );

        assert_eq!(cache.len(), 1);
        assert!(matches!(
            cache.get(&fp),
            Some(DetectionResult::Nsfw { is_nsfw: true, .. })
        ));
    }

    #[test]
    fn test_sweep_removes_only_expired_entries() {
        let cache = DecisionCache::new();
        let fp = MediaFingerprint::compute(b"media");
        cache.put(fp.clone(), ai_result(50.0));

        // 23h after insertion: retained
        assert_eq!(cache.sweep_expired(Utc::now() + Duration::hours(23)), 0);
        assert!(cache.get(&fp).is_some());

        // 25h after insertion: gone
        assert_eq!(cache.sweep_expired(Utc::now() + Duration::hours(25)), 1);
        assert!(cache.get(&fp).is_none());
    }

    #[test]
    fn test_stale_entry_served_until_swept() {
        // Reads never check age; only the sweep evicts.
        let cache = DecisionCache::with_policy(Duration::hours(24), 1000);
        let fp = MediaFingerprint::compute(b"media");
        cache.put(fp.clone(), ai_result(50.0));

        assert!(cache.get(&fp).is_some());
    }

    #[test]
    fn test_insertion_triggered_sweep() {
        // TTL of zero makes every existing entry expired; sweep fires on
        // the 3rd insertion and clears everything older than now.
        let cache = DecisionCache::with_policy(Duration::zero(), 3);

        cache.put(MediaFingerprint::compute(b"a"), ai_result(1.0));
        cache.put(MediaFingerprint::compute(b"b"), ai_result(2.0));
        assert_eq!(cache.len(), 2);

        cache.put(MediaFingerprint::compute(b"c"), ai_result(3.0));
        assert!(cache.len() < 3);
    }

    #[test]
    fn test_clear_returns_zero() {
        let cache = DecisionCache::new();
        cache.put(MediaFingerprint::compute(b"a"), ai_result(1.0));
        cache.put(MediaFingerprint::compute(b"b"), ai_result(2.0));

        assert_eq!(cache.clear(), 0);
        assert_eq!(cache.len(), 0);
    }
}

//! Detection orchestration
//!
//! Ties fingerprinting, the decision cache, the quota tracker, and the
//! vendor transport together. This is the only place that touches cache
//! or quota; normalizers never do.
//!
//! Concurrent requests for the same fingerprint are serialized through a
//! per-fingerprint in-flight lock: the first caller performs the vendor
//! call, everyone else waits and is then served from cache. At most one
//! vendor call and one quota credit per fingerprint at a time.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;

use crate::fingerprint::MediaFingerprint;
use crate::models::{DetectionResult, DetectorKind, MediaType, NsfwCategory, QuotaStatus};
use crate::services::cache::DecisionCache;
use crate::services::error::DetectError;
use crate::services::normalize::{normalize_ai_verdict, normalize_nsfw_verdict};
use crate::services::quota::QuotaTracker;
use crate::services::vendor::{VendorError, VendorTransport, credential_var};

/// Outcome of a detection request
#[derive(Debug, Clone)]
pub struct Detection {
    pub result: DetectionResult,
    pub fingerprint: MediaFingerprint,
    pub cached: bool,
}

pub struct Detector<T: VendorTransport> {
    transport: T,
    quota: QuotaTracker,
    cache: DecisionCache,
    inflight: AsyncMutex<HashMap<MediaFingerprint, Arc<AsyncMutex<()>>>>,
}

impl<T: VendorTransport> Detector<T> {
    pub fn new(transport: T, quota: QuotaTracker, cache: DecisionCache) -> Self {
        Self {
            transport,
            quota,
            cache,
            inflight: AsyncMutex::new(HashMap::new()),
        }
    }

    pub fn quota_status(&self) -> QuotaStatus {
        self.quota.status()
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Flush every cached verdict. Returns the new size (0).
    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }

    pub fn has_credential(&self, kind: DetectorKind) -> bool {
        self.transport.has_credential(kind)
    }

    /// Run a detector over raw media bytes.
    ///
    /// Cache hits cost nothing. A vendor transport failure consumes no
    /// quota and writes no cache entry.
    pub async fn analyze(
        &self,
        bytes: &[u8],
        kind: DetectorKind,
        media_type: MediaType,
        filename: &str,
    ) -> Result<Detection, DetectError> {
        if bytes.is_empty() {
            return Err(DetectError::EmptyInput);
        }

        let fingerprint = MediaFingerprint::compute(bytes);

        // NSFW moderation does not support video: short-circuit before
        // any cache, quota, or vendor interaction.
        if kind == DetectorKind::Nsfw && media_type == MediaType::Video {
            return Ok(Detection {
                result: DetectionResult::Nsfw {
                    is_nsfw: false,
                    score: 0.0,
                    category: NsfwCategory::VideoUnsupported,
                },
                fingerprint,
                cached: false,
            });
        }

        if let Some(result) = self.cache.get(&fingerprint) {
            println!("[detect] cache hit hash={}", fingerprint);
            return Ok(Detection {
                result,
                fingerprint,
                cached: true,
            });
        }

        let entry_lock = {
            let mut inflight = self.inflight.lock().await;
            inflight
                .entry(fingerprint.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        let outcome = {
            let _guard = entry_lock.lock().await;
            self.analyze_locked(bytes, kind, media_type, filename, &fingerprint)
                .await
        };

        // Drop the in-flight entry once nobody else is waiting on it. The
        // map holds one reference and we hold one; anything above two
        // means another request is queued behind this fingerprint.
        {
            let mut inflight = self.inflight.lock().await;
            if let Some(lock) = inflight.get(&fingerprint) {
                if Arc::strong_count(lock) == 2 {
                    inflight.remove(&fingerprint);
                }
            }
        }

        outcome
    }

    /// The vendor-call path, entered with the per-fingerprint lock held
    async fn analyze_locked(
        &self,
        bytes: &[u8],
        kind: DetectorKind,
        media_type: MediaType,
        filename: &str,
        fingerprint: &MediaFingerprint,
    ) -> Result<Detection, DetectError> {
        // Re-check under the lock: a concurrent request for the same
        // bytes may have populated the cache while we waited.
        if let Some(result) = self.cache.get(fingerprint) {
            println!("[detect] cache hit after wait hash={}", fingerprint);
            return Ok(Detection {
                result,
                fingerprint: fingerprint.clone(),
                cached: true,
            });
        }

        if !self.quota.can_analyze() {
            return Err(DetectError::QuotaExceeded(self.quota.status()));
        }

        let raw = self
            .transport
            .call_vendor(bytes, kind, media_type, filename)
            .await
            .map_err(|e| match e {
                VendorError::MissingCredential(_) => {
                    DetectError::VendorConfigMissing(credential_var(kind))
                }
                other => DetectError::UpstreamUnavailable(other.to_string()),
            })?;

        let result = match kind {
            DetectorKind::AiGenerated => normalize_ai_verdict(&raw),
            DetectorKind::Nsfw => normalize_nsfw_verdict(&raw),
        };

        self.quota.use_credit();
        self.cache.put(fingerprint.clone(), result);

        Ok(Detection {
            result,
            fingerprint: fingerprint.clone(),
            cached: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport that returns a canned AI verdict and counts calls
    struct CountingTransport {
        calls: AtomicUsize,
        delay_ms: u64,
    }

    impl CountingTransport {
        fn new(delay_ms: u64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay_ms,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl VendorTransport for CountingTransport {
        fn call_vendor(
            &self,
            _bytes: &[u8],
            _kind: DetectorKind,
            _media_type: MediaType,
            _filename: &str,
        ) -> impl std::future::Future<Output = Result<Value, VendorError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = self.delay_ms;
            async move {
                if delay > 0 {
                    tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                }
                Ok(json!({
                    "report": {"ai_generated": {"verdict": "ai", "ai": {"confidence": 0.87}}}
                }))
            }
        }
    }

    /// Transport that always fails with a network-style error
    struct FailingTransport;

    impl VendorTransport for FailingTransport {
        fn call_vendor(
            &self,
            _bytes: &[u8],
            _kind: DetectorKind,
            _media_type: MediaType,
            _filename: &str,
        ) -> impl std::future::Future<Output = Result<Value, VendorError>> + Send {
            async { Err(VendorError::Status(500, "vendor down".into())) }
        }
    }

    /// Transport that panics if reached
    struct UnreachableTransport;

    impl VendorTransport for UnreachableTransport {
        fn call_vendor(
            &self,
            _bytes: &[u8],
            _kind: DetectorKind,
            _media_type: MediaType,
            _filename: &str,
        ) -> impl std::future::Future<Output = Result<Value, VendorError>> + Send {
            async { panic!("vendor must not be called") }
        }
    }

    fn detector<T: VendorTransport>(transport: T, limit: u32) -> Detector<T> {
        Detector::new(transport, QuotaTracker::new(limit), DecisionCache::new())
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let d = detector(CountingTransport::new(0), 10);
        let err = d
            .analyze(b"", DetectorKind::AiGenerated, MediaType::Image, "a.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, DetectError::EmptyInput));
    }

    #[tokio::test]
    async fn test_fresh_call_then_cache_hit() {
        let d = detector(CountingTransport::new(0), 10);

        let first = d
            .analyze(b"media", DetectorKind::AiGenerated, MediaType::Image, "a.jpg")
            .await
            .unwrap();
        assert!(!first.cached);
        assert_eq!(
            first.result,
            DetectionResult::Ai {
                is_ai: true,
                confidence: 87.0
            }
        );
        assert_eq!(d.quota_status().used, 1);

        let second = d
            .analyze(b"media", DetectorKind::AiGenerated, MediaType::Image, "a.jpg")
            .await
            .unwrap();
        assert!(second.cached);
        assert_eq!(second.fingerprint, first.fingerprint);
        // Cache hit consumes no quota
        assert_eq!(d.quota_status().used, 1);
    }

    #[tokio::test]
    async fn test_quota_exceeded_blocks_vendor_call() {
        let d = detector(CountingTransport::new(0), 1);

        d.analyze(b"one", DetectorKind::AiGenerated, MediaType::Image, "a.jpg")
            .await
            .unwrap();

        let err = d
            .analyze(b"two", DetectorKind::AiGenerated, MediaType::Image, "b.jpg")
            .await
            .unwrap_err();
        match err {
            DetectError::QuotaExceeded(status) => {
                assert_eq!(status.used, 1);
                assert_eq!(status.remaining, 0);
            }
            other => panic!("expected QuotaExceeded, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_consumes_nothing() {
        let d = detector(FailingTransport, 5);

        let err = d
            .analyze(b"media", DetectorKind::AiGenerated, MediaType::Image, "a.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, DetectError::UpstreamUnavailable(_)));
        assert_eq!(d.quota_status().used, 0);
        assert_eq!(d.cache_size(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_same_fingerprint_single_vendor_call() {
        let d = Arc::new(detector(CountingTransport::new(50), 10));

        let a = {
            let d = d.clone();
            tokio::spawn(async move {
                d.analyze(b"same", DetectorKind::AiGenerated, MediaType::Image, "a.jpg")
                    .await
            })
        };
        let b = {
            let d = d.clone();
            tokio::spawn(async move {
                d.analyze(b"same", DetectorKind::AiGenerated, MediaType::Image, "a.jpg")
                    .await
            })
        };

        let ra = a.await.unwrap().unwrap();
        let rb = b.await.unwrap().unwrap();

        assert_eq!(d.transport.call_count(), 1);
        assert_eq!(d.quota_status().used, 1);
        // Exactly one of the two was served fresh
        assert_eq!([ra.cached, rb.cached].iter().filter(|c| **c).count(), 1);
    }

    #[tokio::test]
    async fn test_nsfw_video_short_circuits() {
        let d = detector(UnreachableTransport, 10);

        let detection = d
            .analyze(b"video bytes", DetectorKind::Nsfw, MediaType::Video, "clip.mp4")
            .await
            .unwrap();

        assert_eq!(
            detection.result,
            DetectionResult::Nsfw {
                is_nsfw: false,
                score: 0.0,
                category: NsfwCategory::VideoUnsupported
            }
        );
        assert!(!detection.cached);
        assert_eq!(d.quota_status().used, 0);
        assert_eq!(d.cache_size(), 0);
    }

    #[tokio::test]
    async fn test_missing_credential_maps_to_config_error() {
        struct NoCredTransport;
        impl VendorTransport for NoCredTransport {
            fn call_vendor(
                &self,
                _bytes: &[u8],
                _kind: DetectorKind,
                _media_type: MediaType,
                _filename: &str,
            ) -> impl std::future::Future<Output = Result<Value, VendorError>> + Send
            {
                async { Err(VendorError::MissingCredential("AI_OR_NOT_API_KEY")) }
            }
            fn has_credential(&self, _kind: DetectorKind) -> bool {
                false
            }
        }

        let d = detector(NoCredTransport, 10);
        let err = d
            .analyze(b"media", DetectorKind::AiGenerated, MediaType::Image, "a.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, DetectError::VendorConfigMissing(_)));
        assert_eq!(d.quota_status().used, 0);
    }

    #[tokio::test]
    async fn test_inflight_map_cleaned_up() {
        let d = detector(CountingTransport::new(0), 10);
        d.analyze(b"media", DetectorKind::AiGenerated, MediaType::Image, "a.jpg")
            .await
            .unwrap();
        assert!(d.inflight.lock().await.is_empty());
    }
}

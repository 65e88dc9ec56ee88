use crate::core::Platform;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Minimum spacing between calls to each platform.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitPolicy {
    default_interval: Duration,
    intervals: HashMap<Platform, Duration>,
}

impl RateLimitPolicy {
    pub fn new(default_interval: Duration) -> Self {
        Self {
            default_interval,
            intervals: HashMap::new(),
        }
    }

    pub fn with_interval(mut self, platform: Platform, interval: Duration) -> Self {
        self.intervals.insert(platform, interval);
        self
    }

    pub fn interval_for(&self, platform: Platform) -> Duration {
        self.intervals
            .get(&platform)
            .copied()
            .unwrap_or(self.default_interval)
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
            .with_interval(Platform::YouTube, Duration::from_secs(1))
            .with_interval(Platform::Instagram, Duration::from_secs(2))
            .with_interval(Platform::TikTok, Duration::from_millis(1500))
            .with_interval(Platform::Twitter, Duration::from_secs(1))
            .with_interval(Platform::Facebook, Duration::from_secs(2))
    }
}

type Slot = Arc<tokio::sync::Mutex<Option<Instant>>>;

/// Per-platform minimum-interval gate.
///
/// Each platform owns a slot holding the time of its last admitted call.
/// The check, the wait and the update all happen while that slot's lock is
/// held, so concurrent callers for one platform are admitted one interval
/// apart. Callers for different platforms use different slots and never
/// wait on each other.
#[derive(Debug)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    slots: DashMap<Platform, Slot>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            slots: DashMap::new(),
        }
    }

    /// Wait until `platform` may be called again and record the admission.
    ///
    /// Returns the instant the call was admitted. This never fails; it only
    /// delays.
    pub async fn acquire(&self, platform: Platform) -> Instant {
        let slot = self.slot(platform);
        let mut last_call = slot.lock().await;

        if let Some(previous) = *last_call {
            let interval = self.policy.interval_for(platform);
            let remaining = interval.saturating_sub(previous.elapsed());
            if !remaining.is_zero() {
                debug!("Rate limiting {}: waiting {:?}", platform, remaining);
                tokio::time::sleep(remaining).await;
            }
        }

        let admitted = Instant::now();
        *last_call = Some(admitted);
        admitted
    }

    // Clone the slot out so the map shard is released before awaiting.
    fn slot(&self, platform: Platform) -> Slot {
        self.slots.entry(platform).or_default().clone()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitPolicy::default())
    }
}

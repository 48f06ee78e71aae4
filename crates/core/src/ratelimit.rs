//! Per-client admission control.
//!
//! Fixed windows aligned to wall-clock boundaries, one counter per
//! `(operation class, client key)`. A client can therefore land up to twice
//! its threshold across a boundary (the tail of one window plus the head of
//! the next); that is accepted.
//!
//! Counters live in a sharded [`DashMap`], so each call locks only the shard
//! holding its key. Windows from earlier periods are reset in place when their
//! key is touched again, and swept in bulk once per new window per class so
//! idle clients do not accumulate.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};

/// Request categories with independent thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationClass {
    Write,
    Read,
}

impl OperationClass {
    fn slot(self) -> usize {
        match self {
            OperationClass::Write => 0,
            OperationClass::Read => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationClass::Write => "write",
            OperationClass::Read => "read",
        }
    }
}

/// Threshold and window length for one operation class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLimit {
    /// Operations admitted per window.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl ClassLimit {
    pub const fn per_minute(max_requests: u32) -> Self {
        Self { max_requests, window_secs: 60 }
    }

    fn window_millis(self) -> i64 {
        i64::try_from(self.window_secs.max(1).saturating_mul(1000)).unwrap_or(i64::MAX)
    }
}

/// Limits for both operation classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub write: ClassLimit,
    pub read: ClassLimit,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { write: ClassLimit::per_minute(30), read: ClassLimit::per_minute(300) }
    }
}

impl RateLimitConfig {
    pub fn limit_for(&self, class: OperationClass) -> ClassLimit {
        match class {
            OperationClass::Write => self.write,
            OperationClass::Read => self.read,
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed {
        /// Operations left in the current window after this one.
        remaining: u32,
        /// Time until the window rolls over.
        reset_in: Duration,
    },
    Denied {
        /// Time until the window rolls over; always at least 1ms.
        retry_after: Duration,
    },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WindowKey {
    class: OperationClass,
    client: String,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    /// Index of the window period: `now_ms / window_ms`.
    period: i64,
    count: u32,
}

/// Fixed-window rate limiter keyed by client and operation class.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    windows: DashMap<WindowKey, Window>,
    /// Latest period already swept, per class.
    swept: [AtomicI64; 2],
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            windows: DashMap::new(),
            swept: [AtomicI64::new(i64::MIN), AtomicI64::new(i64::MIN)],
        }
    }

    /// Count one operation for `client_key`, or deny it with a retry hint.
    pub fn allow(&self, client_key: &str, class: OperationClass) -> Admission {
        let limit = self.config.limit_for(class);
        let window_ms = limit.window_millis();
        let now_ms = self.clock.now().timestamp_millis();
        let period = now_ms.div_euclid(window_ms);
        let reset_in = period
            .checked_add(1)
            .and_then(|next| next.checked_mul(window_ms))
            .map_or(window_ms, |boundary| boundary - now_ms);
        let reset_in = Duration::from_millis(u64::try_from(reset_in.max(1)).unwrap_or(1));

        // Must run before taking the entry guard below: retain locks shards.
        self.sweep_stale(class, period);

        let key = WindowKey { class, client: client_key.to_string() };
        let mut window = self.windows.entry(key).or_insert(Window { period, count: 0 });
        if window.period != period {
            *window = Window { period, count: 0 };
        }

        if window.count >= limit.max_requests {
            tracing::debug!(client = client_key, class = class.as_str(), count = window.count, "admission denied");
            return Admission::Denied { retry_after: reset_in };
        }

        window.count += 1;
        Admission::Allowed { remaining: limit.max_requests - window.count, reset_in }
    }

    /// Drop counters belonging to periods before `period` for this class.
    ///
    /// Runs at most once per class per period; the caller that advances the
    /// marker does the sweep.
    fn sweep_stale(&self, class: OperationClass, period: i64) {
        let marker = &self.swept[class.slot()];
        let seen = marker.load(Ordering::Acquire);
        if period <= seen {
            return;
        }
        if marker
            .compare_exchange(seen, period, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let before = self.windows.len();
        self.windows
            .retain(|key, window| key.class != class || window.period >= period);
        let dropped = before.saturating_sub(self.windows.len());
        if dropped > 0 {
            tracing::debug!(class = class.as_str(), dropped, "evicted stale admission windows");
        }
    }

    /// Number of `(class, client)` counters currently held.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::clock::ManualClock;

    /// 30 seconds into a minute-aligned window.
    fn mid_window() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:30Z").unwrap().with_timezone(&Utc)
    }

    fn limiter(write: u32, read: u32) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(mid_window()));
        let config = RateLimitConfig { write: ClassLimit::per_minute(write), read: ClassLimit::per_minute(read) };
        (RateLimiter::with_clock(config, clock.clone()), clock)
    }

    #[test]
    fn test_write_threshold() {
        let (limiter, _clock) = limiter(30, 300);

        for i in 0..30 {
            assert!(limiter.allow("10.0.0.1", OperationClass::Write).is_allowed(), "write {} should pass", i + 1);
        }

        match limiter.allow("10.0.0.1", OperationClass::Write) {
            Admission::Denied { retry_after } => {
                assert!(retry_after > Duration::ZERO);
                assert_eq!(retry_after, Duration::from_secs(30));
            }
            Admission::Allowed { .. } => panic!("31st write should be denied"),
        }
    }

    #[test]
    fn test_remaining_counts_down() {
        let (limiter, _clock) = limiter(3, 300);
        let remaining: Vec<u32> = (0..3)
            .map(|_| match limiter.allow("client", OperationClass::Write) {
                Admission::Allowed { remaining, .. } => remaining,
                Admission::Denied { .. } => panic!("should be allowed"),
            })
            .collect();
        assert_eq!(remaining, vec![2, 1, 0]);
    }

    #[test]
    fn test_classes_are_independent() {
        let (limiter, _clock) = limiter(1, 2);

        assert!(limiter.allow("client", OperationClass::Write).is_allowed());
        assert!(!limiter.allow("client", OperationClass::Write).is_allowed());

        assert!(limiter.allow("client", OperationClass::Read).is_allowed());
        assert!(limiter.allow("client", OperationClass::Read).is_allowed());
        assert!(!limiter.allow("client", OperationClass::Read).is_allowed());
    }

    #[test]
    fn test_clients_are_independent() {
        let (limiter, _clock) = limiter(1, 1);
        assert!(limiter.allow("a", OperationClass::Write).is_allowed());
        assert!(!limiter.allow("a", OperationClass::Write).is_allowed());
        assert!(limiter.allow("b", OperationClass::Write).is_allowed());
    }

    #[test]
    fn test_window_rolls_over_at_boundary() {
        let (limiter, clock) = limiter(2, 300);
        assert!(limiter.allow("client", OperationClass::Write).is_allowed());
        assert!(limiter.allow("client", OperationClass::Write).is_allowed());
        assert!(!limiter.allow("client", OperationClass::Write).is_allowed());

        clock.advance(Duration::from_millis(29_999));
        assert!(!limiter.allow("client", OperationClass::Write).is_allowed());

        clock.advance(Duration::from_millis(1));
        assert!(limiter.allow("client", OperationClass::Write).is_allowed());
    }

    #[test]
    fn test_boundary_burst_is_permitted() {
        let (limiter, clock) = limiter(5, 300);
        clock.set(DateTime::parse_from_rfc3339("2026-03-01T12:00:59Z").unwrap().with_timezone(&Utc));
        for _ in 0..5 {
            assert!(limiter.allow("burst", OperationClass::Write).is_allowed());
        }

        clock.advance(Duration::from_secs(1));
        for _ in 0..5 {
            assert!(limiter.allow("burst", OperationClass::Write).is_allowed());
        }
        assert!(!limiter.allow("burst", OperationClass::Write).is_allowed());
    }

    #[test]
    fn test_idle_clients_are_evicted() {
        let (limiter, clock) = limiter(10, 10);
        for i in 0..50 {
            limiter.allow(&format!("client-{i}"), OperationClass::Read);
        }
        limiter.allow("writer", OperationClass::Write);
        assert_eq!(limiter.tracked_keys(), 51);

        clock.advance(Duration::from_secs(60));
        limiter.allow("fresh", OperationClass::Read);

        // Read counters from the old window are gone; the write counter stays
        // until a write is seen in the new period.
        assert_eq!(limiter.tracked_keys(), 2);

        limiter.allow("fresh", OperationClass::Write);
        assert_eq!(limiter.tracked_keys(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_admission_respects_threshold() {
        let (limiter, _clock) = limiter(100, 300);
        let limiter = Arc::new(limiter);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    (0..50)
                        .filter(|_| limiter.allow("shared", OperationClass::Write).is_allowed())
                        .count()
                })
            })
            .collect();

        let mut admitted = 0;
        for task in tasks {
            admitted += task.await.unwrap();
        }
        assert_eq!(admitted, 100);
    }
}

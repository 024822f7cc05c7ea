use crate::clock::millis;
use crate::rate_limit::WindowPolicy;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Duration;

/// Counter for one client key.
///
/// Times are [`Clock::now_millis`](crate::clock::Clock::now_millis) readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub window_start: u64,
    pub count: u32,
}

impl RateWindow {
    pub fn new(now: u64) -> Self {
        Self { window_start: now, count: 0 }
    }

    /// Whether the window that started at `window_start` has fully elapsed.
    pub fn is_expired(&self, window: Duration, now: u64) -> bool {
        now.saturating_sub(self.window_start) >= millis(window)
    }

    /// Reading at which this window closes.
    pub fn closes_at(&self, window: Duration) -> u64 {
        self.window_start.saturating_add(millis(window))
    }

    /// Apply the fixed-window rule: reset if the window elapsed, then admit while
    /// `count + permits <= permit_limit`.
    pub fn try_consume(&mut self, permits: u32, policy: &WindowPolicy, now: u64) -> bool {
        if self.is_expired(policy.window(), now) {
            self.window_start = now;
            self.count = 0;
        }
        match self.count.checked_add(permits) {
            Some(next) if next <= policy.permit_limit() => {
                self.count = next;
                true
            }
            _ => false,
        }
    }
}

/// Outcome of one store update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    pub admitted: bool,
    /// The window after the update.
    pub window: RateWindow,
}

/// Abstract storage for per-key rate windows.
///
/// Implementations must apply [`RateWindow::try_consume`] atomically per key. Different keys
/// should not serialize behind one another.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Check-and-increment the window for `key`, creating it on first use.
    async fn try_consume(
        &self,
        key: &str,
        permits: u32,
        policy: &WindowPolicy,
        now: u64,
    ) -> Result<WindowHit, Self::Error>;

    /// Drop windows that have fully elapsed. Returns how many were removed.
    async fn purge_expired(
        &self,
        window: Duration,
        now: u64,
    ) -> Result<usize, Self::Error>;
}

/// In-memory window store sharded by key.
#[derive(Debug, Default)]
pub struct InMemoryWindowStore {
    windows: DashMap<String, RateWindow>,
}

impl InMemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked client keys.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn window(&self, key: &str) -> Option<RateWindow> {
        self.windows.get(key).map(|w| *w)
    }
}

#[async_trait]
impl WindowStore for InMemoryWindowStore {
    type Error = std::convert::Infallible;

    async fn try_consume(
        &self,
        key: &str,
        permits: u32,
        policy: &WindowPolicy,
        now: u64,
    ) -> Result<WindowHit, Self::Error> {
        let mut window =
            self.windows.entry(key.to_owned()).or_insert_with(|| RateWindow::new(now));
        let admitted = window.try_consume(permits, policy, now);
        Ok(WindowHit { admitted, window: *window })
    }

    async fn purge_expired(
        &self,
        window: Duration,
        now: u64,
    ) -> Result<usize, Self::Error> {
        let before = self.windows.len();
        self.windows.retain(|_, w| !w.is_expired(window, now));
        Ok(before.saturating_sub(self.windows.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_000_000;

    fn policy(limit: u32) -> WindowPolicy {
        WindowPolicy::new(limit, Duration::from_secs(60)).unwrap()
    }

    #[test]
    fn window_admits_up_to_limit() {
        let mut w = RateWindow::new(T0);
        assert!(w.try_consume(1, &policy(2), T0));
        assert!(w.try_consume(1, &policy(2), T0));
        assert!(!w.try_consume(1, &policy(2), T0));
        assert_eq!(w.count, 2);
    }

    #[test]
    fn window_resets_when_elapsed() {
        let mut w = RateWindow::new(T0);
        assert!(w.try_consume(1, &policy(1), T0));
        let almost = T0 + 59_000;
        assert!(!w.try_consume(1, &policy(1), almost));
        let later = T0 + 60_000;
        assert!(w.try_consume(1, &policy(1), later));
        assert_eq!(w.window_start, later);
        assert_eq!(w.count, 1);
    }

    #[test]
    fn oversized_request_never_admitted() {
        let mut w = RateWindow::new(T0);
        assert!(!w.try_consume(3, &policy(2), T0));
        assert!(!w.try_consume(u32::MAX, &policy(2), T0));
        assert_eq!(w.count, 0);
    }

    #[test]
    fn huge_window_saturates_instead_of_overflowing() {
        let w = RateWindow::new(T0);
        assert_eq!(w.closes_at(Duration::MAX), u64::MAX);
        assert!(!w.is_expired(Duration::MAX, u64::MAX - 1));
    }

    #[tokio::test]
    async fn store_partitions_by_key() {
        let store = InMemoryWindowStore::new();
        let p = policy(1);
        assert!(store.try_consume("a", 1, &p, T0).await.unwrap().admitted);
        assert!(!store.try_consume("a", 1, &p, T0).await.unwrap().admitted);
        assert!(store.try_consume("b", 1, &p, T0).await.unwrap().admitted);
        assert_eq!(store.len(), 2);
        assert_eq!(store.window("a").unwrap().count, 1);
    }

    #[tokio::test]
    async fn purge_drops_only_elapsed_windows() {
        let store = InMemoryWindowStore::new();
        let p = policy(5);
        store.try_consume("old", 1, &p, T0).await.unwrap();
        store.try_consume("fresh", 1, &p, T0 + 30_000).await.unwrap();

        let removed =
            store.purge_expired(p.window(), T0 + 60_000).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.window("old").is_none());
        assert!(store.window("fresh").is_some());
    }
}

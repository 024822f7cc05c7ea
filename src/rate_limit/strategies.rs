use crate::adaptive::Adaptive;
use crate::clock::Clock;
use crate::rate_limit::store::WindowStore;
use crate::rate_limit::{Decision, RateLimiter, WindowPolicy, BREW_POLICY_NAME};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A fixed-window rate limiter.
///
/// Each key gets `permit_limit` permits per `window`. The window for a key starts at its first
/// request and restarts on the first request after it elapses. The policy can be swapped at
/// runtime with [`FixedWindow::set_policy`]; open windows keep their start time.
pub struct FixedWindow<S> {
    store: Arc<S>,
    policy: Adaptive<WindowPolicy>,
    clock: Arc<dyn Clock>,
    name: String,
}

impl<S> FixedWindow<S>
where
    S: WindowStore + 'static,
{
    pub fn new(store: S, policy: WindowPolicy, clock: Arc<dyn Clock>) -> Self {
        Self::with_store(Arc::new(store), policy, clock)
    }

    /// Share a store with other handles (e.g. a background purge task).
    pub fn with_store(store: Arc<S>, policy: WindowPolicy, clock: Arc<dyn Clock>) -> Self {
        Self { store, policy: Adaptive::new(policy), clock, name: BREW_POLICY_NAME.to_string() }
    }

    /// Name reported in `Decision::Denied::reason`.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn policy(&self) -> WindowPolicy {
        *self.policy.get()
    }

    pub fn set_policy(&self, policy: WindowPolicy) {
        tracing::info!(
            policy = %self.name,
            permit_limit = policy.permit_limit(),
            window = ?policy.window(),
            "rate-limit policy updated"
        );
        self.policy.set(policy);
    }

    /// Single-permit admission. Store failures reject the request.
    pub async fn admit(&self, key: &str) -> bool {
        match self.acquire(key, 1).await {
            Ok(decision) => decision.is_allowed(),
            Err(e) => {
                tracing::error!(key, error = %e, "rate-limit store failed; rejecting");
                false
            }
        }
    }

    /// Drop windows that have fully elapsed under the current policy.
    pub async fn purge_expired(&self) -> Result<usize, S::Error> {
        let window = self.policy.get().window();
        let removed = self.store.purge_expired(window, self.clock.now_millis()).await?;
        if removed > 0 {
            tracing::debug!(policy = %self.name, removed, "purged idle rate windows");
        }
        Ok(removed)
    }
}

#[async_trait]
impl<S> RateLimiter for FixedWindow<S>
where
    S: WindowStore + 'static,
{
    async fn acquire(
        &self,
        key: &str,
        permits: u32,
    ) -> Result<Decision, Box<dyn std::error::Error + Send + Sync>> {
        let policy = *self.policy.get();
        let now = self.clock.now_millis();
        let hit = self.store.try_consume(key, permits, &policy, now).await?;

        if hit.admitted {
            return Ok(Decision::Allowed {
                remaining: policy.permit_limit().saturating_sub(hit.window.count),
            });
        }

        let wait = Duration::from_millis(hit.window.closes_at(policy.window()).saturating_sub(now));
        tracing::warn!(key, policy = %self.name, ?wait, "rate limit exceeded");
        Ok(Decision::Denied { wait, reason: self.name.clone() })
    }
}

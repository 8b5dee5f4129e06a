//! Core proxy pool implementation.

use crate::config::ProxyPoolConfig;
use crate::cooldown::CooldownLedger;
use crate::endpoint::ProxyEndpoint;
use crate::resolver::{self, Resolution};

use log::{info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A rotating pool of proxy endpoints with per-endpoint cooldowns.
///
/// The pool is an explicitly owned instance, not process-global state;
/// hand an `Arc<ProxyPool>` to whatever issues outbound calls. All
/// operations other than construction are synchronous and take the state
/// lock exactly once, so interleaved callers observe atomic transitions.
pub struct ProxyPool {
    state: Mutex<PoolState>,
    /// Configuration for the pool.
    pub config: ProxyPoolConfig,
}

struct PoolState {
    enabled: bool,
    /// Insertion order is rotation order; no duplicates.
    endpoints: Vec<ProxyEndpoint>,
    /// Index of the next slot to try.
    cursor: usize,
    cooldowns: CooldownLedger,
}

impl ProxyPool {
    /// Create a pool by resolving proxy sources per the configuration.
    /// Infallible: every resolution failure degrades to a disabled pool.
    pub async fn new(config: ProxyPoolConfig) -> Arc<Self> {
        let resolution = resolver::resolve(&config).await;
        Arc::new(Self::from_resolution(config, resolution))
    }

    /// Build a pool from an already-computed resolution.
    pub fn from_resolution(config: ProxyPoolConfig, resolution: Resolution) -> Self {
        Self {
            state: Mutex::new(PoolState {
                enabled: resolution.enabled && !resolution.endpoints.is_empty(),
                endpoints: resolution.endpoints,
                cursor: 0,
                cooldowns: CooldownLedger::new(),
            }),
            config,
        }
    }

    /// Build an enabled pool directly from endpoints, bypassing source
    /// resolution. An empty list yields a disabled pool.
    pub fn from_endpoints(config: ProxyPoolConfig, endpoints: Vec<ProxyEndpoint>) -> Self {
        Self::from_resolution(config, Resolution::from_endpoints(endpoints))
    }

    /// Round-robin selection: the first endpoint at or after the cursor
    /// whose cooldown has expired. `None` means "proceed without a proxy
    /// for this call" and is returned when the pool is disabled, empty,
    /// or every endpoint is cooling down.
    pub fn next(&self) -> Option<ProxyEndpoint> {
        self.next_at(Instant::now())
    }

    fn next_at(&self, now: Instant) -> Option<ProxyEndpoint> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if !state.enabled || state.endpoints.is_empty() {
            return None;
        }
        let len = state.endpoints.len();
        for step in 0..len {
            let idx = (state.cursor + step) % len;
            let endpoint = &state.endpoints[idx];
            if state.cooldowns.is_eligible(endpoint.url().as_str(), now) {
                let endpoint = endpoint.clone();
                state.cursor = (idx + 1) % len;
                return Some(endpoint);
            }
        }
        None
    }

    /// Take `endpoint` out of rotation for the configured default duration.
    pub fn cool_down(&self, endpoint: &ProxyEndpoint) {
        self.cool_down_for(endpoint, self.config.default_cooldown);
    }

    /// Take `endpoint` out of rotation until `duration` has elapsed. The
    /// endpoint keeps its slot in the rotation sequence; a later call for
    /// the same endpoint overwrites the earlier expiry.
    pub fn cool_down_for(&self, endpoint: &ProxyEndpoint, duration: Duration) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if !state.endpoints.iter().any(|e| e == endpoint) {
            return;
        }
        state
            .cooldowns
            .set(endpoint.url().as_str(), Instant::now() + duration);
        warn!("Cooling down proxy {} for {:?}", endpoint, duration);
    }

    /// Permanently remove `endpoint` from the pool. This is the caller's
    /// decision (e.g. the destination rejected the endpoint's credentials);
    /// the pool never removes an endpoint on its own.
    pub fn remove(&self, endpoint: &ProxyEndpoint) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let Some(idx) = state.endpoints.iter().position(|e| e == endpoint) else {
            return;
        };
        state.endpoints.remove(idx);
        state.cooldowns.clear(endpoint.url().as_str());
        // Keep the cursor pointing at the same upcoming endpoint.
        if idx < state.cursor {
            state.cursor -= 1;
        }
        if state.endpoints.is_empty() {
            state.cursor = 0;
        } else {
            state.cursor %= state.endpoints.len();
        }
        info!("Removed proxy {} from pool", endpoint);
    }

    /// Whether resolution produced a usable pool.
    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// (total endpoints, endpoints currently cooling down).
    pub fn stats(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.endpoints.len(), state.cooldowns.cooling(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::ProxyScheme;

    fn endpoint(host: &str) -> ProxyEndpoint {
        ProxyEndpoint::new(ProxyScheme::Http, host, 8080, None, None).unwrap()
    }

    fn pool_of(hosts: &[&str]) -> ProxyPool {
        let endpoints = hosts.iter().map(|h| endpoint(h)).collect();
        ProxyPool::from_endpoints(ProxyPoolConfig::builder().enabled(true).build(), endpoints)
    }

    fn hosts_of(pool: &ProxyPool, n: usize) -> Vec<String> {
        (0..n)
            .map(|_| {
                pool.next()
                    .expect("pool should yield an endpoint")
                    .host()
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn round_robin_visits_each_endpoint_once_before_repeating() {
        let pool = pool_of(&["a", "b", "c"]);
        assert_eq!(hosts_of(&pool, 6), ["a", "b", "c", "a", "b", "c"]);
    }

    #[test]
    fn single_endpoint_repeats() {
        let pool = pool_of(&["a"]);
        assert_eq!(hosts_of(&pool, 3), ["a", "a", "a"]);
    }

    #[test]
    fn disabled_pool_yields_nothing() {
        let pool = ProxyPool::from_resolution(
            ProxyPoolConfig::builder().build(),
            Resolution::disabled(),
        );
        assert!(!pool.is_enabled());
        assert_eq!(pool.next(), None);
    }

    #[test]
    fn empty_pool_is_treated_as_disabled() {
        let pool = ProxyPool::from_endpoints(
            ProxyPoolConfig::builder().enabled(true).build(),
            Vec::new(),
        );
        assert!(!pool.is_enabled());
        assert_eq!(pool.next(), None);
    }

    #[test]
    fn cooling_endpoint_is_skipped_without_reordering() {
        let pool = pool_of(&["a", "b", "c"]);
        let b = endpoint("b");
        pool.cool_down_for(&b, Duration::from_secs(60));

        let now = Instant::now();
        assert_eq!(pool.next_at(now).unwrap().host(), "a");
        assert_eq!(pool.next_at(now).unwrap().host(), "c");
        assert_eq!(pool.next_at(now).unwrap().host(), "a");

        // Once the cooldown elapses, `b` resumes its original slot.
        let later = now + Duration::from_secs(61);
        assert_eq!(pool.next_at(later).unwrap().host(), "b");
        assert_eq!(pool.next_at(later).unwrap().host(), "c");
        assert_eq!(pool.next_at(later).unwrap().host(), "a");
    }

    #[test]
    fn all_cooling_yields_none_then_recovers() {
        let pool = pool_of(&["a", "b"]);
        pool.cool_down_for(&endpoint("a"), Duration::from_secs(60));
        pool.cool_down_for(&endpoint("b"), Duration::from_secs(60));

        let now = Instant::now();
        assert_eq!(pool.next_at(now), None);
        assert_eq!(pool.stats().1, 2);

        let later = now + Duration::from_secs(61);
        assert_eq!(pool.next_at(later).unwrap().host(), "a");
    }

    #[test]
    fn later_cooldown_overwrites_earlier_expiry() {
        let pool = pool_of(&["a", "b"]);
        let a = endpoint("a");
        pool.cool_down_for(&a, Duration::from_secs(600));
        pool.cool_down_for(&a, Duration::from_millis(1));

        let later = Instant::now() + Duration::from_secs(1);
        assert_eq!(pool.next_at(later).unwrap().host(), "a");
    }

    #[test]
    fn removed_endpoint_never_comes_back() {
        let pool = pool_of(&["a", "b", "c"]);
        pool.remove(&endpoint("b"));
        assert_eq!(pool.stats().0, 2);
        assert_eq!(hosts_of(&pool, 4), ["a", "c", "a", "c"]);

        // Not even after arbitrary elapsed time.
        let later = Instant::now() + Duration::from_secs(3600);
        assert_eq!(pool.next_at(later).unwrap().host(), "a");
        assert_eq!(pool.next_at(later).unwrap().host(), "c");
    }

    #[test]
    fn remove_keeps_rotation_aligned_mid_cycle() {
        let pool = pool_of(&["a", "b", "c"]);
        assert_eq!(pool.next().unwrap().host(), "a");
        // Cursor now points at "b"; removing "a" must not skip "b".
        pool.remove(&endpoint("a"));
        assert_eq!(hosts_of(&pool, 3), ["b", "c", "b"]);
    }

    #[test]
    fn removing_the_last_endpoint_empties_the_pool() {
        let pool = pool_of(&["a"]);
        pool.remove(&endpoint("a"));
        assert_eq!(pool.next(), None);
        assert_eq!(pool.stats(), (0, 0));
    }

    #[test]
    fn cooldown_of_unknown_endpoint_is_ignored() {
        let pool = pool_of(&["a"]);
        pool.cool_down_for(&endpoint("ghost"), Duration::from_secs(60));
        assert_eq!(pool.stats().1, 0);
        assert_eq!(pool.next().unwrap().host(), "a");
    }
}

//! Keyed cooldown tracking for proxy endpoints.
//!
//! The ledger records, per endpoint, the instant after which it becomes
//! eligible for selection again. Endpoints stay in the pool's rotation
//! sequence while cooling down; selection merely skips them, so rotation
//! order is preserved across cooldown cycles.

use std::collections::HashMap;
use std::time::Instant;

/// Expiry store consulted once per rotation-scan entry; all operations are
/// O(1) amortized.
#[derive(Debug, Default)]
pub struct CooldownLedger {
    entries: HashMap<String, Instant>,
}

impl CooldownLedger {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Mark `key` ineligible until `until`. A later call for the same key
    /// overwrites the earlier expiry (last-write-wins).
    pub fn set(&mut self, key: &str, until: Instant) {
        self.entries.insert(key.to_string(), until);
    }

    /// An endpoint with no entry, or whose expiry has passed, is eligible.
    pub fn is_eligible(&self, key: &str, now: Instant) -> bool {
        match self.entries.get(key) {
            Some(until) => *until <= now,
            None => true,
        }
    }

    /// Drop the entry for `key`, if any.
    pub fn clear(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Number of entries still cooling at `now`.
    pub fn cooling(&self, now: Instant) -> usize {
        self.entries.values().filter(|until| **until > now).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn unknown_key_is_eligible() {
        let ledger = CooldownLedger::new();
        assert!(ledger.is_eligible("http://a:1/", Instant::now()));
    }

    #[test]
    fn entry_blocks_until_expiry() {
        let mut ledger = CooldownLedger::new();
        let now = Instant::now();
        ledger.set("http://a:1/", now + Duration::from_secs(60));

        assert!(!ledger.is_eligible("http://a:1/", now));
        assert!(!ledger.is_eligible("http://a:1/", now + Duration::from_secs(59)));
        assert!(ledger.is_eligible("http://a:1/", now + Duration::from_secs(60)));
        assert!(ledger.is_eligible("http://a:1/", now + Duration::from_secs(61)));
    }

    #[test]
    fn later_set_overwrites_earlier_expiry() {
        let mut ledger = CooldownLedger::new();
        let now = Instant::now();
        ledger.set("http://a:1/", now + Duration::from_secs(60));
        ledger.set("http://a:1/", now + Duration::from_secs(5));

        assert!(ledger.is_eligible("http://a:1/", now + Duration::from_secs(10)));
    }

    #[test]
    fn clear_restores_eligibility() {
        let mut ledger = CooldownLedger::new();
        let now = Instant::now();
        ledger.set("http://a:1/", now + Duration::from_secs(60));
        ledger.clear("http://a:1/");

        assert!(ledger.is_eligible("http://a:1/", now));
        assert_eq!(ledger.cooling(now), 0);
    }

    #[test]
    fn cooling_counts_only_pending_entries() {
        let mut ledger = CooldownLedger::new();
        let now = Instant::now();
        ledger.set("http://a:1/", now + Duration::from_secs(60));
        ledger.set("http://b:1/", now - Duration::from_secs(1));

        assert_eq!(ledger.cooling(now), 1);
    }
}

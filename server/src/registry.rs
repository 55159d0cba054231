//! Account registry and new-account admission control
//!
//! This module owns every account the server has ever seen:
//! - Mapping from the reporter's self-asserted identifier to its account
//! - Display-name disambiguation so names stay unique across the registry
//! - A rolling creation-rate gate bounding how fast new accounts appear
//!
//! Accounts are never removed. The registry lives for the whole process.

use crate::error::ReportError;
use log::{info, warn};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet, VecDeque};

/// Per-identifier tracking state
///
/// Timestamps are server-side wall-clock seconds; `last_reported_elapsed`
/// is whatever the reporter last claimed and was accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Opaque client-supplied key
    pub identifier: String,
    /// Unique, immutable after creation
    pub display_name: String,
    /// Sum of every accepted delta
    pub total_elapsed: f64,
    /// Baseline for the next delta
    pub last_reported_elapsed: f64,
    /// Drives the online flag on the leaderboard
    pub last_seen_wall_time: f64,
    /// Bounds delta plausibility against real elapsed time
    pub last_update_wall_time: f64,
}

impl Account {
    /// Creates an account seeded from its first report
    ///
    /// The baseline is the first report's own elapsed value, so that report
    /// always yields a zero delta.
    pub fn new(
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        asserted_elapsed: f64,
        now: f64,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: display_name.into(),
            total_elapsed: 0.0,
            last_reported_elapsed: asserted_elapsed,
            last_seen_wall_time: now,
            last_update_wall_time: now,
        }
    }

    /// Returns true if the account reported within `window` seconds of `now`
    pub fn is_online(&self, now: f64, window: f64) -> bool {
        now - self.last_seen_wall_time < window
    }
}

/// Caps how many accounts may be created per rolling window
///
/// Timestamps are appended in arrival order, so expiry is a prefix trim.
#[derive(Debug)]
pub struct CreationGate {
    max_per_window: usize,
    window: f64,
    admitted: VecDeque<f64>,
}

impl CreationGate {
    pub fn new(max_per_window: usize, window: f64) -> Self {
        Self {
            max_per_window,
            window,
            admitted: VecDeque::with_capacity(max_per_window),
        }
    }

    /// Drops every creation older than the window
    fn evict(&mut self, now: f64) {
        while let Some(&oldest) = self.admitted.front() {
            if now - oldest > self.window {
                self.admitted.pop_front();
            } else {
                break;
            }
        }
    }

    /// Records a creation at `now` if the window has room
    ///
    /// Returns `RateLimited` and records nothing when the window is full.
    pub fn admit(&mut self, now: f64) -> Result<(), ReportError> {
        self.evict(now);

        if self.admitted.len() >= self.max_per_window {
            return Err(ReportError::RateLimited);
        }

        self.admitted.push_back(now);
        Ok(())
    }

    /// Number of creations still inside the window as of the last call
    pub fn in_window(&self) -> usize {
        self.admitted.len()
    }
}

/// Picks the first free name among `requested`, `requested_2`, `requested_3`, ...
pub fn unique_display_name(taken: &HashSet<String>, requested: &str) -> String {
    if !taken.contains(requested) {
        return requested.to_string();
    }

    let mut suffix = 2u64;
    loop {
        let candidate = format!("{}_{}", requested, suffix);
        if !taken.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Identifier-to-account table plus the creation gate guarding it
#[derive(Debug)]
pub struct Registry {
    accounts: HashMap<String, Account>,
    display_names: HashSet<String>,
    gate: CreationGate,
}

impl Registry {
    pub fn new(max_new_accounts: usize, creation_window: f64) -> Self {
        Self {
            accounts: HashMap::new(),
            display_names: HashSet::new(),
            gate: CreationGate::new(max_new_accounts, creation_window),
        }
    }

    /// Returns the account for `identifier`, creating it if it is new
    ///
    /// For a known identifier the name and elapsed arguments are ignored and
    /// the boolean is false. For an unknown one the creation gate is
    /// consulted first; a denial leaves the registry untouched.
    pub fn resolve_or_create(
        &mut self,
        identifier: &str,
        requested_name: &str,
        asserted_elapsed: f64,
        now: f64,
    ) -> Result<(&mut Account, bool), ReportError> {
        match self.accounts.entry(identifier.to_string()) {
            Entry::Occupied(entry) => Ok((entry.into_mut(), false)),
            Entry::Vacant(entry) => {
                if let Err(e) = self.gate.admit(now) {
                    warn!(
                        "Refused new account {} ({}): {}",
                        identifier, requested_name, e
                    );
                    return Err(e);
                }

                let display_name = unique_display_name(&self.display_names, requested_name);
                self.display_names.insert(display_name.clone());

                info!("New account {} registered as {}", identifier, display_name);
                let account = Account::new(identifier, display_name, asserted_elapsed, now);
                Ok((entry.insert(account), true))
            }
        }
    }

    pub fn get(&self, identifier: &str) -> Option<&Account> {
        self.accounts.get(identifier)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Counts accounts seen within `window` seconds of `now`
    pub fn online_count(&self, now: f64, window: f64) -> usize {
        self.accounts
            .values()
            .filter(|account| account.is_online(now, window))
            .count()
    }

    /// Returns the number of registered accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns true if no account has been created yet
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taken(names: &[&str]) -> HashSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_account_creation() {
        let account = Account::new("id-1", "alice", 42.0, 1000.0);

        assert_eq!(account.identifier, "id-1");
        assert_eq!(account.display_name, "alice");
        assert_eq!(account.total_elapsed, 0.0);
        assert_eq!(account.last_reported_elapsed, 42.0);
        assert_eq!(account.last_seen_wall_time, 1000.0);
        assert_eq!(account.last_update_wall_time, 1000.0);
    }

    #[test]
    fn test_account_online() {
        let account = Account::new("id-1", "alice", 0.0, 1000.0);

        assert!(account.is_online(1000.0, 120.0));
        assert!(account.is_online(1119.9, 120.0));
        assert!(!account.is_online(1120.0, 120.0));
        assert!(!account.is_online(1500.0, 120.0));
    }

    #[test]
    fn test_unique_name_free() {
        assert_eq!(unique_display_name(&taken(&[]), "alice"), "alice");
        assert_eq!(unique_display_name(&taken(&["bob"]), "alice"), "alice");
    }

    #[test]
    fn test_unique_name_probes_suffixes() {
        assert_eq!(unique_display_name(&taken(&["alice"]), "alice"), "alice_2");
        assert_eq!(
            unique_display_name(&taken(&["alice", "alice_2", "alice_3"]), "alice"),
            "alice_4"
        );
    }

    #[test]
    fn test_unique_name_fills_gap() {
        assert_eq!(
            unique_display_name(&taken(&["alice", "alice_3"]), "alice"),
            "alice_2"
        );
    }

    #[test]
    fn test_gate_admits_up_to_limit() {
        let mut gate = CreationGate::new(2, 1.0);

        assert!(gate.admit(10.0).is_ok());
        assert!(gate.admit(10.1).is_ok());
        assert_eq!(gate.admit(10.2), Err(ReportError::RateLimited));
        assert_eq!(gate.in_window(), 2);
    }

    #[test]
    fn test_gate_evicts_old_entries() {
        let mut gate = CreationGate::new(1, 1.0);

        assert!(gate.admit(10.0).is_ok());
        assert_eq!(gate.admit(10.5), Err(ReportError::RateLimited));
        assert_eq!(gate.admit(11.0), Err(ReportError::RateLimited));
        assert!(gate.admit(11.01).is_ok());
        assert_eq!(gate.in_window(), 1);
    }

    #[test]
    fn test_gate_denial_records_nothing() {
        let mut gate = CreationGate::new(1, 1.0);

        assert!(gate.admit(10.0).is_ok());
        for i in 0..10 {
            assert!(gate.admit(10.0 + i as f64 * 0.05).is_err());
        }
        assert_eq!(gate.in_window(), 1);

        // Only the first admission counts toward the window
        assert!(gate.admit(11.5).is_ok());
    }

    #[test]
    fn test_registry_creation() {
        let registry = Registry::new(1, 1.0);
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_resolve_creates_account() {
        let mut registry = Registry::new(1, 1.0);

        let (account, created) = registry
            .resolve_or_create("id-1", "alice", 30.0, 100.0)
            .unwrap();

        assert!(created);
        assert_eq!(account.display_name, "alice");
        assert_eq!(account.last_reported_elapsed, 30.0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve_existing_ignores_arguments() {
        let mut registry = Registry::new(10, 1.0);
        registry
            .resolve_or_create("id-1", "alice", 30.0, 100.0)
            .unwrap();

        let (account, created) = registry
            .resolve_or_create("id-1", "mallory", 9999.0, 200.0)
            .unwrap();

        assert!(!created);
        assert_eq!(account.display_name, "alice");
        assert_eq!(account.last_reported_elapsed, 30.0);
        assert_eq!(account.last_update_wall_time, 100.0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve_disambiguates_names() {
        let mut registry = Registry::new(10, 1.0);

        let (first, _) = registry
            .resolve_or_create("id-1", "alice", 0.0, 100.0)
            .unwrap();
        assert_eq!(first.display_name, "alice");

        let (second, _) = registry
            .resolve_or_create("id-2", "alice", 0.0, 100.0)
            .unwrap();
        assert_eq!(second.display_name, "alice_2");

        let (third, _) = registry
            .resolve_or_create("id-3", "alice_2", 0.0, 100.0)
            .unwrap();
        assert_eq!(third.display_name, "alice_2_2");
    }

    #[test]
    fn test_resolve_rate_limited_has_no_side_effect() {
        let mut registry = Registry::new(1, 1.0);
        registry
            .resolve_or_create("id-1", "alice", 0.0, 100.0)
            .unwrap();

        let result = registry.resolve_or_create("id-2", "bob", 0.0, 100.5);
        assert_eq!(result.unwrap_err(), ReportError::RateLimited);
        assert_eq!(registry.len(), 1);
        assert!(registry.get("id-2").is_none());

        // The refused name is still free once the window has passed
        let (account, created) = registry
            .resolve_or_create("id-2", "bob", 0.0, 101.5)
            .unwrap();
        assert!(created);
        assert_eq!(account.display_name, "bob");
    }

    #[test]
    fn test_existing_accounts_bypass_gate() {
        let mut registry = Registry::new(1, 1.0);
        registry
            .resolve_or_create("id-1", "alice", 0.0, 100.0)
            .unwrap();

        for _ in 0..5 {
            let (_, created) = registry
                .resolve_or_create("id-1", "alice", 0.0, 100.1)
                .unwrap();
            assert!(!created);
        }
    }

    #[test]
    fn test_online_count() {
        let mut registry = Registry::new(10, 1.0);
        registry.resolve_or_create("id-1", "a", 0.0, 0.0).unwrap();
        registry.resolve_or_create("id-2", "b", 0.0, 100.0).unwrap();

        assert_eq!(registry.online_count(110.0, 120.0), 2);
        assert_eq!(registry.online_count(150.0, 120.0), 1);
        assert_eq!(registry.online_count(500.0, 120.0), 0);
    }
}

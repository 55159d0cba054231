//! Shared, lock-guarded tracking state
//!
//! The `Tracker` owns the single registry behind one `RwLock`. A report
//! holds the write lock across resolve-or-create and validation, so two
//! concurrent first reports for the same identifier produce exactly one
//! account. The leaderboard only needs the read lock.
//!
//! Time comes from the injected `Clock`, which never runs backwards, and is
//! read while the lock is held. Together these keep creation timestamps in
//! arrival order.

use crate::clock::Clock;
use crate::config::TrackerConfig;
use crate::error::ReportError;
use crate::leaderboard;
use crate::reconciler::{apply_report, check_elapsed};
use crate::registry::Registry;
use log::warn;
use shared::{LeaderboardEntry, ReportRequest};
use std::sync::{Arc, PoisonError, RwLock};

/// Result of an accepted report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportReceipt {
    /// Resolved display name, which may differ from the requested one
    pub username: String,
    pub total: f64,
    pub delta: f64,
    pub created: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerStats {
    pub accounts: usize,
    pub online: usize,
}

pub struct Tracker {
    config: TrackerConfig,
    clock: Arc<dyn Clock>,
    registry: RwLock<Registry>,
}

impl Tracker {
    pub fn new(config: TrackerConfig, clock: Arc<dyn Clock>) -> Self {
        let registry = Registry::new(config.max_new_accounts, config.creation_window);
        Self {
            config,
            clock,
            registry: RwLock::new(registry),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Resolves the reporting account and applies its elapsed time
    ///
    /// Any error leaves the registry unchanged.
    pub fn report(&self, request: &ReportRequest) -> Result<ReportReceipt, ReportError> {
        let identifier = match request.identifier() {
            Some(identifier) => identifier,
            None => {
                warn!("Report rejected: {}", ReportError::MissingIdentifier);
                return Err(ReportError::MissingIdentifier);
            }
        };

        if let Err(e) = check_elapsed(request.elapsed) {
            warn!("{} rejected: {} {}", identifier, e, request.elapsed);
            return Err(e);
        }

        let mut registry = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();

        let (account, created) = registry.resolve_or_create(
            identifier,
            request.requested_name(),
            request.elapsed,
            now,
        )?;

        let accepted = apply_report(account, request.elapsed, now, request.closing, &self.config)?;

        Ok(ReportReceipt {
            username: account.display_name.clone(),
            total: accepted.new_total,
            delta: accepted.delta,
            created,
        })
    }

    /// Current leaderboard, highest total first
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();
        leaderboard::project(registry.accounts(), now, self.config.online_window)
    }

    pub fn stats(&self) -> TrackerStats {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();
        TrackerStats {
            accounts: registry.len(),
            online: registry.online_count(now, self.config.online_window),
        }
    }
}

//! Validation and application of elapsed-time reports
//!
//! Reporters own their clocks and may be buggy or hostile. A report is only
//! applied if the increase it claims is non-negative, no larger than one
//! ping interval, and close to the wall-clock time the server itself saw
//! pass since the account's last accepted report. A rejected report leaves
//! the account exactly as it was.

use crate::config::TrackerConfig;
use crate::error::ReportError;
use crate::registry::Account;
use log::{info, warn};

/// Outcome of an accepted report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accepted {
    pub delta: f64,
    pub new_total: f64,
}

/// Rejects elapsed values no reporter clock can produce
pub fn check_elapsed(asserted_elapsed: f64) -> Result<(), ReportError> {
    if !asserted_elapsed.is_finite() || asserted_elapsed < 0.0 {
        return Err(ReportError::InvalidElapsed);
    }
    Ok(())
}

/// Checks a claimed delta against the limits, without touching any state
pub fn validate_delta(
    delta: f64,
    real_delta: f64,
    config: &TrackerConfig,
) -> Result<(), ReportError> {
    if delta < 0.0 {
        return Err(ReportError::NegativeDelta { delta });
    }

    if delta > config.max_increment {
        return Err(ReportError::DeltaTooLarge { delta });
    }

    if (delta - real_delta).abs() > config.drift_tolerance {
        return Err(ReportError::DeltaTimeMismatch { delta, real_delta });
    }

    Ok(())
}

/// Applies `asserted_elapsed` to `account` if it passes validation
///
/// `closing` only changes the log line: the reporter is ending its session
/// and won't send again until it restarts.
pub fn apply_report(
    account: &mut Account,
    asserted_elapsed: f64,
    now: f64,
    closing: bool,
    config: &TrackerConfig,
) -> Result<Accepted, ReportError> {
    if let Err(e) = check_elapsed(asserted_elapsed) {
        warn!(
            "{} ({}) rejected: {} {} (total {:.1}s)",
            account.identifier, account.display_name, e, asserted_elapsed, account.total_elapsed
        );
        return Err(e);
    }

    let delta = asserted_elapsed - account.last_reported_elapsed;
    let real_delta = now - account.last_update_wall_time;

    if let Err(e) = validate_delta(delta, real_delta, config) {
        warn!(
            "{} ({}) rejected: {} (delta {:.1}s, real {:.1}s, total {:.1}s)",
            account.identifier,
            account.display_name,
            e,
            delta,
            real_delta,
            account.total_elapsed
        );
        return Err(e);
    }

    account.total_elapsed += delta;
    account.last_reported_elapsed = asserted_elapsed;
    account.last_seen_wall_time = now;
    account.last_update_wall_time = now;

    if closing {
        info!(
            "{} ({}) closed. Total time: {:.1}s",
            account.identifier, account.display_name, account.total_elapsed
        );
    } else {
        info!(
            "{} ({}) updated: +{:.1}s (total {:.1}s)",
            account.identifier, account.display_name, delta, account.total_elapsed
        );
    }

    Ok(Accepted {
        delta,
        new_total: account.total_elapsed,
    })
}

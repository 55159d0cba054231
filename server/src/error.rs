//! Rejection reasons for incoming reports.
//!
//! Every variant is a client-input error. The `Display` text is the reason
//! string sent back to the reporter, so it must stay stable.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportError {
    #[error("missing user_id")]
    MissingIdentifier,

    #[error("too many new users, try again later")]
    RateLimited,

    #[error("elapsed cannot decrease")]
    NegativeDelta { delta: f64 },

    #[error("increment too large")]
    DeltaTooLarge { delta: f64 },

    #[error("mismatch with real time")]
    DeltaTimeMismatch { delta: f64, real_delta: f64 },

    /// Non-finite or negative elapsed value.
    #[error("invalid elapsed")]
    InvalidElapsed,
}

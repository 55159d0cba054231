//! # Touchgrass Tracking Server Library
//!
//! This library provides the server side of the touchgrass time tracker. Many
//! independent reporters periodically send how long their session has been
//! running; the server turns those claims into per-account totals and serves
//! a leaderboard ranked by total time.
//!
//! ## Core Responsibilities
//!
//! ### Account Registry
//! Reporters identify themselves with an opaque, self-asserted identifier.
//! The registry maps each identifier to exactly one account, gives every
//! account a unique display name, and caps how many new accounts can be
//! created per second so spoofed identifiers cannot flood the table.
//!
//! ### Report Reconciliation
//! Reporter clocks are not trusted. Each report's claimed increase is checked
//! against the previous accepted report and against the wall-clock time the
//! server itself observed in between. Reports that go backwards, jump too
//! far, or drift from real time are rejected without touching any state.
//!
//! ### Leaderboard
//! A read-only projection over the registry: display name, total rounded to
//! a tenth of a second, and whether the account reported recently.
//!
//! ## Module Organization
//!
//! - `registry`: accounts, name disambiguation, creation-rate gate
//! - `reconciler`: report validation and application
//! - `leaderboard`: sorted read-side view
//! - `tracker`: the lock-guarded store combining the three
//! - `network`: UDP transport speaking the `shared::Packet` protocol
//! - `clock`, `config`, `error`: time sources, tunables, rejection reasons
//!
//! ## State
//!
//! Everything lives in process memory. Accounts are never evicted and a
//! restart loses all totals.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::clock::SystemClock;
//! use server::config::TrackerConfig;
//! use server::network::Server;
//! use server::tracker::Tracker;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tracker = Arc::new(Tracker::new(TrackerConfig::default(), Arc::new(SystemClock::new())));
//!
//!     let mut server = Server::new("127.0.0.1:1337", tracker, Duration::from_secs(60)).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod leaderboard;
pub mod network;
pub mod reconciler;
pub mod registry;
pub mod tracker;

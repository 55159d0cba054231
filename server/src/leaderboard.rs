//! Read-side leaderboard projection over the registry's accounts

use crate::registry::Account;
use shared::{round_tenths, LeaderboardEntry};
use std::cmp::Ordering;

/// Builds the leaderboard as of `now`, highest total first.
///
/// Sorting uses the unrounded totals; equal totals keep iteration order.
pub fn project<'a, I>(accounts: I, now: f64, online_window: f64) -> Vec<LeaderboardEntry>
where
    I: IntoIterator<Item = &'a Account>,
{
    let mut ranked: Vec<&Account> = accounts.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.total_elapsed
            .partial_cmp(&a.total_elapsed)
            .unwrap_or(Ordering::Equal)
    });

    ranked
        .into_iter()
        .map(|account| LeaderboardEntry {
            username: account.display_name.clone(),
            elapsed: round_tenths(account.total_elapsed),
            online: account.is_online(now, online_window),
        })
        .collect()
}

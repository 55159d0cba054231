use serde::{Deserialize, Serialize};

/// How often a well-behaved reporter sends its elapsed time, in seconds.
pub const PING_INTERVAL_SECS: f64 = 120.0;
pub const DEFAULT_USERNAME: &str = "Anonymous";
pub const MAX_PACKET_SIZE: usize = 2048;
/// Requested names are cut to this many characters
pub const MAX_USERNAME_CHARS: usize = 32;
/// Entries per leaderboard page unless the request asks for fewer
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Report(ReportRequest),
    /// Asks for up to `limit` entries starting at rank `offset` (0-based)
    LeaderboardRequest {
        offset: u32,
        limit: u32,
    },

    ReportAccepted {
        username: String,
        total: f64,
    },
    Rejected {
        reason: String,
    },
    /// One page of the leaderboard; `total` is the full board length
    Leaderboard {
        offset: u32,
        total: u32,
        entries: Vec<LeaderboardEntry>,
    },
}

/// A single elapsed-time report as sent by a reporter.
///
/// `user_id` is optional on the wire so the server can answer a missing
/// identifier with a reason instead of dropping the datagram.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReportRequest {
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub elapsed: f64,
    pub closing: bool,
}

impl ReportRequest {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, elapsed: f64) -> Self {
        Self {
            user_id: Some(user_id.into()),
            username: Some(username.into()),
            elapsed,
            closing: false,
        }
    }

    pub fn closing(mut self, closing: bool) -> Self {
        self.closing = closing;
        self
    }

    /// Returns the identifier, treating an empty string as absent.
    pub fn identifier(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Returns the requested display name, falling back to `DEFAULT_USERNAME`.
    ///
    /// Names longer than `MAX_USERNAME_CHARS` are truncated.
    pub fn requested_name(&self) -> &str {
        let name = self
            .username
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_USERNAME);

        match name.char_indices().nth(MAX_USERNAME_CHARS) {
            Some((end, _)) => &name[..end],
            None => name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub username: String,
    pub elapsed: f64,
    pub online: bool,
}

/// Rounds a number of seconds to one decimal place for display.
pub fn round_tenths(seconds: f64) -> f64 {
    (seconds * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_report_request_new() {
        let request = ReportRequest::new("abc", "alice", 12.5);

        assert_eq!(request.identifier(), Some("abc"));
        assert_eq!(request.requested_name(), "alice");
        assert_eq!(request.elapsed, 12.5);
        assert!(!request.closing);
    }

    #[test]
    fn test_report_request_closing() {
        let request = ReportRequest::new("abc", "alice", 1.0).closing(true);
        assert!(request.closing);
    }

    #[test]
    fn test_empty_identifier_is_missing() {
        let request = ReportRequest::new("", "alice", 1.0);
        assert_eq!(request.identifier(), None);

        let request = ReportRequest {
            user_id: None,
            username: None,
            elapsed: 0.0,
            closing: false,
        };
        assert_eq!(request.identifier(), None);
    }

    #[test]
    fn test_requested_name_defaults_to_anonymous() {
        let mut request = ReportRequest::new("abc", "", 1.0);
        assert_eq!(request.requested_name(), DEFAULT_USERNAME);

        request.username = None;
        assert_eq!(request.requested_name(), "Anonymous");
    }

    #[test]
    fn test_requested_name_truncated() {
        let long = "x".repeat(100);
        let request = ReportRequest::new("abc", long, 1.0);
        assert_eq!(request.requested_name().chars().count(), MAX_USERNAME_CHARS);

        // Multi-byte characters are cut on a char boundary
        let wide = "é".repeat(40);
        let request = ReportRequest::new("abc", wide, 1.0);
        assert_eq!(request.requested_name(), "é".repeat(MAX_USERNAME_CHARS));

        let exact = "y".repeat(MAX_USERNAME_CHARS);
        let request = ReportRequest::new("abc", exact.clone(), 1.0);
        assert_eq!(request.requested_name(), exact);
    }

    #[test]
    fn test_round_tenths() {
        assert_approx_eq!(round_tenths(12.34), 12.3, 1e-9);
        assert_approx_eq!(round_tenths(12.36), 12.4, 1e-9);
        assert_approx_eq!(round_tenths(0.0), 0.0, 1e-9);
        assert_approx_eq!(round_tenths(119.99), 120.0, 1e-9);
    }

    #[test]
    fn test_packet_bincode_report() {
        let packet = Packet::Report(ReportRequest::new("id-1", "bob", 240.0).closing(true));

        let bytes = bincode::serialize(&packet).unwrap();
        assert!(bytes.len() < MAX_PACKET_SIZE);

        match bincode::deserialize::<Packet>(&bytes).unwrap() {
            Packet::Report(request) => {
                assert_eq!(request.identifier(), Some("id-1"));
                assert_eq!(request.requested_name(), "bob");
                assert!(request.closing);
            }
            other => panic!("Unexpected packet {:?}", other),
        }
    }
}

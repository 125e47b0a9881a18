//! Prefixed record identifiers.
//!
//! Identifiers are a short table prefix plus a random 128-bit suffix, e.g.
//! `usr_03f9c2…`. Randomness makes generation collision-free without a
//! read-then-insert round-trip, so concurrent registrations never race on
//! an ID counter.

use uuid::Uuid;

/// Prefix for user profile IDs.
pub const USER_PREFIX: &str = "usr";
/// Prefix for credential account IDs.
pub const ACCOUNT_PREFIX: &str = "acc";
/// Prefix for session IDs.
pub const SESSION_PREFIX: &str = "ses";

/// Generates a new prefixed identifier.
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// Generates a per-request correlation ID for error envelopes and logs.
pub fn new_request_id() -> String {
    format!("req_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_carry_their_prefix() {
        let id = new_id(USER_PREFIX);
        assert!(id.starts_with("usr_"));
        // 3-char prefix + underscore + 32 hex chars
        assert_eq!(id.len(), 36);
    }

    #[test]
    fn ids_do_not_collide() {
        let ids: HashSet<_> = (0..10_000).map(|_| new_id(SESSION_PREFIX)).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn request_ids_are_prefixed() {
        assert!(new_request_id().starts_with("req_"));
    }
}

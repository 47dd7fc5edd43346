//! Staged-rollout partitions
//!
//! Every identity maps to a stable bucket in 0-255. A release advertises an
//! inclusive bucket range; only identities inside the range are offered the
//! update, which lets rollouts widen gradually across the install base.

use sha2::{Digest, Sha256};
use std::env;

/// Answers whether the current identity falls inside a rollout range.
pub trait PartitionOracle: Send + Sync {
    /// Inclusive membership test over `[start, end]`. A range with
    /// `start > end` matches nothing, which is how a rollout is paused.
    fn in_partition(&self, start: u8, end: u8) -> bool;
}

/// The local user identity.
#[derive(Debug, Clone)]
pub struct User {
    id: String,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Identity from the OS username.
    pub fn from_env() -> Self {
        let id = env::var("USER")
            .or_else(|_| env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        Self { id }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Stable bucket assignment: first byte of the SHA-256 digest of the
    /// identity string.
    pub fn partition(&self) -> u8 {
        let digest = Sha256::digest(self.id.as_bytes());
        digest[0]
    }
}

impl PartitionOracle for User {
    fn in_partition(&self, start: u8, end: u8) -> bool {
        let bucket = self.partition();
        start <= bucket && bucket <= end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_is_deterministic() {
        let a = User::new("alice");
        let b = User::new("alice");
        assert_eq!(a.partition(), b.partition());
    }

    #[test]
    fn test_full_range_always_matches() {
        assert!(User::new("alice").in_partition(0, 255));
        assert!(User::new("bob").in_partition(0, 255));
    }

    #[test]
    fn test_inverted_range_never_matches() {
        let user = User::new("alice");
        assert!(!user.in_partition(200, 100));
        // Even the user's own bucket cannot satisfy an inverted range.
        let bucket = user.partition();
        if bucket > 0 {
            assert!(!user.in_partition(bucket, bucket - 1));
        }
    }

    #[test]
    fn test_single_bucket_range() {
        let user = User::new("alice");
        let bucket = user.partition();
        assert!(user.in_partition(bucket, bucket));
    }
}

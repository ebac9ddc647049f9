//! Payload fingerprint used for dirty-checking
//!
//! A write only includes the `data` field in its update when the payload's
//! fingerprint differs from the one cached at the last read/write, so
//! unchanged session content is never rewritten. This is a dirty-check, not
//! a security boundary; the digest never leaves the process.

use sha2::{Digest, Sha256};

/// SHA-256 digest of a session payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint of the given payload bytes
    pub fn of(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        Self(digest.into())
    }

    /// Fingerprint of the empty payload, the canonical "new session" state
    pub fn empty() -> Self {
        Self::of(b"")
    }
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fingerprint_is_stable() {
        assert_eq!(Fingerprint::empty(), Fingerprint::of(b""));
        assert_eq!(Fingerprint::default(), Fingerprint::empty());
    }

    #[test]
    fn test_differing_payloads_differ() {
        let a = Fingerprint::of(b"user_id|i:42;");
        let b = Fingerprint::of(b"user_id|i:43;");
        assert_ne!(a, b);
        assert_ne!(a, Fingerprint::empty());
    }

    #[test]
    fn test_same_payload_matches() {
        assert_eq!(Fingerprint::of(b"x=1"), Fingerprint::of(b"x=1"));
    }
}

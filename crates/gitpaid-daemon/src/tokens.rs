//! Short-lived, single-use signing tokens for certificate issuance.
//!
//! A token correlates an authenticated GitHub session with the later
//! certificate signing request. Tokens expire after the configured TTL and
//! are consumed by the first redeem attempt, expired or not.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Identity attested by an issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubProfile {
    pub github_username: String,
    #[serde(default)]
    pub github_email: Option<String>,
}

#[derive(Debug)]
struct Entry {
    profile: GitHubProfile,
    expires_at: Instant,
}

/// Bounded TTL store of outstanding tokens.
///
/// Entries are never promoted, so the least recently used end of the cache
/// is also the oldest issue and the first to expire.
#[derive(Debug)]
pub struct SigningTokenStore {
    ttl: Duration,
    entries: LruCache<String, Entry>,
}

impl SigningTokenStore {
    pub fn new(ttl: Duration, max_tokens: usize) -> Self {
        let capacity = NonZeroUsize::new(max_tokens).unwrap_or(NonZeroUsize::MIN);
        Self {
            ttl,
            entries: LruCache::new(capacity),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Issue a fresh token for `profile`.
    pub fn issue(&mut self, profile: GitHubProfile) -> String {
        self.issue_at(profile, Instant::now())
    }

    /// Consume `token`. Returns the profile if it had not expired.
    pub fn redeem(&mut self, token: &str) -> Option<GitHubProfile> {
        self.redeem_at(token, Instant::now())
    }

    fn issue_at(&mut self, profile: GitHubProfile, now: Instant) -> String {
        self.purge_expired(now);

        let token = random_token();
        let entry = Entry {
            profile,
            expires_at: now + self.ttl,
        };
        // At capacity the oldest outstanding token is evicted.
        self.entries.push(token.clone(), entry);
        token
    }

    fn redeem_at(&mut self, token: &str, now: Instant) -> Option<GitHubProfile> {
        let entry = self.entries.pop(token)?;
        (now < entry.expires_at).then_some(entry.profile)
    }

    fn purge_expired(&mut self, now: Instant) {
        while self
            .entries
            .peek_lru()
            .is_some_and(|(_, entry)| now >= entry.expires_at)
        {
            self.entries.pop_lru();
        }
    }
}

/// 32 random bytes, hex encoded.
fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

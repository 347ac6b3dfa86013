//! Short-lived login tokens.
//!
//! A token proves that someone was allowed to start a login for a given
//! username. It's handed out by [`TokenManager::create_token`], exchanged
//! for a session by the registrar, and dies after its TTL.
//!
//! ```text
//!   create_token(user) ──→ [live] ──(now >= expires_at)──→ [expired]
//!          │                  │                                │
//!          │                  └──(create_token(user) again)────┤
//!          │                                                   ▼
//!          └── deletes previous token for user        removed on next get_token()
//! ```
//!
//! # Lazy expiry
//!
//! There is no background sweeper. An expired token is removed the next
//! time someone looks it up, so [`TokenManager::get_token`] can write to
//! the store even though it reads like a getter.
//! [`TokenManager::purge_expired`] exists for callers that want an
//! explicit sweep.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use arkgate_store::SharedStore;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{SessionError, require_non_empty};

/// Configuration for token lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// How long (in seconds) a token stays valid after creation.
    ///
    /// Default: 180 (3 minutes). 0 makes tokens expire immediately, which
    /// is only useful in tests.
    pub ttl_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self { ttl_secs: 180 }
    }
}

/// A login token bound to one username.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Opaque identifier (32 hex characters).
    pub id: String,
    pub username: String,
    /// Caller-supplied payload, stored as-is.
    #[serde(default)]
    pub data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    /// A token is usable up to, but not including, `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Issues, looks up, and revokes login tokens.
///
/// Enforces the key invariant: at most one live token per username.
/// Creating a token for a username removes whatever token it had before.
pub struct TokenManager {
    store: SharedStore<Token>,
    config: TokenConfig,
    /// Held across revoke-then-insert in [`create_token`](Self::create_token)
    /// so concurrent calls for one username can't both insert.
    issue_gate: Mutex<()>,
}

impl TokenManager {
    /// Creates a manager over the given token store.
    pub fn new(store: SharedStore<Token>, config: TokenConfig) -> Self {
        Self {
            store,
            config,
            issue_gate: Mutex::new(()),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Issues a new token for `username` and returns its identifier.
    ///
    /// Any token previously issued to the same username is deleted first,
    /// whether or not it had expired.
    ///
    /// # Errors
    /// - [`SessionError::InvalidArgument`] if `username` is empty.
    /// - [`SessionError::Persistence`] if the store can't be written.
    pub fn create_token(
        &self,
        username: &str,
        data: Map<String, Value>,
    ) -> Result<String, SessionError> {
        require_non_empty("username", username)?;

        // Guards no data of its own, so a poisoned gate is still usable.
        let _exclusive = self.issue_gate.lock().unwrap_or_else(PoisonError::into_inner);

        let previous = self.store.scan(&|_, t| t.username == username)?;
        for (id, _) in &previous {
            self.store.delete(id)?;
        }
        if !previous.is_empty() {
            tracing::debug!(%username, replaced = previous.len(), "previous token revoked");
        }

        let ttl = chrono::Duration::from_std(Duration::from_secs(self.config.ttl_secs))
            .map_err(|_| SessionError::InvalidArgument("token ttl is out of range".into()))?;
        let now = Utc::now();
        let token = Token {
            id: generate_token_id(),
            username: username.to_string(),
            data,
            created_at: now,
            expires_at: now + ttl,
        };
        let id = token.id.clone();
        self.store.put(&id, token)?;

        tracing::info!(%username, ttl_secs = self.config.ttl_secs, "token created");
        Ok(id)
    }

    /// Looks up a live token.
    ///
    /// Returns `Ok(None)` for an empty id, an unknown id, or an expired
    /// token. **Side effect:** an expired token is deleted from the store
    /// before `None` is returned.
    pub fn get_token(&self, id: &str) -> Result<Option<Token>, SessionError> {
        if id.trim().is_empty() {
            return Ok(None);
        }
        let Some(token) = self.store.get(id)? else {
            return Ok(None);
        };
        if token.is_expired_at(Utc::now()) {
            self.store.delete(id)?;
            tracing::debug!(username = %token.username, "expired token evicted on lookup");
            return Ok(None);
        }
        Ok(Some(token))
    }

    /// Deletes a token. Returns whether it existed.
    pub fn delete_token(&self, id: &str) -> Result<bool, SessionError> {
        Ok(self.store.delete(id)?)
    }

    /// Removes every expired token and returns the removed ids.
    pub fn purge_expired(&self) -> Result<Vec<String>, SessionError> {
        let now = Utc::now();
        let expired = self.store.scan(&|_, t| t.is_expired_at(now))?;
        let mut removed = Vec::with_capacity(expired.len());
        for (id, _) in expired {
            if self.store.delete(&id)? {
                removed.push(id);
            }
        }
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "expired tokens purged");
        }
        Ok(removed)
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
fn generate_token_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Time-dependent behavior is tested the same way throughout: a TTL of
    //! 0 makes every token expire at creation, a TTL of an hour makes them
    //! outlive the test. Boundary checks use `is_expired_at` with explicit
    //! instants.

    use std::sync::Arc;

    use arkgate_store::{KvStore, MemoryStore};

    use super::*;

    fn manager_with_ttl(ttl_secs: u64) -> TokenManager {
        TokenManager::new(Arc::new(MemoryStore::<Token>::new()), TokenConfig { ttl_secs })
    }

    fn long_lived() -> TokenManager {
        manager_with_ttl(3600)
    }

    fn instantly_expiring() -> TokenManager {
        manager_with_ttl(0)
    }

    // =====================================================================
    // create_token()
    // =====================================================================

    #[test]
    fn test_create_token_returns_retrievable_id() {
        let mgr = long_lived();

        let id = mgr.create_token("alice", Map::new()).unwrap();
        let token = mgr.get_token(&id).unwrap().expect("token should be live");

        assert_eq!(id.len(), 32);
        assert_eq!(token.username, "alice");
        assert_eq!(token.expires_at - token.created_at, chrono::Duration::seconds(3600));
    }

    #[test]
    fn test_create_token_empty_username_is_invalid_argument() {
        let mgr = long_lived();

        assert!(matches!(
            mgr.create_token("", Map::new()),
            Err(SessionError::InvalidArgument(_))
        ));
        assert!(matches!(
            mgr.create_token("   ", Map::new()),
            Err(SessionError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_create_token_second_call_invalidates_first() {
        let mgr = long_lived();
        let old = mgr.create_token("alice", Map::new()).unwrap();

        let new = mgr.create_token("alice", Map::new()).unwrap();

        assert_ne!(old, new);
        assert!(mgr.get_token(&old).unwrap().is_none(), "old token must be gone");
        assert!(mgr.get_token(&new).unwrap().is_some());
    }

    #[test]
    fn test_create_token_other_users_unaffected() {
        let mgr = long_lived();
        let bob = mgr.create_token("bob", Map::new()).unwrap();

        mgr.create_token("alice", Map::new()).unwrap();
        mgr.create_token("alice", Map::new()).unwrap();

        assert!(mgr.get_token(&bob).unwrap().is_some());
    }

    #[test]
    fn test_create_token_keeps_payload() {
        let mgr = long_lived();
        let mut data = Map::new();
        data.insert("wallet".into(), Value::String("0xabc".into()));

        let id = mgr.create_token("alice", data.clone()).unwrap();

        assert_eq!(mgr.get_token(&id).unwrap().unwrap().data, data);
    }

    // =====================================================================
    // get_token()
    // =====================================================================

    #[test]
    fn test_get_token_unknown_or_empty_returns_none() {
        let mgr = long_lived();

        assert!(mgr.get_token("nope").unwrap().is_none());
        assert!(mgr.get_token("").unwrap().is_none());
    }

    #[test]
    fn test_get_token_expired_returns_none_and_deletes() {
        let store: Arc<MemoryStore<Token>> = Arc::new(MemoryStore::new());
        let mgr = TokenManager::new(store.clone(), TokenConfig { ttl_secs: 0 });
        let id = mgr.create_token("alice", Map::new()).unwrap();
        assert_eq!(store.len().unwrap(), 1);

        let result = mgr.get_token(&id).unwrap();

        assert!(result.is_none());
        assert_eq!(
            store.len().unwrap(),
            0,
            "lookup of an expired token must evict it"
        );
    }

    #[test]
    fn test_is_expired_at_boundary() {
        let now = Utc::now();
        let token = Token {
            id: "t".into(),
            username: "alice".into(),
            data: Map::new(),
            created_at: now,
            expires_at: now + chrono::Duration::minutes(3),
        };

        assert!(!token.is_expired_at(now));
        assert!(!token.is_expired_at(token.expires_at - chrono::Duration::milliseconds(1)));
        assert!(token.is_expired_at(token.expires_at), "expiry instant itself is expired");
        assert!(token.is_expired_at(token.expires_at + chrono::Duration::seconds(1)));
        assert_eq!(token.remaining_at(token.expires_at), Duration::ZERO);
    }

    // =====================================================================
    // delete_token() / purge_expired()
    // =====================================================================

    #[test]
    fn test_delete_token_reports_existence() {
        let mgr = long_lived();
        let id = mgr.create_token("alice", Map::new()).unwrap();

        assert!(mgr.delete_token(&id).unwrap());
        assert!(!mgr.delete_token(&id).unwrap());
        assert!(mgr.get_token(&id).unwrap().is_none());
    }

    #[test]
    fn test_purge_expired_removes_all_expired() {
        let mgr = instantly_expiring();
        let a = mgr.create_token("alice", Map::new()).unwrap();
        let b = mgr.create_token("bob", Map::new()).unwrap();

        let mut removed = mgr.purge_expired().unwrap();
        removed.sort();

        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(removed, expected);
    }

    #[test]
    fn test_purge_expired_keeps_live_tokens() {
        let mgr = long_lived();
        let id = mgr.create_token("alice", Map::new()).unwrap();

        assert!(mgr.purge_expired().unwrap().is_empty());
        assert!(mgr.get_token(&id).unwrap().is_some());
    }

    #[test]
    fn test_create_token_concurrent_calls_leave_one_live_token() {
        use std::sync::Barrier;
        use std::thread;

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            arkgate_store::JsonFileStore::<Token>::open(dir.path().join("tokens.json")).unwrap(),
        );
        let mgr = Arc::new(TokenManager::new(store.clone(), TokenConfig { ttl_secs: 3600 }));
        const THREADS: usize = 8;

        for round in 0..20 {
            let barrier = Arc::new(Barrier::new(THREADS));
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let mgr = mgr.clone();
                    let barrier = barrier.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        mgr.create_token("alice", Map::new()).unwrap()
                    })
                })
                .collect();
            let ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

            let live = ids
                .iter()
                .filter(|id| mgr.get_token(id).unwrap().is_some())
                .count();
            assert_eq!(live, 1, "round {round}: alice must have exactly one live token");
            assert_eq!(store.len().unwrap(), 1, "round {round}: store must hold one token");
        }
    }

    #[test]
    fn test_token_serializes_camel_case() {
        let mgr = long_lived();
        let id = mgr.create_token("alice", Map::new()).unwrap();
        let token = mgr.get_token(&id).unwrap().unwrap();

        let json = serde_json::to_value(&token).unwrap();

        assert!(json.get("createdAt").is_some());
        assert!(json.get("expiresAt").is_some());
    }
}

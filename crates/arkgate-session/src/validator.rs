//! Checking a username's session against the caller's IP.

use std::sync::Arc;

use arkgate_remote::{AuthRefresher, RemoteStore};
use arkgate_store::SharedStore;

use crate::{DenyReason, RemoteEntry, SessionError, SessionRecord, SessionStatus, require_non_empty};

/// Answers "is this user logged in from this IP?" from the remote store.
///
/// The local remote map only says which blobs belong to whom; the blob
/// itself is always re-read, so a record that expired remotely stops
/// granting access immediately. Stale map entries found this way are
/// removed.
pub struct SessionValidator<R: RemoteStore> {
    remote: Arc<R>,
    refresher: Arc<AuthRefresher<R>>,
    entries: SharedStore<RemoteEntry>,
}

impl<R: RemoteStore> SessionValidator<R> {
    pub fn new(
        remote: Arc<R>,
        refresher: Arc<AuthRefresher<R>>,
        entries: SharedStore<RemoteEntry>,
    ) -> Self {
        Self {
            remote,
            refresher,
            entries,
        }
    }

    /// Validates the session registered for `username` against `ip`.
    ///
    /// Only the first map entry for the user (insertion order) is looked
    /// at. If its blob is gone (404) the entry is deleted and the answer is
    /// [`DenyReason::NoSession`]; later entries are not tried.
    ///
    /// # Errors
    /// - [`SessionError::RemoteAuthFailure`] if the credential refresh that
    ///   precedes every check fails, including when no refresh credential
    ///   is configured.
    /// - [`SessionError::InvalidArgument`] if `username` or `ip` is empty.
    /// - [`SessionError::RemoteRecordNotReady`] if the store answers 400.
    /// - [`SessionError::RemoteFetchFailure`] for any other non-2xx answer.
    /// - [`SessionError::RemoteResponseMalformed`] if the blob doesn't hold
    ///   a session record.
    pub async fn session_for_username(
        &self,
        username: &str,
        ip: &str,
    ) -> Result<SessionStatus, SessionError> {
        if !self.refresher.attempt_refresh().await {
            return Err(SessionError::RemoteAuthFailure);
        }
        require_non_empty("username", username)?;
        require_non_empty("ip", ip)?;

        let owned = self.entries.scan(&|_, e| e.username == username)?;
        let Some((file_id, _)) = owned.into_iter().next() else {
            tracing::debug!(%username, "no registered session");
            return Ok(SessionStatus::Denied(DenyReason::NoSession));
        };

        let credential = self.refresher.credential().current();
        let response = self
            .remote
            .fetch_content(credential.as_deref(), &file_id)
            .await?;

        if response.is_not_found() {
            self.entries.delete(&file_id)?;
            tracing::info!(%username, %file_id, "stale session pointer collected");
            return Ok(SessionStatus::Denied(DenyReason::NoSession));
        }
        if response.is_not_ready() {
            return Err(SessionError::RemoteRecordNotReady(file_id));
        }
        if !response.is_success() {
            return Err(SessionError::RemoteFetchFailure {
                status: response.status,
                message: response.error_message(),
            });
        }

        let session = SessionRecord::from_remote(&response.body).ok_or_else(|| {
            SessionError::RemoteResponseMalformed(format!(
                "blob {file_id} holds no session record"
            ))
        })?;

        if session.ip == ip {
            tracing::debug!(%username, %file_id, "session allowed");
            Ok(SessionStatus::Allowed { file_id, session })
        } else {
            tracing::debug!(%username, %file_id, presented = %ip, "session ip mismatch");
            Ok(SessionStatus::Denied(DenyReason::IpMismatch))
        }
    }
}

#[cfg(test)]
mod tests {
    use arkgate_remote::{Credential, MemoryRemote, Upload};
    use arkgate_store::{KvStore, MemoryStore};

    use super::*;

    struct Harness {
        remote: Arc<MemoryRemote>,
        refresher: Arc<AuthRefresher<MemoryRemote>>,
        entries: Arc<MemoryStore<RemoteEntry>>,
        validator: SessionValidator<MemoryRemote>,
    }

    fn harness(refresh_token: Option<&str>) -> Harness {
        let remote = Arc::new(MemoryRemote::new("rt"));
        let refresher = Arc::new(AuthRefresher::new(
            remote.clone(),
            Arc::new(Credential::default()),
            refresh_token.map(str::to_string),
        ));
        let entries = Arc::new(MemoryStore::<RemoteEntry>::new());
        let validator = SessionValidator::new(remote.clone(), refresher.clone(), entries.clone());
        Harness {
            remote,
            refresher,
            entries,
            validator,
        }
    }

    /// Stores a blob directly and points a map entry at it.
    async fn seed(h: &Harness, username: &str, data: &str) -> String {
        assert!(h.refresher.attempt_refresh().await);
        let upload = Upload {
            data: data.to_string(),
            filename: SessionRecord::filename(username),
            description: "seed".into(),
        };
        let response = h
            .remote
            .upload(h.refresher.credential().current().as_deref(), &upload)
            .await
            .unwrap();
        let file_id = response.body["data"]["id"].as_str().unwrap().to_string();
        h.entries
            .put(
                &file_id,
                RemoteEntry {
                    username: username.into(),
                    token_id: "tok".into(),
                },
            )
            .unwrap();
        file_id
    }

    fn record_json(ip: &str, username: &str) -> String {
        serde_json::to_string(&SessionRecord::new(ip, username, "tok")).unwrap()
    }

    #[tokio::test]
    async fn test_session_for_username_matching_ip_is_allowed() {
        let h = harness(Some("rt"));
        let file_id = seed(&h, "alice", &record_json("1.2.3.4", "alice")).await;

        let status = h.validator.session_for_username("alice", "1.2.3.4").await.unwrap();

        match status {
            SessionStatus::Allowed { file_id: got, session } => {
                assert_eq!(got, file_id);
                assert_eq!(session.ip, "1.2.3.4");
            }
            other => panic!("expected allowed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_session_for_username_ip_compare_is_exact() {
        let h = harness(Some("rt"));
        seed(&h, "alice", &record_json("1.2.3.4", "alice")).await;

        let status = h.validator.session_for_username("alice", "1.2.3.4 ").await.unwrap();

        assert_eq!(status, SessionStatus::Denied(DenyReason::IpMismatch));
    }

    #[tokio::test]
    async fn test_session_for_username_unknown_user_is_no_session() {
        let h = harness(Some("rt"));
        seed(&h, "bob", &record_json("1.2.3.4", "bob")).await;
        let fetches_before = h.remote.fetch_calls();

        let status = h.validator.session_for_username("alice", "1.2.3.4").await.unwrap();

        assert_eq!(status, SessionStatus::Denied(DenyReason::NoSession));
        assert_eq!(h.remote.fetch_calls(), fetches_before);
    }

    #[tokio::test]
    async fn test_session_for_username_without_refresh_token_is_auth_failure() {
        let h = harness(None);

        let result = h.validator.session_for_username("alice", "1.2.3.4").await;

        assert!(matches!(result, Err(SessionError::RemoteAuthFailure)));
        assert_eq!(h.remote.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_session_for_username_refresh_precedes_argument_checks() {
        let h = harness(Some("rt"));
        h.remote.set_refresh_failing(true);

        let result = h.validator.session_for_username("", "").await;

        assert!(matches!(result, Err(SessionError::RemoteAuthFailure)));
    }

    #[tokio::test]
    async fn test_session_for_username_empty_username_is_invalid_argument() {
        let h = harness(Some("rt"));

        let result = h.validator.session_for_username("", "1.2.3.4").await;

        assert!(matches!(result, Err(SessionError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_session_for_username_removed_blob_collects_entry() {
        let h = harness(Some("rt"));
        let file_id = seed(&h, "alice", &record_json("1.2.3.4", "alice")).await;
        h.remote.remove(&file_id);

        let status = h.validator.session_for_username("alice", "1.2.3.4").await.unwrap();

        assert_eq!(status, SessionStatus::Denied(DenyReason::NoSession));
        assert!(h.entries.get(&file_id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_for_username_pending_blob_is_not_ready() {
        let h = harness(Some("rt"));
        let file_id = seed(&h, "alice", &record_json("1.2.3.4", "alice")).await;
        h.remote.mark_pending(&file_id, 1);

        let result = h.validator.session_for_username("alice", "1.2.3.4").await;

        match result {
            Err(SessionError::RemoteRecordNotReady(id)) => assert_eq!(id, file_id),
            other => panic!("expected not ready, got {other:?}"),
        }
        assert!(h.entries.get(&file_id).unwrap().is_some(), "entry must survive");
    }

    #[tokio::test]
    async fn test_session_for_username_garbage_blob_is_malformed() {
        let h = harness(Some("rt"));
        seed(&h, "alice", "not a session").await;

        let result = h.validator.session_for_username("alice", "1.2.3.4").await;

        assert!(matches!(result, Err(SessionError::RemoteResponseMalformed(_))));
    }

    #[tokio::test]
    async fn test_session_for_username_first_entry_wins() {
        let h = harness(Some("rt"));
        seed(&h, "alice", &record_json("1.1.1.1", "alice")).await;
        seed(&h, "alice", &record_json("2.2.2.2", "alice")).await;

        let first = h.validator.session_for_username("alice", "1.1.1.1").await.unwrap();
        let second = h.validator.session_for_username("alice", "2.2.2.2").await.unwrap();

        assert!(first.is_allowed());
        assert_eq!(second.reason(), Some(DenyReason::IpMismatch));
    }
}

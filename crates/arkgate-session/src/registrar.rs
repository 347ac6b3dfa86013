//! Trading a login token for a remote session record.
//!
//! ```text
//!   register_session(token, ip)
//!        │
//!        ├─ token lookup ──────────── unknown/expired ──→ InvalidOrExpiredToken (no remote call)
//!        ├─ proactive refresh (best-effort)
//!        ├─ upload ── 401 ── refresh ── failed ─────────→ RemoteAuthFailure
//!        │    │                  └── ok ── upload again (once)
//!        │    └─ non-2xx ────────────────────────────────→ RemoteRegistrationFailure
//!        ├─ file id from response ── missing ────────────→ RemoteResponseMalformed
//!        ├─ remote map: file id → {username, token}
//!        └─ read-back verification (best-effort, sets `verified`)
//! ```

use std::sync::Arc;
use std::time::Duration;

use arkgate_remote::{AuthRefresher, RemoteResponse, RemoteStore, Upload};
use arkgate_store::SharedStore;
use serde::{Deserialize, Serialize};

use crate::record::extract_file_id;
use crate::{
    Registration, RemoteEntry, SessionError, SessionRecord, TokenManager, require_non_empty,
};

/// Read-back polling after an upload.
///
/// The remote store is eventually consistent: a blob can answer 400 for a
/// short while after it was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// How many reads to try. 0 disables verification (every
    /// registration reports `verified = false`).
    pub attempts: u32,
    /// Pause between reads that answered "not ready", in milliseconds.
    pub delay_ms: u64,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 250,
        }
    }
}

impl VerifyConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Registers sessions in the remote store.
pub struct SessionRegistrar<R: RemoteStore> {
    tokens: Arc<TokenManager>,
    remote: Arc<R>,
    refresher: Arc<AuthRefresher<R>>,
    entries: SharedStore<RemoteEntry>,
    verify: VerifyConfig,
}

impl<R: RemoteStore> SessionRegistrar<R> {
    pub fn new(
        tokens: Arc<TokenManager>,
        remote: Arc<R>,
        refresher: Arc<AuthRefresher<R>>,
        entries: SharedStore<RemoteEntry>,
        verify: VerifyConfig,
    ) -> Self {
        Self {
            tokens,
            remote,
            refresher,
            entries,
            verify,
        }
    }

    /// Uploads a session record for the token's user, bound to `ip`.
    ///
    /// On success exactly one remote map entry exists for the returned
    /// `file_id`. Registering again for the same user adds another entry;
    /// older ones are left in place.
    ///
    /// # Errors
    /// - [`SessionError::InvalidArgument`] if `token_id` or `ip` is empty.
    /// - [`SessionError::InvalidOrExpiredToken`] if the token is unknown,
    ///   replaced, or expired. No remote call is made.
    /// - [`SessionError::RemoteAuthFailure`] if the upload was rejected as
    ///   unauthorized and the credential couldn't be refreshed.
    /// - [`SessionError::RemoteRegistrationFailure`] for any other non-2xx
    ///   upload answer, including a second 401 after a successful refresh.
    /// - [`SessionError::RemoteResponseMalformed`] if the store didn't say
    ///   which id it assigned.
    /// - [`SessionError::Persistence`] if the remote map can't be written.
    pub async fn register_session(
        &self,
        token_id: &str,
        ip: &str,
    ) -> Result<Registration, SessionError> {
        require_non_empty("token", token_id)?;
        require_non_empty("ip", ip)?;

        let token = self
            .tokens
            .get_token(token_id)?
            .ok_or(SessionError::InvalidOrExpiredToken)?;
        let session = SessionRecord::new(ip, &token.username, &token.id);

        if !self.refresher.attempt_refresh().await {
            tracing::debug!(username = %session.username, "proactive refresh unavailable, uploading with current credential");
        }

        let upload = Upload {
            data: serde_json::to_string(&session).map_err(|e| {
                SessionError::RemoteResponseMalformed(format!("session record: {e}"))
            })?,
            filename: SessionRecord::filename(&session.username),
            description: format!("session for {}", session.username),
        };

        let response = self.upload_with_retry(&upload).await?;
        if !response.is_success() {
            return Err(SessionError::RemoteRegistrationFailure {
                status: response.status,
                message: response.error_message(),
            });
        }

        let file_id = extract_file_id(&response.body).ok_or_else(|| {
            SessionError::RemoteResponseMalformed(format!(
                "upload response carries no file id: {}",
                response.body
            ))
        })?;

        self.entries.put(
            &file_id,
            RemoteEntry {
                username: session.username.clone(),
                token_id: session.token_id.clone(),
            },
        )?;

        let verified = self.verify(&file_id, ip).await;
        tracing::info!(
            username = %session.username,
            %file_id,
            %ip,
            verified,
            "session registered"
        );

        Ok(Registration {
            file_id,
            session,
            verified,
            remote_meta: response.body,
        })
    }

    /// Uploads, and on 401 refreshes once and uploads exactly once more.
    async fn upload_with_retry(&self, upload: &Upload) -> Result<RemoteResponse, SessionError> {
        let credential = self.refresher.credential();
        let first = self
            .remote
            .upload(credential.current().as_deref(), upload)
            .await?;
        if !first.is_unauthorized() {
            return Ok(first);
        }

        tracing::warn!(filename = %upload.filename, "upload unauthorized, refreshing credential");
        if !self.refresher.attempt_refresh().await {
            return Err(SessionError::RemoteAuthFailure);
        }
        Ok(self
            .remote
            .upload(credential.current().as_deref(), upload)
            .await?)
    }

    /// Reads the record back and checks it carries `ip`. Never fails.
    async fn verify(&self, file_id: &str, ip: &str) -> bool {
        let credential = self.refresher.credential();
        for attempt in 1..=self.verify.attempts {
            let response = match self
                .remote
                .fetch_content(credential.current().as_deref(), file_id)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(%file_id, error = %e, "session read-back failed");
                    return false;
                }
            };

            if response.is_success() {
                return match SessionRecord::from_remote(&response.body) {
                    Some(stored) if stored.ip == ip => true,
                    Some(stored) => {
                        tracing::warn!(%file_id, expected = %ip, stored = %stored.ip, "session read-back ip differs");
                        false
                    }
                    None => {
                        tracing::warn!(%file_id, "session read-back has no usable record");
                        false
                    }
                };
            }

            if response.is_not_ready() && attempt < self.verify.attempts {
                tracing::debug!(%file_id, attempt, "session record not ready yet");
                tokio::time::sleep(self.verify.delay()).await;
                continue;
            }

            tracing::warn!(
                %file_id,
                status = response.status,
                message = %response.error_message(),
                "session read-back rejected"
            );
            return false;
        }
        false
    }
}

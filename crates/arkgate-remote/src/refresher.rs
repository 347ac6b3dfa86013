//! Keeps the remote-store credential fresh.
//!
//! Arkacdn access credentials are short-lived. The gateway holds a
//! long-lived refresh credential (configuration, never changes at runtime)
//! and trades it for a new access credential whenever a call is rejected,
//! or up front before calls that need a fresh one.
//!
//! # Fail-soft contract
//!
//! [`AuthRefresher::attempt_refresh`] never returns an error. A refresh
//! that can't happen (no refresh credential, network down, store says no)
//! is reported as `false` and the process simply stays on whatever
//! credential it had. Callers decide whether `false` is fatal.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::{Credential, RemoteStore};

/// Trades the refresh credential for new access credentials.
pub struct AuthRefresher<R: RemoteStore> {
    remote: Arc<R>,
    credential: Arc<Credential>,
    refresh_token: Option<String>,
    /// Serializes refresh exchanges so concurrent callers don't race to
    /// overwrite each other's fresh credential.
    gate: Mutex<()>,
}

impl<R: RemoteStore> AuthRefresher<R> {
    /// Creates a refresher. An empty `refresh_token` counts as absent.
    pub fn new(
        remote: Arc<R>,
        credential: Arc<Credential>,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            remote,
            credential,
            refresh_token: refresh_token.filter(|t| !t.is_empty()),
            gate: Mutex::new(()),
        }
    }

    /// The credential this refresher maintains.
    pub fn credential(&self) -> &Arc<Credential> {
        &self.credential
    }

    /// Returns `true` if a refresh credential is configured.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Attempts to obtain a new access credential.
    ///
    /// - No refresh credential configured → `false`, no remote call.
    /// - Response carries a new access credential → credential swapped,
    ///   `true`.
    /// - Otherwise → whether the refresh call itself returned 2xx.
    /// - Transport failure → `false`.
    pub async fn attempt_refresh(&self) -> bool {
        let Some(refresh_token) = self.refresh_token.as_deref() else {
            tracing::debug!("no refresh credential configured, skipping refresh");
            return false;
        };

        let _exclusive = self.gate.lock().await;

        let response = match self.remote.refresh(refresh_token).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "credential refresh failed");
                return false;
            }
        };

        match extract_access_token(&response.body) {
            Some(access) if response.is_success() => {
                self.credential.replace(access);
                tracing::debug!("remote credential refreshed");
                true
            }
            _ => {
                if !response.is_success() {
                    tracing::warn!(
                        status = response.status,
                        message = %response.error_message(),
                        "credential refresh rejected"
                    );
                }
                response.is_success()
            }
        }
    }
}

/// Finds the new access credential in a refresh response.
fn extract_access_token(body: &Value) -> Option<String> {
    const POINTERS: [&str; 5] = [
        "/accessToken",
        "/access_token",
        "/data/accessToken",
        "/data/access_token",
        "/token",
    ];
    POINTERS
        .iter()
        .filter_map(|p| body.pointer(p))
        .filter_map(Value::as_str)
        .find(|t| !t.is_empty())
        .map(str::to_string)
}

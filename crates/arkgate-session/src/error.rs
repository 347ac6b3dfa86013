//! Error types for the session layer.

use arkgate_remote::RemoteError;
use arkgate_store::StoreError;

/// Errors that can occur while issuing tokens or registering and
/// validating sessions.
///
/// Everything here surfaces to the caller unchanged. The only automatic
/// retry in the layer is the single refresh-and-retry on an unauthorized
/// upload; best-effort steps (proactive refresh, read-back verification)
/// never produce these errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A required argument was empty or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The token doesn't exist, was replaced by a newer one, or expired.
    #[error("invalid or expired token")]
    InvalidOrExpiredToken,

    /// The remote store rejected our credential and refreshing it failed.
    #[error("remote store authentication failed")]
    RemoteAuthFailure,

    /// The remote store refused the session upload.
    #[error("session registration failed (status {status}): {message}")]
    RemoteRegistrationFailure { status: u16, message: String },

    /// Reading a session record back from the remote store failed.
    #[error("session fetch failed (status {status}): {message}")]
    RemoteFetchFailure { status: u16, message: String },

    /// The record exists but the remote store can't serve it yet.
    #[error("session record {0} is not ready yet")]
    RemoteRecordNotReady(String),

    /// The remote store answered 2xx with a body we can't use.
    #[error("unexpected remote response: {0}")]
    RemoteResponseMalformed(String),

    /// Local state could not be read or written.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// The remote store could not be reached at all.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

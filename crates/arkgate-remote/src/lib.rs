//! Remote session store plumbing for arkgate.
//!
//! Session records live in a third-party blob store (Arkacdn). This crate
//! provides:
//!
//! - the [`RemoteStore`] trait, the four calls the gateway makes against
//!   the store (upload, metadata, content, credential refresh),
//! - [`ArkacdnClient`]: the real HTTP implementation (feature `http`),
//! - [`MemoryRemote`]: an in-process implementation with the same status
//!   code behavior, for tests and local runs,
//! - [`Credential`] and [`AuthRefresher`]: the process-wide bearer
//!   credential and the component that keeps it fresh.
//!
//! # Feature Flags
//!
//! - `http` (default): [`ArkacdnClient`] via `reqwest`

mod credential;
mod error;
#[cfg(feature = "http")]
mod http;
mod memory;
mod refresher;
mod response;

pub use credential::Credential;
pub use error::RemoteError;
#[cfg(feature = "http")]
pub use http::ArkacdnClient;
pub use memory::MemoryRemote;
pub use refresher::AuthRefresher;
pub use response::{RemoteResponse, Upload};

use std::future::Future;

/// Default Arkacdn API root.
pub const DEFAULT_BASE_URL: &str = "https://api.arkacdn.cloud";

/// The calls the gateway makes against the remote blob store.
///
/// Implementations report what the store answered, not whether the answer
/// was good: any HTTP status comes back as `Ok(RemoteResponse)`. `Err` is
/// reserved for "never got an answer" (DNS, TLS, connection reset). The
/// session layer decides what each status means.
///
/// `credential` is the bearer token to present, or `None` to send the
/// request unauthenticated.
pub trait RemoteStore: Send + Sync + 'static {
    /// `POST /upload/plain`: stores a new blob and returns its metadata,
    /// including the identifier the store assigned.
    fn upload(
        &self,
        credential: Option<&str>,
        upload: &Upload,
    ) -> impl Future<Output = Result<RemoteResponse, RemoteError>> + Send;

    /// `GET /upload/{id}`: blob metadata.
    ///
    /// The session layer never calls this; it reads content directly. It
    /// is here for operators and tools inspecting stored records.
    fn fetch_meta(
        &self,
        credential: Option<&str>,
        file_id: &str,
    ) -> impl Future<Output = Result<RemoteResponse, RemoteError>> + Send;

    /// `GET /upload/{id}/json`: blob content parsed as JSON.
    fn fetch_content(
        &self,
        credential: Option<&str>,
        file_id: &str,
    ) -> impl Future<Output = Result<RemoteResponse, RemoteError>> + Send;

    /// `POST /auth/refresh`: exchanges the long-lived refresh credential
    /// for a new access credential.
    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<RemoteResponse, RemoteError>> + Send;
}

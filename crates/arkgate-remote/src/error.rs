/// Errors where the remote store never produced a response.
///
/// Non-success HTTP statuses are not errors at this layer; they come back
/// inside [`RemoteResponse`](crate::RemoteResponse).
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The HTTP exchange itself failed (connect, TLS, body read).
    #[cfg(feature = "http")]
    #[error("remote request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured base URL can't be used.
    #[error("invalid remote base url: {0}")]
    InvalidBaseUrl(String),

    /// The store could not be reached.
    #[error("remote store unreachable: {0}")]
    Unreachable(String),
}

//! Unified error type for arkgate.

use arkgate_remote::RemoteError;
use arkgate_session::SessionError;
use arkgate_store::StoreError;

/// Failures of the on-chain collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// Deploying a user's contract failed.
    #[error("contract deployment failed: {0}")]
    Deploy(String),

    /// Calling a deployed contract failed.
    #[error("contract call failed: {0}")]
    Call(String),
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each layer's variant lets `?` convert
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ArkgateError {
    /// A request field at the gateway level was empty or malformed
    /// (wallet address, username).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A local store could not be opened or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The remote store could not be reached or configured.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A token or session operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The chain collaborator failed.
    #[error(transparent)]
    Chain(#[from] ChainError),
}

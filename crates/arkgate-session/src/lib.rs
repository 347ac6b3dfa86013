//! Login tokens and remote-backed sessions for arkgate.
//!
//! This crate is the protocol core of the gateway:
//!
//! 1. **Tokens**: short-lived login tokens, one live token per username
//!    ([`TokenManager`])
//! 2. **Registration**: trading a token plus the client's IP for a session
//!    record stored in the remote blob store ([`SessionRegistrar`])
//! 3. **Validation**: checking that a username's stored session still
//!    exists remotely and was registered from the presented IP
//!    ([`SessionValidator`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Gateway (above)  ← login, token and session endpoints
//!     ↕
//! Session Layer (this crate)  ← token lifecycle, register, validate
//!     ↕                 ↕
//! Store Layer      Remote Layer  ← local maps / Arkacdn + credential refresh
//! ```
//!
//! # Flow
//!
//! ```text
//! create_token(user) ──→ register_session(token, ip) ──→ session_for_username(user, ip)
//!        │                        │                                 │
//!   tokens store           upload + remote map entry        remote fetch + IP compare
//! ```

mod error;
mod record;
mod registrar;
mod token;
mod validator;

pub use error::SessionError;
pub use record::{DenyReason, Registration, RemoteEntry, SessionRecord, SessionStatus};
pub use registrar::{SessionRegistrar, VerifyConfig};
pub use token::{Token, TokenConfig, TokenManager};
pub use validator::SessionValidator;

/// Rejects empty (or whitespace-only) string arguments.
pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<(), SessionError> {
    if value.trim().is_empty() {
        return Err(SessionError::InvalidArgument(format!(
            "{field} must be a non-empty string"
        )));
    }
    Ok(())
}

//! HTTP status codes for gateway outcomes.
//!
//! Routing lives outside this crate; whatever serves the HTTP surface asks
//! each outcome for its status here so every front end answers the same.
//!
//! | Outcome                                   | Status |
//! |-------------------------------------------|--------|
//! | session allowed                           | 200    |
//! | invalid argument                          | 400    |
//! | ip mismatch, invalid or expired token     | 401    |
//! | no session                                | 404    |
//! | record not ready                          | 409    |
//! | local persistence failure                 | 500    |
//! | remote store or chain failure             | 502    |

use arkgate_remote::RemoteError;
use arkgate_session::{DenyReason, SessionError, SessionStatus};

use crate::{ArkgateError, ChainError};

/// Maps an outcome to the HTTP status the service answers with.
pub trait HttpStatus {
    fn http_status(&self) -> u16;
}

impl HttpStatus for SessionStatus {
    fn http_status(&self) -> u16 {
        match self {
            Self::Allowed { .. } => 200,
            Self::Denied(reason) => reason.http_status(),
        }
    }
}

impl HttpStatus for DenyReason {
    fn http_status(&self) -> u16 {
        match self {
            Self::NoSession => 404,
            Self::IpMismatch => 401,
        }
    }
}

impl HttpStatus for SessionError {
    fn http_status(&self) -> u16 {
        match self {
            Self::InvalidArgument(_) => 400,
            Self::InvalidOrExpiredToken => 401,
            Self::RemoteRecordNotReady(_) => 409,
            Self::RemoteAuthFailure
            | Self::RemoteRegistrationFailure { .. }
            | Self::RemoteFetchFailure { .. }
            | Self::RemoteResponseMalformed(_) => 502,
            Self::Persistence(_) => 500,
            Self::Remote(e) => e.http_status(),
        }
    }
}

impl HttpStatus for RemoteError {
    fn http_status(&self) -> u16 {
        match self {
            // Our own configuration is wrong, not the upstream.
            Self::InvalidBaseUrl(_) => 500,
            _ => 502,
        }
    }
}

impl HttpStatus for ChainError {
    fn http_status(&self) -> u16 {
        502
    }
}

impl HttpStatus for ArkgateError {
    fn http_status(&self) -> u16 {
        match self {
            Self::InvalidArgument(_) => 400,
            Self::Store(_) => 500,
            Self::Remote(e) => e.http_status(),
            Self::Session(e) => e.http_status(),
            Self::Chain(e) => e.http_status(),
        }
    }
}

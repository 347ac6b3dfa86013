//! # Arkgate
//!
//! IP-bound login sessions backed by a remote blob store.
//!
//! A user asks for a short-lived token, logs in with it from some IP, and
//! from then on every request from that user is checked against the
//! session record the gateway uploaded to the remote store. The remote
//! store is the system of record: when the record disappears there, the
//! session is gone.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arkgate::prelude::*;
//!
//! // Implement ContractDeployer for your chain, then:
//! // let gateway = Gateway::builder()
//! //     .data_dir("./data")
//! //     .remote(RemoteConfig { refresh_token: Some(rt), ..Default::default() })
//! //     .build(ArkacdnClient::new(DEFAULT_BASE_URL)?, my_deployer)?;
//! // let token = gateway.issue_token("alice", Default::default())?;
//! ```
//!
//! ## Crates
//!
//! | Crate             | Layer                                        |
//! |-------------------|----------------------------------------------|
//! | `arkgate-store`   | embedded key-value stores                    |
//! | `arkgate-remote`  | remote store client, credential refresh      |
//! | `arkgate-session` | tokens, session registration and validation  |
//! | `arkgate`         | gateway, accounts, status mapping, telemetry |

pub mod accounts;
pub mod config;
mod error;
mod gateway;
pub mod status;
pub mod telemetry;

pub use error::{ArkgateError, ChainError};
pub use gateway::{Gateway, GatewayBuilder, LoginOutcome, LoginRequest, UserProfile};

pub mod prelude {
    pub use crate::accounts::{Account, AccountDirectory, ContractDeployer, WalletAddress};
    pub use crate::config::{GatewayConfig, RemoteConfig};
    pub use crate::status::HttpStatus;
    pub use crate::telemetry::init_tracing;
    pub use crate::{
        ArkgateError, ChainError, Gateway, GatewayBuilder, LoginOutcome, LoginRequest,
        UserProfile,
    };

    #[cfg(feature = "http")]
    pub use arkgate_remote::ArkacdnClient;
    pub use arkgate_remote::{
        AuthRefresher, Credential, DEFAULT_BASE_URL, MemoryRemote, RemoteError, RemoteResponse,
        RemoteStore, Upload,
    };
    pub use arkgate_session::{
        DenyReason, Registration, SessionError, SessionRecord, SessionStatus, Token, TokenConfig,
        VerifyConfig,
    };
    pub use arkgate_store::{JsonFileStore, KvStore, MemoryStore, SharedStore, StoreError};
}

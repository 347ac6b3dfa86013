//! Username → contract directory.
//!
//! Every user gets one contract on first login. The directory remembers
//! which contract belongs to which username so later logins (and profile
//! lookups) don't deploy again.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use arkgate_store::SharedStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{ArkgateError, ChainError};

/// Longest non-EVM wallet identifier accepted.
pub const MAX_WALLET_LEN: usize = 128;

// ---------------------------------------------------------------------------
// WalletAddress
// ---------------------------------------------------------------------------

/// A wallet address presented at login.
///
/// EVM addresses (`0x` + 40 hex digits) are normalized to lowercase and
/// become the owner of the deployed contract. Anything else is kept as an
/// opaque identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WalletAddress {
    Evm(String),
    Other(String),
}

impl WalletAddress {
    /// Parses a presented address.
    ///
    /// # Errors
    /// [`ArkgateError::InvalidArgument`] if the address is empty, contains
    /// whitespace, or is longer than [`MAX_WALLET_LEN`].
    pub fn parse(raw: &str) -> Result<Self, ArkgateError> {
        if raw.is_empty() {
            return Err(ArkgateError::InvalidArgument(
                "address must be a non-empty string".into(),
            ));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(ArkgateError::InvalidArgument(
                "address must not contain whitespace".into(),
            ));
        }
        if raw.len() > MAX_WALLET_LEN {
            return Err(ArkgateError::InvalidArgument(format!(
                "address is longer than {MAX_WALLET_LEN} characters"
            )));
        }
        if is_evm(raw) {
            Ok(Self::Evm(raw.to_ascii_lowercase()))
        } else {
            Ok(Self::Other(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Evm(a) | Self::Other(a) => a,
        }
    }

    pub fn is_evm(&self) -> bool {
        matches!(self, Self::Evm(_))
    }

    /// The address to pass as contract owner, EVM addresses only.
    pub fn evm_owner(&self) -> Option<&str> {
        match self {
            Self::Evm(a) => Some(a),
            Self::Other(_) => None,
        }
    }
}

fn is_evm(raw: &str) -> bool {
    let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) else {
        return false;
    };
    hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = ArkgateError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<WalletAddress> for String {
    fn from(address: WalletAddress) -> Self {
        match address {
            WalletAddress::Evm(a) | WalletAddress::Other(a) => a,
        }
    }
}

// ---------------------------------------------------------------------------
// ContractDeployer
// ---------------------------------------------------------------------------

/// The on-chain collaborator: deploys per-user contracts and reads them.
///
/// # Trait bounds
///
/// - `Send + Sync` → shared by every request handler via `Arc`.
/// - `'static` → lives as long as the gateway.
pub trait ContractDeployer: Send + Sync + 'static {
    /// Deploys a fresh contract and returns its address. `owner` is set
    /// for EVM wallets; `None` leaves ownership with the deploying key.
    fn deploy(
        &self,
        owner: Option<&str>,
    ) -> impl Future<Output = Result<String, ChainError>> + Send;

    /// Reads the kill counter of a deployed contract.
    fn kills(&self, contract: &str) -> impl Future<Output = Result<u64, ChainError>> + Send;
}

// ---------------------------------------------------------------------------
// AccountDirectory
// ---------------------------------------------------------------------------

/// A user's deployed contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub contract_address: String,
    pub wallet: WalletAddress,
    pub created_at: DateTime<Utc>,
}

/// Persisted `username → Account` map with deploy-once semantics.
pub struct AccountDirectory<D: ContractDeployer> {
    store: SharedStore<Account>,
    deployer: Arc<D>,
    /// Held across check-then-deploy so concurrent first logins for the
    /// same user can't deploy twice.
    deploy_gate: Mutex<()>,
}

impl<D: ContractDeployer> AccountDirectory<D> {
    pub fn new(store: SharedStore<Account>, deployer: Arc<D>) -> Self {
        Self {
            store,
            deployer,
            deploy_gate: Mutex::new(()),
        }
    }

    pub fn get(&self, username: &str) -> Result<Option<Account>, ArkgateError> {
        Ok(self.store.get(username)?)
    }

    /// Returns the user's account, deploying a contract first if the user
    /// has none. The `bool` is `true` when a deployment happened.
    ///
    /// An existing account is returned as-is even if `wallet` differs from
    /// the one it was created with.
    pub async fn ensure_account(
        &self,
        username: &str,
        wallet: &WalletAddress,
    ) -> Result<(Account, bool), ArkgateError> {
        let _exclusive = self.deploy_gate.lock().await;

        if let Some(existing) = self.store.get(username)? {
            return Ok((existing, false));
        }

        let contract_address = self.deployer.deploy(wallet.evm_owner()).await?;
        let account = Account {
            contract_address,
            wallet: wallet.clone(),
            created_at: Utc::now(),
        };
        self.store.put(username, account.clone())?;

        tracing::info!(
            %username,
            contract = %account.contract_address,
            evm_owner = wallet.is_evm(),
            "contract deployed for user"
        );
        Ok((account, true))
    }

    /// Reads the user's kill counter. `None` if the user has no account.
    pub async fn kills(&self, username: &str) -> Result<Option<u64>, ArkgateError> {
        let Some(account) = self.store.get(username)? else {
            return Ok(None);
        };
        Ok(Some(self.deployer.kills(&account.contract_address).await?))
    }
}

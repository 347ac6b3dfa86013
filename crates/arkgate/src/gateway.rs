//! `Gateway` builder and request operations.
//!
//! This is the entry point for serving arkgate. It ties together all the
//! layers: stores → remote credential → tokens → sessions → accounts.
//! Each public method corresponds to one endpoint of the HTTP surface:
//!
//! | Endpoint                        | Method                              |
//! |---------------------------------|-------------------------------------|
//! | `GET /token?username=`          | [`Gateway::issue_token`]            |
//! | `GET /token/validate/:id`       | [`Gateway::validate_token`]         |
//! | `POST /login`                   | [`Gateway::login`]                  |
//! | `POST /validatesession`         | [`Gateway::validate_session`]       |
//! | `GET /user/:username`           | [`Gateway::user`]                   |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arkgate_remote::{AuthRefresher, Credential, RemoteStore};
use arkgate_session::{
    Registration, RemoteEntry, SessionError, SessionRegistrar, SessionStatus, SessionValidator,
    Token, TokenConfig, TokenManager, VerifyConfig,
};
use arkgate_store::{JsonFileStore, MemoryStore, SharedStore, StoreError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::accounts::{Account, AccountDirectory, ContractDeployer, WalletAddress};
use crate::config::{ACCOUNTS_FILE, GatewayConfig, RemoteConfig, SESSIONS_FILE, TOKENS_FILE};
use crate::ArkgateError;

// ---------------------------------------------------------------------------
// Request / response shapes
// ---------------------------------------------------------------------------

/// Body of `POST /login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    /// Token previously issued to `username`.
    pub token: String,
    /// Wallet address; EVM addresses become the contract owner.
    pub address: String,
    /// Client IP the session is bound to.
    pub ip: String,
}

/// What a successful login produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub account: Account,
    /// `true` if this login deployed the user's contract.
    pub deployed: bool,
    pub registration: Registration,
}

/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub contract_address: String,
    pub kills: u64,
}

// ---------------------------------------------------------------------------
// GatewayBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring a [`Gateway`].
///
/// # Example
///
/// ```rust,ignore
/// use arkgate::prelude::*;
///
/// let gateway = Gateway::builder()
///     .data_dir("/var/lib/arkgate")
///     .remote(RemoteConfig { refresh_token: Some(rt), ..Default::default() })
///     .build(remote, deployer)?;
/// ```
pub struct GatewayBuilder {
    config: GatewayConfig,
}

impl GatewayBuilder {
    /// Creates a new builder with default settings (in-memory state).
    pub fn new() -> Self {
        Self {
            config: GatewayConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Persists local state as JSON documents under `dir`.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = Some(dir.into());
        self
    }

    /// Sets the remote store credentials and base URL.
    pub fn remote(mut self, remote: RemoteConfig) -> Self {
        self.config.remote = remote;
        self
    }

    /// Sets the token lifetime.
    pub fn tokens(mut self, tokens: TokenConfig) -> Self {
        self.config.tokens = tokens;
        self
    }

    /// Sets the read-back polling after uploads.
    pub fn verify(mut self, verify: VerifyConfig) -> Self {
        self.config.verify = verify;
        self
    }

    /// Opens the local stores and wires the layers together.
    ///
    /// # Errors
    /// [`ArkgateError::Store`] if a persisted store can't be read.
    pub fn build<R, D>(self, remote: R, deployer: D) -> Result<Gateway<R, D>, ArkgateError>
    where
        R: RemoteStore,
        D: ContractDeployer,
    {
        let dir = self.config.data_dir.as_deref();
        let tokens: SharedStore<Token> = open_store(dir, TOKENS_FILE)?;
        let entries: SharedStore<RemoteEntry> = open_store(dir, SESSIONS_FILE)?;
        let accounts: SharedStore<Account> = open_store(dir, ACCOUNTS_FILE)?;

        let remote = Arc::new(remote);
        let credential = Arc::new(Credential::new(self.config.remote.access_token.clone()));
        let refresher = Arc::new(AuthRefresher::new(
            remote.clone(),
            credential,
            self.config.remote.refresh_token.clone(),
        ));
        if !refresher.can_refresh() {
            tracing::warn!("no refresh credential configured, session validation will fail");
        }

        let tokens = Arc::new(TokenManager::new(tokens, self.config.tokens.clone()));
        let registrar = SessionRegistrar::new(
            tokens.clone(),
            remote.clone(),
            refresher.clone(),
            entries.clone(),
            self.config.verify.clone(),
        );
        let validator = SessionValidator::new(remote, refresher.clone(), entries);
        let accounts = AccountDirectory::new(accounts, Arc::new(deployer));

        tracing::info!(
            data_dir = ?self.config.data_dir,
            base_url = %self.config.remote.base_url,
            token_ttl_secs = self.config.tokens.ttl_secs,
            "gateway ready"
        );

        Ok(Gateway {
            tokens,
            registrar,
            validator,
            accounts,
            refresher,
        })
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Opens `dir/name` as a JSON file store, or a memory store when there is
/// no directory.
fn open_store<V>(dir: Option<&Path>, name: &str) -> Result<SharedStore<V>, StoreError>
where
    V: Clone + Serialize + DeserializeOwned + Send + 'static,
{
    Ok(match dir {
        Some(dir) => Arc::new(JsonFileStore::<V>::open(dir.join(name))?),
        None => Arc::new(MemoryStore::<V>::new()),
    })
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// The login and session gateway.
///
/// Cheap to share: wrap it in an `Arc` and hand it to every request
/// handler. All methods take `&self`.
pub struct Gateway<R: RemoteStore, D: ContractDeployer> {
    tokens: Arc<TokenManager>,
    registrar: SessionRegistrar<R>,
    validator: SessionValidator<R>,
    accounts: AccountDirectory<D>,
    refresher: Arc<AuthRefresher<R>>,
}

impl<R: RemoteStore, D: ContractDeployer> Gateway<R, D> {
    /// Creates a new builder.
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// Issues a login token for `username`, revoking any previous one.
    pub fn issue_token(
        &self,
        username: &str,
        data: Map<String, Value>,
    ) -> Result<String, ArkgateError> {
        Ok(self.tokens.create_token(username, data)?)
    }

    /// Looks up a live token. Expired tokens are evicted and reported as
    /// `None`.
    pub fn validate_token(&self, token_id: &str) -> Result<Option<Token>, ArkgateError> {
        Ok(self.tokens.get_token(token_id)?)
    }

    /// Logs a user in: checks the token, makes sure the user has a
    /// contract, and registers a session bound to the request's IP.
    ///
    /// # Errors
    /// - [`SessionError::InvalidArgument`] (wrapped) if `username` or `ip`
    ///   is empty.
    /// - [`SessionError::InvalidOrExpiredToken`] (wrapped) if the token is
    ///   not live or was issued to someone else.
    /// - [`ArkgateError::InvalidArgument`] if the address doesn't parse.
    /// - [`ArkgateError::Chain`] if the contract deployment fails.
    /// - Any registration error from the session layer.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginOutcome, ArkgateError> {
        if request.username.trim().is_empty() {
            return Err(SessionError::InvalidArgument(
                "username must be a non-empty string".into(),
            )
            .into());
        }

        let token = self.tokens.get_token(&request.token)?;
        if token.as_ref().map(|t| t.username.as_str()) != Some(request.username.as_str()) {
            tracing::debug!(username = %request.username, "login with foreign or dead token");
            return Err(SessionError::InvalidOrExpiredToken.into());
        }

        let wallet = WalletAddress::parse(&request.address)?;
        let (account, deployed) = self
            .accounts
            .ensure_account(&request.username, &wallet)
            .await?;
        let registration = self
            .registrar
            .register_session(&request.token, &request.ip)
            .await?;

        tracing::info!(
            username = %request.username,
            file_id = %registration.file_id,
            deployed,
            "login complete"
        );
        Ok(LoginOutcome {
            account,
            deployed,
            registration,
        })
    }

    /// Checks that `username` has a live session registered from `ip`.
    pub async fn validate_session(
        &self,
        username: &str,
        ip: &str,
    ) -> Result<SessionStatus, ArkgateError> {
        Ok(self.validator.session_for_username(username, ip).await?)
    }

    /// Profile of a user with a deployed contract; `None` otherwise.
    pub async fn user(&self, username: &str) -> Result<Option<UserProfile>, ArkgateError> {
        let Some(account) = self.accounts.get(username)? else {
            return Ok(None);
        };
        let kills = self.accounts.kills(username).await?.unwrap_or_default();
        Ok(Some(UserProfile {
            username: username.to_string(),
            contract_address: account.contract_address,
            kills,
        }))
    }

    /// Removes every expired token. Returns the removed identifiers.
    pub fn purge_expired_tokens(&self) -> Result<Vec<String>, ArkgateError> {
        Ok(self.tokens.purge_expired()?)
    }

    /// The remote-store credential currently presented.
    pub fn remote_credential(&self) -> &Arc<Credential> {
        self.refresher.credential()
    }
}

//! Wallet connection, persisted address and balance display.

pub mod balance;

use futures::join;
use log::{debug, error, info, warn};
use metrics::counter;
use std::sync::Arc;
use thiserror::Error;
use tokio::{
    sync::{broadcast::error::RecvError, RwLock},
    task::JoinHandle,
};

use crate::chain::{ChainDescriptor, ChainError, ChainGuardian, ChainId};
use crate::config::TokenInfo;
use crate::display::WalletDisplay;
use crate::format::{format_native_balance, format_token_amount, short_address, PLACEHOLDER};
use crate::metrics::{METRIC_WALLET_CONNECT, METRIC_WALLET_EVENTS, METRIC_WALLET_REFRESH};
use crate::provider::{ProviderEvent, WalletClient, WalletError};
use crate::storage::{KeyValueStore, WALLET_KEY};

pub use balance::{BalanceFetcher, Erc20BalanceFetcher};

/// Fractional digits shown for the token balance.
pub const TOKEN_BALANCE_PRECISION: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WalletState {
    #[default]
    Disconnected,
    Connecting,
    Connected(String),
    Error(String),
}

impl WalletState {
    pub fn is_connected(&self) -> bool {
        matches!(self, WalletState::Connected(_))
    }

    pub fn address(&self) -> Option<&str> {
        match self {
            WalletState::Connected(address) => Some(address),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    NotInstalled,
    Correct,
    /// Also reported when the active chain could not be read.
    Wrong,
}

/// Everything the wallet widgets show, with unresolved fields set to the
/// placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySnapshot {
    pub provider_present: bool,
    pub chain_id: Option<ChainId>,
    pub network: NetworkStatus,
    pub network_label: String,
    pub address: Option<String>,
    pub state: WalletState,
    pub native_balance: String,
    pub token_balance: String,
}

impl DisplaySnapshot {
    pub fn button_label(&self) -> String {
        match &self.address {
            Some(address) => short_address(address),
            None => "Connect Wallet".to_string(),
        }
    }

    pub fn network_text(&self) -> String {
        match self.network {
            NetworkStatus::NotInstalled => "Wallet: Not installed".to_string(),
            NetworkStatus::Correct => format!("Network: {}", self.network_label),
            NetworkStatus::Wrong => format!("Network: Wrong (switch to {})", self.network_label),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("no wallet provider installed")]
    NoProvider,
    #[error("wallet network could not be prepared")]
    Chain(#[from] ChainError),
    #[error("wallet request was rejected")]
    Rejected(#[source] WalletError),
}

impl ConnectError {
    /// Everything but a missing wallet is reported to the visitor as a
    /// cancelled connection.
    pub fn is_cancellation(&self) -> bool {
        !matches!(self, ConnectError::NoProvider)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected(String),
    /// The wallet answered with an empty account list.
    NoAccounts,
}

/// Active subscription to wallet notifications. Cancelled on drop.
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn cancel(self) {
        self.handle.abort();
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct WalletSession {
    wallet: Option<WalletClient>,
    guardian: ChainGuardian,
    balances: Option<Arc<dyn BalanceFetcher>>,
    store: Arc<dyn KeyValueStore>,
    display: Arc<dyn WalletDisplay>,
    target: ChainDescriptor,
    token: TokenInfo,
    state: RwLock<WalletState>,
}

impl WalletSession {
    /// Token balances are read with [`Erc20BalanceFetcher`] unless replaced
    /// through [`WalletSession::with_balance_fetcher`].
    pub fn new(
        wallet: Option<WalletClient>,
        store: Arc<dyn KeyValueStore>,
        display: Arc<dyn WalletDisplay>,
        target: ChainDescriptor,
        token: TokenInfo,
    ) -> Self {
        let balances = wallet
            .clone()
            .map(|w| Arc::new(Erc20BalanceFetcher::new(w)) as Arc<dyn BalanceFetcher>);
        Self {
            guardian: ChainGuardian::new(wallet.clone()),
            wallet,
            balances,
            store,
            display,
            target,
            token,
            state: RwLock::new(WalletState::Disconnected),
        }
    }

    pub fn with_balance_fetcher(mut self, balances: Arc<dyn BalanceFetcher>) -> Self {
        self.balances = Some(balances);
        self
    }

    pub fn has_provider(&self) -> bool {
        self.wallet.is_some()
    }

    pub async fn state(&self) -> WalletState {
        self.state.read().await.clone()
    }

    /// Last address saved by a connect or an accounts-changed notification.
    pub fn persisted_address(&self) -> Option<String> {
        self.store.get(WALLET_KEY).filter(|a| !a.is_empty())
    }

    /// Connects the wallet: best-effort permission request, chain check,
    /// then the account request. The chain step always precedes the account
    /// request.
    pub async fn connect(&self) -> Result<ConnectOutcome, ConnectError> {
        counter!(METRIC_WALLET_CONNECT, 1);

        let Some(wallet) = &self.wallet else {
            self.display.notify("Install MetaMask to connect.");
            return Err(ConnectError::NoProvider);
        };

        *self.state.write().await = WalletState::Connecting;

        match self.try_connect(wallet).await {
            Ok(Some(address)) => {
                info!("Wallet connected: {}", address);
                self.display.notify("Wallet connected");
                self.refresh().await;
                Ok(ConnectOutcome::Connected(address))
            }
            Ok(None) => {
                *self.state.write().await = WalletState::Disconnected;
                Ok(ConnectOutcome::NoAccounts)
            }
            Err(e) => {
                error!("Wallet connection failed: {}", e);
                *self.state.write().await = WalletState::Error(e.to_string());
                self.display.notify("Wallet connection canceled.");
                self.refresh_inner(true).await;
                Err(e)
            }
        }
    }

    async fn try_connect(&self, wallet: &WalletClient) -> Result<Option<String>, ConnectError> {
        if let Err(e) = wallet.request_permissions().await {
            debug!("Permission request declined: {}", e);
        }

        let outcome = self.guardian.ensure_chain(&self.target).await?;
        debug!("Chain check: {:?}", outcome);

        let accounts = wallet
            .request_accounts()
            .await
            .map_err(ConnectError::Rejected)?;
        let Some(address) = accounts.into_iter().next() else {
            return Ok(None);
        };

        self.persist_address(Some(&address));
        *self.state.write().await = WalletState::Connected(address.clone());
        Ok(Some(address))
    }

    /// Rebuilds and renders the wallet widgets. Never fails: each field that
    /// cannot be resolved falls back to the placeholder on its own.
    pub async fn refresh(&self) -> DisplaySnapshot {
        self.refresh_inner(false).await
    }

    /// `keep_error` holds a failed connect's `Error` state even when an
    /// address resolves.
    async fn refresh_inner(&self, keep_error: bool) -> DisplaySnapshot {
        counter!(METRIC_WALLET_REFRESH, 1);
        let snapshot = self.snapshot(keep_error).await;
        self.display.render_wallet(&snapshot);
        snapshot
    }

    async fn snapshot(&self, keep_error: bool) -> DisplaySnapshot {
        let Some(wallet) = &self.wallet else {
            return DisplaySnapshot {
                provider_present: false,
                chain_id: None,
                network: NetworkStatus::NotInstalled,
                network_label: self.target.label.clone(),
                address: None,
                state: self.state().await,
                native_balance: PLACEHOLDER.to_string(),
                token_balance: PLACEHOLDER.to_string(),
            };
        };

        let chain_id = match wallet.chain_id().await {
            Ok(chain_id) => Some(chain_id),
            Err(e) => {
                warn!("Could not read chain id: {}", e);
                None
            }
        };
        let network = if chain_id == Some(self.target.chain_id) {
            NetworkStatus::Correct
        } else {
            NetworkStatus::Wrong
        };

        let live = match wallet.accounts().await {
            Ok(accounts) => accounts.into_iter().find(|a| !a.is_empty()),
            Err(e) => {
                warn!("Could not read accounts: {}", e);
                None
            }
        };
        let address = live.or_else(|| self.persisted_address());
        let state = self.settle_state(address.as_deref(), keep_error).await;

        let (native_balance, token_balance) = match &address {
            Some(address) => join!(
                self.native_balance(wallet, address),
                self.token_balance(address)
            ),
            None => (PLACEHOLDER.to_string(), PLACEHOLDER.to_string()),
        };

        DisplaySnapshot {
            provider_present: true,
            chain_id,
            network,
            network_label: self.target.label.clone(),
            address,
            state,
            native_balance,
            token_balance,
        }
    }

    /// A resolved address means connected. Without one, an in-flight connect
    /// or a reported error is left alone.
    async fn settle_state(&self, address: Option<&str>, keep_error: bool) -> WalletState {
        let mut state = self.state.write().await;
        if keep_error && matches!(*state, WalletState::Error(_)) {
            return state.clone();
        }
        match address {
            Some(address) => *state = WalletState::Connected(address.to_string()),
            None => {
                if !matches!(*state, WalletState::Connecting | WalletState::Error(_)) {
                    *state = WalletState::Disconnected;
                }
            }
        }
        state.clone()
    }

    async fn native_balance(&self, wallet: &WalletClient, address: &str) -> String {
        match wallet.get_balance(address).await {
            Ok(wei) => format_native_balance(Some(wei), self.target.native_currency.decimals as u32),
            Err(e) => {
                warn!("Native balance read failed: {}", e);
                PLACEHOLDER.to_string()
            }
        }
    }

    async fn token_balance(&self, address: &str) -> String {
        let Some(balances) = &self.balances else {
            return PLACEHOLDER.to_string();
        };
        match balances.token_balance(self.token.address, address).await {
            Ok(raw) => format_token_amount(
                Some(raw.into()),
                self.token.decimals as u32,
                TOKEN_BALANCE_PRECISION,
            ),
            Err(e) => {
                warn!("{} balance read failed: {}", self.token.symbol, e);
                PLACEHOLDER.to_string()
            }
        }
    }

    fn persist_address(&self, address: Option<&str>) {
        let result = match address {
            Some(address) => self.store.set(WALLET_KEY, address),
            None => self.store.remove(WALLET_KEY),
        };
        if let Err(e) = result {
            warn!("Could not persist wallet address: {}", e);
        }
    }

    /// Applies one wallet notification and refreshes exactly once.
    pub async fn handle_event(&self, event: ProviderEvent) -> DisplaySnapshot {
        counter!(METRIC_WALLET_EVENTS, 1);
        match &event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
                Some(address) if !address.is_empty() => self.persist_address(Some(address)),
                _ => {
                    info!("Wallet reported no accounts, forgetting saved address");
                    self.persist_address(None);
                    *self.state.write().await = WalletState::Disconnected;
                }
            },
            ProviderEvent::ChainChanged(chain) => debug!("Wallet switched to chain {}", chain),
        }
        self.refresh().await
    }

    /// Subscribes to wallet notifications, refreshing once per event. `None`
    /// when there is no wallet to listen to.
    pub fn listen(self: &Arc<Self>) -> Option<Subscription> {
        let mut events = self.wallet.as_ref()?.listen();
        let session = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        session.handle_event(event).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Missed {} wallet notifications, refreshing", skipped);
                        session.refresh().await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Some(Subscription { handle })
    }
}

use async_trait::async_trait;
use ethers::providers::{Http, Provider, ProviderError, RpcError};
use log::{debug, warn};
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tokio::{sync::broadcast, task::JoinHandle};

use super::{decode_accounts, ProviderEvent, WalletError, WalletProvider};

const EVENT_CAPACITY: usize = 16;

/// Wallet provider backed by a JSON-RPC endpoint over HTTP.
///
/// HTTP has no push channel, so account and chain changes are discovered by
/// [`HttpWalletProvider::spawn_change_watcher`]; hosts that do receive wallet
/// notifications can forward them through [`HttpWalletProvider::emitter`].
pub struct HttpWalletProvider {
    provider: Provider<Http>,
    events: broadcast::Sender<ProviderEvent>,
}

impl HttpWalletProvider {
    pub fn try_new(rpc_url: &str) -> anyhow::Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self { provider, events })
    }

    pub fn emitter(&self) -> broadcast::Sender<ProviderEvent> {
        self.events.clone()
    }

    /// Polls `eth_accounts` and `eth_chainId` every `period` and emits an event
    /// whenever either differs from the previous observation. The first
    /// observation only sets the baseline.
    pub fn spawn_change_watcher(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            let mut last_accounts: Option<Vec<String>> = None;
            let mut last_chain: Option<String> = None;

            loop {
                ticker.tick().await;

                match this.request("eth_accounts", Value::Null).await {
                    Ok(value) => match decode_accounts("eth_accounts", value) {
                        Ok(accounts) => {
                            if last_accounts.as_ref().is_some_and(|prev| *prev != accounts) {
                                let _ = this.events.send(ProviderEvent::AccountsChanged(accounts.clone()));
                            }
                            last_accounts = Some(accounts);
                        }
                        Err(e) => debug!("Ignoring malformed accounts: {}", e),
                    },
                    Err(e) => debug!("Account poll failed: {}", e),
                }

                match this.request("eth_chainId", Value::Null).await {
                    Ok(Value::String(chain)) => {
                        if last_chain.as_ref().is_some_and(|prev| *prev != chain) {
                            let _ = this.events.send(ProviderEvent::ChainChanged(chain.clone()));
                        }
                        last_chain = Some(chain);
                    }
                    Ok(other) => debug!("Ignoring malformed chain id: {}", other),
                    Err(e) => debug!("Chain poll failed: {}", e),
                }
            }
        })
    }
}

#[async_trait]
impl WalletProvider for HttpWalletProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        let params = match params {
            Value::Null => Value::Array(Vec::new()),
            other => other,
        };
        self.provider
            .request::<Value, Value>(method, params)
            .await
            .map_err(|e| {
                let err = map_provider_error(e);
                if err.code().is_none() {
                    warn!("{} failed: {}", method, err);
                }
                err
            })
    }

    fn listen(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

fn map_provider_error(err: ProviderError) -> WalletError {
    match err.as_error_response() {
        Some(response) => WalletError::Rpc {
            code: response.code,
            message: response.message.clone(),
        },
        None => WalletError::Transport(err.to_string()),
    }
}

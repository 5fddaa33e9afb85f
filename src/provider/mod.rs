//! Wallet provider seam.
//!
//! A browser wallet exposes a single `request(method, params)` entry point and
//! pushes `accountsChanged` / `chainChanged` notifications. [`WalletProvider`]
//! models exactly that; [`WalletClient`] layers the typed calls the site makes
//! on top of it. Whether a provider exists at all is expressed with `Option`,
//! never probed ad hoc.

pub mod http;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::chain::{ChainDescriptor, ChainId};

pub use http::HttpWalletProvider;

/// EIP-1193: the user rejected the request.
pub const USER_REJECTED: i64 = 4001;
/// EIP-3326: the requested chain has not been added to the wallet.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("wallet rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("wallet transport error: {0}")]
    Transport(String),
    #[error("unexpected response to {method}: {reason}")]
    Decode { method: &'static str, reason: String },
}

impl WalletError {
    pub fn code(&self) -> Option<i64> {
        match self {
            WalletError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code() == Some(USER_REJECTED)
    }

    /// Some wallets only mention the code in the message text.
    pub fn is_unrecognized_chain(&self) -> bool {
        match self {
            WalletError::Rpc { code, message } => {
                *code == UNRECOGNIZED_CHAIN || message.contains(&UNRECOGNIZED_CHAIN.to_string())
            }
            WalletError::Transport(message) => message.contains(&UNRECOGNIZED_CHAIN.to_string()),
            WalletError::Decode { .. } => false,
        }
    }

    fn decode(method: &'static str, reason: impl Into<String>) -> Self {
        WalletError::Decode {
            method,
            reason: reason.into(),
        }
    }
}

/// Notifications pushed by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<String>),
    ChainChanged(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Issue one JSON-RPC style request.
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError>;

    /// Subscribe to provider notifications. Dropping the receiver unsubscribes.
    fn listen(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// ERC-20 asset suggested to the wallet through `wallet_watchAsset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedAsset {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
    pub image: Option<String>,
}

/// Typed calls over a [`WalletProvider`].
#[derive(Clone)]
pub struct WalletClient {
    inner: Arc<dyn WalletProvider>,
}

impl WalletClient {
    pub fn new(inner: Arc<dyn WalletProvider>) -> Self {
        Self { inner }
    }

    pub fn listen(&self) -> broadcast::Receiver<ProviderEvent> {
        self.inner.listen()
    }

    pub async fn chain_id(&self) -> Result<ChainId, WalletError> {
        let value = self.inner.request("eth_chainId", Value::Null).await?;
        let text = value
            .as_str()
            .ok_or_else(|| WalletError::decode("eth_chainId", "expected a hex string"))?;
        text.parse()
            .map_err(|_| WalletError::decode("eth_chainId", format!("invalid chain id {text}")))
    }

    pub async fn accounts(&self) -> Result<Vec<String>, WalletError> {
        let value = self.inner.request("eth_accounts", Value::Null).await?;
        decode_accounts("eth_accounts", value)
    }

    pub async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        let value = self.inner.request("eth_requestAccounts", Value::Null).await?;
        decode_accounts("eth_requestAccounts", value)
    }

    pub async fn request_permissions(&self) -> Result<(), WalletError> {
        self.inner
            .request("wallet_requestPermissions", json!([{ "eth_accounts": {} }]))
            .await
            .map(|_| ())
    }

    pub async fn switch_chain(&self, chain: ChainId) -> Result<(), WalletError> {
        self.inner
            .request(
                "wallet_switchEthereumChain",
                json!([{ "chainId": chain.to_string() }]),
            )
            .await
            .map(|_| ())
    }

    pub async fn add_chain(&self, descriptor: &ChainDescriptor) -> Result<(), WalletError> {
        self.inner
            .request("wallet_addEthereumChain", json!([descriptor.to_rpc_params()]))
            .await
            .map(|_| ())
    }

    pub async fn get_balance(&self, address: &str) -> Result<U256, WalletError> {
        let value = self
            .inner
            .request("eth_getBalance", json!([address, "latest"]))
            .await?;
        decode_quantity("eth_getBalance", &value)
    }

    /// Read-only contract call against the latest block.
    pub async fn call(&self, to: Address, data: Bytes) -> Result<U256, WalletError> {
        let value = self
            .inner
            .request("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        decode_quantity("eth_call", &value)
    }

    pub async fn watch_asset(&self, asset: &WatchedAsset) -> Result<bool, WalletError> {
        let mut options = json!({
            "address": asset.address,
            "symbol": asset.symbol,
            "decimals": asset.decimals,
        });
        if let Some(image) = &asset.image {
            options["image"] = json!(image);
        }
        let value = self
            .inner
            .request("wallet_watchAsset", json!({ "type": "ERC20", "options": options }))
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }
}

fn decode_accounts(method: &'static str, value: Value) -> Result<Vec<String>, WalletError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(WalletError::decode(method, format!("non-string account {other}"))),
            })
            .collect(),
        other => Err(WalletError::decode(method, format!("expected an array, got {other}"))),
    }
}

/// Hex quantity (`0x...`) as returned by `eth_getBalance` and `eth_call`.
pub fn decode_quantity(method: &'static str, value: &Value) -> Result<U256, WalletError> {
    let text = value
        .as_str()
        .ok_or_else(|| WalletError::decode(method, "expected a hex string"))?;
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .ok_or_else(|| WalletError::decode(method, format!("missing 0x prefix in {text}")))?;
    if digits.is_empty() {
        return Err(WalletError::decode(method, "empty result"));
    }
    // eth_call returns a full 32-byte word; anything longer is not a uint256.
    let digits = digits.trim_start_matches('0');
    if digits.len() > 64 {
        return Err(WalletError::decode(method, "value exceeds 256 bits"));
    }
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(digits, 16).map_err(|e| WalletError::decode(method, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecognized_chain_detection() {
        let by_code = WalletError::Rpc {
            code: 4902,
            message: "Unrecognized chain ID".into(),
        };
        let by_message = WalletError::Rpc {
            code: -32603,
            message: "Unrecognized chain ID \"0x38\". Try adding the chain (4902)".into(),
        };
        let other = WalletError::Rpc {
            code: 4001,
            message: "User rejected the request.".into(),
        };
        assert!(by_code.is_unrecognized_chain());
        assert!(by_message.is_unrecognized_chain());
        assert!(!other.is_unrecognized_chain());
        assert!(other.is_user_rejection());
    }

    #[test]
    fn test_decode_quantity() {
        assert_eq!(decode_quantity("eth_call", &json!("0x0")).unwrap(), U256::zero());
        assert_eq!(
            decode_quantity("eth_call", &json!(format!("0x{:064x}", 1_000u64))).unwrap(),
            U256::from(1_000u64)
        );
        assert!(decode_quantity("eth_call", &json!("0x")).is_err());
        assert!(decode_quantity("eth_call", &json!("1234")).is_err());
        assert!(decode_quantity("eth_call", &json!(12)).is_err());
    }

    #[tokio::test]
    async fn test_accounts_decoding() {
        let mut provider = MockWalletProvider::new();
        provider
            .expect_request()
            .withf(|method, _| method == "eth_accounts")
            .returning(|_, _| Ok(json!(["0xabc", "0xdef"])));
        let client = WalletClient::new(Arc::new(provider));
        assert_eq!(client.accounts().await.unwrap(), vec!["0xabc", "0xdef"]);
    }

    #[tokio::test]
    async fn test_watch_asset_params() {
        let mut provider = MockWalletProvider::new();
        provider
            .expect_request()
            .withf(|method, params| {
                method == "wallet_watchAsset"
                    && params["type"] == "ERC20"
                    && params["options"]["symbol"] == "BUV"
                    && params["options"].get("image").is_none()
            })
            .times(1)
            .returning(|_, _| Ok(json!(true)));
        let client = WalletClient::new(Arc::new(provider));
        let asset = WatchedAsset {
            address: "0xd14Ec02A022D2BD4117a0EEba966423253a48ad1".into(),
            symbol: "BUV".into(),
            decimals: 18,
            image: None,
        };
        assert!(client.watch_asset(&asset).await.unwrap());
    }
}

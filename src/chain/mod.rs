use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{fmt, str::FromStr};
use thiserror::Error;

use crate::provider::{WalletClient, WalletError};

/// Network identifier as exchanged with wallets (`0x38`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChainId(pub u64);

pub const BSC_MAINNET: ChainId = ChainId(0x38);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid chain id: {0}")]
pub struct ParseChainIdError(String);

impl FromStr for ChainId {
    type Err = ParseChainIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| ParseChainIdError(s.to_string()))?;
        u64::from_str_radix(digits, 16)
            .map(ChainId)
            .map_err(|_| ParseChainIdError(s.to_string()))
    }
}

impl TryFrom<String> for ChainId {
    type Error = ParseChainIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChainId> for String {
    fn from(id: ChainId) -> Self {
        id.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Everything a wallet needs to register a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDescriptor {
    pub chain_id: ChainId,
    pub chain_name: String,
    /// Short name used in status text ("BSC").
    pub label: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

impl ChainDescriptor {
    pub fn bnb_smart_chain() -> Self {
        Self {
            chain_id: BSC_MAINNET,
            chain_name: "BNB Smart Chain".to_string(),
            label: "BSC".to_string(),
            native_currency: NativeCurrency {
                name: "BNB".to_string(),
                symbol: "BNB".to_string(),
                decimals: 18,
            },
            rpc_urls: vec!["https://bsc-dataseed.binance.org/".to_string()],
            block_explorer_urls: vec!["https://bscscan.com/".to_string()],
        }
    }

    /// Parameter object for `wallet_addEthereumChain`.
    pub fn to_rpc_params(&self) -> Value {
        json!({
            "chainId": self.chain_id.to_string(),
            "chainName": self.chain_name,
            "nativeCurrency": {
                "name": self.native_currency.name,
                "symbol": self.native_currency.symbol,
                "decimals": self.native_currency.decimals,
            },
            "rpcUrls": self.rpc_urls,
            "blockExplorerUrls": self.block_explorer_urls,
        })
    }
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("could not read the active chain")]
    Query(#[source] WalletError),
    #[error("switching to chain {chain} failed")]
    Switch {
        chain: ChainId,
        #[source]
        source: WalletError,
    },
    #[error("adding chain {chain} failed")]
    Add {
        chain: ChainId,
        #[source]
        source: WalletError,
    },
}

impl ChainError {
    /// The wallet error that caused the failure, unchanged.
    pub fn provider_error(&self) -> &WalletError {
        match self {
            ChainError::Query(source) => source,
            ChainError::Switch { source, .. } | ChainError::Add { source, .. } => source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Nothing to enforce without a wallet.
    NoProvider,
    AlreadyActive,
    Switched,
    Added,
}

/// Points the wallet at the required network before account-scoped calls.
#[derive(Clone)]
pub struct ChainGuardian {
    wallet: Option<WalletClient>,
}

impl ChainGuardian {
    pub fn new(wallet: Option<WalletClient>) -> Self {
        Self { wallet }
    }

    /// One switch attempt, and one add-chain attempt only when the wallet
    /// does not know the chain. No retries.
    pub async fn ensure_chain(&self, target: &ChainDescriptor) -> Result<ChainOutcome, ChainError> {
        let Some(wallet) = &self.wallet else {
            return Ok(ChainOutcome::NoProvider);
        };

        let current = wallet.chain_id().await.map_err(ChainError::Query)?;
        if current == target.chain_id {
            return Ok(ChainOutcome::AlreadyActive);
        }

        info!("Wallet on chain {}, switching to {}", current, target.chain_id);
        match wallet.switch_chain(target.chain_id).await {
            Ok(()) => Ok(ChainOutcome::Switched),
            Err(e) if e.is_unrecognized_chain() => {
                info!("Wallet does not know {}, adding {}", target.chain_id, target.chain_name);
                wallet
                    .add_chain(target)
                    .await
                    .map(|_| ChainOutcome::Added)
                    .map_err(|source| ChainError::Add {
                        chain: target.chain_id,
                        source,
                    })
            }
            Err(source) => {
                warn!("Chain switch to {} failed: {}", target.chain_id, source);
                Err(ChainError::Switch {
                    chain: target.chain_id,
                    source,
                })
            }
        }
    }
}

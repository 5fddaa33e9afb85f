use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256};
use std::str::FromStr;

use crate::provider::{WalletClient, WalletError};

/// `balanceOf(address)`
pub const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// Reads a token balance for an owner.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BalanceFetcher: Send + Sync {
    async fn token_balance(&self, token: Address, owner: &str) -> Result<U256, WalletError>;
}

/// Raw ERC-20 `balanceOf` through the wallet's `eth_call`.
#[derive(Clone)]
pub struct Erc20BalanceFetcher {
    wallet: WalletClient,
}

impl Erc20BalanceFetcher {
    pub fn new(wallet: WalletClient) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl BalanceFetcher for Erc20BalanceFetcher {
    async fn token_balance(&self, token: Address, owner: &str) -> Result<U256, WalletError> {
        let owner = Address::from_str(owner).map_err(|e| WalletError::Decode {
            method: "eth_call",
            reason: format!("invalid owner address {owner}: {e}"),
        })?;
        self.wallet.call(token, balance_of_calldata(owner)).await
    }
}

/// Selector followed by the owner left-padded to a 32-byte word.
pub fn balance_of_calldata(owner: Address) -> Bytes {
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&BALANCE_OF_SELECTOR);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(owner.as_bytes());
    Bytes::from(data)
}

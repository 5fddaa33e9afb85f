use log::error;

use crate::config::TokenInfo;
use crate::display::WalletDisplay;
use crate::provider::{WalletClient, WalletError, WatchedAsset};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddTokenOutcome {
    NoProvider,
    Added,
    /// The visitor dismissed the prompt.
    NotAdded,
    Failed(WalletError),
}

impl AddTokenOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            AddTokenOutcome::NoProvider => "No wallet detected (install MetaMask)",
            AddTokenOutcome::Added => "Token added to wallet",
            AddTokenOutcome::NotAdded => "Token not added",
            AddTokenOutcome::Failed(_) => "Could not add token",
        }
    }
}

/// Suggests the project token to the wallet and reports the result to the
/// visitor.
pub async fn add_token_to_wallet(
    wallet: Option<&WalletClient>,
    token: &TokenInfo,
    display: &dyn WalletDisplay,
) -> AddTokenOutcome {
    let outcome = match wallet {
        None => AddTokenOutcome::NoProvider,
        Some(wallet) => {
            let asset = WatchedAsset {
                address: token.contract(),
                symbol: token.symbol.clone(),
                decimals: token.decimals,
                image: token.image.clone().filter(|i| !i.is_empty()),
            };
            match wallet.watch_asset(&asset).await {
                Ok(true) => AddTokenOutcome::Added,
                Ok(false) => AddTokenOutcome::NotAdded,
                Err(e) => {
                    error!("wallet_watchAsset failed: {}", e);
                    AddTokenOutcome::Failed(e)
                }
            }
        }
    };
    display.notify(outcome.message());
    outcome
}

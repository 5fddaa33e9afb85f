use anyhow::{anyhow, Context, Result};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf, str::FromStr, time::Duration};
use url::Url;

use crate::chain::{ChainDescriptor, ChainId, NativeCurrency};

pub const DEFAULT_CONTRACT: &str = "0xd14Ec02A022D2BD4117a0EEba966423253a48ad1";
pub const DEFAULT_MARKET_API: &str = "https://api.dexscreener.com/latest/dex/tokens";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(45);
pub const DEFAULT_VISIBILITY_THRESHOLD: f64 = 0.2;

/// The project token as shown on the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub image: Option<String>,
}

impl Default for TokenInfo {
    fn default() -> Self {
        Self {
            address: Address::from_str(DEFAULT_CONTRACT).unwrap_or_default(),
            name: "Burnaverse Protocol".to_string(),
            symbol: "BUV".to_string(),
            decimals: 18,
            image: None,
        }
    }
}

impl TokenInfo {
    /// Checksummed contract address, the form users copy and data sources key on.
    pub fn contract(&self) -> String {
        ethers::utils::to_checksum(&self.address, None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Links {
    pub explorer_token: String,
    pub explorer_contract: String,
    pub swap: String,
}

impl Links {
    fn for_contract(contract: &str) -> Self {
        Self {
            explorer_token: format!("https://bscscan.com/token/{}", contract),
            explorer_contract: format!("https://bscscan.com/address/{}", contract),
            swap: "https://pancakeswap.finance/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub base_url: String,
    pub token: TokenInfo,
    pub links: Links,
    pub target_chain: ChainDescriptor,

    /// Wallet JSON-RPC endpoint. `None` means no wallet is available.
    pub wallet_rpc_url: Option<String>,
    /// How often the HTTP wallet is polled for account/chain changes.
    pub wallet_watch_interval: Duration,

    pub market_api_url: String,
    pub poll_interval: Duration,
    pub visibility_threshold: f64,

    pub store_path: PathBuf,
    pub log_level: String,
    pub metrics_port: Option<u16>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let token = TokenInfo::default();
        let links = Links::for_contract(DEFAULT_CONTRACT);
        Self {
            base_url: "https://burnaverseprotocol.xyz".to_string(),
            token,
            links,
            target_chain: ChainDescriptor::bnb_smart_chain(),
            wallet_rpc_url: None,
            wallet_watch_interval: Duration::from_secs(4),
            market_api_url: DEFAULT_MARKET_API.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            visibility_threshold: DEFAULT_VISIBILITY_THRESHOLD,
            store_path: PathBuf::from("burnaverse-store.json"),
            log_level: "info".to_string(),
            metrics_port: None,
        }
    }
}

impl SiteConfig {
    /// Defaults overridden by environment variables (`.env` is honoured by the
    /// caller through `dotenv`).
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(contract) = var("TOKEN_CONTRACT") {
            config.token.address = Address::from_str(&contract)
                .map_err(|e| anyhow!("TOKEN_CONTRACT is not an address: {}", e))?;
            config.links = Links::for_contract(&contract);
        }
        if let Some(name) = var("TOKEN_NAME") {
            config.token.name = name;
        }
        if let Some(symbol) = var("TOKEN_SYMBOL") {
            config.token.symbol = symbol;
        }
        if let Some(decimals) = var("TOKEN_DECIMALS") {
            config.token.decimals = decimals.parse().context("TOKEN_DECIMALS")?;
        }
        config.token.image = var("TOKEN_IMAGE");

        if let Some(base_url) = var("SITE_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(swap) = var("SWAP_URL") {
            config.links.swap = swap;
        }

        if let Some(chain_id) = var("TARGET_CHAIN_ID") {
            config.target_chain.chain_id = chain_id
                .parse::<ChainId>()
                .map_err(|e| anyhow!("TARGET_CHAIN_ID: {}", e))?;
        }
        if let Some(name) = var("TARGET_CHAIN_NAME") {
            config.target_chain.chain_name = name;
        }
        if let Some(label) = var("TARGET_CHAIN_LABEL") {
            config.target_chain.label = label;
        }
        if let Some(symbol) = var("TARGET_CHAIN_CURRENCY") {
            config.target_chain.native_currency = NativeCurrency {
                name: symbol.clone(),
                symbol,
                decimals: config.target_chain.native_currency.decimals,
            };
        }
        if let Some(rpc) = var("TARGET_CHAIN_RPC_URLS") {
            config.target_chain.rpc_urls = split_list(&rpc);
        }
        if let Some(explorers) = var("TARGET_CHAIN_EXPLORER_URLS") {
            config.target_chain.block_explorer_urls = split_list(&explorers);
        }

        config.wallet_rpc_url = var("WALLET_RPC_URL");
        if let Some(ms) = var("WALLET_WATCH_INTERVAL_MS") {
            config.wallet_watch_interval =
                Duration::from_millis(ms.parse().context("WALLET_WATCH_INTERVAL_MS")?);
        }

        if let Some(url) = var("MARKET_API_URL") {
            config.market_api_url = url;
        }
        if let Some(secs) = var("POLL_INTERVAL_SECS") {
            config.poll_interval = Duration::from_secs(secs.parse().context("POLL_INTERVAL_SECS")?);
        }
        if let Some(threshold) = var("VISIBILITY_THRESHOLD") {
            config.visibility_threshold = threshold.parse().context("VISIBILITY_THRESHOLD")?;
        }

        if let Some(path) = var("STORE_PATH") {
            config.store_path = PathBuf::from(path);
        }
        if let Some(level) = var("LOG_LEVEL") {
            config.log_level = level;
        }
        if let Some(port) = var("METRICS_PORT") {
            config.metrics_port = Some(port.parse().context("METRICS_PORT")?);
        }

        Ok(config)
    }

    pub fn validate_all(&self) -> Result<()> {
        validate_url("SITE_BASE_URL", &self.base_url)?;
        validate_url("MARKET_API_URL", &self.market_api_url)?;
        validate_url("SWAP_URL", &self.links.swap)?;
        if let Some(rpc) = &self.wallet_rpc_url {
            validate_url("WALLET_RPC_URL", rpc)?;
        }
        for rpc in &self.target_chain.rpc_urls {
            validate_url("TARGET_CHAIN_RPC_URLS", rpc)?;
        }
        for explorer in &self.target_chain.block_explorer_urls {
            validate_url("TARGET_CHAIN_EXPLORER_URLS", explorer)?;
        }

        if self.token.address == Address::zero() {
            return Err(anyhow!("token contract must not be the zero address"));
        }
        if self.poll_interval.is_zero() {
            return Err(anyhow!("poll interval must be positive"));
        }
        if self.wallet_watch_interval.is_zero() {
            return Err(anyhow!("wallet watch interval must be positive"));
        }
        if !(self.visibility_threshold > 0.0 && self.visibility_threshold <= 1.0) {
            return Err(anyhow!(
                "visibility threshold must be in (0, 1], got {}",
                self.visibility_threshold
            ));
        }
        Ok(())
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn validate_url(field: &str, raw: &str) -> Result<()> {
    let url = Url::parse(raw).with_context(|| format!("{} is not a valid URL: {}", field, raw))?;
    match url.scheme() {
        "http" | "https" | "ws" | "wss" => Ok(()),
        other => Err(anyhow!("{} has unsupported scheme {}", field, other)),
    }
}

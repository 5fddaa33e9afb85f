//! Live market statistics for the token: fetch, pick the most liquid pair,
//! classify it and render it for display.

pub mod dexscreener;
pub mod poller;
pub mod view;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use dexscreener::DexScreenerClient;
pub use poller::{MarketDataPoller, PollState};
pub use view::{MarketStatus, MarketView, PoolLine, Tone};

const HIGH_ACTIVITY_LIQUIDITY_USD: f64 = 50_000.0;
const HIGH_ACTIVITY_TXNS: u64 = 100;
const GROWING_LIQUIDITY_USD: f64 = 5_000.0;

/// Pools listed under the headline figures.
pub const TOP_POOLS: usize = 3;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("market data request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("market data source answered {0}")]
    Status(reqwest::StatusCode),
}

/// One trading pair as reported by the data source. Every field is optional
/// because young pools routinely omit some of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketPair {
    pub price_usd: Option<String>,
    pub liquidity_usd: Option<f64>,
    pub volume_h24: Option<f64>,
    pub fdv: Option<f64>,
    pub price_change_h24: Option<f64>,
    pub buys_h24: Option<u64>,
    pub sells_h24: Option<u64>,
    pub pair_address: Option<String>,
    pub url: Option<String>,
    pub dex_id: Option<String>,
    pub chain_id: Option<String>,
    pub base_symbol: Option<String>,
    pub quote_symbol: Option<String>,
}

impl MarketPair {
    /// Liquidity used for ranking; missing or non-numeric counts as zero.
    pub fn liquidity(&self) -> f64 {
        self.liquidity_usd.filter(|l| l.is_finite()).unwrap_or(0.0)
    }

    pub fn txns_h24(&self) -> u64 {
        self.buys_h24.unwrap_or(0).saturating_add(self.sells_h24.unwrap_or(0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    High,
    Growing,
    Low,
}

impl Activity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Activity::High => "high",
            Activity::Growing => "growing",
            Activity::Low => "low",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Activity::High => "High activity",
            Activity::Growing => "Growing",
            Activity::Low => "Low liquidity",
        }
    }
}

/// Both thresholds are strict.
pub fn classify_activity(pair: &MarketPair) -> Activity {
    let liquidity = pair.liquidity();
    if liquidity > HIGH_ACTIVITY_LIQUIDITY_USD && pair.txns_h24() > HIGH_ACTIVITY_TXNS {
        Activity::High
    } else if liquidity > GROWING_LIQUIDITY_USD {
        Activity::Growing
    } else {
        Activity::Low
    }
}

/// Descending by liquidity. The sort is stable, so equally liquid pairs keep
/// the order the source returned them in.
pub fn rank_pairs(mut pairs: Vec<MarketPair>) -> Vec<MarketPair> {
    pairs.sort_by(|a, b| b.liquidity().total_cmp(&a.liquidity()));
    pairs
}

pub fn select_pair(pairs: Vec<MarketPair>) -> Option<MarketPair> {
    rank_pairs(pairs).into_iter().next()
}

/// Ranked pairs with the headline pair at index 0.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub ranked: Vec<MarketPair>,
    pub activity: Activity,
}

impl MarketSnapshot {
    pub fn from_pairs(pairs: Vec<MarketPair>) -> Option<Self> {
        let ranked = rank_pairs(pairs);
        let activity = classify_activity(ranked.first()?);
        Some(Self { ranked, activity })
    }

    pub fn top(&self) -> &MarketPair {
        &self.ranked[0]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Live(MarketSnapshot),
    /// The token has no pools yet. Informational, not a failure.
    NoLiquidity,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// All pairs trading the token at `contract`.
    async fn fetch_pairs(&self, contract: &str) -> Result<Vec<MarketPair>, MarketError>;
}

/// One request to the source; no retries.
pub async fn poll(source: &dyn MarketDataSource, contract: &str) -> Result<PollOutcome, MarketError> {
    let pairs = source.fetch_pairs(contract).await?;
    Ok(match MarketSnapshot::from_pairs(pairs) {
        Some(snapshot) => PollOutcome::Live(snapshot),
        None => PollOutcome::NoLiquidity,
    })
}

//! DexScreener token-pairs endpoint.
//!
//! Endpoint: `{base}/{contract}` (default base
//! `https://api.dexscreener.com/latest/dex/tokens`), returning
//! `{ "pairs": [ ... ] }` or `{ "pairs": null }` for tokens without pools.
//! No authentication.

use async_trait::async_trait;
use log::debug;
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;

use super::{MarketDataSource, MarketError, MarketPair};

#[derive(Debug, Clone, Deserialize)]
pub struct TokenPairsResponse {
    #[serde(default)]
    pub pairs: Option<Vec<DexScreenerPair>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DexScreenerPair {
    pub chain_id: Option<String>,
    pub dex_id: Option<String>,
    pub url: Option<String>,
    pub pair_address: Option<String>,
    pub base_token: Option<TokenRef>,
    pub quote_token: Option<TokenRef>,
    pub price_usd: Option<String>,
    pub txns: Option<Txns>,
    pub volume: Option<Volume>,
    pub price_change: Option<PriceChange>,
    pub liquidity: Option<Liquidity>,
    pub fdv: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TokenRef {
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Txns {
    pub h24: Option<TxnCounts>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TxnCounts {
    pub buys: Option<u64>,
    pub sells: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Volume {
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PriceChange {
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Liquidity {
    pub usd: Option<f64>,
}

impl From<DexScreenerPair> for MarketPair {
    fn from(pair: DexScreenerPair) -> Self {
        let counts = pair.txns.and_then(|t| t.h24);
        Self {
            price_usd: pair.price_usd,
            liquidity_usd: pair.liquidity.and_then(|l| l.usd),
            volume_h24: pair.volume.and_then(|v| v.h24),
            fdv: pair.fdv,
            price_change_h24: pair.price_change.and_then(|c| c.h24),
            buys_h24: counts.as_ref().and_then(|c| c.buys),
            sells_h24: counts.as_ref().and_then(|c| c.sells),
            pair_address: pair.pair_address,
            url: pair.url,
            dex_id: pair.dex_id,
            chain_id: pair.chain_id,
            base_symbol: pair.base_token.and_then(|t| t.symbol),
            quote_symbol: pair.quote_token.and_then(|t| t.symbol),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DexScreenerClient {
    client: reqwest::Client,
    base_url: String,
}

impl DexScreenerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn endpoint(&self, contract: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), contract)
    }
}

#[async_trait]
impl MarketDataSource for DexScreenerClient {
    async fn fetch_pairs(&self, contract: &str) -> Result<Vec<MarketPair>, MarketError> {
        let url = self.endpoint(contract);
        debug!("Fetching market data from {}", url);

        let response = self
            .client
            .get(&url)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MarketError::Status(response.status()));
        }

        let body: TokenPairsResponse = response.json().await?;
        Ok(body
            .pairs
            .unwrap_or_default()
            .into_iter()
            .map(MarketPair::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "schemaVersion": "1.0.0",
        "pairs": [
            {
                "chainId": "bsc",
                "dexId": "pancakeswap",
                "url": "https://dexscreener.com/bsc/0xpair",
                "pairAddress": "0x1111111111222222222233333333334444444444",
                "labels": ["v2"],
                "baseToken": { "address": "0xd14e", "name": "Burnaverse Protocol", "symbol": "BUV" },
                "quoteToken": { "address": "0xbb4c", "name": "Wrapped BNB", "symbol": "WBNB" },
                "priceNative": "0.0000012",
                "priceUsd": "0.000742",
                "txns": { "m5": { "buys": 1, "sells": 0 }, "h24": { "buys": 120, "sells": 87 } },
                "volume": { "h24": 15234.55, "h6": 1000 },
                "priceChange": { "h24": -3.21 },
                "liquidity": { "usd": 61234.1, "base": 1000, "quote": 12 },
                "fdv": 742000
            },
            {
                "chainId": "bsc",
                "dexId": "biswap",
                "pairAddress": "0x5555"
            }
        ]
    }"#;

    #[test]
    fn test_parse_full_and_sparse_pairs() {
        let body: TokenPairsResponse = serde_json::from_str(SAMPLE).unwrap();
        let pairs: Vec<MarketPair> = body.pairs.unwrap().into_iter().map(MarketPair::from).collect();
        assert_eq!(pairs.len(), 2);

        let full = &pairs[0];
        assert_eq!(full.price_usd.as_deref(), Some("0.000742"));
        assert_eq!(full.liquidity_usd, Some(61234.1));
        assert_eq!(full.volume_h24, Some(15234.55));
        assert_eq!(full.fdv, Some(742000.0));
        assert_eq!(full.price_change_h24, Some(-3.21));
        assert_eq!(full.buys_h24, Some(120));
        assert_eq!(full.sells_h24, Some(87));
        assert_eq!(full.base_symbol.as_deref(), Some("BUV"));
        assert_eq!(full.quote_symbol.as_deref(), Some("WBNB"));
        assert_eq!(full.dex_id.as_deref(), Some("pancakeswap"));

        let sparse = &pairs[1];
        assert_eq!(sparse.liquidity_usd, None);
        assert_eq!(sparse.buys_h24, None);
        assert_eq!(sparse.url, None);
    }

    #[test]
    fn test_null_pairs() {
        let body: TokenPairsResponse =
            serde_json::from_str(r#"{"schemaVersion":"1.0.0","pairs":null}"#).unwrap();
        assert!(body.pairs.is_none());
        let body: TokenPairsResponse = serde_json::from_str("{}").unwrap();
        assert!(body.pairs.is_none());
    }

    #[test]
    fn test_endpoint() {
        let client = DexScreenerClient::new("https://api.dexscreener.com/latest/dex/tokens/");
        assert_eq!(
            client.endpoint("0xd14Ec02A022D2BD4117a0EEba966423253a48ad1"),
            "https://api.dexscreener.com/latest/dex/tokens/0xd14Ec02A022D2BD4117a0EEba966423253a48ad1"
        );
    }

    #[tokio::test]
    #[ignore] // Run only when testing with live API
    async fn test_fetch_live_pairs() {
        let client = DexScreenerClient::new(crate::config::DEFAULT_MARKET_API);
        // WBNB always has pools
        let pairs = client
            .fetch_pairs("0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c")
            .await
            .unwrap();
        assert!(!pairs.is_empty());
    }
}

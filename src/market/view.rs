use itertools::Itertools;
use std::fmt;

use super::{Activity, MarketPair, MarketSnapshot, TOP_POOLS};
use crate::format::{
    abbreviate, format_percent_change, format_usd_magnitude, format_usd_text, PLACEHOLDER,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Good,
    Bad,
}

/// Status line of the live-stats region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketStatus {
    Loading,
    Live(Activity),
    NoLiquidity,
    Unavailable,
}

impl MarketStatus {
    pub fn text(&self) -> String {
        match self {
            MarketStatus::Loading => "Loading live market data…".to_string(),
            MarketStatus::Live(activity) => format!("Live market data • {}", activity.label()),
            MarketStatus::NoLiquidity => {
                "Liquidity not detected yet — live stats will appear after pool + first swap."
                    .to_string()
            }
            MarketStatus::Unavailable => "Live market data unavailable.".to_string(),
        }
    }

    pub fn tone(&self) -> Option<Tone> {
        match self {
            MarketStatus::Loading => None,
            MarketStatus::Live(_) => Some(Tone::Good),
            MarketStatus::NoLiquidity | MarketStatus::Unavailable => Some(Tone::Bad),
        }
    }
}

/// One entry of the "top pools" list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolLine {
    pub dex: String,
    pub symbols: String,
    pub liquidity: String,
    pub url: Option<String>,
}

impl fmt::Display for PoolLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.dex, self.symbols, self.liquidity)
    }
}

/// Display-ready figures for the headline pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketView {
    pub price: String,
    pub liquidity: String,
    pub volume: String,
    pub fdv: String,
    pub change: String,
    pub buys: String,
    pub sells: String,
    pub pair_label: String,
    pub pair_address: String,
    pub link: Option<String>,
    pub pools: Vec<PoolLine>,
}

impl MarketView {
    pub fn from_snapshot(snapshot: &MarketSnapshot) -> Self {
        let top = snapshot.top();
        Self {
            price: format_usd_text(top.price_usd.as_deref()),
            liquidity: format_usd_magnitude(top.liquidity_usd),
            volume: format_usd_magnitude(top.volume_h24),
            fdv: format_usd_magnitude(top.fdv),
            change: format_percent_change(top.price_change_h24),
            buys: count_label("Buys", top.buys_h24),
            sells: count_label("Sells", top.sells_h24),
            pair_label: format!(
                "{} • {} • {}",
                or_default(&top.dex_id, "DEX").to_uppercase(),
                or_default(&top.chain_id, "BSC").to_uppercase(),
                symbols(top)
            ),
            pair_address: match top.pair_address.as_deref().filter(|a| !a.is_empty()) {
                Some(address) => format!("Pair: {}", abbreviate(address, 10, 6)),
                None => format!("Pair: {}", PLACEHOLDER),
            },
            link: top.url.clone().filter(|u| !u.is_empty()),
            pools: snapshot
                .ranked
                .iter()
                .take(TOP_POOLS)
                .map(|pair| PoolLine {
                    dex: or_default(&pair.dex_id, "DEX").to_uppercase(),
                    symbols: symbols(pair),
                    liquidity: format_usd_magnitude(pair.liquidity_usd),
                    url: pair.url.clone().filter(|u| !u.is_empty()),
                })
                .collect(),
        }
    }

    pub fn pools_summary(&self) -> String {
        self.pools.iter().join(" | ")
    }
}

fn or_default<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    value.as_deref().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn symbols(pair: &MarketPair) -> String {
    format!(
        "{}/{}",
        pair.base_symbol.as_deref().unwrap_or(""),
        pair.quote_symbol.as_deref().unwrap_or("")
    )
}

fn count_label(label: &str, count: Option<u64>) -> String {
    match count {
        Some(n) => format!("{}: {}", label, n),
        None => format!("{}: {}", label, PLACEHOLDER),
    }
}

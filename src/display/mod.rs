//! Display collaborators. The wallet session and the market poller push
//! formatted text here and never read it back.

use chrono::{DateTime, Local};
use log::{info, warn};

use crate::market::{MarketStatus, MarketView, Tone};
use crate::wallet::DisplaySnapshot;

pub trait WalletDisplay: Send + Sync {
    fn render_wallet(&self, snapshot: &DisplaySnapshot);

    /// Short transient message (the site's toast).
    fn notify(&self, message: &str);
}

pub trait MarketDisplay: Send + Sync {
    /// Whether the live-stats region still exists. Results of fetches that
    /// resolve after it is gone are dropped.
    fn is_attached(&self) -> bool {
        true
    }

    fn show_status(&self, status: &MarketStatus);

    fn show_market(&self, view: &MarketView);

    fn show_updated(&self, at: DateTime<Local>);
}

/// Renders everything to the log; used by the headless binary.
#[derive(Debug, Clone)]
pub struct LogDisplay {
    native_symbol: String,
    token_symbol: String,
}

impl LogDisplay {
    pub fn new(native_symbol: impl Into<String>, token_symbol: impl Into<String>) -> Self {
        Self {
            native_symbol: native_symbol.into(),
            token_symbol: token_symbol.into(),
        }
    }
}

impl WalletDisplay for LogDisplay {
    fn render_wallet(&self, snapshot: &DisplaySnapshot) {
        info!(
            "[{}] {} | {}: {} | {}: {}",
            snapshot.button_label(),
            snapshot.network_text(),
            self.native_symbol,
            snapshot.native_balance,
            self.token_symbol,
            snapshot.token_balance
        );
    }

    fn notify(&self, message: &str) {
        info!("{}", message);
    }
}

impl MarketDisplay for LogDisplay {
    fn show_status(&self, status: &MarketStatus) {
        match status.tone() {
            Some(Tone::Bad) => warn!("{}", status.text()),
            _ => info!("{}", status.text()),
        }
    }

    fn show_market(&self, view: &MarketView) {
        info!(
            "{} | price {} ({}) | liquidity {} | volume {} | fdv {} | {} {}",
            view.pair_label, view.price, view.change, view.liquidity, view.volume, view.fdv,
            view.buys, view.sells
        );
        info!("{} | pools: {}", view.pair_address, view.pools_summary());
    }

    fn show_updated(&self, at: DateTime<Local>) {
        info!("Updated: {}", at.format("%H:%M"));
    }
}

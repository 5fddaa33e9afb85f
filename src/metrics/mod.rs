use anyhow::{Context, Result};
use log::info;
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{Ipv4Addr, SocketAddr};

// Metrics for monitoring
pub const METRIC_WALLET_CONNECT: &str = "wallet_connect_total";
pub const METRIC_WALLET_REFRESH: &str = "wallet_refresh_total";
pub const METRIC_WALLET_EVENTS: &str = "wallet_events_total";
pub const METRIC_MARKET_POLLS: &str = "market_poll_total";
pub const METRIC_MARKET_POLL_FAILURES: &str = "market_poll_failed_total";
pub const METRIC_MARKET_LIQUIDITY: &str = "market_liquidity_usd";

/// Serves the Prometheus scrape endpoint on `0.0.0.0:{port}`. Must be called
/// from within a tokio runtime.
pub fn install_exporter(port: u16) -> Result<SocketAddr> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("failed to install metrics exporter on {}", addr))?;
    describe_all();
    info!("Serving metrics on http://{}/metrics", addr);
    Ok(addr)
}

fn describe_all() {
    describe_counter!(METRIC_WALLET_CONNECT, "Wallet connect attempts");
    describe_counter!(METRIC_WALLET_REFRESH, "Wallet display refreshes");
    describe_counter!(METRIC_WALLET_EVENTS, "Wallet account and chain notifications");
    describe_counter!(METRIC_MARKET_POLLS, "Market data polls");
    describe_counter!(METRIC_MARKET_POLL_FAILURES, "Market data polls that failed");
    describe_gauge!(METRIC_MARKET_LIQUIDITY, "USD liquidity of the most liquid pair");
}

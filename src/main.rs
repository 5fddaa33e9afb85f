use anyhow::Result;
use log::{error, info, warn};
use std::{env, sync::Arc};

use burnaverse::{
    config::SiteConfig,
    display::LogDisplay,
    market::{DexScreenerClient, MarketDataPoller},
    metrics::install_exporter,
    provider::{HttpWalletProvider, WalletClient},
    site::{add_token_to_wallet, ThemePreference},
    storage::{JsonFileStore, KeyValueStore},
    utils::setup_logger,
    wallet::WalletSession,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    dotenv::dotenv().ok();
    let config = SiteConfig::from_env()?;
    setup_logger(&config.log_level)?;
    config.validate_all()?;

    let args: Vec<String> = env::args().skip(1).collect();
    let wants = |flag: &str| args.iter().any(|a| a == flag);

    if let Some(port) = config.metrics_port {
        install_exporter(port)?;
    }

    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(&config.store_path)?);
    let display = Arc::new(LogDisplay::new(
        config.target_chain.native_currency.symbol.clone(),
        config.token.symbol.clone(),
    ));

    let theme = ThemePreference::new(store.clone());
    if wants("--toggle-theme") {
        theme.toggle()?;
    }
    info!("Theme: {}", theme.current());

    // Setup wallet provider
    let mut watcher = None;
    let wallet = match &config.wallet_rpc_url {
        Some(url) => {
            let provider = Arc::new(HttpWalletProvider::try_new(url)?);
            watcher = Some(provider.spawn_change_watcher(config.wallet_watch_interval));
            Some(WalletClient::new(provider))
        }
        None => {
            warn!("WALLET_RPC_URL not set, running without a wallet");
            None
        }
    };

    let session = Arc::new(WalletSession::new(
        wallet.clone(),
        store.clone(),
        display.clone(),
        config.target_chain.clone(),
        config.token.clone(),
    ));
    session.refresh().await;
    let subscription = session.listen();

    if wants("--connect") {
        if let Err(e) = session.connect().await {
            error!("Connect failed: {}", e);
        }
    }
    if wants("--add-token") {
        add_token_to_wallet(wallet.as_ref(), &config.token, display.as_ref()).await;
    }

    // Live stats are always on screen for the headless binary
    let poller = MarketDataPoller::new(
        Arc::new(DexScreenerClient::new(config.market_api_url.clone())),
        display,
        config.token.contract(),
        config.poll_interval,
        config.visibility_threshold,
    );
    poller.set_visible(true);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    poller.set_visible(false);
    if let Some(subscription) = subscription {
        subscription.cancel();
    }
    if let Some(watcher) = watcher {
        watcher.abort();
    }

    Ok(())
}

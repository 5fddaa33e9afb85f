#![allow(dead_code)]

use async_trait::async_trait;
use burnaverse::{
    display::{MarketDisplay, WalletDisplay},
    market::{MarketDataSource, MarketError, MarketPair, MarketStatus, MarketView},
    provider::{ProviderEvent, WalletError, WalletProvider},
    wallet::DisplaySnapshot,
};
use chrono::{DateTime, Local};
use serde_json::{json, Value};
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};
use tokio::sync::broadcast;

pub const ALICE: &str = "0x1234567890123456789012345678901234567890";
pub const BOB: &str = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd";

/// 1.5 native units.
pub const NATIVE_BALANCE_HEX: &str = "0x14d1120d7b160000";
/// 1234.5678 tokens at 18 decimals.
pub const TOKEN_BALANCE_HEX: &str = "0x42ed11e914577f8000";

pub fn rpc_error(code: i64, message: &str) -> WalletError {
    WalletError::Rpc {
        code,
        message: message.to_string(),
    }
}

/// Lets every spawned task run until it blocks. Relies on the paused clock
/// auto-advancing once the runtime is idle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Wallet that answers from a script and records every request.
pub struct FakeWallet {
    queued: Mutex<HashMap<String, VecDeque<Result<Value, WalletError>>>>,
    standing: Mutex<HashMap<String, Result<Value, WalletError>>>,
    calls: Mutex<Vec<(String, Value)>>,
    events: broadcast::Sender<ProviderEvent>,
}

impl FakeWallet {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            queued: Mutex::new(HashMap::new()),
            standing: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            events,
        }
    }

    /// A wallet on `chain` with no authorized accounts and known balances.
    pub fn on_chain(chain: &str) -> Self {
        let wallet = Self::new();
        wallet.on("eth_chainId", Ok(json!(chain)));
        wallet.on("eth_accounts", Ok(json!([])));
        wallet.on("wallet_requestPermissions", Ok(json!([])));
        wallet.on("eth_getBalance", Ok(json!(NATIVE_BALANCE_HEX)));
        wallet.on("eth_call", Ok(json!(TOKEN_BALANCE_HEX)));
        wallet
    }

    /// Answer for every call to `method` not covered by [`FakeWallet::once`].
    pub fn on(&self, method: &str, result: Result<Value, WalletError>) {
        self.standing.lock().unwrap().insert(method.to_string(), result);
    }

    /// Answer for the next call to `method` only.
    pub fn once(&self, method: &str, result: Result<Value, WalletError>) {
        self.queued
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(result);
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.methods().iter().filter(|m| *m == method).count()
    }

    pub fn position(&self, method: &str) -> Option<usize> {
        self.methods().iter().position(|m| m == method)
    }

    pub fn params(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        self.calls.lock().unwrap().push((method.to_string(), params));
        if let Some(result) = self
            .queued
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(VecDeque::pop_front)
        {
            return result;
        }
        self.standing
            .lock()
            .unwrap()
            .get(method)
            .cloned()
            .unwrap_or_else(|| Err(rpc_error(-32601, "method not found")))
    }

    fn listen(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

/// Display that keeps everything pushed to it.
#[derive(Default)]
pub struct RecordingDisplay {
    pub renders: Mutex<Vec<DisplaySnapshot>>,
    pub notices: Mutex<Vec<String>>,
    pub statuses: Mutex<Vec<MarketStatus>>,
    pub views: Mutex<Vec<MarketView>>,
    pub updates: AtomicUsize,
    detached: AtomicBool,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }

    pub fn render_count(&self) -> usize {
        self.renders.lock().unwrap().len()
    }

    pub fn last_render(&self) -> Option<DisplaySnapshot> {
        self.renders.lock().unwrap().last().cloned()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<MarketStatus> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn view_count(&self) -> usize {
        self.views.lock().unwrap().len()
    }
}

impl WalletDisplay for RecordingDisplay {
    fn render_wallet(&self, snapshot: &DisplaySnapshot) {
        self.renders.lock().unwrap().push(snapshot.clone());
    }

    fn notify(&self, message: &str) {
        self.notices.lock().unwrap().push(message.to_string());
    }
}

impl MarketDisplay for RecordingDisplay {
    fn is_attached(&self) -> bool {
        !self.detached.load(Ordering::SeqCst)
    }

    fn show_status(&self, status: &MarketStatus) {
        self.statuses.lock().unwrap().push(*status);
    }

    fn show_market(&self, view: &MarketView) {
        self.views.lock().unwrap().push(view.clone());
    }

    fn show_updated(&self, _at: DateTime<Local>) {
        self.updates.fetch_add(1, Ordering::SeqCst);
    }
}

type Script = Box<dyn Fn(usize) -> Result<Vec<MarketPair>, MarketError> + Send + Sync>;

/// Market source answering from a closure of the call index, optionally after
/// a delay.
pub struct ScriptedSource {
    script: Script,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(
        script: impl Fn(usize) -> Result<Vec<MarketPair>, MarketError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataSource for ScriptedSource {
    async fn fetch_pairs(&self, _contract: &str) -> Result<Vec<MarketPair>, MarketError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.script)(call)
    }
}

pub fn liquid_pair() -> MarketPair {
    MarketPair {
        price_usd: Some("0.000742".into()),
        liquidity_usd: Some(61_234.1),
        buys_h24: Some(120),
        sells_h24: Some(87),
        dex_id: Some("pancakeswap".into()),
        base_symbol: Some("BUV".into()),
        quote_symbol: Some("WBNB".into()),
        ..Default::default()
    }
}

pub mod chain;       // Target network descriptor and switch/add guard
pub mod config;
pub mod display;
pub mod format;
pub mod market;      // Live market data and the visibility-driven poller
pub mod metrics;
pub mod provider;    // Injected wallet (EIP-1193) abstraction
pub mod site;
pub mod storage;
pub mod utils;
pub mod wallet;

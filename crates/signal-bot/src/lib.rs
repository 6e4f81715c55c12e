//! Technical-analysis trading signals for BTC, ETH and SOL spot pairs.
//!
//! Market data flows from a [`core::data_service::MarketDataSource`] through
//! the pure indicator, support/resistance and order-book modules into one
//! strategy per asset, which produces a sized [`types::Signal`].

pub mod config;
pub mod constants;
pub mod core;
pub mod errors;
pub mod logging;
pub mod types;

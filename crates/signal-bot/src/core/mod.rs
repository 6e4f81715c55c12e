pub mod data_service;
pub mod fallback;
pub mod indicators;
pub mod orderbook;
pub mod position_sizing;
pub mod signal_engine;
pub mod sr_levels;
pub mod strategies;

//! Signal engine: routes a symbol to its strategy and feeds it fresh market
//! data.
//!
//! Each request fetches candles and the order book concurrently, then runs the
//! strategy's pure evaluation. Assets are independent: one asset's data
//! failure never affects another's signal. No state is kept between requests.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::StrategiesConfig;
use crate::errors::{SignalError, SignalResult};
use crate::types::{OrderBookSnapshot, Signal, Timeframe};

use super::data_service::MarketDataSource;
use super::strategies::{build_strategies, SignalStrategy};

// ═══════════════════════════════════════════════════════════════════════════
// SignalEngine
// ═══════════════════════════════════════════════════════════════════════════

pub struct SignalEngine {
    source: Arc<dyn MarketDataSource>,
    /// Keyed by symbol; ordered so batch results are deterministic.
    strategies: BTreeMap<String, Box<dyn SignalStrategy>>,
}

impl SignalEngine {
    /// Create an engine over `strategies`. A later strategy for an already
    /// registered symbol replaces the earlier one.
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        strategies: Vec<Box<dyn SignalStrategy>>,
    ) -> Self {
        let mut by_symbol = BTreeMap::new();
        for strategy in strategies {
            let symbol = strategy.symbol().to_string();
            if by_symbol.insert(symbol.clone(), strategy).is_some() {
                warn!(%symbol, "duplicate strategy for symbol; keeping the last one");
            }
        }
        Self {
            source,
            strategies: by_symbol,
        }
    }

    /// Engine with every strategy enabled in `config`.
    pub fn from_config(source: Arc<dyn MarketDataSource>, config: &StrategiesConfig) -> Self {
        Self::new(source, build_strategies(config))
    }

    /// Registered symbols, sorted.
    pub fn symbols(&self) -> impl Iterator<Item = &str> + '_ {
        self.strategies.keys().map(String::as_str)
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    /// Compute a fresh signal for `symbol` on `timeframe` (the strategy's
    /// default when `None`).
    ///
    /// Candle failures and short history surface as
    /// [`SignalError::DataUnavailable`] / [`SignalError::InsufficientData`];
    /// an order-book failure only degrades the book analysis to neutral.
    pub async fn get_signal(
        &self,
        symbol: &str,
        timeframe: Option<Timeframe>,
    ) -> SignalResult<Signal> {
        let strategy = self
            .strategies
            .get(symbol)
            .ok_or_else(|| SignalError::UnknownSymbol(symbol.to_string()))?;
        let timeframe = timeframe.unwrap_or_else(|| strategy.default_timeframe());

        let (candles_res, book_res) = tokio::join!(
            self.source
                .fetch_candles(symbol, timeframe, strategy.candle_count()),
            self.source.fetch_orderbook(symbol),
        );

        let candles = candles_res.map_err(|e| match e {
            e if e.is_unavailable() => e,
            other => SignalError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: other.to_string(),
            },
        })?;
        let book = book_res.unwrap_or_else(|e| {
            warn!(%symbol, error = %e, "order book unavailable; continuing with empty book");
            OrderBookSnapshot::empty()
        });

        debug!(
            %symbol,
            %timeframe,
            candles = candles.len(),
            bids = book.bids.len(),
            asks = book.asks.len(),
            "market data fetched"
        );
        strategy.evaluate(&candles, &book, timeframe)
    }

    /// Signals for every registered symbol, evaluated concurrently. Results
    /// are in symbol order and independent of each other.
    pub async fn get_all_signals(
        &self,
        timeframe: Option<Timeframe>,
    ) -> Vec<(String, SignalResult<Signal>)> {
        let requests = self.strategies.keys().map(|symbol| async move {
            (symbol.clone(), self.get_signal(symbol, timeframe).await)
        });
        join_all(requests).await
    }

    // -----------------------------------------------------------------------
    // Publishing
    // -----------------------------------------------------------------------

    /// Evaluate every asset once and send the available signals to `tx`.
    /// Returns the number of signals sent.
    pub async fn publish_all(
        &self,
        timeframe: Option<Timeframe>,
        tx: &mpsc::Sender<Signal>,
    ) -> usize {
        let mut sent = 0;
        for (symbol, result) in self.get_all_signals(timeframe).await {
            match result {
                Ok(signal) => {
                    info!(
                        %symbol,
                        side = %signal.side,
                        entry = %signal.entry,
                        confidence = %signal.confidence,
                        "signal computed"
                    );
                    if let Err(e) = tx.send(signal).await {
                        error!("failed to send signal: {e}");
                        break;
                    }
                    sent += 1;
                }
                Err(e) if e.is_unavailable() => {
                    warn!(%symbol, error = %e, "no signal available");
                }
                Err(e) => {
                    error!(%symbol, error = %e, "signal evaluation failed");
                }
            }
        }
        sent
    }

    /// Publish every `interval` until `shutdown` fires. The first pass runs
    /// immediately.
    pub async fn run(
        &self,
        interval: Duration,
        timeframe: Option<Timeframe>,
        tx: mpsc::Sender<Signal>,
        shutdown: CancellationToken,
    ) {
        info!(
            interval_s = interval.as_secs(),
            assets = self.strategies.len(),
            "signal engine started"
        );

        loop {
            let sent = self.publish_all(timeframe, &tx).await;
            debug!(sent, "evaluation pass complete");

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("signal engine shutting down");
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    use crate::core::strategies::fixtures::{book_around, trending_candles};
    use crate::types::{Candle, Side};

    /// In-memory source keyed by symbol. Missing symbols fail.
    #[derive(Default)]
    struct StaticSource {
        candles: HashMap<String, Vec<Candle>>,
        books: HashMap<String, OrderBookSnapshot>,
    }

    impl StaticSource {
        fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
            self.candles.insert(symbol.to_string(), candles);
            self
        }

        fn with_book(mut self, symbol: &str, book: OrderBookSnapshot) -> Self {
            self.books.insert(symbol.to_string(), book);
            self
        }
    }

    #[async_trait]
    impl MarketDataSource for StaticSource {
        async fn fetch_candles(
            &self,
            symbol: &str,
            _timeframe: Timeframe,
            count: usize,
        ) -> SignalResult<Vec<Candle>> {
            let all = self
                .candles
                .get(symbol)
                .ok_or_else(|| SignalError::Api {
                    code: "400100".into(),
                    message: format!("no candles for {symbol}"),
                })?;
            Ok(all[all.len().saturating_sub(count)..].to_vec())
        }

        async fn fetch_orderbook(&self, symbol: &str) -> SignalResult<OrderBookSnapshot> {
            self.books.get(symbol).cloned().ok_or_else(|| SignalError::Malformed {
                reason: "no book".into(),
            })
        }
    }

    fn engine(source: StaticSource) -> SignalEngine {
        SignalEngine::from_config(Arc::new(source), &StrategiesConfig::default())
    }

    #[test]
    fn test_registered_symbols() {
        let e = engine(StaticSource::default());
        let symbols: Vec<&str> = e.symbols().collect();
        assert_eq!(symbols, vec!["BTC-USDT", "ETH-USDT", "SOL-USDT"]);
    }

    #[tokio::test]
    async fn test_empty_candles_unavailable() {
        let e = engine(StaticSource::default().with_candles("BTC-USDT", vec![]));
        let err = e.get_signal("BTC-USDT", None).await.unwrap_err();
        assert!(matches!(err, SignalError::DataUnavailable { .. }));
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_unavailable() {
        let e = engine(StaticSource::default());
        let err = e.get_signal("ETH-USDT", None).await.unwrap_err();
        match err {
            SignalError::DataUnavailable { symbol, reason } => {
                assert_eq!(symbol, "ETH-USDT");
                assert!(reason.contains("400100"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_symbol() {
        let e = engine(StaticSource::default());
        let err = e.get_signal("DOGE-USDT", None).await.unwrap_err();
        assert!(matches!(err, SignalError::UnknownSymbol(s) if s == "DOGE-USDT"));
    }

    #[tokio::test]
    async fn test_missing_book_degrades_to_neutral() {
        let source = StaticSource::default()
            .with_candles("BTC-USDT", trending_candles(250, 100.0, 1.0, 0.75));
        let signal = engine(source).get_signal("BTC-USDT", None).await.unwrap();
        assert_eq!(signal.side, Side::Long);
        assert_eq!(signal.timeframe, Timeframe::M5);
        assert_eq!(signal.orderbook_bias, crate::types::BookBias::Neutral);
        assert_eq!(signal.book.bid_wall, None);
    }

    #[tokio::test]
    async fn test_explicit_timeframe_is_reported() {
        let source = StaticSource::default()
            .with_candles("SOL-USDT", trending_candles(60, 150.0, 0.0, 0.25))
            .with_book("SOL-USDT", book_around(150.0, 2.0, 1.0));
        let signal = engine(source)
            .get_signal("SOL-USDT", Some(Timeframe::M5))
            .await
            .unwrap();
        assert_eq!(signal.timeframe, Timeframe::M5);
        assert_eq!(signal.side, Side::Hold);
    }

    #[tokio::test]
    async fn test_get_all_signals_independent() {
        let source = StaticSource::default()
            .with_candles("BTC-USDT", trending_candles(250, 100.0, 1.0, 0.75))
            .with_candles("SOL-USDT", trending_candles(10, 150.0, 0.0, 0.25));
        let results = engine(source).get_all_signals(None).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, "BTC-USDT");
        assert!(results[0].1.is_ok());
        assert!(matches!(
            results[1].1,
            Err(SignalError::DataUnavailable { .. })
        ));
        assert!(matches!(
            results[2].1,
            Err(SignalError::InsufficientData { .. })
        ));
    }

    #[tokio::test]
    async fn test_publish_all_sends_available_signals() {
        let source = StaticSource::default()
            .with_candles("BTC-USDT", trending_candles(250, 100.0, 1.0, 0.75))
            .with_candles("ETH-USDT", trending_candles(60, 2000.0, 0.0, 1.0));
        let (tx, mut rx) = mpsc::channel(8);
        let sent = engine(source).publish_all(None, &tx).await;
        drop(tx);

        assert_eq!(sent, 2);
        let mut symbols = Vec::new();
        while let Some(signal) = rx.recv().await {
            symbols.push(signal.symbol);
        }
        assert_eq!(symbols, vec!["BTC-USDT", "ETH-USDT"]);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let source = StaticSource::default()
            .with_candles("ETH-USDT", trending_candles(60, 2000.0, 0.0, 1.0));
        let e = engine(source);
        let (tx, mut rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        e.run(Duration::from_secs(3600), None, tx, shutdown).await;
        // One pass always runs before the cancellation is observed.
        assert_eq!(rx.recv().await.map(|s| s.symbol), Some("ETH-USDT".to_string()));
        assert!(rx.recv().await.is_none());
    }
}

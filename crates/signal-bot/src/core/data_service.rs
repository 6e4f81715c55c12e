//! Market data retrieval.
//!
//! [`MarketDataSource`] is the seam between the signal engine and wherever
//! candles and order books come from. [`KucoinDataService`] implements it over
//! KuCoin's public REST market-data endpoints; no authentication, no caching:
//! every call hits the exchange and returns a fresh snapshot.
//!
//! Endpoints:
//!   - `/api/v1/market/candles`: `[[time, open, close, high, low, volume, turnover], …]`,
//!     newest first, numbers as strings
//!   - `/api/v1/market/orderbook/level2_20`: `{ sequence, bids: [[price, size]], asks: … }`

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::DataSourceConfig;
use crate::constants::{
    KUCOIN_CANDLES_PATH, KUCOIN_MAX_CANDLES, KUCOIN_ORDERBOOK_PATH, KUCOIN_SUCCESS_CODE,
};
use crate::errors::{SignalError, SignalResult};
use crate::types::{Candle, OrderBookSnapshot, Timeframe};

use super::fallback::{safe_parse, safe_value};

// ═══════════════════════════════════════════════════════════════════════════
// Source trait
// ═══════════════════════════════════════════════════════════════════════════

/// Supplier of candle series and order-book snapshots.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Up to `count` candles for `symbol`, oldest first. May return fewer
    /// when history is short.
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> SignalResult<Vec<Candle>>;

    /// Current top-of-book snapshot for `symbol`.
    async fn fetch_orderbook(&self, symbol: &str) -> SignalResult<OrderBookSnapshot>;
}

// ═══════════════════════════════════════════════════════════════════════════
// KuCoin
// ═══════════════════════════════════════════════════════════════════════════

/// KuCoin public market data over HTTPS.
pub struct KucoinDataService {
    client: reqwest::Client,
    base_url: String,
}

impl KucoinDataService {
    pub fn new(config: &DataSourceConfig) -> SignalResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(concat!("signal-bot/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Private: HTTP helper
    // -----------------------------------------------------------------------

    /// GET a KuCoin endpoint and return its `data` payload.
    async fn kucoin_get(&self, path: &str, params: &[(&str, String)]) -> SignalResult<Value> {
        let url = format!("{}{path}", self.base_url);
        let resp = self.client.get(&url).query(params).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, url = %url, body = %body, "KuCoin HTTP error");
            return Err(SignalError::Api {
                code: status.as_u16().to_string(),
                message: body,
            });
        }

        let body: Value = resp.json().await?;
        unwrap_envelope(body)
    }

    fn now_unix() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }
}

#[async_trait]
impl MarketDataSource for KucoinDataService {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> SignalResult<Vec<Candle>> {
        let count = count.min(KUCOIN_MAX_CANDLES);
        let end_at = Self::now_unix();
        let start_at = end_at - (count as i64) * timeframe.duration_secs() as i64;

        let start = Instant::now();
        let data = self
            .kucoin_get(
                KUCOIN_CANDLES_PATH,
                &[
                    ("symbol", symbol.to_string()),
                    ("type", timeframe.as_kucoin_interval().to_string()),
                    ("startAt", start_at.to_string()),
                    ("endAt", end_at.to_string()),
                ],
            )
            .await?;
        let candles = parse_candles(&data, count)?;

        debug!(
            symbol,
            timeframe = %timeframe,
            candles = candles.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            latest_close = candles.last().map(|c| c.close).unwrap_or_default(),
            "candles fetched"
        );
        Ok(candles)
    }

    async fn fetch_orderbook(&self, symbol: &str) -> SignalResult<OrderBookSnapshot> {
        let start = Instant::now();
        let data = self
            .kucoin_get(KUCOIN_ORDERBOOK_PATH, &[("symbol", symbol.to_string())])
            .await?;
        let book = parse_orderbook(&data);

        debug!(
            symbol,
            bid_levels = book.bids.len(),
            ask_levels = book.asks.len(),
            sequence = book.sequence_id,
            latency_ms = start.elapsed().as_millis() as u64,
            "order book fetched"
        );
        Ok(book)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Free helpers
// ═══════════════════════════════════════════════════════════════════════════

/// Check the `{ code, msg, data }` envelope and return `data`.
fn unwrap_envelope(mut body: Value) -> SignalResult<Value> {
    let code = match body.get("code") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    if code != KUCOIN_SUCCESS_CODE {
        let message = body
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(SignalError::Api { code, message });
    }
    match body.get_mut("data").map(Value::take) {
        Some(Value::Null) | None => Err(SignalError::Malformed {
            reason: "response has no data".into(),
        }),
        Some(data) => Ok(data),
    }
}

/// Parse a number that may be encoded as a JSON string. Unparseable or
/// undefined values are `None`.
fn parse_f64(v: &Value) -> Option<f64> {
    let parsed = match v {
        Value::String(s) => safe_parse(s, f64::NAN),
        other => safe_value(other.as_f64()?, f64::NAN),
    };
    parsed.is_finite().then_some(parsed)
}

/// One `[time, open, close, high, low, volume, turnover]` row.
fn parse_candle_row(row: &Value) -> Option<Candle> {
    let items = row.as_array()?;
    if items.len() < 6 {
        return None;
    }
    let timestamp = match &items[0] {
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        other => other.as_i64()?,
    };
    Some(Candle {
        timestamp,
        open: parse_f64(&items[1])?,
        close: parse_f64(&items[2])?,
        high: parse_f64(&items[3])?,
        low: parse_f64(&items[4])?,
        volume: parse_f64(&items[5])?,
    })
}

/// Parse the candle array, drop malformed rows, order oldest first and keep
/// the newest `count`.
fn parse_candles(data: &Value, count: usize) -> SignalResult<Vec<Candle>> {
    let rows = data.as_array().ok_or_else(|| SignalError::Malformed {
        reason: "candles payload is not an array".into(),
    })?;

    let mut candles: Vec<Candle> = rows.iter().filter_map(parse_candle_row).collect();
    let skipped = rows.len() - candles.len();
    if skipped > 0 {
        warn!(skipped, "dropped malformed candle rows");
    }

    candles.sort_by_key(|c| c.timestamp);
    candles.dedup_by_key(|c| c.timestamp);
    if candles.len() > count {
        candles.drain(..candles.len() - count);
    }
    Ok(candles)
}

/// Parse `[[price, size], …]`, skipping malformed levels.
fn parse_price_size_array(v: Option<&Value>) -> Vec<(f64, f64)> {
    let Some(arr) = v.and_then(Value::as_array) else {
        return Vec::new();
    };
    arr.iter()
        .filter_map(|entry| {
            let pair = entry.as_array()?;
            if pair.len() < 2 {
                return None;
            }
            Some((parse_f64(&pair[0])?, parse_f64(&pair[1])?))
        })
        .collect()
}

/// Parse a level-2 payload; bids end up descending and asks ascending.
fn parse_orderbook(data: &Value) -> OrderBookSnapshot {
    let mut bids = parse_price_size_array(data.get("bids"));
    let mut asks = parse_price_size_array(data.get("asks"));
    bids.sort_by(|a, b| b.0.total_cmp(&a.0));
    asks.sort_by(|a, b| a.0.total_cmp(&b.0));

    let sequence_id = match data.get("sequence") {
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        Some(v) => v.as_u64().unwrap_or(0),
        None => 0,
    };

    OrderBookSnapshot {
        bids,
        asks,
        sequence_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_f64_string_and_number() {
        assert_eq!(parse_f64(&json!("123.5")), Some(123.5));
        assert_eq!(parse_f64(&json!(42)), Some(42.0));
        assert_eq!(parse_f64(&json!("nan")), None);
        assert_eq!(parse_f64(&json!(null)), None);
        assert_eq!(parse_f64(&json!(" 7.5 ")), Some(7.5));
        assert_eq!(parse_f64(&json!("inf")), None);
        assert_eq!(parse_f64(&json!("abc")), None);
        assert_eq!(parse_f64(&json!([1])), None);
    }

    #[test]
    fn test_parse_candle_row_column_order() {
        let row = json!(["1700000000", "100", "102", "105", "99", "12.5", "1275"]);
        let c = parse_candle_row(&row).unwrap();
        assert_eq!(c.timestamp, 1_700_000_000);
        assert_eq!(c.open, 100.0);
        assert_eq!(c.close, 102.0);
        assert_eq!(c.high, 105.0);
        assert_eq!(c.low, 99.0);
        assert_eq!(c.volume, 12.5);
    }

    #[test]
    fn test_parse_candles_sorts_and_trims() {
        let data = json!([
            ["300", "3", "3", "3", "3", "1", "3"],
            ["200", "2", "2", "2", "2", "1", "2"],
            ["bad"],
            ["100", "1", "1", "1", "1", "1", "1"]
        ]);
        let candles = parse_candles(&data, 2).unwrap();
        let ts: Vec<i64> = candles.iter().map(|c| c.timestamp).collect();
        assert_eq!(ts, vec![200, 300]);
    }

    #[test]
    fn test_parse_candles_not_array() {
        let err = parse_candles(&json!({"x": 1}), 10).unwrap_err();
        assert!(matches!(err, SignalError::Malformed { .. }));
    }

    #[test]
    fn test_parse_orderbook() {
        let data = json!({
            "sequence": "3262786978",
            "time": 1700000000000i64,
            "bids": [["99.5", "2"], ["100", "1"], ["oops", "1"]],
            "asks": [["101.5", "1"], ["101", "3"]]
        });
        let book = parse_orderbook(&data);
        assert_eq!(book.sequence_id, 3_262_786_978);
        assert_eq!(book.bids, vec![(100.0, 1.0), (99.5, 2.0)]);
        assert_eq!(book.asks, vec![(101.0, 3.0), (101.5, 1.0)]);
    }

    #[test]
    fn test_parse_orderbook_missing_sides() {
        let book = parse_orderbook(&json!({}));
        assert!(book.is_empty());
        assert_eq!(book.sequence_id, 0);
    }

    #[test]
    fn test_unwrap_envelope() {
        let ok = unwrap_envelope(json!({"code": "200000", "data": [1, 2]})).unwrap();
        assert_eq!(ok, json!([1, 2]));

        let err = unwrap_envelope(json!({"code": "400100", "msg": "bad symbol"})).unwrap_err();
        match err {
            SignalError::Api { code, message } => {
                assert_eq!(code, "400100");
                assert_eq!(message, "bad symbol");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = unwrap_envelope(json!({"code": "200000", "data": null})).unwrap_err();
        assert!(matches!(err, SignalError::Malformed { .. }));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let svc = KucoinDataService::new(&DataSourceConfig {
            base_url: "https://api.kucoin.com/".into(),
            request_timeout_ms: 1000,
        })
        .unwrap();
        assert_eq!(svc.base_url(), "https://api.kucoin.com");
    }
}

pub mod book;
pub mod levels;
pub mod market_data;
pub mod position;
pub mod signal;
pub mod timeframe;

pub use book::{BookBias, BookWalls, OrderBookMetrics, Wall};
pub use levels::{NearestLevels, PivotLevels, VwapBands, WeeklyLevels};
pub use market_data::{Candle, CandleColumns, OrderBookSnapshot};
pub use position::PositionSize;
pub use signal::{BandPosition, BookSummary, Diagnostics, ObvTrend, Side, Signal, SrSummary};
pub use timeframe::Timeframe;

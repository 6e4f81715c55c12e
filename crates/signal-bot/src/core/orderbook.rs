//! Order-book analysis: depth imbalance, walls and distance-weighted
//! pressure over the top of a level-2 snapshot.

use crate::types::{BookBias, BookWalls, OrderBookMetrics, OrderBookSnapshot, Wall};

use super::fallback::{fallback, Computed, FallbackReason, Settle};

/// Levels summed per side for depth / imbalance.
pub const DEPTH_LEVELS: usize = 10;
/// Levels scanned per side for walls.
pub const WALL_SCAN_LEVELS: usize = 20;
pub const MAX_WALLS_PER_SIDE: usize = 3;
/// `|imbalance|` above which the book is called directional.
pub const BIAS_THRESHOLD: f64 = 0.2;

/// Everything the strategies read from one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct BookAnalysis {
    pub metrics: OrderBookMetrics,
    pub walls: BookWalls,
    pub pressure: f64,
}

/// Run every analysis over `book`, settling fallbacks.
pub fn analyze(
    book: &OrderBookSnapshot,
    wall_multiplier: f64,
    pressure_levels: usize,
) -> BookAnalysis {
    BookAnalysis {
        metrics: analyze_depth(book).settle("orderbook.depth"),
        walls: detect_walls(book, wall_multiplier).settle("orderbook.walls"),
        pressure: calculate_book_pressure(book, pressure_levels).settle("orderbook.pressure"),
    }
}

fn level_ok(&(price, size): &(f64, f64)) -> bool {
    price.is_finite() && size.is_finite() && price >= 0.0 && size >= 0.0
}

fn side_ok(levels: &[(f64, f64)]) -> bool {
    levels.iter().all(level_ok)
}

/// Depth, imbalance, spread and bias over the top [`DEPTH_LEVELS`] levels.
///
/// An empty side yields all-zero metrics with a Neutral bias. A level with a
/// non-finite or negative value, or a crossed top of book (best bid above best
/// ask), yields all-zero metrics with an Error bias. A locked book reads a
/// zero spread.
pub fn analyze_depth(book: &OrderBookSnapshot) -> Computed<OrderBookMetrics> {
    if book.is_empty() {
        return fallback(OrderBookMetrics::zeroed(BookBias::Neutral), FallbackReason::EmptyBook);
    }
    let bids = &book.bids[..book.bids.len().min(DEPTH_LEVELS)];
    let asks = &book.asks[..book.asks.len().min(DEPTH_LEVELS)];
    if !side_ok(bids) || !side_ok(asks) {
        return fallback(OrderBookMetrics::zeroed(BookBias::Error), FallbackReason::MalformedBook);
    }

    let best_bid = bids[0].0;
    let best_ask = asks[0].0;
    if best_bid > best_ask {
        return fallback(OrderBookMetrics::zeroed(BookBias::Error), FallbackReason::MalformedBook);
    }

    let bid_depth: f64 = bids.iter().map(|&(_, size)| size).sum();
    let ask_depth: f64 = asks.iter().map(|&(_, size)| size).sum();
    let total = bid_depth + ask_depth;
    let imbalance = if total > 0.0 {
        (bid_depth - ask_depth) / total
    } else {
        0.0
    };

    let (spread, midprice) = if best_bid > 0.0 && best_ask > 0.0 {
        (best_ask - best_bid, (best_bid + best_ask) / 2.0)
    } else {
        (0.0, 0.0)
    };

    let bias = if imbalance > BIAS_THRESHOLD {
        BookBias::Bullish
    } else if imbalance < -BIAS_THRESHOLD {
        BookBias::Bearish
    } else {
        BookBias::Neutral
    };

    Ok(OrderBookMetrics {
        bid_depth,
        ask_depth,
        imbalance,
        spread,
        midprice,
        bias,
        best_bid,
        best_ask,
    })
}

/// Levels whose size exceeds `threshold_multiplier` times the mean level size
/// of their side (top [`WALL_SCAN_LEVELS`]). Up to [`MAX_WALLS_PER_SIDE`] per
/// side, largest first. Both lists are empty when either side is empty.
pub fn detect_walls(book: &OrderBookSnapshot, threshold_multiplier: f64) -> Computed<BookWalls> {
    if book.is_empty() {
        return fallback(BookWalls::default(), FallbackReason::EmptyBook);
    }
    let bids = &book.bids[..book.bids.len().min(WALL_SCAN_LEVELS)];
    let asks = &book.asks[..book.asks.len().min(WALL_SCAN_LEVELS)];
    if !side_ok(bids) || !side_ok(asks) {
        return fallback(BookWalls::default(), FallbackReason::MalformedBook);
    }

    Ok(BookWalls {
        bid_walls: side_walls(bids, threshold_multiplier),
        ask_walls: side_walls(asks, threshold_multiplier),
    })
}

fn side_walls(levels: &[(f64, f64)], threshold_multiplier: f64) -> Vec<Wall> {
    let mean = levels.iter().map(|&(_, size)| size).sum::<f64>() / levels.len() as f64;
    if mean <= 0.0 {
        return Vec::new();
    }
    let mut walls: Vec<Wall> = levels
        .iter()
        .filter(|&&(_, size)| size > mean * threshold_multiplier)
        .map(|&(price, size)| Wall {
            price,
            size,
            ratio: size / mean,
        })
        .collect();
    walls.sort_by(|a, b| b.size.total_cmp(&a.size));
    walls.truncate(MAX_WALLS_PER_SIDE);
    walls
}

/// Distance-weighted imbalance over the top `depth_levels` levels.
///
/// Each level's size is weighted by `1 / (1 + |price - mid|)`. Returns
/// `(Σbid - Σask) / (Σbid + Σask)`, or 0 when the book is empty, has a
/// non-positive best price, or carries no weight.
pub fn calculate_book_pressure(book: &OrderBookSnapshot, depth_levels: usize) -> Computed<f64> {
    if book.is_empty() || depth_levels == 0 {
        return fallback(0.0, FallbackReason::EmptyBook);
    }
    let bids = &book.bids[..book.bids.len().min(depth_levels)];
    let asks = &book.asks[..book.asks.len().min(depth_levels)];
    if !side_ok(bids) || !side_ok(asks) {
        return fallback(0.0, FallbackReason::MalformedBook);
    }

    let best_bid = bids[0].0;
    let best_ask = asks[0].0;
    if best_bid <= 0.0 || best_ask <= 0.0 {
        return fallback(0.0, FallbackReason::MalformedBook);
    }
    let mid = (best_bid + best_ask) / 2.0;

    let weighted = |levels: &[(f64, f64)]| -> f64 {
        levels
            .iter()
            .map(|&(price, size)| size / (1.0 + (price - mid).abs()))
            .sum()
    };
    let wb = weighted(bids);
    let wa = weighted(asks);
    let total = wb + wa;
    if total > 0.0 {
        Ok((wb - wa) / total)
    } else {
        Ok(0.0)
    }
}

use thiserror::Error;

/// Typed error hierarchy for the signal engine.
///
/// Numeric degeneracies never surface here (they resolve to documented
/// fallback values); only data-availability and setup problems do. The binary
/// wraps these with `anyhow::Context` for propagation.
#[derive(Error, Debug)]
pub enum SignalError {
    // -- Data ---------------------------------------------------------------
    #[error("market data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("insufficient candles for {symbol}: need {needed}, got {got}")]
    InsufficientData {
        symbol: String,
        needed: usize,
        got: usize,
    },

    #[error("exchange API error: code {code}: {message}")]
    Api { code: String, message: String },

    #[error("malformed market data: {reason}")]
    Malformed { reason: String },

    // -- Routing ------------------------------------------------------------
    #[error("no strategy registered for symbol {0}")]
    UnknownSymbol(String),

    // -- Forwarded errors ---------------------------------------------------
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl SignalError {
    /// `true` for the "no signal available" outcomes, as opposed to setup or
    /// transport failures.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::DataUnavailable { .. } | Self::InsufficientData { .. }
        )
    }
}

pub type SignalResult<T> = Result<T, SignalError>;

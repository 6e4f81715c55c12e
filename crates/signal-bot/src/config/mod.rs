pub mod types;
pub mod validate;

pub use types::*;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Load both config JSON files into a single [`SignalBotConfig`], then apply
/// environment variable overrides and validate.
///
/// Expected directory layout:
/// ```text
/// config/
///   app.json
///   strategies.json
/// ```
///
/// Every field is defaulted, so `{}` is a valid file.
///
/// # Environment variable overrides
///
/// | Env Var                    | Config Field                            |
/// |----------------------------|-----------------------------------------|
/// | `ACCOUNT_BALANCE`          | `strategies.sizing.account_balance`     |
/// | `RISK_PCT`                 | `strategies.sizing.risk_pct`            |
/// | `MAX_NOTIONAL_PCT`         | `strategies.sizing.max_notional_pct`    |
/// | `KUCOIN_BASE_URL`          | `app.data_source.base_url`              |
/// | `REFRESH_INTERVAL_SECONDS` | `app.run.refresh_interval_seconds`      |
pub fn load_config(config_dir: &Path) -> Result<SignalBotConfig> {
    let read = |name: &str| -> Result<String> {
        let path = config_dir.join(name);
        std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))
    };

    let app: AppConfig = serde_json::from_str(&read("app.json")?).context("parsing app.json")?;

    let strategies: StrategiesConfig =
        serde_json::from_str(&read("strategies.json")?).context("parsing strategies.json")?;

    let mut config = SignalBotConfig { app, strategies };

    apply_env_overrides(&mut config);
    validate::validate_config(&config)?;

    Ok(config)
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides to the loaded config.
///
/// Only non-empty env vars take effect. Parse failures are skipped (the JSON
/// value remains).
fn apply_env_overrides(config: &mut SignalBotConfig) {
    // -- Sizing --------------------------------------------------------------
    if let Some(val) = env_decimal("ACCOUNT_BALANCE") {
        info!(%val, "env override: ACCOUNT_BALANCE");
        config.strategies.sizing.account_balance = val;
    }

    if let Some(val) = env_decimal("RISK_PCT") {
        info!(%val, "env override: RISK_PCT");
        config.strategies.sizing.risk_pct = val;
    }

    if let Some(val) = env_decimal("MAX_NOTIONAL_PCT") {
        info!(%val, "env override: MAX_NOTIONAL_PCT");
        config.strategies.sizing.max_notional_pct = val;
    }

    // -- Data source ---------------------------------------------------------
    if let Some(val) = env_string("KUCOIN_BASE_URL") {
        info!("env override: KUCOIN_BASE_URL");
        config.app.data_source.base_url = val;
    }

    // -- Run loop ------------------------------------------------------------
    if let Some(val) = env_parse::<u64>("REFRESH_INTERVAL_SECONDS") {
        info!(val, "env override: REFRESH_INTERVAL_SECONDS");
        config.app.run.refresh_interval_seconds = val;
    }
}

/// Read a non-empty env var as a `String`.
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Read a non-empty env var and parse it as `T`.
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}

/// Read a non-empty env var and parse it as `Decimal`.
fn env_decimal(key: &str) -> Option<Decimal> {
    env_string(key).and_then(|v| Decimal::from_str(&v).ok())
}

use async_trait::async_trait;

use crate::{Candle, ConditionRecord, Result};

/// Source of the tradable symbol universe and historical candles.
///
/// `BinanceFuturesClient` in `crates/engine` implements this against the
/// USDⓈ-M futures REST API. A short or empty candle table is not an error;
/// the evaluator reports it as insufficient data.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// All symbols a wildcard condition expands to, in a stable order.
    async fn symbol_universe(&self) -> Result<Vec<String>>;

    /// Up to `limit` candles for `symbol` on `timeframe`, oldest first.
    async fn candles(&self, symbol: &str, timeframe: &str, limit: usize) -> Result<CandleTable>;
}

/// Delivers one finished alert message to the outside world.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;
}

/// Supplies the operator's current condition list. Read fresh every cycle.
#[async_trait]
pub trait ConditionSource: Send + Sync {
    async fn conditions(&self) -> Result<Vec<ConditionRecord>>;
}

/// Fire-and-forget progress and log sink for whatever presents the engine
/// to the operator. Called from the engine's worker task.
pub trait MonitorSink: Send + Sync {
    fn progress(&self, done: usize, total: usize);

    fn log(&self, message: &str);

    fn reset_progress(&self) {
        self.progress(0, 0);
    }
}

/// Candle tables are small and owned by the caller; this alias keeps
/// signatures readable.
pub type CandleTable = Vec<Candle>;

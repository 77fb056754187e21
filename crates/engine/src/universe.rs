use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use common::{MarketData, Result};

/// Owned cache of the provider's symbol universe.
#[derive(Debug)]
pub struct SymbolCache {
    ttl: Duration,
    cached: Option<(Instant, Vec<String>)>,
}

impl SymbolCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

    pub fn new(ttl: Duration) -> Self {
        Self { ttl, cached: None }
    }

    /// Cached symbols, refreshed from `market` when missing or older than the TTL.
    pub async fn get(&mut self, market: &dyn MarketData) -> Result<Vec<String>> {
        if let Some((fetched_at, symbols)) = &self.cached {
            if fetched_at.elapsed() < self.ttl {
                return Ok(symbols.clone());
            }
        }

        let symbols = market.symbol_universe().await?;
        debug!(count = symbols.len(), "Refreshed symbol universe");
        self.cached = Some((Instant::now(), symbols.clone()));
        Ok(symbols)
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

impl Default for SymbolCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use common::{Candle, CandleTable, Error, MarketData, Result};

/// Binance error code for "too many requests".
const TOO_MANY_REQUESTS: i64 = -1003;

/// Public-data client for the Binance USDⓈ-M futures REST API.
pub struct BinanceFuturesClient {
    base_url: String,
    http: Client,
}

impl BinanceFuturesClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        check_status(status, &body)?;
        Ok(body)
    }
}

#[async_trait]
impl MarketData for BinanceFuturesClient {
    async fn symbol_universe(&self) -> Result<Vec<String>> {
        let body = self.get("/fapi/v1/exchangeInfo", &[]).await?;
        let symbols = parse_symbols(&body)?;
        debug!(count = symbols.len(), "Fetched USDT perpetual symbols");
        Ok(symbols)
    }

    async fn candles(&self, symbol: &str, timeframe: &str, limit: usize) -> Result<CandleTable> {
        let query = [
            ("symbol", symbol.to_string()),
            ("interval", timeframe.to_string()),
            ("limit", limit.to_string()),
        ];
        let body = self.get("/fapi/v1/klines", &query).await?;
        parse_klines(&body)
    }
}

/// Map a non-success response to a typed error. Throttling (HTTP 429, the
/// 418 IP ban, or code -1003) becomes `RateLimited`.
fn check_status(status: u16, body: &str) -> Result<()> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    let code = serde_json::from_str::<ApiError>(body).ok().map(|e| e.code);
    if status == 429 || status == 418 || code == Some(TOO_MANY_REQUESTS) {
        return Err(Error::RateLimited(format!("HTTP {status}: {body}")));
    }
    Err(Error::Exchange(format!("HTTP {status}: {body}")))
}

/// Symbols quoted in USDT, perpetual, and currently trading.
fn parse_symbols(body: &str) -> Result<Vec<String>> {
    let info: ExchangeInfo =
        serde_json::from_str(body).map_err(|e| Error::Exchange(format!("bad exchangeInfo: {e}")))?;

    Ok(info
        .symbols
        .into_iter()
        .filter(|s| s.quote_asset == "USDT" && s.contract_type == "PERPETUAL" && s.status == "TRADING")
        .map(|s| s.symbol)
        .collect())
}

/// Kline rows are positional arrays:
/// `[openTime, open, high, low, close, volume, closeTime, ...]` with prices as strings.
fn parse_klines(body: &str) -> Result<CandleTable> {
    let rows: Vec<Vec<serde_json::Value>> = serde_json::from_str(body)?;
    rows.iter().map(|row| parse_kline(row)).collect()
}

fn parse_kline(row: &[serde_json::Value]) -> Result<Candle> {
    if row.len() < 7 {
        return Err(Error::Exchange(format!("kline row has {} fields, expected at least 7", row.len())));
    }

    Ok(Candle {
        open_time: timestamp(&row[0])?,
        open: number(&row[1])?,
        high: number(&row[2])?,
        low: number(&row[3])?,
        close: number(&row[4])?,
        volume: number(&row[5])?,
        close_time: timestamp(&row[6])?,
    })
}

fn number(value: &serde_json::Value) -> Result<f64> {
    match value {
        serde_json::Value::String(s) => s
            .parse::<f64>()
            .map_err(|e| Error::Exchange(format!("bad kline number '{s}': {e}"))),
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::Exchange(format!("bad kline number {n}"))),
        other => Err(Error::Exchange(format!("bad kline number {other}"))),
    }
}

fn timestamp(value: &serde_json::Value) -> Result<DateTime<Utc>> {
    value
        .as_i64()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .ok_or_else(|| Error::Exchange(format!("bad kline timestamp {value}")))
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ApiError {
    code: i64,
}

#[derive(Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    #[serde(default)]
    quote_asset: String,
    #[serde(default)]
    contract_type: String,
    #[serde(default)]
    status: String,
}

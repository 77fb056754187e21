use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// One OHLCV bar for a fixed interval, as returned by the market data provider.
/// Tables of candles are always ordered oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: DateTime<Utc>,
}

impl Candle {
    pub fn field(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
        }
    }
}

/// A price column of a candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
}

impl FromStr for PriceField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(PriceField::Open),
            "high" => Ok(PriceField::High),
            "low" => Ok(PriceField::Low),
            "close" => Ok(PriceField::Close),
            other => Err(Error::InvalidCondition(format!("unknown price field '{other}'"))),
        }
    }
}

impl std::fmt::Display for PriceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceField::Open => write!(f, "Open"),
            PriceField::High => write!(f, "High"),
            PriceField::Low => write!(f, "Low"),
            PriceField::Close => write!(f, "Close"),
        }
    }
}

/// A condition exactly as the operator entered it.
///
/// Field order is the fixed wire order
/// `(group, shift, timeframe, symbol, indicator, params, detail, operator, value)`,
/// so a TOML file may use either named tables or positional arrays:
///
/// ```toml
/// [[condition]]
/// shift = 0
/// timeframe = "5m"
/// symbol = "BTCUSDT"
/// indicator = "RSI"
/// params = "length=14"
/// detail = "RSI Value"
/// operator = "<"
/// value = "30"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConditionRecord {
    /// Empty means the condition alerts on its own.
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub shift: u32,
    pub timeframe: String,
    pub symbol: String,
    pub indicator: String,
    /// Comma separated `key=value` list, e.g. `length=20, stddev=2`.
    #[serde(default)]
    pub params: String,
    pub detail: String,
    pub operator: String,
    /// Literal number, `price`/OHLC field name, or an indicator token such as `Rising`.
    #[serde(default)]
    pub value: String,
}

impl ConditionRecord {
    const FIELD_COUNT: usize = 9;
}

/// Parses the `;`-separated wire line, e.g.
/// `;0;5m;BTCUSDT;RSI;length=14;RSI Value;<;30`.
impl FromStr for ConditionRecord {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(';').map(str::trim).collect();
        if fields.len() != Self::FIELD_COUNT {
            return Err(Error::InvalidCondition(format!(
                "expected {} ';'-separated fields, got {}",
                Self::FIELD_COUNT,
                fields.len()
            )));
        }

        let shift = if fields[1].is_empty() {
            0
        } else {
            fields[1].parse::<u32>().map_err(|_| {
                Error::InvalidCondition(format!("shift must be a non-negative integer, got '{}'", fields[1]))
            })?
        };

        Ok(ConditionRecord {
            group: fields[0].to_string(),
            shift,
            timeframe: fields[2].to_string(),
            symbol: fields[3].to_string(),
            indicator: fields[4].to_string(),
            params: fields[5].to_string(),
            detail: fields[6].to_string(),
            operator: fields[7].to_string(),
            value: fields[8].to_string(),
        })
    }
}

impl std::fmt::Display for ConditionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{};{};{};{};{};{};{};{};{}",
            self.group,
            self.shift,
            self.timeframe,
            self.symbol,
            self.indicator,
            self.params,
            self.detail,
            self.operator,
            self.value
        )
    }
}

/// Current state of the monitoring engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    #[default]
    Stopped,
    Running,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Stopped => write!(f, "stopped"),
            EngineState::Running => write!(f, "running"),
        }
    }
}

/// Tasks checked so far in the current cycle. `total == 0` means idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_parses_wire_line() {
        let rec: ConditionRecord = ";0;5m;BTCUSDT;RSI;length=14;RSI Value;<;30".parse().unwrap();
        assert_eq!(rec.group, "");
        assert_eq!(rec.shift, 0);
        assert_eq!(rec.timeframe, "5m");
        assert_eq!(rec.detail, "RSI Value");
        assert_eq!(rec.value, "30");
    }

    #[test]
    fn record_display_round_trips_through_wire_line() {
        let line = "breakout;2;1h;All;BollingerBands;length=20, stddev=2;Upper Band;<;price";
        let rec: ConditionRecord = line.parse().unwrap();
        assert_eq!(rec.to_string(), line);
    }

    #[test]
    fn record_rejects_wrong_field_count() {
        assert!("5m;BTCUSDT;RSI".parse::<ConditionRecord>().is_err());
    }

    #[test]
    fn record_rejects_negative_shift() {
        assert!(";-1;5m;BTCUSDT;RSI;;RSI Value;<;30".parse::<ConditionRecord>().is_err());
    }

    #[test]
    fn record_deserializes_from_positional_toml_array() {
        #[derive(Deserialize)]
        struct File {
            conditions: Vec<ConditionRecord>,
        }
        let file: File = toml::from_str(
            r#"conditions = [["", 0, "5m", "BTCUSDT", "RSI", "length=14", "RSI Value", "<", "30"]]"#,
        )
        .unwrap();
        assert_eq!(file.conditions[0].symbol, "BTCUSDT");
        assert_eq!(file.conditions[0].operator, "<");
    }

    #[test]
    fn price_field_is_case_insensitive() {
        assert_eq!("Close".parse::<PriceField>().unwrap(), PriceField::Close);
        assert_eq!(" HIGH ".parse::<PriceField>().unwrap(), PriceField::High);
        assert!("mid".parse::<PriceField>().is_err());
    }
}

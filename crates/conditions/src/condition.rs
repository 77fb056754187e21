use common::{ConditionRecord, PriceField};

use crate::indicators::{Direction, Turn};
use crate::planner::MAX_FETCH_LIMIT;
use crate::{ConditionError, Operator, Params};

/// Symbol token that expands to the whole symbol universe.
pub const WILDCARD: &str = "All";

/// Candle intervals the data provider serves.
pub const TIMEFRAMES: [&str; 15] = [
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w", "1M",
];

/// Which symbols a condition watches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolSelector {
    All,
    One(String),
}

impl SymbolSelector {
    fn parse(raw: &str) -> Result<Self, ConditionError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConditionError::EmptySymbol);
        }
        if raw.eq_ignore_ascii_case(WILDCARD) || raw.eq_ignore_ascii_case("All Coins") {
            Ok(SymbolSelector::All)
        } else {
            Ok(SymbolSelector::One(raw.to_uppercase()))
        }
    }

    pub fn matches(&self, symbol: &str) -> bool {
        match self {
            SymbolSelector::All => true,
            SymbolSelector::One(s) => s == symbol,
        }
    }
}

/// Indicator kind with its typed parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Indicator {
    Rsi { length: usize },
    Envelope { length: usize, percent: f64 },
    BollingerBands { length: usize, stddev: f64 },
    Sma { length: usize },
    MaSlope { length: usize },
    MaCompare { short: usize, long: usize },
    CandleTrend,
    MaTrend { length: usize },
}

impl Indicator {
    pub fn parse(tag: &str, params: &Params) -> Result<Self, ConditionError> {
        let key: String = tag
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();

        let indicator = match key.as_str() {
            "rsi" => Indicator::Rsi {
                length: params.length(&["length", "period"], 14, 2)?,
            },
            "envelope" | "env" => Indicator::Envelope {
                length: params.length(&["length", "period"], 20, 1)?,
                percent: params.number(&["percent", "pct"], 5.0)?,
            },
            "bollingerbands" | "bollinger" | "bb" => Indicator::BollingerBands {
                length: params.length(&["length", "period"], 20, 1)?,
                stddev: params.number(&["stddev", "std"], 2.0)?,
            },
            "sma" | "ma" => Indicator::Sma {
                length: params.length(&["length", "period"], 20, 1)?,
            },
            "maslope" => Indicator::MaSlope {
                length: params.length(&["length", "period"], 20, 1)?,
            },
            "macompare" => Indicator::MaCompare {
                short: params.length(&["short", "short_period", "short_length"], 5, 1)?,
                long: params.length(&["long", "long_period", "long_length"], 20, 1)?,
            },
            "candletrend" => Indicator::CandleTrend,
            "matrend" => Indicator::MaTrend {
                length: params.length(&["length", "period"], 20, 1)?,
            },
            _ => return Err(ConditionError::UnknownIndicator(tag.trim().to_string())),
        };
        Ok(indicator)
    }

    /// Bars that must exist at and before the evaluated position.
    pub fn lookback(&self) -> usize {
        match self {
            Indicator::Rsi { length } => length.saturating_add(1),
            Indicator::Envelope { length, .. }
            | Indicator::BollingerBands { length, .. }
            | Indicator::Sma { length } => *length,
            Indicator::MaSlope { length } => length.saturating_add(2),
            Indicator::MaCompare { short, long } => (*short).max(*long),
            Indicator::CandleTrend => 2,
            Indicator::MaTrend { length } => length.saturating_add(1),
        }
    }

    /// Largest window-length parameter, used for sizing fetches.
    pub fn longest_period(&self) -> usize {
        match self {
            Indicator::Rsi { length }
            | Indicator::Envelope { length, .. }
            | Indicator::BollingerBands { length, .. }
            | Indicator::Sma { length }
            | Indicator::MaSlope { length }
            | Indicator::MaTrend { length } => *length,
            Indicator::MaCompare { short, long } => (*short).max(*long),
            Indicator::CandleTrend => 0,
        }
    }

    fn supports(&self, detail: &Detail) -> bool {
        match (self, detail) {
            (Indicator::Rsi { .. }, Detail::Value) => true,
            (Indicator::Envelope { .. } | Indicator::BollingerBands { .. }, d) => {
                matches!(d, Detail::Upper | Detail::Middle | Detail::Lower | Detail::Price)
            }
            (Indicator::Sma { .. }, d) => matches!(d, Detail::Value | Detail::Price),
            (Indicator::MaSlope { .. }, d) => {
                matches!(d, Detail::Direction | Detail::Change | Detail::Slope)
            }
            (Indicator::MaCompare { .. }, d) => matches!(d, Detail::Spread),
            (Indicator::CandleTrend, Detail::Run { field, .. }) => field.is_some(),
            (Indicator::MaTrend { .. }, Detail::Run { field, .. }) => field.is_none(),
            _ => false,
        }
    }
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Indicator::Rsi { length } => write!(f, "RSI({length})"),
            Indicator::Envelope { length, percent } => write!(f, "Envelope({length}, {percent}%)"),
            Indicator::BollingerBands { length, stddev } => write!(f, "BB({length}, {stddev})"),
            Indicator::Sma { length } => write!(f, "SMA({length})"),
            Indicator::MaSlope { length } => write!(f, "MA_Slope({length})"),
            Indicator::MaCompare { short, long } => write!(f, "MA_Compare({short}/{long})"),
            Indicator::CandleTrend => write!(f, "Candle_Trend"),
            Indicator::MaTrend { length } => write!(f, "MA_Trend({length})"),
        }
    }
}

/// Which output of the indicator the condition reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detail {
    Value,
    Upper,
    Middle,
    Lower,
    Price,
    Direction,
    Change,
    Slope,
    Spread,
    /// Consecutive-step count on a price field (`Close 상승`) or on the
    /// indicator's moving average (`연속 상승`).
    Run {
        field: Option<PriceField>,
        direction: Direction,
    },
}

impl Detail {
    fn parse(raw: &str) -> Option<Self> {
        let text = raw.trim().to_lowercase();
        let detail = match text.as_str() {
            "rsi value" | "sma value" | "value" => Detail::Value,
            "upper band" | "upper" => Detail::Upper,
            "middle band" | "middle" => Detail::Middle,
            "lower band" | "lower" => Detail::Lower,
            "price" => Detail::Price,
            "direction" => Detail::Direction,
            "change" => Detail::Change,
            "slope" => Detail::Slope,
            "difference" | "spread" | "diff" => Detail::Spread,
            _ => return Self::parse_run(&text),
        };
        Some(detail)
    }

    fn parse_run(text: &str) -> Option<Self> {
        let (head, tail) = match text.rsplit_once(' ') {
            Some((head, tail)) => (head.trim(), tail.trim()),
            None => ("", text),
        };
        let direction = match tail {
            "상승" | "rising" | "up" => Direction::Rising,
            "하락" | "falling" | "down" => Direction::Falling,
            _ => return None,
        };
        let field = match head {
            "" | "연속" | "ma" => None,
            other => Some(other.parse::<PriceField>().ok()?),
        };
        Some(Detail::Run { field, direction })
    }
}

/// The right-hand side of a comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    Literal(f64),
    /// A candle column read at the same offset. `price` means the close.
    Field(PriceField),
    Direction(Direction),
    Turn(Turn),
}

impl Target {
    fn parse(raw: &str) -> Option<Self> {
        let text = raw.trim().to_lowercase();
        let target = match text.as_str() {
            "" | "price" => Target::Field(PriceField::Close),
            "rising" => Target::Direction(Direction::Rising),
            "falling" => Target::Direction(Direction::Falling),
            "turned up" => Target::Turn(Turn::Up),
            "turned down" => Target::Turn(Turn::Down),
            other => match other.parse::<PriceField>() {
                Ok(field) => Target::Field(field),
                Err(_) => Target::Literal(other.parse::<f64>().ok().filter(|v| v.is_finite())?),
            },
        };
        Some(target)
    }

    fn fits(&self, detail: &Detail) -> bool {
        match (detail, self) {
            (Detail::Direction, Target::Direction(_)) => true,
            (Detail::Change, Target::Turn(_)) => true,
            (Detail::Direction | Detail::Change, _) => false,
            (Detail::Run { .. }, Target::Literal(v)) => {
                (0.0..=MAX_FETCH_LIMIT as f64).contains(v) && v.fract() == 0.0
            }
            (Detail::Run { .. }, _) => false,
            (_, Target::Literal(_) | Target::Field(_)) => true,
            _ => false,
        }
    }
}

/// A validated alert condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub group: Option<String>,
    pub shift: usize,
    pub timeframe: String,
    pub symbol: SymbolSelector,
    pub indicator: Indicator,
    pub detail: Detail,
    pub operator: Operator,
    pub target: Target,
    record: ConditionRecord,
}

impl Condition {
    pub fn parse(record: &ConditionRecord) -> Result<Self, ConditionError> {
        let timeframe = record.timeframe.trim();
        if !TIMEFRAMES.contains(&timeframe) {
            return Err(ConditionError::UnknownTimeframe(timeframe.to_string()));
        }

        let params: Params = record.params.parse()?;
        let indicator = Indicator::parse(&record.indicator, &params)?;

        let detail = Detail::parse(&record.detail)
            .filter(|d| indicator.supports(d))
            .ok_or_else(|| ConditionError::UnsupportedDetail {
                indicator: record.indicator.trim().to_string(),
                detail: record.detail.trim().to_string(),
            })?;

        let operator: Operator = record.operator.parse()?;

        let target = Target::parse(&record.value)
            .filter(|t| t.fits(&detail))
            .ok_or_else(|| ConditionError::ValueMismatch {
                detail: record.detail.trim().to_string(),
                value: record.value.trim().to_string(),
            })?;

        let group = Some(record.group.trim())
            .filter(|g| !g.is_empty())
            .map(str::to_string);

        Ok(Condition {
            group,
            shift: record.shift as usize,
            timeframe: timeframe.to_string(),
            symbol: SymbolSelector::parse(&record.symbol)?,
            indicator,
            detail,
            operator,
            target,
            record: record.clone(),
        })
    }

    /// Stable text identifying this condition, used for alert dedup keys.
    pub fn identity(&self) -> String {
        self.record.to_string()
    }

    /// The detail as the operator wrote it.
    pub fn detail_label(&self) -> &str {
        self.record.detail.trim()
    }

    /// Short human-readable form, e.g. `RSI(14) RSI Value < 30`.
    pub fn summary(&self) -> String {
        let value = match self.record.value.trim() {
            "" => "price",
            v => v,
        };
        let mut text = format!("{} {} {} {}", self.indicator, self.detail_label(), self.operator, value);
        if self.shift > 0 {
            text.push_str(&format!(" [{} bars ago]", self.shift));
        }
        text
    }

    /// Bars this condition wants fetched: its longest window plus the shift,
    /// and for run counts enough bars to see the run end.
    pub fn history_len(&self) -> usize {
        let run_extra = match (self.detail, self.target) {
            (Detail::Run { .. }, Target::Literal(count)) => (count as usize).saturating_add(2),
            _ => 0,
        };
        self.indicator
            .longest_period()
            .max(self.indicator.lookback())
            .saturating_add(run_extra)
            .saturating_add(self.shift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(indicator: &str, params: &str, detail: &str, op: &str, value: &str) -> ConditionRecord {
        ConditionRecord {
            group: String::new(),
            shift: 0,
            timeframe: "15m".to_string(),
            symbol: "BTCUSDT".to_string(),
            indicator: indicator.to_string(),
            params: params.to_string(),
            detail: detail.to_string(),
            operator: op.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn parses_rsi_condition() {
        let c = Condition::parse(&record("RSI", "length=14", "RSI Value", "<", "30")).unwrap();
        assert_eq!(c.indicator, Indicator::Rsi { length: 14 });
        assert_eq!(c.detail, Detail::Value);
        assert_eq!(c.operator, Operator::Lt);
        assert_eq!(c.target, Target::Literal(30.0));
        assert_eq!(c.group, None);
        assert_eq!(c.summary(), "RSI(14) RSI Value < 30");
    }

    #[test]
    fn defaults_fill_missing_params() {
        let c = Condition::parse(&record("BollingerBands", "", "Upper Band", "<", "price")).unwrap();
        assert_eq!(c.indicator, Indicator::BollingerBands { length: 20, stddev: 2.0 });
        assert_eq!(c.target, Target::Field(PriceField::Close));
    }

    #[test]
    fn empty_value_means_price() {
        let c = Condition::parse(&record("Envelope", "length=20, percent=5", "Lower Band", ">", "")).unwrap();
        assert_eq!(c.target, Target::Field(PriceField::Close));
        assert!(c.summary().ends_with("> price"));
    }

    #[test]
    fn indicator_tags_tolerate_spelling() {
        let params = Params::default();
        assert_eq!(Indicator::parse("MA_Slope", &params).unwrap(), Indicator::MaSlope { length: 20 });
        assert_eq!(Indicator::parse("ma-compare", &params).unwrap(), Indicator::MaCompare { short: 5, long: 20 });
        assert_eq!(Indicator::parse("Candle Trend", &params).unwrap(), Indicator::CandleTrend);
        assert!(Indicator::parse("MACD", &params).is_err());
    }

    #[test]
    fn run_details_parse_korean_and_english() {
        assert_eq!(
            Detail::parse("Close 상승"),
            Some(Detail::Run { field: Some(PriceField::Close), direction: Direction::Rising })
        );
        assert_eq!(
            Detail::parse("low falling"),
            Some(Detail::Run { field: Some(PriceField::Low), direction: Direction::Falling })
        );
        assert_eq!(
            Detail::parse("연속 하락"),
            Some(Detail::Run { field: None, direction: Direction::Falling })
        );
        assert_eq!(Detail::parse("Volume 상승"), None);
    }

    #[test]
    fn detail_must_belong_to_indicator() {
        let err = Condition::parse(&record("RSI", "", "Upper Band", "<", "30")).unwrap_err();
        assert!(matches!(err, ConditionError::UnsupportedDetail { .. }));
        // Candle_Trend needs a price field, MA_Trend must not have one
        assert!(Condition::parse(&record("Candle_Trend", "", "연속 상승", "==", "3")).is_err());
        assert!(Condition::parse(&record("MA_Trend", "", "Close 상승", "==", "3")).is_err());
        assert!(Condition::parse(&record("MA_Trend", "length=5", "연속 상승", ">=", "3")).is_ok());
    }

    #[test]
    fn categorical_details_need_matching_tokens() {
        assert!(Condition::parse(&record("MA_Slope", "", "Direction", "==", "Rising")).is_ok());
        assert!(Condition::parse(&record("MA_Slope", "", "Change", "==", "Turned Down")).is_ok());
        assert!(Condition::parse(&record("MA_Slope", "", "Direction", ">", "1.5")).is_err());
        assert!(Condition::parse(&record("MA_Slope", "", "Change", "==", "Rising")).is_err());
        assert!(Condition::parse(&record("RSI", "", "RSI Value", "==", "Rising")).is_err());
        assert!(Condition::parse(&record("MA_Slope", "", "Slope", ">", "0.5")).is_ok());
    }

    #[test]
    fn one_malformed_param_rejects_the_condition() {
        let typo = Condition::parse(&record("RSI", "length:20", "RSI Value", "<", "30"));
        assert!(matches!(typo, Err(ConditionError::MalformedParam(p)) if p == "length:20"));
        assert!(Condition::parse(&record("SMA", "length=20, stddev=x", "Price", ">", "price")).is_err());
    }

    #[test]
    fn run_targets_must_be_whole_counts() {
        assert!(Condition::parse(&record("Candle_Trend", "", "Close 상승", "==", "2.5")).is_err());
        assert!(Condition::parse(&record("Candle_Trend", "", "Close 상승", "==", "price")).is_err());
        assert!(Condition::parse(&record("Candle_Trend", "", "Close 상승", ">=", "1e30")).is_err());
        assert!(Condition::parse(&record("MA_Trend", "", "연속 상승", ">=", "1501")).is_err());
        assert!(Condition::parse(&record("MA_Trend", "", "연속 상승", ">=", "1500")).is_ok());
    }

    #[test]
    fn rejects_bad_operator_timeframe_and_symbol() {
        assert!(matches!(
            Condition::parse(&record("RSI", "", "RSI Value", "=>", "30")),
            Err(ConditionError::UnknownOperator(_))
        ));

        let mut r = record("RSI", "", "RSI Value", "<", "30");
        r.timeframe = "7m".to_string();
        assert_eq!(Condition::parse(&r), Err(ConditionError::UnknownTimeframe("7m".to_string())));

        let mut r = record("RSI", "", "RSI Value", "<", "30");
        r.symbol = "  ".to_string();
        assert_eq!(Condition::parse(&r), Err(ConditionError::EmptySymbol));
    }

    #[test]
    fn wildcard_symbol_and_group() {
        let mut r = record("RSI", "", "RSI Value", "<", "30");
        r.symbol = "all coins".to_string();
        r.group = " dip ".to_string();
        let c = Condition::parse(&r).unwrap();
        assert_eq!(c.symbol, SymbolSelector::All);
        assert!(c.symbol.matches("ETHUSDT"));
        assert_eq!(c.group.as_deref(), Some("dip"));
    }

    #[test]
    fn history_len_covers_window_shift_and_run() {
        let mut r = record("BollingerBands", "length=50", "Lower Band", ">", "price");
        r.shift = 3;
        assert_eq!(Condition::parse(&r).unwrap().history_len(), 53);

        let c = Condition::parse(&record("Candle_Trend", "", "Close 상승", ">=", "6")).unwrap();
        assert_eq!(c.history_len(), 2 + 8);

        let c = Condition::parse(&record("RSI", "length=14", "RSI Value", "<", "30")).unwrap();
        assert_eq!(c.history_len(), 15);
    }
}

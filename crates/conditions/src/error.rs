use thiserror::Error;

/// A condition record that cannot be turned into a typed [`crate::Condition`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    #[error("unknown indicator '{0}'")]
    UnknownIndicator(String),

    #[error("{indicator} has no detail '{detail}'")]
    UnsupportedDetail { indicator: String, detail: String },

    #[error("unknown operator '{0}' (expected one of >, >=, <, <=, ==)")]
    UnknownOperator(String),

    #[error("unsupported timeframe '{0}'")]
    UnknownTimeframe(String),

    #[error("symbol must not be empty")]
    EmptySymbol,

    #[error("malformed parameter '{0}' (expected key=value)")]
    MalformedParam(String),

    #[error("parameter '{name}' {reason}")]
    InvalidParam { name: String, reason: String },

    #[error("value '{value}' cannot be compared with detail '{detail}'")]
    ValueMismatch { detail: String, value: String },
}

/// Why a condition could not be judged against a candle table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("insufficient data: need {need} candles, have {have}")]
    InsufficientData { need: usize, have: usize },

    #[error("indicator computation failed: {0}")]
    Compute(String),
}

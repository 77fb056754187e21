use common::Candle;

use crate::condition::{Condition, Detail, Indicator, Target};
use crate::indicators::{self, Direction, Series, Turn};
use crate::EvalError;

/// Outcome of judging one condition against one candle table.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub fired: bool,
    /// Resolved comparison, e.g. `RSI(14) RSI Value(24.1234) < 30.0000`.
    pub explanation: String,
}

/// What the indicator reported at the evaluated bar.
enum Observation {
    Number(f64),
    Direction(Option<Direction>),
    Turn(Option<Turn>),
}

/// Judge `condition` against `candles` (oldest first) at `condition.shift`
/// bars before the most recent one.
///
/// A table too short for the indicator window plus the shift yields
/// [`EvalError::InsufficientData`]. Missing or non-finite values never fire
/// but are not errors.
pub fn evaluate(candles: &[Candle], condition: &Condition) -> Result<Evaluation, EvalError> {
    let have = candles.len();
    let need = condition.shift.saturating_add(condition.indicator.lookback());
    if condition.shift >= have || have < need {
        return Err(EvalError::InsufficientData { need, have });
    }
    let at = have - 1 - condition.shift;

    let observation = observe(candles, condition, at, need)?;
    Ok(judge(candles, condition, at, observation))
}

fn observe(
    candles: &[Candle],
    condition: &Condition,
    at: usize,
    need: usize,
) -> Result<Observation, EvalError> {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let have = candles.len();
    let value_at = |series: &Series, i: usize| -> Result<f64, EvalError> {
        series
            .get(i)
            .copied()
            .flatten()
            .ok_or(EvalError::InsufficientData { need, have })
    };

    let observation = match (&condition.indicator, condition.detail) {
        (_, Detail::Price) => Observation::Number(closes[at]),

        (Indicator::Rsi { length }, Detail::Value) => {
            Observation::Number(value_at(&indicators::rsi(&closes, *length), at)?)
        }

        (Indicator::Envelope { length, percent }, band) => {
            let bands = indicators::envelope(&closes, *length, *percent);
            Observation::Number(value_at(pick_band(&bands, band)?, at)?)
        }

        (Indicator::BollingerBands { length, stddev }, band) => {
            let bands = indicators::bollinger_bands(&closes, *length, *stddev);
            Observation::Number(value_at(pick_band(&bands, band)?, at)?)
        }

        (Indicator::Sma { length }, Detail::Value) => {
            Observation::Number(value_at(&indicators::sma(&closes, *length), at)?)
        }

        (Indicator::MaSlope { length }, detail) => {
            let ma = indicators::sma(&closes, *length);
            let (a, b, c) = (value_at(&ma, at - 2)?, value_at(&ma, at - 1)?, value_at(&ma, at)?);
            match detail {
                Detail::Direction => Observation::Direction(indicators::direction(b, c)),
                Detail::Change => Observation::Turn(indicators::turn(a, b, c)),
                Detail::Slope => {
                    if c == 0.0 {
                        return Err(EvalError::Compute("moving average is zero".to_string()));
                    }
                    let slope = indicators::least_squares_slope(&[a, b, c])
                        .ok_or_else(|| EvalError::Compute("slope needs three points".to_string()))?;
                    Observation::Number(slope / c * 100.0)
                }
                other => return Err(unsupported(condition, other)),
            }
        }

        (Indicator::MaCompare { short, long }, Detail::Spread) => {
            let spread = indicators::percent_spread(
                &indicators::sma(&closes, *short),
                &indicators::sma(&closes, *long),
            );
            Observation::Number(value_at(&spread, at)?)
        }

        (Indicator::CandleTrend, Detail::Run { field: Some(field), direction }) => {
            let series: Series = candles.iter().map(|c| Some(c.field(field))).collect();
            Observation::Number(indicators::count_run(&series, at, direction) as f64)
        }

        (Indicator::MaTrend { length }, Detail::Run { field: None, direction }) => {
            let ma = indicators::sma(&closes, *length);
            Observation::Number(indicators::count_run(&ma, at, direction) as f64)
        }

        (_, other) => return Err(unsupported(condition, other)),
    };
    Ok(observation)
}

fn pick_band(bands: &indicators::Bands, detail: Detail) -> Result<&Series, EvalError> {
    match detail {
        Detail::Upper => Ok(&bands.upper),
        Detail::Middle => Ok(&bands.middle),
        Detail::Lower => Ok(&bands.lower),
        other => Err(EvalError::Compute(format!("bands have no {other:?} output"))),
    }
}

fn unsupported(condition: &Condition, detail: Detail) -> EvalError {
    EvalError::Compute(format!("{} cannot produce {detail:?}", condition.indicator))
}

fn judge(candles: &[Candle], condition: &Condition, at: usize, observation: Observation) -> Evaluation {
    let op = condition.operator;
    let label = match condition.detail {
        Detail::Price => "Price".to_string(),
        _ => format!("{} {}", condition.indicator, condition.detail_label()),
    };

    let (fired, mut explanation) = match (observation, condition.target) {
        (Observation::Number(lhs), Target::Literal(rhs)) => {
            (op.apply(lhs, rhs), format!("{label}({lhs:.4}) {op} {rhs:.4}"))
        }
        (Observation::Number(lhs), Target::Field(field)) => {
            let rhs = candles[at].field(field);
            (op.apply(lhs, rhs), format!("{label}({lhs:.4}) {op} {field}({rhs:.4})"))
        }
        // Categorical outputs match the token exactly whatever the operator says
        (Observation::Direction(seen), Target::Direction(want)) => {
            let seen_text = seen.map_or("Flat".to_string(), |d| d.to_string());
            (seen == Some(want), format!("{label}({seen_text}) == {want}"))
        }
        (Observation::Turn(seen), Target::Turn(want)) => {
            let seen_text = seen.map_or("No Turn".to_string(), |t| t.to_string());
            (seen == Some(want), format!("{label}({seen_text}) == {want}"))
        }
        (_, target) => (false, format!("{label} cannot be compared with {target:?}")),
    };

    if condition.shift > 0 {
        explanation.push_str(&format!(" [{} bars ago]", condition.shift));
    }
    Evaluation { fired, explanation }
}

//! Indicator series computed from candle closes.
//!
//! Every function returns a series aligned with its input (same length,
//! oldest first) holding `None` where the window has not filled yet. All
//! series are causal: the value at index `i` only depends on inputs `..=i`,
//! so evaluating "shift bars ago" is a plain index lookup.

pub mod bands;
pub mod rsi;
pub mod trend;

pub use bands::{bollinger_bands, envelope, Bands};
pub use rsi::rsi;
pub use trend::{count_run, direction, least_squares_slope, turn, Direction, Turn};

pub type Series = Vec<Option<f64>>;

/// Simple moving average of the last `length` values.
pub fn sma(values: &[f64], length: usize) -> Series {
    let mut out = vec![None; values.len()];
    if length == 0 || values.len() < length {
        return out;
    }
    for (i, window) in values.windows(length).enumerate() {
        out[i + length - 1] = Some(window.iter().sum::<f64>() / length as f64);
    }
    out
}

/// `(short - long) / long * 100` element-wise. `None` where either side is
/// missing or `long` is zero.
pub fn percent_spread(short: &Series, long: &Series) -> Series {
    short
        .iter()
        .zip(long)
        .map(|(s, l)| match (s, l) {
            (Some(s), Some(l)) if *l != 0.0 => Some((s - l) / l * 100.0),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_aligns_with_input() {
        let series = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(series, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn sma_short_input_is_all_none() {
        assert_eq!(sma(&[1.0, 2.0], 3), vec![None, None]);
        assert_eq!(sma(&[1.0, 2.0], 0), vec![None, None]);
    }

    #[test]
    fn spread_is_relative_to_long_average() {
        let short = vec![None, Some(110.0), Some(90.0)];
        let long = vec![Some(100.0), Some(100.0), Some(0.0)];
        assert_eq!(percent_spread(&short, &long), vec![None, Some(10.0), None]);
    }
}

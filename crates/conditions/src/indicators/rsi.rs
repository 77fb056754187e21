use super::Series;

/// RSI (Relative Strength Index) series.
///
/// Uses Wilder's smoothed moving average: the first average gain/loss is the
/// plain mean of the first `period` changes, later values are smoothed with
/// factor `1/period`. Entries before index `period` are `None`.
pub fn rsi(closes: &[f64], period: usize) -> Series {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() < period + 1 {
        return out;
    }

    // First average gain/loss over the initial `period` changes
    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let initial = &changes[..period];

    let mut avg_gain = initial.iter().filter(|&&c| c > 0.0).sum::<f64>() / period as f64;
    let mut avg_loss =
        initial.iter().filter(|&&c| c < 0.0).map(|c| c.abs()).sum::<f64>() / period as f64;
    out[period] = Some(strength(avg_gain, avg_loss));

    // Wilder smoothing over remaining changes
    for (i, &change) in changes[period..].iter().enumerate() {
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { change.abs() } else { 0.0 };
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
        out[period + 1 + i] = Some(strength(avg_gain, avg_loss));
    }

    out
}

fn strength(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        // A flat window has no direction at all
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_is_none_until_period_plus_one_values() {
        // Need at least period+1 = 15 values
        let prices = vec![100.0; 14];
        assert!(rsi(&prices, 14).iter().all(Option::is_none));
    }

    #[test]
    fn rsi_first_value_lands_on_index_period() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let series = rsi(&prices, 14);
        assert_eq!(series.len(), 15);
        assert!(series[13].is_none());
        assert!(series[14].is_some());
    }

    #[test]
    fn rsi_all_gains_returns_100() {
        // Strictly increasing prices → RSI = 100
        let prices = vec![10.0, 11.0, 12.0, 13.0, 14.0];
        let value = rsi(&prices, 3)[4].unwrap();
        assert!((value - 100.0).abs() < 1e-6, "Expected ~100, got {value}");
    }

    #[test]
    fn rsi_all_losses_returns_0() {
        // Strictly decreasing prices → RSI = 0
        let prices = vec![14.0, 13.0, 12.0, 11.0, 10.0];
        let value = rsi(&prices, 3)[4].unwrap();
        assert!((value - 0.0).abs() < 1e-6, "Expected ~0, got {value}");
    }

    #[test]
    fn rsi_flat_prices_are_neutral() {
        let prices = vec![10.0; 20];
        assert_eq!(rsi(&prices, 14)[19], Some(50.0));
    }

    #[test]
    fn rsi_14_converges_on_monotonic_series() {
        // Rising with a single early dip: RSI climbs toward 100
        let mut rising: Vec<f64> = (0..80).map(|i| 100.0 + i as f64).collect();
        rising[3] = 90.0;
        let series = rsi(&rising, 14);
        let early = series[20].unwrap();
        let late = series[79].unwrap();
        assert!(late > early, "{late} should exceed {early}");
        assert!(late > 99.0, "Expected RSI near 100, got {late}");

        // Falling with a single early bounce: RSI sinks toward 0
        let mut falling: Vec<f64> = (0..80).map(|i| 200.0 - i as f64).collect();
        falling[3] = 210.0;
        let series = rsi(&falling, 14);
        let late = series[79].unwrap();
        assert!(late < 1.0, "Expected RSI near 0, got {late}");
    }

    #[test]
    fn rsi_stays_within_bounds_on_choppy_prices() {
        let prices: Vec<f64> = (0..200).map(|i| 50.0 + ((i * 37) % 23) as f64 - 11.0).collect();
        for v in rsi(&prices, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v), "RSI out of range: {v}");
        }
    }
}

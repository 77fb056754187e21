use super::{sma, Series};

/// Upper/middle/lower envelope around a moving average.
#[derive(Debug, Clone, PartialEq)]
pub struct Bands {
    pub upper: Series,
    pub middle: Series,
    pub lower: Series,
}

/// Moving-average envelope: SMA(length) shifted up and down by `percent`.
pub fn envelope(closes: &[f64], length: usize, percent: f64) -> Bands {
    let middle = sma(closes, length);
    let ratio = percent / 100.0;
    Bands {
        upper: middle.iter().map(|m| m.map(|m| m * (1.0 + ratio))).collect(),
        lower: middle.iter().map(|m| m.map(|m| m * (1.0 - ratio))).collect(),
        middle,
    }
}

/// Bollinger Bands: SMA(length) ± `num_std` population standard deviations.
pub fn bollinger_bands(closes: &[f64], length: usize, num_std: f64) -> Bands {
    let middle = sma(closes, length);
    let mut upper = vec![None; closes.len()];
    let mut lower = vec![None; closes.len()];

    for (i, mean) in middle.iter().enumerate() {
        let Some(mean) = mean else { continue };
        let window = &closes[i + 1 - length..=i];
        let variance =
            window.iter().map(|c| (c - mean) * (c - mean)).sum::<f64>() / length as f64;
        let std = variance.sqrt();
        upper[i] = Some(mean + num_std * std);
        lower[i] = Some(mean - num_std * std);
    }

    Bands { upper, middle, lower }
}

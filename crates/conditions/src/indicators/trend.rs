use super::Series;

/// Bar-over-bar direction of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Rising,
    Falling,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Rising => write!(f, "Rising"),
            Direction::Falling => write!(f, "Falling"),
        }
    }
}

/// A reversal across three consecutive values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Turn {
    Up,
    Down,
}

impl std::fmt::Display for Turn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Turn::Up => write!(f, "Turned Up"),
            Turn::Down => write!(f, "Turned Down"),
        }
    }
}

/// `None` when the two values are equal.
pub fn direction(prev: f64, curr: f64) -> Option<Direction> {
    if curr > prev {
        Some(Direction::Rising)
    } else if curr < prev {
        Some(Direction::Falling)
    } else {
        None
    }
}

/// Falling-then-rising is `Turn::Up`, rising-then-falling is `Turn::Down`.
pub fn turn(a: f64, b: f64, c: f64) -> Option<Turn> {
    match (direction(a, b), direction(b, c)) {
        (Some(Direction::Falling), Some(Direction::Rising)) => Some(Turn::Up),
        (Some(Direction::Rising), Some(Direction::Falling)) => Some(Turn::Down),
        _ => None,
    }
}

/// Slope of the least-squares line through `ys` at x = 0, 1, 2, ...
pub fn least_squares_slope(ys: &[f64]) -> Option<f64> {
    let n = ys.len();
    if n < 2 {
        return None;
    }
    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = ys.iter().sum::<f64>() / n_f;

    let (mut num, mut den) = (0.0, 0.0);
    for (x, y) in ys.iter().enumerate() {
        let dx = x as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    Some(num / den)
}

/// Number of consecutive strict steps in `direction`, walking backward from
/// index `at`. Stops at the first non-conforming step, a missing or
/// non-finite value, or the start of the series.
pub fn count_run(series: &Series, at: usize, want: Direction) -> usize {
    let mut count = 0;
    let mut i = at.min(series.len().saturating_sub(1));
    while i >= 1 {
        let (Some(prev), Some(curr)) = (series[i - 1], series[i]) else { break };
        if !prev.is_finite() || !curr.is_finite() || direction(prev, curr) != Some(want) {
            break;
        }
        count += 1;
        i -= 1;
    }
    count
}

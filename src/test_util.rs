//! Deterministic synthetic charts shared by the unit tests.

use crate::patterns::DoublePeakKind;
use crate::Candles;

/// Candles around a closing path: high = close + 1, low = close − 1, open =
/// previous close.
pub(crate) fn candles_from_path(path: &[f64]) -> Candles {
    let n = path.len();
    let time: Vec<i64> = (0..n as i64).collect();
    let open: Vec<f64> = (0..n)
        .map(|i| if i == 0 { path[0] } else { path[i - 1] })
        .collect();
    let high: Vec<f64> = path.iter().map(|v| v + 1.0).collect();
    let low: Vec<f64> = path.iter().map(|v| v - 1.0).collect();
    let close = path.to_vec();
    let volume = vec![1_000.0; n];
    Candles::new(time, open, high, low, close, volume).unwrap()
}

/// Symmetric triangle wave in `[-1, 1]` with the given leg length.
fn triangle_unit(i: usize, leg: usize) -> f64 {
    let cycle = 2 * leg;
    let phase = i % cycle;
    if phase < leg {
        -1.0 + 2.0 * phase as f64 / leg as f64
    } else {
        1.0 - 2.0 * (phase - leg) as f64 / leg as f64
    }
}

/// Oscillation around a drifting base: swing highs and lows each sit on a
/// straight line with the same slope.
pub(crate) fn channel_candles(n: usize, drift: f64) -> Candles {
    let path: Vec<f64> = (0..n)
        .map(|i| 100.0 + drift * i as f64 + 8.0 * triangle_unit(i, 13))
        .collect();
    candles_from_path(&path)
}

/// Oscillation with decaying amplitude: falling highs, rising lows.
pub(crate) fn triangle_candles(n: usize) -> Candles {
    let path: Vec<f64> = (0..n)
        .map(|i| {
            let amp = 20.0 - 14.0 * i as f64 / n as f64;
            100.0 + amp * triangle_unit(i, 13)
        })
        .collect();
    candles_from_path(&path)
}

/// Both envelopes trending the same way while converging.
pub(crate) fn wedge_candles(n: usize, rising: bool) -> Candles {
    let path: Vec<f64> = (0..n)
        .map(|i| {
            let i = i as f64;
            let (low_env, high_env) = if rising {
                (100.0 + 0.8 * i, 130.0 + 0.65 * i)
            } else {
                (230.0 - 0.8 * i, 260.0 - 0.65 * i)
            };
            let t = (triangle_unit(i as usize, 13) + 1.0) / 2.0;
            low_env + (high_env - low_env) * t
        })
        .collect();
    candles_from_path(&path)
}

/// Oscillation with growing amplitude.
pub(crate) fn broadening_candles(n: usize) -> Candles {
    let path: Vec<f64> = (0..n)
        .map(|i| {
            let amp = 4.0 + 16.0 * i as f64 / n as f64;
            100.0 + amp * triangle_unit(i, 13)
        })
        .collect();
    candles_from_path(&path)
}

/// Linear ramp helper for piecewise paths.
fn ramp(path: &mut Vec<f64>, to: f64, bars: usize) {
    let from = *path.last().unwrap();
    for i in 1..=bars {
        path.push(from + (to - from) * i as f64 / bars as f64);
    }
}

/// Two equal extrema around a deep middle leg, then a sideways tail. When
/// `broken` the tail closes through the middle level instead.
pub(crate) fn double_peak_candles(kind: DoublePeakKind, broken: bool) -> Candles {
    let mut path = vec![100.0];
    ramp(&mut path, 125.0, 12); // first peak
    ramp(&mut path, 100.0, 10); // valley floor
    ramp(&mut path, 125.0, 10); // second peak
    let tail = if broken { 88.0 } else { 112.0 };
    ramp(&mut path, tail, 12);
    for _ in 0..10 {
        path.push(tail);
    }
    if matches!(kind, DoublePeakKind::Bottom) {
        // Mirror around the midline.
        for v in &mut path {
            *v = 212.0 - *v;
        }
    }
    candles_from_path(&path)
}

/// Shoulder / trough / head / trough / shoulder, then a drift away.
pub(crate) fn head_shoulders_candles(inverse: bool) -> Candles {
    let mut path = vec![100.0];
    ramp(&mut path, 112.0, 8); // left shoulder
    ramp(&mut path, 100.0, 8); // left trough
    ramp(&mut path, 126.0, 8); // head
    ramp(&mut path, 101.0, 8); // right trough
    ramp(&mut path, 113.0, 8); // right shoulder
    ramp(&mut path, 95.0, 10); // breakdown leg
    for _ in 0..6 {
        path.push(95.0);
    }
    if inverse {
        for v in &mut path {
            *v = 212.0 - *v;
        }
    }
    candles_from_path(&path)
}

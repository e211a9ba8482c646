//! Double top / double bottom detection.

use crate::series::Series;
use crate::zigzag::{zigzag_candles, SwingKind, SwingPoint, ZigZagParams};
use crate::{Candles, Result};

use super::{atr_with_fallback, Timespan};

// ============================================================
// TYPES & PARAMETERS
// ============================================================

/// Which way the formation points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DoublePeakKind {
    Top,
    Bottom,
}

/// Local shape of one extremum: sharp spike or rounded turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PeakShape {
    Adam,
    Eve,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DoublePeakParams {
    pub zigzag: ZigZagParams,
    /// Max price difference between the two extrema, in ATR units.
    pub price_max_difference_atr: f64,
    /// Max price difference as a percentage of the first extremum.
    pub price_max_difference_pct: f64,
    /// Minimum depth of the valley floor between the extrema, in ATR units.
    pub valley_min_depth_atr: f64,
    /// Close beyond the support line by more than this (ATR units) ends the
    /// formation.
    pub break_tolerance_atr: f64,
    pub atr_length: usize,
    /// Half width of the neighborhood used for Adam/Eve classification.
    pub shape_window: usize,
    pub timespan: Timespan,
}

impl Default for DoublePeakParams {
    fn default() -> Self {
        Self {
            zigzag: ZigZagParams::default(),
            price_max_difference_atr: 1.0,
            price_max_difference_pct: 2.0,
            valley_min_depth_atr: 2.0,
            break_tolerance_atr: 0.5,
            atr_length: 14,
            shape_window: 3,
            timespan: Timespan::Long,
        }
    }
}

/// A double top or bottom. `support` is the horizontal line from the valley
/// floor, rendered from the first extremum to the chart end.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DoublePeak {
    pub kind: DoublePeakKind,
    pub first: SwingPoint,
    pub second: SwingPoint,
    pub valley: SwingPoint,
    pub first_shape: PeakShape,
    pub second_shape: PeakShape,
    pub support: Series,
    /// True while no candle has closed decisively beyond the support line.
    pub in_force: bool,
}

// ============================================================
// DETECTION
// ============================================================

/// Find the best double top/bottom in the timespan window, or `None`.
///
/// Candidates are consecutive extremum/valley/extremum zigzag triples whose
/// extrema agree in price within both the ATR and percentage limits and whose
/// valley is deep enough. The best candidate maximizes valley depth minus
/// peak mismatch (both in ATR units), latest first on ties.
pub fn find_double_peak_formation(
    candles: &Candles,
    kind: DoublePeakKind,
    params: &DoublePeakParams,
) -> Result<Option<DoublePeak>> {
    if candles.is_empty() {
        return Ok(None);
    }
    let window_start = candles.len().saturating_sub(params.timespan.bars());
    // The trailing unconfirmed extreme is an in-progress leg, not a peak.
    let swings: Vec<SwingPoint> = zigzag_candles(candles, &params.zigzag)?
        .into_iter()
        .filter(|s| s.confirmed)
        .collect();
    let (atr, fallback_atr) = atr_with_fallback(candles, params.atr_length)?;

    let extremum_kind = match kind {
        DoublePeakKind::Top => SwingKind::High,
        DoublePeakKind::Bottom => SwingKind::Low,
    };
    let mut best: Option<(f64, DoublePeak)> = None;
    for window in swings.windows(3) {
        let [first, valley, second] = [window[0], window[1], window[2]];
        if first.kind != extremum_kind || second.kind != extremum_kind {
            continue;
        }
        if first.index < window_start {
            continue;
        }
        let a = atr.get(second.index).unwrap_or(fallback_atr);

        let diff = (first.price - second.price).abs();
        if diff > params.price_max_difference_atr * a {
            continue;
        }
        if diff > params.price_max_difference_pct / 100.0 * first.price.abs() {
            continue;
        }
        let depth = match kind {
            DoublePeakKind::Top => first.price.min(second.price) - valley.price,
            DoublePeakKind::Bottom => valley.price - first.price.max(second.price),
        };
        if depth < params.valley_min_depth_atr * a {
            continue;
        }

        let quality = depth / a - diff / a;
        let replace = best
            .as_ref()
            .map_or(true, |(held, _)| quality >= *held);
        if replace {
            let candidate = DoublePeak {
                kind,
                first,
                second,
                valley,
                first_shape: classify_shape(candles, first, a, params.shape_window),
                second_shape: classify_shape(candles, second, a, params.shape_window),
                support: support_series(candles.len(), first.index, valley.price),
                in_force: still_in_force(candles, kind, second.index, valley.price, a, params),
            };
            best = Some((quality, candidate));
        }
    }
    Ok(best.map(|(_, p)| p))
}

/// Horizontal line at the valley price from `start` to the chart end.
fn support_series(chart_len: usize, start: usize, price: f64) -> Series {
    Series::from_cells((0..chart_len).map(|i| (i >= start).then_some(price)).collect())
}

/// Adam when the extremum stands clear of its immediate neighborhood; Eve
/// when the turn is rounded.
fn classify_shape(candles: &Candles, peak: SwingPoint, atr: f64, half_width: usize) -> PeakShape {
    let source = match peak.kind {
        SwingKind::High => candles.high(),
        SwingKind::Low => candles.low(),
    };
    let lo = peak.index.saturating_sub(half_width);
    let hi = (peak.index + half_width).min(candles.len() - 1);
    let mut sum = 0.0;
    let mut count = 0.0;
    for i in lo..=hi {
        if i == peak.index {
            continue;
        }
        if let Some(v) = source.get(i) {
            sum += v;
            count += 1.0;
        }
    }
    if count == 0.0 {
        return PeakShape::Adam;
    }
    let prominence = (peak.price - sum / count).abs();
    if prominence >= 0.5 * atr {
        PeakShape::Adam
    } else {
        PeakShape::Eve
    }
}

/// The formation holds until a close lands beyond the support line by more
/// than the break tolerance.
fn still_in_force(
    candles: &Candles,
    kind: DoublePeakKind,
    after: usize,
    support: f64,
    atr: f64,
    params: &DoublePeakParams,
) -> bool {
    let tolerance = params.break_tolerance_atr * atr;
    for i in after + 1..candles.len() {
        let Some(close) = candles.close().get(i) else {
            continue;
        };
        let broken = match kind {
            DoublePeakKind::Top => close < support - tolerance,
            DoublePeakKind::Bottom => close > support + tolerance,
        };
        if broken {
            return false;
        }
    }
    true
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{channel_candles, double_peak_candles};

    fn params() -> DoublePeakParams {
        DoublePeakParams {
            zigzag: ZigZagParams {
                depth: 5,
                deviation: 3.0,
                backstep: 2,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_double_top_in_force() {
        // Two equal peaks, deep valley, no close below the valley afterwards.
        let candles = double_peak_candles(DoublePeakKind::Top, false);
        let found = find_double_peak_formation(&candles, DoublePeakKind::Top, &params())
            .unwrap()
            .expect("double top");
        assert!(found.in_force);
        assert!(found.first.index < found.valley.index);
        assert!(found.valley.index < found.second.index);
        assert!((found.first.price - found.second.price).abs() < 2.0);
        assert_eq!(found.support.get(found.valley.index), Some(found.valley.price));
    }

    #[test]
    fn test_double_top_broken() {
        let candles = double_peak_candles(DoublePeakKind::Top, true);
        let found = find_double_peak_formation(&candles, DoublePeakKind::Top, &params())
            .unwrap()
            .expect("double top");
        assert!(!found.in_force);
    }

    #[test]
    fn test_double_bottom() {
        let candles = double_peak_candles(DoublePeakKind::Bottom, false);
        let found = find_double_peak_formation(&candles, DoublePeakKind::Bottom, &params())
            .unwrap()
            .expect("double bottom");
        assert!(found.in_force);
        assert!(found.valley.price > found.first.price);
    }

    #[test]
    fn test_trending_chart_has_no_double_top() {
        // Successive swing highs keep rising; no pair agrees in price. The
        // truncated final leg must not pose as a second peak either.
        for drift in [0.6, 0.8] {
            let candles = channel_candles(160, drift);
            let found =
                find_double_peak_formation(&candles, DoublePeakKind::Top, &params()).unwrap();
            assert!(found.is_none(), "phantom double top at drift {drift}");
        }
    }

    #[test]
    fn test_empty_chart() {
        let candles = Candles::new(vec![], vec![], vec![], vec![], vec![], vec![]).unwrap();
        assert!(
            find_double_peak_formation(&candles, DoublePeakKind::Top, &params())
                .unwrap()
                .is_none()
        );
    }
}

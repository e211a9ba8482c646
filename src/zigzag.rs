//! ZigZag swing extraction: reduces a dense price series to an alternating
//! sequence of swing highs and lows.

use crate::series::Series;
use crate::{Candles, EngineError, Result};

// ============================================================
// TYPES
// ============================================================

/// Which side of price action a swing point marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SwingKind {
    High,
    Low,
}

impl SwingKind {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            SwingKind::High => SwingKind::Low,
            SwingKind::Low => SwingKind::High,
        }
    }
}

/// A locally extreme high or low. Produced in index order; consecutive points
/// strictly alternate kind.
///
/// The last point of an extraction may be the in-progress leg's extreme,
/// flagged `confirmed: false`. Shape matchers build on confirmed swings only.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SwingPoint {
    pub index: usize,
    pub price: f64,
    pub kind: SwingKind,
    pub confirmed: bool,
}

fn swing(index: usize, price: f64, kind: SwingKind) -> SwingPoint {
    SwingPoint {
        index,
        price,
        kind,
        confirmed: false,
    }
}

/// ZigZag extraction parameters.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct ZigZagParams {
    /// Minimum bars between confirmed swings.
    pub depth: usize,
    /// Minimum percent move from the last confirmed swing to confirm a new one.
    pub deviation: f64,
    /// Minimum bars the scan must advance past a tentative extreme before it
    /// can be finalized.
    pub backstep: usize,
}

impl Default for ZigZagParams {
    fn default() -> Self {
        Self {
            depth: 12,
            deviation: 5.0,
            backstep: 3,
        }
    }
}

impl ZigZagParams {
    fn validate(&self) -> Result<()> {
        if self.depth == 0 {
            return Err(EngineError::Configuration {
                param: "depth",
                reason: "must be > 0",
            });
        }
        if !self.deviation.is_finite() || self.deviation < 0.0 {
            return Err(EngineError::Configuration {
                param: "deviation",
                reason: "must be a non-negative finite percentage",
            });
        }
        Ok(())
    }
}

// ============================================================
// EXTRACTION
// ============================================================

fn pct_move(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        return 0.0;
    }
    ((to - from) / from).abs() * 100.0
}

/// Extract alternating swing points from high/low series.
///
/// Both sides seed from the chart start; the first counter-move satisfying
/// `deviation` and `backstep` picks the direction and confirms the starting
/// extreme. From there the scan holds one tentative extreme: a reversal
/// confirms it only when the counter-move satisfies `deviation`, the
/// tentative swing sits at least `depth` bars from the last confirmed swing,
/// and at least `backstep` bars have passed since the tentative extreme
/// without a superior same-side candidate.
///
/// A counter-leg that never matures is folded back into the prior leg: when
/// price breaks past the last confirmed swing before the tentative opposite
/// extreme confirms, that swing is revised instead of the scan freezing on a
/// dead tentative.
///
/// The final tentative extreme is appended with `confirmed: false` so callers
/// can see the latest leg. Empty input or insufficient history yields an
/// empty list, never an error.
pub fn zigzag(high: &Series, low: &Series, params: &ZigZagParams) -> Result<Vec<SwingPoint>> {
    params.validate()?;
    if high.len() != low.len() {
        return Err(EngineError::Precondition(format!(
            "high ({}) and low ({}) series lengths differ",
            high.len(),
            low.len()
        )));
    }

    let n = high.len();
    let mut swings: Vec<SwingPoint> = Vec::new();
    let mut tentative: Option<SwingPoint> = None;
    let mut anchor: Option<SwingPoint> = None; // last confirmed swing

    // Running extremes of both sides until the first qualifying move picks
    // the initial direction.
    let mut seed_high: Option<SwingPoint> = None;
    let mut seed_low: Option<SwingPoint> = None;

    for i in 0..n {
        let (Some(h), Some(l)) = (high.get(i), low.get(i)) else {
            continue;
        };

        let Some(t) = tentative else {
            let sh = match seed_high {
                Some(s) if h <= s.price => s,
                _ => swing(i, h, SwingKind::High),
            };
            let sl = match seed_low {
                Some(s) if l >= s.price => s,
                _ => swing(i, l, SwingKind::Low),
            };
            seed_high = Some(sh);
            seed_low = Some(sl);
            let from_low =
                pct_move(sl.price, h) >= params.deviation && i - sl.index >= params.backstep;
            let from_high =
                pct_move(sh.price, l) >= params.deviation && i - sh.index >= params.backstep;
            // The earlier extreme wins when both sides qualify at once.
            if from_low && (!from_high || sl.index <= sh.index) {
                let first = SwingPoint {
                    confirmed: true,
                    ..sl
                };
                swings.push(first);
                anchor = Some(first);
                tentative = Some(swing(i, h, SwingKind::High));
            } else if from_high {
                let first = SwingPoint {
                    confirmed: true,
                    ..sh
                };
                swings.push(first);
                anchor = Some(first);
                tentative = Some(swing(i, l, SwingKind::Low));
            }
            continue;
        };

        match t.kind {
            SwingKind::High => {
                if anchor.map_or(false, |a| l < a.price) {
                    // Price broke the last confirmed low before this rally
                    // confirmed; the rally was interim. Fold it back, keeping
                    // the higher of the two highs as the revised swing.
                    swings.pop();
                    if let Some(last) = swings.last_mut() {
                        if t.price > last.price {
                            *last = SwingPoint {
                                confirmed: true,
                                ..t
                            };
                        }
                    }
                    anchor = swings.last().copied();
                    tentative = Some(swing(i, l, SwingKind::Low));
                } else if h > t.price {
                    // Superior same-side candidate: revise the tentative high.
                    tentative = Some(swing(i, h, SwingKind::High));
                } else if pct_move(t.price, l) >= params.deviation
                    && i - t.index >= params.backstep
                    && anchor.map_or(true, |a| t.index - a.index >= params.depth)
                {
                    let c = SwingPoint {
                        confirmed: true,
                        ..t
                    };
                    swings.push(c);
                    anchor = Some(c);
                    tentative = Some(swing(i, l, SwingKind::Low));
                }
            }
            SwingKind::Low => {
                if anchor.map_or(false, |a| h > a.price) {
                    swings.pop();
                    if let Some(last) = swings.last_mut() {
                        if t.price < last.price {
                            *last = SwingPoint {
                                confirmed: true,
                                ..t
                            };
                        }
                    }
                    anchor = swings.last().copied();
                    tentative = Some(swing(i, h, SwingKind::High));
                } else if l < t.price {
                    tentative = Some(swing(i, l, SwingKind::Low));
                } else if pct_move(t.price, h) >= params.deviation
                    && i - t.index >= params.backstep
                    && anchor.map_or(true, |a| t.index - a.index >= params.depth)
                {
                    let c = SwingPoint {
                        confirmed: true,
                        ..t
                    };
                    swings.push(c);
                    anchor = Some(c);
                    tentative = Some(swing(i, h, SwingKind::High));
                }
            }
        }
    }

    // The in-progress leg is still useful to callers, flagged as such.
    if let Some(t) = tentative {
        let alternates = swings.last().map_or(true, |last| last.kind != t.kind);
        let spaced = anchor.map_or(true, |a| t.index > a.index);
        if alternates && spaced {
            swings.push(t);
        }
    }

    Ok(swings)
}

/// [`zigzag`] over a candle chart's own high/low series.
pub fn zigzag_candles(candles: &Candles, params: &ZigZagParams) -> Result<Vec<SwingPoint>> {
    zigzag(candles.high(), candles.low(), params)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: Vec<f64>) -> Series {
        Series::from_values(values)
    }

    fn ramp(path: &mut Vec<f64>, to: f64, bars: usize) {
        let from = *path.last().unwrap();
        for i in 1..=bars {
            path.push(from + (to - from) * i as f64 / bars as f64);
        }
    }

    fn high_low(values: &[f64]) -> (Series, Series) {
        (
            series(values.iter().map(|v| v + 1.0).collect()),
            series(values.iter().map(|v| v - 1.0).collect()),
        )
    }

    /// Triangle wave oscillating between 100 and 150 with a given leg length.
    fn triangle_wave(cycles: usize, leg: usize) -> (Series, Series) {
        let mut values = Vec::new();
        for _ in 0..cycles {
            for i in 0..leg {
                values.push(100.0 + 50.0 * i as f64 / leg as f64);
            }
            for i in 0..leg {
                values.push(150.0 - 50.0 * i as f64 / leg as f64);
            }
        }
        high_low(&values)
    }

    fn default_params() -> ZigZagParams {
        ZigZagParams {
            depth: 5,
            deviation: 3.0,
            backstep: 2,
        }
    }

    #[test]
    fn test_empty_input() {
        let swings = zigzag(&series(vec![]), &series(vec![]), &default_params()).unwrap();
        assert!(swings.is_empty());
    }

    #[test]
    fn test_short_input_no_error() {
        let swings = zigzag(
            &series(vec![101.0, 102.0]),
            &series(vec![99.0, 100.0]),
            &default_params(),
        )
        .unwrap();
        // At most the tentative extreme; never an error.
        assert!(swings.len() <= 1);
    }

    #[test]
    fn test_alternation_and_monotone_indices() {
        let (high, low) = triangle_wave(4, 10);
        let swings = zigzag(&high, &low, &default_params()).unwrap();
        assert!(swings.len() >= 4, "expected several swings, got {}", swings.len());
        for pair in swings.windows(2) {
            assert_ne!(pair[0].kind, pair[1].kind, "kinds must alternate");
            assert!(pair[0].index < pair[1].index, "indices must increase");
        }
    }

    #[test]
    fn test_finds_wave_extremes() {
        let (high, low) = triangle_wave(3, 10);
        let swings = zigzag(&high, &low, &default_params()).unwrap();
        for s in &swings {
            match s.kind {
                SwingKind::High => assert!(s.price > 140.0, "swing high at {}", s.price),
                SwingKind::Low => assert!(s.price < 110.0, "swing low at {}", s.price),
            }
        }
    }

    #[test]
    fn test_trailing_swing_flagged_unconfirmed() {
        let (high, low) = triangle_wave(3, 10);
        let swings = zigzag(&high, &low, &default_params()).unwrap();
        let (last, rest) = swings.split_last().unwrap();
        assert!(!last.confirmed, "in-progress leg must not read as confirmed");
        assert!(rest.iter().all(|s| s.confirmed));
    }

    #[test]
    fn test_initial_low_recorded_on_rising_chart() {
        // Rise straight out of the chart's bottom, then one real pullback.
        let mut path = vec![100.0];
        ramp(&mut path, 200.0, 40);
        ramp(&mut path, 160.0, 10);
        let (high, low) = high_low(&path);
        let swings = zigzag(&high, &low, &ZigZagParams::default()).unwrap();
        assert!(swings.len() >= 2, "got {} swings", swings.len());
        assert_eq!(swings[0].kind, SwingKind::Low);
        assert_eq!(swings[0].index, 0);
        assert!(swings[0].confirmed);
        assert_eq!(swings[1].kind, SwingKind::High);
        assert!(swings[1].confirmed);
    }

    #[test]
    fn test_shallow_pullback_does_not_stall() {
        // A pullback landing closer than `depth` bars to the confirmed high
        // can never confirm as a low; the rally after it must still register.
        let mut path = vec![100.0];
        ramp(&mut path, 159.0, 29);
        ramp(&mut path, 127.0, 5);
        ramp(&mut path, 428.0, 100);
        let (high, low) = high_low(&path);
        let swings = zigzag(&high, &low, &ZigZagParams::default()).unwrap();
        let last = swings.last().expect("rally produced no swing at all");
        assert_eq!(last.kind, SwingKind::High);
        assert!(last.index > 100, "extractor stalled at index {}", last.index);
        for pair in swings.windows(2) {
            assert_ne!(pair[0].kind, pair[1].kind);
            assert!(pair[0].index < pair[1].index);
        }
    }

    #[test]
    fn test_deviation_filters_noise() {
        // 1% wiggles never satisfy a 5% deviation requirement.
        let values: Vec<f64> = (0..100)
            .map(|i| 100.0 + if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        let high = series(values.iter().map(|v| v + 0.1).collect());
        let low = series(values.iter().map(|v| v - 0.1).collect());
        let params = ZigZagParams {
            depth: 3,
            deviation: 5.0,
            backstep: 2,
        };
        let swings = zigzag(&high, &low, &params).unwrap();
        assert!(swings.len() <= 1, "noise produced {} swings", swings.len());
    }

    #[test]
    fn test_param_validation() {
        let s = series(vec![1.0]);
        let bad_depth = ZigZagParams {
            depth: 0,
            ..Default::default()
        };
        assert!(zigzag(&s, &s, &bad_depth).is_err());
        let bad_dev = ZigZagParams {
            deviation: f64::NAN,
            ..Default::default()
        };
        assert!(zigzag(&s, &s, &bad_dev).is_err());
    }

    #[test]
    fn test_length_mismatch() {
        let err = zigzag(
            &series(vec![1.0, 2.0]),
            &series(vec![1.0]),
            &default_params(),
        );
        assert!(matches!(err, Err(EngineError::Precondition(_))));
    }

    #[test]
    fn test_gap_cells_skipped() {
        let high = Series::from_cells(vec![Some(101.0), None, Some(120.0), Some(110.0)]);
        let low = Series::from_cells(vec![Some(99.0), None, Some(118.0), Some(108.0)]);
        let params = ZigZagParams {
            depth: 1,
            deviation: 1.0,
            backstep: 1,
        };
        let swings = zigzag(&high, &low, &params).unwrap();
        for pair in swings.windows(2) {
            assert_ne!(pair[0].kind, pair[1].kind);
        }
    }
}

//! Trend-line enumeration and scoring.
//!
//! Candidate lines are drawn through pairs of weighted base points anchored
//! to the chart's highs or lows; every candle between the anchors (plus an
//! extension window) is classified against the line to build [`HitMetrics`],
//! which a user-supplied [`Formula`] folds into one score.

use std::cmp::Ordering;

use crate::formula::Formula;
use crate::indicators::atr;
use crate::series::Series;
use crate::zigzag::{SwingKind, SwingPoint};
use crate::{Candles, Fraction, Result};

// ============================================================
// BASE POINTS & ANCHOR FIELD
// ============================================================

/// A candidate anchor: a chart index with a relative weight.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BasePoint {
    pub index: usize,
    pub weight: f64,
}

/// Which candle field candidate lines anchor to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AnchorField {
    /// Resistance-style lines through candle highs.
    High,
    /// Support-style lines through candle lows.
    Low,
}

// ============================================================
// HIT METRICS
// ============================================================

/// Aggregate statistics describing how candles interact with a candidate
/// trend line. Distances are normalized by ATR.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HitMetrics {
    /// Closes beyond the line against the anchored side.
    pub violations: f64,
    /// Touches where the candle closed back above the line.
    pub bounce_up: f64,
    /// Touches where the candle closed back below the line.
    pub bounce_down: f64,
    /// Bounces whose wick came within the strong-touch tolerance.
    pub strong_bounce_up: f64,
    pub strong_bounce_down: f64,
    /// Local extremes above / below the line.
    pub peaks_up: f64,
    pub peaks_down: f64,
    /// Candles entirely above / below the line.
    pub candles_above: f64,
    pub candles_below: f64,
    /// Fraction of walked candles that do not violate the line.
    pub percent_clean: f64,
    /// Per-bar line slope in ATR units.
    pub slope: f64,
    /// Bars between the two anchors.
    pub length: f64,
    /// Percentiles of |anchor price − line| / ATR over the walk.
    pub deviation_p50: f64,
    pub deviation_p90: f64,
}

/// Macro wiring metric identifiers to HitMetrics fields in one place
macro_rules! define_metrics {
    (
        $(
            $variant:ident => $name:literal, $field:ident
        ),* $(,)?
    ) => {
        /// The closed set of metric identifiers available to scoring formulas.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
        pub enum Metric {
            $($variant),*
        }

        impl Metric {
            pub const NAMES: &'static [&'static str] = &[$($name),*];

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)*
                    _ => None,
                }
            }
        }

        impl HitMetrics {
            /// Read the field a formula identifier refers to.
            #[inline]
            pub fn get(&self, metric: Metric) -> f64 {
                match metric {
                    $(Metric::$variant => self.$field),*
                }
            }
        }
    };
}

define_metrics! {
    Violations => "violations", violations,
    BounceUp => "bounce_up", bounce_up,
    BounceDown => "bounce_down", bounce_down,
    StrongBounceUp => "strong_bounce_up", strong_bounce_up,
    StrongBounceDown => "strong_bounce_down", strong_bounce_down,
    PeaksUp => "peaks_up", peaks_up,
    PeaksDown => "peaks_down", peaks_down,
    CandlesAbove => "candles_above", candles_above,
    CandlesBelow => "candles_below", candles_below,
    PercentClean => "percent_clean", percent_clean,
    Slope => "slope", slope,
    Length => "length", length,
    DeviationP50 => "deviation_p50", deviation_p50,
    DeviationP90 => "deviation_p90", deviation_p90,
}

// ============================================================
// CANDIDATES & PARAMETERS
// ============================================================

/// A scored candidate trend line between two anchors.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CandidateTrendLine {
    pub from: SwingPoint,
    pub to: SwingPoint,
    pub hits: HitMetrics,
    pub score: f64,
}

impl CandidateTrendLine {
    /// Line value at an arbitrary chart index (extrapolates past the anchors).
    #[inline]
    pub fn value_at(&self, index: usize) -> f64 {
        let slope = self.slope_per_bar();
        self.from.price + slope * (index as f64 - self.from.index as f64)
    }

    /// Raw price change per bar.
    #[inline]
    pub fn slope_per_bar(&self) -> f64 {
        let run = (self.to.index - self.from.index) as f64;
        (self.to.price - self.from.price) / run
    }

    /// Render the line as a series: values over `[from, min(end, to + extend)]`,
    /// `None` elsewhere.
    pub fn to_series(&self, chart_len: usize, extend: usize) -> Series {
        let end = (self.to.index + extend).min(chart_len.saturating_sub(1));
        let cells = (0..chart_len)
            .map(|i| (i >= self.from.index && i <= end).then(|| self.value_at(i)))
            .collect();
        Series::from_cells(cells)
    }
}

/// Default scoring formula: reward clean, well-respected lines.
pub const DEFAULT_FORMULA: &str =
    "bounce_up + bounce_down + 2 * (strong_bounce_up + strong_bounce_down) \
     + percent_clean * 4 - violations * 3";

/// Deterministic pruning cap: when more base points arrive, only the highest
/// weighted survive pairing.
pub const MAX_BASE_POINTS: usize = 96;

/// Hard cap on scored candidates; enumeration stops once reached.
pub const MAX_CANDIDATES: usize = 20_000;

/// Trend scorer configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TrendParams {
    /// Scoring formula over the [`Metric`] identifiers.
    pub formula: String,
    /// Fraction of strongest candidates to return.
    pub retention: Fraction,
    /// ATR window used to normalize hit-metric distances.
    pub atr_length: usize,
    /// Bars past the `to` anchor the candle walk extends.
    pub extension: usize,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            formula: DEFAULT_FORMULA.to_string(),
            retention: Fraction::new_const(0.25),
            atr_length: 14,
            extension: 20,
        }
    }
}

// ============================================================
// SCORING
// ============================================================

const TOUCH_TOL_ATR: f64 = 0.15;
const STRONG_TOL_ATR: f64 = 0.05;

struct LineContext<'a> {
    candles: &'a Candles,
    field: AnchorField,
    atr: Series,
    fallback_atr: f64,
}

impl LineContext<'_> {
    fn atr_at(&self, i: usize) -> f64 {
        self.atr.get(i).unwrap_or(self.fallback_atr)
    }

    fn score_pair(&self, from: SwingPoint, to: SwingPoint, extension: usize) -> HitMetrics {
        let slope = (to.price - from.price) / (to.index - from.index) as f64;
        let end = (to.index + extension).min(self.candles.len() - 1);

        let mut hits = HitMetrics {
            length: (to.index - from.index) as f64,
            ..Default::default()
        };
        let mut walked = 0.0;
        let mut atr_sum = 0.0;
        let mut deviations: Vec<f64> = Vec::with_capacity(end - from.index + 1);

        for k in from.index..=end {
            let (Some(high), Some(low), Some(close)) = (
                self.candles.high().get(k),
                self.candles.low().get(k),
                self.candles.close().get(k),
            ) else {
                continue;
            };
            let a = self.atr_at(k).max(f64::MIN_POSITIVE);
            let line_y = from.price + slope * (k - from.index) as f64;
            let touch_tol = TOUCH_TOL_ATR * a;
            let strong_tol = STRONG_TOL_ATR * a;

            walked += 1.0;
            atr_sum += a;

            let anchor_price = match self.field {
                AnchorField::High => high,
                AnchorField::Low => low,
            };
            deviations.push((anchor_price - line_y).abs() / a);

            if low > line_y + touch_tol {
                hits.candles_above += 1.0;
            } else if high < line_y - touch_tol {
                hits.candles_below += 1.0;
            } else {
                // Touching the line.
                if close > line_y {
                    hits.bounce_up += 1.0;
                    if (low - line_y).abs() <= strong_tol {
                        hits.strong_bounce_up += 1.0;
                    }
                } else {
                    hits.bounce_down += 1.0;
                    if (high - line_y).abs() <= strong_tol {
                        hits.strong_bounce_down += 1.0;
                    }
                }
            }

            let violated = match self.field {
                AnchorField::High => close > line_y + touch_tol,
                AnchorField::Low => close < line_y - touch_tol,
            };
            if violated {
                hits.violations += 1.0;
            }

            // Local extremes relative to direct neighbors.
            if k > from.index && k < end {
                let prev_high = self.candles.high().get(k - 1);
                let next_high = self.candles.high().get(k + 1);
                if let (Some(ph), Some(nh)) = (prev_high, next_high) {
                    if high > ph && high > nh && high > line_y {
                        hits.peaks_up += 1.0;
                    }
                }
                let prev_low = self.candles.low().get(k - 1);
                let next_low = self.candles.low().get(k + 1);
                if let (Some(pl), Some(nl)) = (prev_low, next_low) {
                    if low < pl && low < nl && low < line_y {
                        hits.peaks_down += 1.0;
                    }
                }
            }
        }

        if walked > 0.0 {
            hits.percent_clean = 1.0 - hits.violations / walked;
            hits.slope = slope / (atr_sum / walked);
        }
        deviations.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        hits.deviation_p50 = percentile(&deviations, 0.50);
        hits.deviation_p90 = percentile(&deviations, 0.90);
        hits
    }
}

fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (q * (sorted.len() - 1) as f64).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

fn mean_available(series: &Series) -> f64 {
    let mut sum = 0.0;
    let mut count = 0.0;
    for cell in series.iter().flatten() {
        sum += cell;
        count += 1.0;
    }
    if count > 0.0 {
        sum / count
    } else {
        1.0
    }
}

/// Enumerate, score, and rank candidate trend lines.
///
/// All pairs of base points become candidates; when the point count exceeds
/// [`MAX_BASE_POINTS`] the highest-weight points are kept (weight descending,
/// then index ascending), and [`MAX_CANDIDATES`] bounds the
/// scored-candidate walk. Candidates for which `drop` returns true are
/// discarded before ranking. The strongest `params.retention` fraction is
/// returned, sorted by score descending with index tie-breaks.
pub fn find_trends(
    candles: &Candles,
    points: &[BasePoint],
    field: AnchorField,
    params: &TrendParams,
    drop: Option<&dyn Fn(&CandidateTrendLine) -> bool>,
) -> Result<Vec<CandidateTrendLine>> {
    // Parse before any scoring work.
    let formula = Formula::parse(&params.formula)?;
    if candles.is_empty() {
        return Ok(Vec::new());
    }
    let atr_series = atr(candles, params.atr_length)?;

    let source = match field {
        AnchorField::High => candles.high(),
        AnchorField::Low => candles.low(),
    };
    let swing_kind = match field {
        AnchorField::High => SwingKind::High,
        AnchorField::Low => SwingKind::Low,
    };

    // Keep only points with a present anchor value and a usable weight.
    let mut points: Vec<(BasePoint, f64)> = points
        .iter()
        .copied()
        .filter(|p| p.weight.is_finite() && p.weight >= 0.0)
        .filter_map(|p| source.get(p.index).map(|price| (p, price)))
        .collect();
    points.sort_by(|a, b| a.0.index.cmp(&b.0.index));
    points.dedup_by_key(|p| p.0.index);

    if points.len() > MAX_BASE_POINTS {
        points.sort_by(|a, b| {
            b.0.weight
                .partial_cmp(&a.0.weight)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.index.cmp(&b.0.index))
        });
        points.truncate(MAX_BASE_POINTS);
        points.sort_by(|a, b| a.0.index.cmp(&b.0.index));
    }

    let ctx = LineContext {
        candles,
        field,
        fallback_atr: mean_available(&atr_series),
        atr: atr_series,
    };

    let mut candidates: Vec<CandidateTrendLine> = Vec::new();
    'outer: for (i, (a, a_price)) in points.iter().enumerate() {
        for (b, b_price) in &points[i + 1..] {
            if candidates.len() >= MAX_CANDIDATES {
                break 'outer;
            }
            let from = SwingPoint {
                index: a.index,
                price: *a_price,
                kind: swing_kind,
                confirmed: true,
            };
            let to = SwingPoint {
                index: b.index,
                price: *b_price,
                kind: swing_kind,
                confirmed: true,
            };
            let hits = ctx.score_pair(from, to, params.extension);
            let score = formula.eval(&hits) * (a.weight + b.weight) / 2.0;
            let candidate = CandidateTrendLine {
                from,
                to,
                hits,
                score,
            };
            if drop.map_or(false, |f| f(&candidate)) {
                continue;
            }
            candidates.push(candidate);
        }
    }

    candidates.sort_by(|a, b| {
        let key = |c: &CandidateTrendLine| {
            if c.score.is_finite() {
                c.score
            } else {
                f64::NEG_INFINITY
            }
        };
        key(b)
            .partial_cmp(&key(a))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.from.index.cmp(&b.from.index))
            .then_with(|| a.to.index.cmp(&b.to.index))
    });

    let keep = ((candidates.len() as f64) * params.retention.get()).ceil() as usize;
    candidates.truncate(keep.min(candidates.len()));
    Ok(candidates)
}

// ============================================================
// TESTS
// ============================================================

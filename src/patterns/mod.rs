//! Geometric chart-pattern matchers.
//!
//! Every matcher follows the same pipeline: extract zigzag swings, select a
//! subset matching the target shape's topology, fit lines through the anchors
//! with the trend scorer, then apply shape-specific numeric constraints. A
//! matcher returns the single best candidate or `None`, never a degenerate
//! best-effort shape.

pub mod double_peak;
pub mod head_shoulders;
pub mod lines;

pub use double_peak::{
    find_double_peak_formation, DoublePeak, DoublePeakKind, DoublePeakParams, PeakShape,
};
pub use head_shoulders::{find_head_and_shoulders, HeadShoulders, HeadShouldersParams};
pub use lines::{
    find_broadening, find_channel, find_triangle, find_wedge, BroadeningParams, ChannelType,
    LinePatternParams, TriangleType, TwoLinePattern, WedgeType,
};

use rayon::prelude::*;

use crate::indicators::atr;
use crate::series::Series;
use crate::trend::{find_trends, AnchorField, BasePoint, CandidateTrendLine, TrendParams};
use crate::zigzag::{SwingKind, SwingPoint};
use crate::{Candles, EngineError, Result};

// ============================================================
// TIMESPAN
// ============================================================

/// Lookback bucket for the line-based matchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Timespan {
    Short,
    Long,
}

impl Timespan {
    /// Fixed lookback in bars.
    #[inline]
    pub fn bars(self) -> usize {
        match self {
            Timespan::Short => 50,
            Timespan::Long => 150,
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "short" => Ok(Timespan::Short),
            "long" => Ok(Timespan::Long),
            _ => Err(EngineError::Configuration {
                param: "timespan",
                reason: "expected 'short' or 'long'",
            }),
        }
    }
}

// ============================================================
// SHARED FITTING HELPERS
// ============================================================

/// Best trend line through the confirmed swings of one kind at or after
/// `from_index`. Fewer than two usable anchors yields `None`.
pub(crate) fn best_line(
    candles: &Candles,
    swings: &[SwingPoint],
    kind: SwingKind,
    from_index: usize,
    trend: &TrendParams,
) -> Result<Option<CandidateTrendLine>> {
    let points: Vec<BasePoint> = swings
        .iter()
        .filter(|s| s.confirmed && s.kind == kind && s.index >= from_index)
        .map(|s| BasePoint {
            index: s.index,
            weight: 1.0,
        })
        .collect();
    if points.len() < 2 {
        return Ok(None);
    }
    let field = match kind {
        SwingKind::High => AnchorField::High,
        SwingKind::Low => AnchorField::Low,
    };
    let ranked = find_trends(candles, &points, field, trend, None)?;
    Ok(ranked.into_iter().next())
}

/// ATR series plus a fallback for indices where it is not yet seeded.
pub(crate) fn atr_with_fallback(candles: &Candles, length: usize) -> Result<(Series, f64)> {
    let series = atr(candles, length)?;
    let mut sum = 0.0;
    let mut count = 0.0;
    for v in series.iter().flatten() {
        sum += v;
        count += 1.0;
    }
    let fallback = if count > 0.0 { sum / count } else { 1.0 };
    Ok((series, fallback))
}

/// Straight line through two swing points rendered over `[start, chart_len)`.
pub(crate) fn line_through(
    a: SwingPoint,
    b: SwingPoint,
    start: usize,
    chart_len: usize,
) -> Series {
    let slope = (b.price - a.price) / (b.index as f64 - a.index as f64);
    let cells = (0..chart_len)
        .map(|i| (i >= start).then(|| a.price + slope * (i as f64 - a.index as f64)))
        .collect();
    Series::from_cells(cells)
}

// ============================================================
// PATTERN SUITE
// ============================================================

/// Configured bundle running every matcher over one chart.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PatternSuite {
    pub timespan: Option<Timespan>,
    pub lines: LinePatternParams,
    pub broadening: BroadeningParams,
    pub double_peak: DoublePeakParams,
    pub head_shoulders: HeadShouldersParams,
}

/// Everything the suite found on one chart. Absent shapes are `None`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SuiteReport {
    pub channel: Option<TwoLinePattern>,
    pub triangle: Option<TwoLinePattern>,
    pub wedge: Option<TwoLinePattern>,
    pub broadening: Option<TwoLinePattern>,
    pub double_top: Option<DoublePeak>,
    pub double_bottom: Option<DoublePeak>,
    pub head_and_shoulders: Option<HeadShoulders>,
    pub inverse_head_and_shoulders: Option<HeadShoulders>,
}

impl SuiteReport {
    /// Count of shapes present.
    pub fn found(&self) -> usize {
        self.channel.is_some() as usize
            + self.triangle.is_some() as usize
            + self.wedge.is_some() as usize
            + self.broadening.is_some() as usize
            + self.double_top.is_some() as usize
            + self.double_bottom.is_some() as usize
            + self.head_and_shoulders.is_some() as usize
            + self.inverse_head_and_shoulders.is_some() as usize
    }
}

impl PatternSuite {
    /// Run every matcher. Each shape slot holds the best variant found, trying
    /// the configured timespan or both buckets when unset.
    pub fn run(&self, candles: &Candles) -> Result<SuiteReport> {
        let spans: &[Timespan] = match self.timespan {
            Some(t) => match t {
                Timespan::Short => &[Timespan::Short],
                Timespan::Long => &[Timespan::Long],
            },
            None => &[Timespan::Short, Timespan::Long],
        };

        let mut channel = None;
        let mut triangle = None;
        let mut wedge = None;
        let mut broadening = None;
        for &span in spans {
            for ct in [
                ChannelType::Ascending,
                ChannelType::Descending,
                ChannelType::Horizontal,
            ] {
                pick_better(&mut channel, find_channel(candles, ct, span, &self.lines)?);
            }
            for tt in [
                TriangleType::Symmetrical,
                TriangleType::Ascending,
                TriangleType::Descending,
            ] {
                pick_better(&mut triangle, find_triangle(candles, tt, span, &self.lines)?);
            }
            for wt in [WedgeType::Rising, WedgeType::Falling] {
                pick_better(&mut wedge, find_wedge(candles, wt, span, &self.lines)?);
            }
            pick_better(
                &mut broadening,
                find_broadening(candles, span, &self.broadening)?,
            );
        }

        let inverse = HeadShouldersParams {
            inverse: true,
            ..self.head_shoulders.clone()
        };
        Ok(SuiteReport {
            channel,
            triangle,
            wedge,
            broadening,
            double_top: find_double_peak_formation(
                candles,
                DoublePeakKind::Top,
                &self.double_peak,
            )?,
            double_bottom: find_double_peak_formation(
                candles,
                DoublePeakKind::Bottom,
                &self.double_peak,
            )?,
            head_and_shoulders: find_head_and_shoulders(candles, &self.head_shoulders)?,
            inverse_head_and_shoulders: find_head_and_shoulders(candles, &inverse)?,
        })
    }
}

fn pick_better(slot: &mut Option<TwoLinePattern>, candidate: Option<TwoLinePattern>) {
    if let Some(c) = candidate {
        let better = slot.as_ref().map_or(true, |held| c.score > held.score);
        if better {
            *slot = Some(c);
        }
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

/// Error from scanning a single instrument
#[derive(Debug)]
pub struct SuiteError {
    pub symbol: String,
    pub error: EngineError,
}

/// Run one suite across many instruments in parallel, partitioning per-symbol
/// successes and errors.
pub fn scan_parallel<'a, I>(
    suite: &PatternSuite,
    instruments: I,
) -> (Vec<(String, SuiteReport)>, Vec<SuiteError>)
where
    I: IntoParallelIterator<Item = (&'a str, &'a Candles)>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, candles)| {
            suite
                .run(candles)
                .map(|report| (symbol.to_string(), report))
                .map_err(|error| SuiteError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }
    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================

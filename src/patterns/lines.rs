//! Two-line shapes: channels, triangles, wedges, broadening formations.
//!
//! Each finder fits one line through swing highs and one through swing lows
//! over the timespan window, then checks the pair against the requested
//! shape's slope and width grammar. Slopes are compared in ATR units per bar,
//! so the tolerances below are scale free.

use crate::series::Series;
use crate::trend::{CandidateTrendLine, TrendParams};
use crate::zigzag::{zigzag_candles, SwingKind, ZigZagParams};
use crate::{Candles, Fraction, Result};

use super::{best_line, Timespan};

// ============================================================
// TYPES & PARAMETERS
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ChannelType {
    Ascending,
    Descending,
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TriangleType {
    Symmetrical,
    /// Flat top, rising bottom.
    Ascending,
    /// Flat bottom, falling top.
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum WedgeType {
    Rising,
    Falling,
}

/// A fitted top/bottom line pair.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TwoLinePattern {
    pub top: CandidateTrendLine,
    pub bottom: CandidateTrendLine,
    /// First and last chart index the pattern spans.
    pub start: usize,
    pub end: usize,
    /// Combined fit quality of the two lines.
    pub score: f64,
}

impl TwoLinePattern {
    /// Render both lines as paint-ready series, `None` outside their spans.
    pub fn render(&self, chart_len: usize, extend: usize) -> (Series, Series) {
        (
            self.top.to_series(chart_len, extend),
            self.bottom.to_series(chart_len, extend),
        )
    }

    fn width_at(&self, index: usize) -> f64 {
        self.top.value_at(index) - self.bottom.value_at(index)
    }
}

/// Shared configuration for the two-line finders.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LinePatternParams {
    pub zigzag: ZigZagParams,
    pub trend: TrendParams,
    /// |slope| (ATR/bar) at or below which a line counts as flat.
    pub flat_slope_atr: f64,
    /// Max slope difference (ATR/bar) for two lines to count as parallel.
    pub parallel_tolerance_atr: f64,
    /// Minimum relative width change to call a pair converging/diverging.
    pub width_change_min: f64,
}

impl Default for LinePatternParams {
    fn default() -> Self {
        Self {
            zigzag: ZigZagParams::default(),
            trend: TrendParams {
                retention: Fraction::new_const(1.0),
                ..TrendParams::default()
            },
            flat_slope_atr: 0.02,
            parallel_tolerance_atr: 0.05,
            width_change_min: 0.15,
        }
    }
}

/// Broadening adds one knob on top of the shared line configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct BroadeningParams {
    pub base: LinePatternParams,
    /// Require one of the two lines to be near flat.
    pub right_angled: bool,
}

// ============================================================
// FITTING
// ============================================================

enum Slope {
    Rising,
    Falling,
    Flat,
}

fn classify_slope(line: &CandidateTrendLine, flat_tolerance: f64) -> Slope {
    let s = line.hits.slope;
    if s.abs() <= flat_tolerance {
        Slope::Flat
    } else if s > 0.0 {
        Slope::Rising
    } else {
        Slope::Falling
    }
}

/// Fit the top/bottom pair over the timespan window. `None` when either side
/// lacks two swing anchors or the fitted lines cross inside the span.
fn fit_pair(
    candles: &Candles,
    timespan: Timespan,
    params: &LinePatternParams,
) -> Result<Option<TwoLinePattern>> {
    if candles.is_empty() {
        return Ok(None);
    }
    let window_start = candles.len().saturating_sub(timespan.bars());
    let swings = zigzag_candles(candles, &params.zigzag)?;

    let Some(top) = best_line(candles, &swings, SwingKind::High, window_start, &params.trend)?
    else {
        return Ok(None);
    };
    let Some(bottom) = best_line(candles, &swings, SwingKind::Low, window_start, &params.trend)?
    else {
        return Ok(None);
    };

    let start = top.from.index.min(bottom.from.index);
    // Width classification projects both lines to the latest candle.
    let end = candles.len() - 1;
    let pattern = TwoLinePattern {
        score: top.score + bottom.score,
        top,
        bottom,
        start,
        end,
    };
    // A top line below the bottom line is not a shape of any kind.
    if pattern.width_at(pattern.start) <= 0.0 {
        return Ok(None);
    }
    Ok(Some(pattern))
}

enum WidthClass {
    Converging,
    Diverging,
    Steady,
}

fn classify_width(pattern: &TwoLinePattern, min_change: f64) -> WidthClass {
    let at_start = pattern.width_at(pattern.start);
    let at_end = pattern.width_at(pattern.end);
    if at_end <= at_start * (1.0 - min_change) {
        WidthClass::Converging
    } else if at_end >= at_start * (1.0 + min_change) {
        WidthClass::Diverging
    } else {
        WidthClass::Steady
    }
}

// ============================================================
// FINDERS
// ============================================================

/// Parallel top/bottom lines whose common direction matches `channel_type`.
pub fn find_channel(
    candles: &Candles,
    channel_type: ChannelType,
    timespan: Timespan,
    params: &LinePatternParams,
) -> Result<Option<TwoLinePattern>> {
    let Some(pattern) = fit_pair(candles, timespan, params)? else {
        return Ok(None);
    };
    let diff = (pattern.top.hits.slope - pattern.bottom.hits.slope).abs();
    if diff > params.parallel_tolerance_atr {
        return Ok(None);
    }
    let matches = match (
        channel_type,
        classify_slope(&pattern.top, params.flat_slope_atr),
        classify_slope(&pattern.bottom, params.flat_slope_atr),
    ) {
        (ChannelType::Ascending, Slope::Rising, Slope::Rising) => true,
        (ChannelType::Descending, Slope::Falling, Slope::Falling) => true,
        (ChannelType::Horizontal, Slope::Flat, Slope::Flat) => true,
        _ => false,
    };
    Ok(matches.then_some(pattern))
}

/// Converging pair whose slope layout matches `triangle_type`.
pub fn find_triangle(
    candles: &Candles,
    triangle_type: TriangleType,
    timespan: Timespan,
    params: &LinePatternParams,
) -> Result<Option<TwoLinePattern>> {
    let Some(pattern) = fit_pair(candles, timespan, params)? else {
        return Ok(None);
    };
    if !matches!(
        classify_width(&pattern, params.width_change_min),
        WidthClass::Converging
    ) {
        return Ok(None);
    }
    let matches = match (
        triangle_type,
        classify_slope(&pattern.top, params.flat_slope_atr),
        classify_slope(&pattern.bottom, params.flat_slope_atr),
    ) {
        (TriangleType::Symmetrical, Slope::Falling, Slope::Rising) => true,
        (TriangleType::Ascending, Slope::Flat, Slope::Rising) => true,
        (TriangleType::Descending, Slope::Falling, Slope::Flat) => true,
        _ => false,
    };
    Ok(matches.then_some(pattern))
}

/// Converging pair with both slopes in the direction named by `wedge_type`.
pub fn find_wedge(
    candles: &Candles,
    wedge_type: WedgeType,
    timespan: Timespan,
    params: &LinePatternParams,
) -> Result<Option<TwoLinePattern>> {
    let Some(pattern) = fit_pair(candles, timespan, params)? else {
        return Ok(None);
    };
    if !matches!(
        classify_width(&pattern, params.width_change_min),
        WidthClass::Converging
    ) {
        return Ok(None);
    }
    let matches = match (
        wedge_type,
        classify_slope(&pattern.top, params.flat_slope_atr),
        classify_slope(&pattern.bottom, params.flat_slope_atr),
    ) {
        (WedgeType::Rising, Slope::Rising, Slope::Rising) => true,
        (WedgeType::Falling, Slope::Falling, Slope::Falling) => true,
        _ => false,
    };
    Ok(matches.then_some(pattern))
}

/// Diverging pair; `right_angled` additionally pins one line near flat.
pub fn find_broadening(
    candles: &Candles,
    timespan: Timespan,
    params: &BroadeningParams,
) -> Result<Option<TwoLinePattern>> {
    let Some(pattern) = fit_pair(candles, timespan, &params.base)? else {
        return Ok(None);
    };
    if !matches!(
        classify_width(&pattern, params.base.width_change_min),
        WidthClass::Diverging
    ) {
        return Ok(None);
    }
    if params.right_angled {
        let flat = params.base.flat_slope_atr;
        let top_flat = matches!(classify_slope(&pattern.top, flat), Slope::Flat);
        let bottom_flat = matches!(classify_slope(&pattern.bottom, flat), Slope::Flat);
        if !top_flat && !bottom_flat {
            return Ok(None);
        }
    }
    Ok(Some(pattern))
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{
        broadening_candles, channel_candles, triangle_candles, wedge_candles,
    };

    #[test]
    fn test_ascending_channel() {
        let candles = channel_candles(160, 0.5);
        let params = LinePatternParams::default();
        let found = find_channel(&candles, ChannelType::Ascending, Timespan::Long, &params)
            .unwrap()
            .expect("ascending channel");
        assert!(found.top.hits.slope > 0.0);
        assert!(found.bottom.hits.slope > 0.0);
        // Rising chart is not a descending channel.
        assert!(
            find_channel(&candles, ChannelType::Descending, Timespan::Long, &params)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_horizontal_channel() {
        let candles = channel_candles(160, 0.0);
        let params = LinePatternParams::default();
        let found = find_channel(&candles, ChannelType::Horizontal, Timespan::Long, &params)
            .unwrap()
            .expect("horizontal channel");
        assert!(found.top.hits.slope.abs() <= params.flat_slope_atr);
    }

    #[test]
    fn test_symmetrical_triangle() {
        let candles = triangle_candles(160);
        let params = LinePatternParams::default();
        let found = find_triangle(&candles, TriangleType::Symmetrical, Timespan::Long, &params)
            .unwrap()
            .expect("symmetrical triangle");
        assert!(found.top.hits.slope < 0.0);
        assert!(found.bottom.hits.slope > 0.0);
        // Converging lines are not a channel.
        assert!(
            find_channel(&candles, ChannelType::Horizontal, Timespan::Long, &params)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_rising_wedge() {
        let candles = wedge_candles(160, true);
        let params = LinePatternParams::default();
        let found = find_wedge(&candles, WedgeType::Rising, Timespan::Long, &params)
            .unwrap()
            .expect("rising wedge");
        assert!(found.top.hits.slope > 0.0);
        assert!(found.bottom.hits.slope > 0.0);
        assert!(
            find_wedge(&candles, WedgeType::Falling, Timespan::Long, &params)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_broadening() {
        let candles = broadening_candles(160);
        let params = BroadeningParams::default();
        let found = find_broadening(&candles, Timespan::Long, &params)
            .unwrap()
            .expect("broadening formation");
        assert!(found.width_at(found.end) > found.width_at(found.start));
        // A converging chart must not read as broadening.
        let converging = triangle_candles(160);
        assert!(find_broadening(&converging, Timespan::Long, &params)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_render_spans() {
        let candles = channel_candles(160, 0.5);
        let params = LinePatternParams::default();
        let found = find_channel(&candles, ChannelType::Ascending, Timespan::Long, &params)
            .unwrap()
            .expect("ascending channel");
        let (top, bottom) = found.render(candles.len(), 0);
        assert_eq!(top.len(), candles.len());
        assert_eq!(bottom.len(), candles.len());
        assert!(top.get(found.top.from.index).is_some());
        if found.top.from.index > 0 {
            assert!(top.get(found.top.from.index - 1).is_none());
        }
    }

    #[test]
    fn test_empty_chart() {
        let candles = Candles::new(vec![], vec![], vec![], vec![], vec![], vec![]).unwrap();
        let params = LinePatternParams::default();
        assert!(
            find_channel(&candles, ChannelType::Ascending, Timespan::Short, &params)
                .unwrap()
                .is_none()
        );
    }
}

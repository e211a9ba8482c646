//! Head-and-shoulders detection.

use crate::series::Series;
use crate::zigzag::{zigzag_candles, SwingKind, SwingPoint, ZigZagParams};
use crate::{Candles, EngineError, Result};

use super::line_through;

// ============================================================
// PARAMETERS & RESULT
// ============================================================

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HeadShouldersParams {
    pub zigzag: ZigZagParams,
    /// The head must exceed both shoulders by at least this fraction of the
    /// left-leg range (left shoulder to first trough).
    pub head_height: f64,
    /// Mirror the topology for an inverse head-and-shoulders.
    pub inverse: bool,
}

impl Default for HeadShouldersParams {
    fn default() -> Self {
        Self {
            zigzag: ZigZagParams::default(),
            head_height: 0.25,
            inverse: false,
        }
    }
}

/// A head-and-shoulders formation. The neckline runs through the two troughs
/// and is rendered from the left shoulder to the chart end.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HeadShoulders {
    pub left_shoulder: SwingPoint,
    pub left_trough: SwingPoint,
    pub head: SwingPoint,
    pub right_trough: SwingPoint,
    pub right_shoulder: SwingPoint,
    pub neckline: Series,
    /// How far the head clears the taller shoulder, as a multiple of the
    /// left-leg range.
    pub prominence: f64,
    pub inverse: bool,
}

// ============================================================
// DETECTION
// ============================================================

/// Find the most prominent head-and-shoulders in the chart, or `None`.
///
/// Requires five consecutive zigzag points peak/trough/peak/trough/peak
/// (mirrored when `inverse`) with the middle peak clearing both shoulders by
/// `head_height` times the left-leg range. Ties on prominence keep the most
/// recent formation.
pub fn find_head_and_shoulders(
    candles: &Candles,
    params: &HeadShouldersParams,
) -> Result<Option<HeadShoulders>> {
    if !params.head_height.is_finite() || params.head_height <= 0.0 {
        return Err(EngineError::Configuration {
            param: "head_height",
            reason: "must be a positive finite fraction",
        });
    }
    if candles.is_empty() {
        return Ok(None);
    }
    // The trailing unconfirmed extreme is an in-progress leg; it must not
    // stand in as a shoulder.
    let swings: Vec<SwingPoint> = zigzag_candles(candles, &params.zigzag)?
        .into_iter()
        .filter(|s| s.confirmed)
        .collect();

    let peak_kind = if params.inverse {
        SwingKind::Low
    } else {
        SwingKind::High
    };
    // Signed comparison so "above" means "more extreme" for both topologies.
    let sign = if params.inverse { -1.0 } else { 1.0 };

    let mut best: Option<HeadShoulders> = None;
    for window in swings.windows(5) {
        let [ls, lt, head, rt, rs] = [window[0], window[1], window[2], window[3], window[4]];
        if ls.kind != peak_kind {
            continue;
        }
        // Zigzag alternation guarantees the rest of the topology.

        let left_leg = (ls.price - lt.price).abs();
        if left_leg <= 0.0 {
            continue;
        }
        let clears_left = sign * (head.price - ls.price);
        let clears_right = sign * (head.price - rs.price);
        let required = params.head_height * left_leg;
        if clears_left < required || clears_right < required {
            continue;
        }

        let prominence = clears_left.min(clears_right) / left_leg;
        let replace = best
            .as_ref()
            .map_or(true, |held| prominence >= held.prominence);
        if replace {
            best = Some(HeadShoulders {
                left_shoulder: ls,
                left_trough: lt,
                head,
                right_trough: rt,
                right_shoulder: rs,
                neckline: line_through(lt, rt, ls.index, candles.len()),
                prominence,
                inverse: params.inverse,
            });
        }
    }
    Ok(best)
}

// ============================================================
// TESTS
// ============================================================

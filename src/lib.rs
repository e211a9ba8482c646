//! # trendscan - charting-indicator & pattern-recognition engine
//!
//! Computes derived numeric series (moving averages, oscillators, volatility
//! bands) from OHLCV candles and detects geometric chart patterns (trend
//! lines, zigzags, triangles, channels, wedges, double tops/bottoms,
//! head-and-shoulders).
//!
//! ## Quick Start
//!
//! ```rust
//! use trendscan::prelude::*;
//!
//! let close: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
//! let high: Vec<f64> = close.iter().map(|c| c + 1.0).collect();
//! let low: Vec<f64> = close.iter().map(|c| c - 1.0).collect();
//! let open = close.clone();
//! let volume = vec![1000.0; 60];
//! let time: Vec<i64> = (0..60).collect();
//!
//! let candles = Candles::new(time, open, high, low, close, volume).unwrap();
//!
//! // Derived series
//! let sma20 = sma(candles.close(), 20).unwrap();
//! let atr14 = atr(&candles, 14).unwrap();
//!
//! // Swing points for the pattern finders
//! let swings = zigzag(candles.high(), candles.low(), &ZigZagParams::default()).unwrap();
//! assert!(sma20.get(19).is_some());
//! # let _ = (atr14, swings);
//! ```

pub mod formula;
pub mod indicators;
pub mod patterns;
pub mod reduce;
pub mod series;
pub mod trend;
pub mod zigzag;

#[cfg(test)]
pub(crate) mod test_util;

pub mod prelude {
    pub use crate::{
        formula::Formula,
        indicators::{
            atr, bands, cmo, ema, hullma, kama, psar, rma, rsi, stochastic, supertrend,
            true_range, vortex, williams_r, Band, BandKind, PsarParams, Stochastic, SuperTrend,
            Vortex,
        },
        patterns::{
            find_broadening, find_channel, find_double_peak_formation, find_head_and_shoulders,
            find_triangle, find_wedge, scan_parallel, BroadeningParams, ChannelType, DoublePeak,
            DoublePeakKind, DoublePeakParams, HeadShoulders, HeadShouldersParams,
            LinePatternParams, PatternSuite, PeakShape, SuiteError, SuiteReport, Timespan,
            TriangleType, TwoLinePattern, WedgeType,
        },
        reduce::{
            alma, highest, lowest, momentum, reduce, sma, sma_dynamic, stdev, sum, vwma, wma,
            MaKind, WindowLen,
        },
        series::{
            add, cut_series, div, for_every, indexed_points_of, interpolate_sparse,
            land_points_onto_series, mul, sub, IndexedPoint, Interpolation, LandMethod, Operand,
            Series,
        },
        trend::{
            find_trends, AnchorField, BasePoint, CandidateTrendLine, HitMetrics, TrendParams,
        },
        zigzag::{zigzag, zigzag_candles, SwingKind, SwingPoint, ZigZagParams},
        Candles, EngineError, Fraction, Period, Result,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while building or evaluating a computation graph
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// Bad parameter at construction time (invalid length, unknown enum
    /// value, out-of-range threshold).
    #[error("invalid configuration: {param}: {reason}")]
    Configuration {
        param: &'static str,
        reason: &'static str,
    },

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Violated input invariant (unsorted timestamps, mismatched lengths).
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// Malformed scoring formula or unknown metric identifier.
    #[error("formula error at offset {offset}: {reason}")]
    Formula { offset: usize, reason: String },

    /// Truly unrecoverable numeric state.
    #[error("computation error: {0}")]
    Computation(&'static str),
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Window length (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(EngineError::Configuration {
                param: "length",
                reason: "must be > 0",
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

/// Normalized fraction in range 0.0..=1.0 (retention percentiles, tolerances)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Fraction(f64);

impl Fraction {
    /// Create a new Fraction, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(EngineError::Configuration {
                param: "fraction",
                reason: "cannot be NaN or infinite",
            });
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(EngineError::OutOfRange {
                field: "fraction",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Fraction {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Fraction {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Fraction::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// CANDLES
// ============================================================

use crate::series::Series;

/// Equal-length OHLCV series sharing one index-to-candle mapping.
///
/// Index 0 is the oldest candle. All contained series are validated to the
/// same length at construction; derived sources (`hl2`, `hlc3`, ...) allocate
/// fresh series and never alias the inputs.
#[derive(Debug, Clone)]
pub struct Candles {
    time: Vec<i64>,
    open: Series,
    high: Series,
    low: Series,
    close: Series,
    volume: Series,
}

impl Candles {
    pub fn new(
        time: Vec<i64>,
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
        volume: Vec<f64>,
    ) -> Result<Self> {
        let n = time.len();
        if [open.len(), high.len(), low.len(), close.len(), volume.len()]
            .iter()
            .any(|&l| l != n)
        {
            return Err(EngineError::Precondition(format!(
                "candle series lengths differ: time={}, open={}, high={}, low={}, close={}, volume={}",
                n,
                open.len(),
                high.len(),
                low.len(),
                close.len(),
                volume.len()
            )));
        }
        Ok(Self {
            time,
            open: Series::from_values(open),
            high: Series::from_values(high),
            low: Series::from_values(low),
            close: Series::from_values(close),
            volume: Series::from_values(volume),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    #[inline]
    pub fn time(&self) -> &[i64] {
        &self.time
    }

    #[inline]
    pub fn open(&self) -> &Series {
        &self.open
    }

    #[inline]
    pub fn high(&self) -> &Series {
        &self.high
    }

    #[inline]
    pub fn low(&self) -> &Series {
        &self.low
    }

    #[inline]
    pub fn close(&self) -> &Series {
        &self.close
    }

    #[inline]
    pub fn volume(&self) -> &Series {
        &self.volume
    }

    fn derived<F: Fn(f64, f64, f64, f64) -> f64>(&self, f: F) -> Series {
        let cells = (0..self.len())
            .map(|i| {
                match (
                    self.open.get(i),
                    self.high.get(i),
                    self.low.get(i),
                    self.close.get(i),
                ) {
                    (Some(o), Some(h), Some(l), Some(c)) => Some(f(o, h, l, c)),
                    _ => None,
                }
            })
            .collect();
        Series::from_cells(cells)
    }

    /// (high + low) / 2
    pub fn hl2(&self) -> Series {
        self.derived(|_, h, l, _| (h + l) / 2.0)
    }

    /// (open + close) / 2
    pub fn oc2(&self) -> Series {
        self.derived(|o, _, _, c| (o + c) / 2.0)
    }

    /// (high + low + close) / 3
    pub fn hlc3(&self) -> Series {
        self.derived(|_, h, l, c| (h + l + c) / 3.0)
    }

    /// (open + high + low + close) / 4
    pub fn ohlc4(&self) -> Series {
        self.derived(|o, h, l, c| (o + h + l + c) / 4.0)
    }

    /// Weighted close: (high + low + 2*close) / 4
    pub fn wclose(&self) -> Series {
        self.derived(|_, h, l, c| (h + l + 2.0 * c) / 4.0)
    }

    /// max(open, close)
    pub fn body_top(&self) -> Series {
        self.derived(|o, _, _, c| o.max(c))
    }

    /// min(open, close)
    pub fn body_bottom(&self) -> Series {
        self.derived(|o, _, _, c| o.min(c))
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_candles(n: usize) -> Candles {
        Candles::new(
            (0..n as i64).collect(),
            vec![100.0; n],
            vec![102.0; n],
            vec![98.0; n],
            vec![101.0; n],
            vec![1000.0; n],
        )
        .unwrap()
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(1).is_ok());
        assert!(Period::new(100).is_ok());
        assert!(Period::new(0).is_err());
    }

    #[test]
    fn test_fraction_validation() {
        assert!(Fraction::new(0.0).is_ok());
        assert!(Fraction::new(1.0).is_ok());
        assert!(Fraction::new(0.5).is_ok());
        assert!(Fraction::new(-0.1).is_err());
        assert!(Fraction::new(1.1).is_err());
        assert!(Fraction::new(f64::NAN).is_err());
        assert!(Fraction::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_candles_length_mismatch() {
        let result = Candles::new(
            vec![0, 1, 2],
            vec![1.0, 2.0],
            vec![1.0, 2.0, 3.0],
            vec![1.0, 2.0, 3.0],
            vec![1.0, 2.0, 3.0],
            vec![1.0, 2.0, 3.0],
        );
        assert!(matches!(result, Err(EngineError::Precondition(_))));
    }

    #[test]
    fn test_derived_sources() {
        let candles = flat_candles(3);
        assert_eq!(candles.hl2().get(0), Some(100.0));
        assert_eq!(candles.oc2().get(0), Some(100.5));
        assert_eq!(candles.hlc3().get(1), Some((102.0 + 98.0 + 101.0) / 3.0));
        assert_eq!(
            candles.ohlc4().get(2),
            Some((100.0 + 102.0 + 98.0 + 101.0) / 4.0)
        );
        assert_eq!(candles.wclose().get(0), Some((102.0 + 98.0 + 202.0) / 4.0));
        assert_eq!(candles.body_top().get(0), Some(101.0));
        assert_eq!(candles.body_bottom().get(0), Some(100.0));
    }

    #[test]
    fn test_empty_candles() {
        let candles = Candles::new(vec![], vec![], vec![], vec![], vec![], vec![]).unwrap();
        assert!(candles.is_empty());
        assert_eq!(candles.hl2().len(), 0);
    }
}

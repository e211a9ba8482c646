//! Generic sliding-window evaluation and the windowed reducers built on it.
//!
//! `reduce` is the shared contract: element `i` of the output is
//! `f(window(series, i, length))` when the window is fully populated, else
//! `None`. Width is either fixed (validated up front) or a per-index series
//! of widths (invalid widths null out that index only).

use crate::indicators::{ema, hullma, kama, rma};
use crate::series::Series;
use crate::{EngineError, Period, Result};

// ============================================================
// REDUCER FRAMEWORK
// ============================================================

/// Window width for [`reduce`]: fixed, or read per index from a series.
#[derive(Debug, Clone, Copy)]
pub enum WindowLen<'a> {
    Fixed(Period),
    PerIndex(&'a Series),
}

/// Sliding-window evaluation over `[i - length + 1, i]`.
///
/// `f` receives a dense window slice; windows with missing history (before
/// the chart start or containing `None` cells) yield `None`. Per-index widths
/// must be positive finite integers; anything else nulls that index.
pub fn reduce<F: Fn(&[f64]) -> f64>(series: &Series, length: WindowLen<'_>, f: F) -> Series {
    let mut scratch: Vec<f64> = Vec::new();
    let cells = (0..series.len())
        .map(|i| {
            let width = match length {
                WindowLen::Fixed(p) => p.get(),
                WindowLen::PerIndex(lengths) => {
                    let w = lengths.get(i)?;
                    if !w.is_finite() || w < 1.0 || w.fract() != 0.0 {
                        return None;
                    }
                    w as usize
                }
            };
            if i + 1 < width {
                return None;
            }
            scratch.clear();
            for j in (i + 1 - width)..=i {
                scratch.push(series.get(j)?);
            }
            Some(f(&scratch))
        })
        .collect();
    Series::from_cells(cells)
}

fn fixed(length: usize) -> Result<WindowLen<'static>> {
    Ok(WindowLen::Fixed(Period::new(length)?))
}

// ============================================================
// WINDOWED REDUCERS
// ============================================================

/// Simple moving average.
pub fn sma(series: &Series, length: usize) -> Result<Series> {
    Ok(reduce(series, fixed(length)?, |w| {
        w.iter().sum::<f64>() / w.len() as f64
    }))
}

/// SMA with a per-index dynamic window width.
pub fn sma_dynamic(series: &Series, lengths: &Series) -> Series {
    reduce(series, WindowLen::PerIndex(lengths), |w| {
        w.iter().sum::<f64>() / w.len() as f64
    })
}

/// Rolling sum.
pub fn sum(series: &Series, length: usize) -> Result<Series> {
    Ok(reduce(series, fixed(length)?, |w| w.iter().sum()))
}

/// Rolling maximum.
pub fn highest(series: &Series, length: usize) -> Result<Series> {
    Ok(reduce(series, fixed(length)?, |w| {
        w.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }))
}

/// Rolling minimum.
pub fn lowest(series: &Series, length: usize) -> Result<Series> {
    Ok(reduce(series, fixed(length)?, |w| {
        w.iter().copied().fold(f64::INFINITY, f64::min)
    }))
}

/// Population standard deviation within the window (denominator = length).
pub fn stdev(series: &Series, length: usize) -> Result<Series> {
    Ok(reduce(series, fixed(length)?, |w| {
        let n = w.len() as f64;
        let mean = w.iter().sum::<f64>() / n;
        (w.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt()
    }))
}

/// `x[i] - x[i-length]`. Defined once both endpoints exist.
pub fn momentum(series: &Series, length: usize) -> Result<Series> {
    Period::new(length)?;
    let cells = (0..series.len())
        .map(|i| {
            let back = i.checked_sub(length)?;
            Some(series.get(i)? - series.get(back)?)
        })
        .collect();
    Ok(Series::from_cells(cells))
}

/// Linearly weighted moving average (weight k+1 for window position k).
pub fn wma(series: &Series, length: usize) -> Result<Series> {
    Ok(reduce(series, fixed(length)?, |w| {
        let denom = (w.len() * (w.len() + 1)) as f64 / 2.0;
        w.iter()
            .enumerate()
            .map(|(k, x)| (k + 1) as f64 * x)
            .sum::<f64>()
            / denom
    }))
}

/// Arnaud Legoux moving average with gaussian window weights.
///
/// `smooth` places the weight peak within the window (0 = oldest, 1 =
/// newest); `sigma` controls the gaussian width.
pub fn alma(series: &Series, length: usize, sigma: f64, smooth: f64) -> Result<Series> {
    let window = fixed(length)?;
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(EngineError::Configuration {
            param: "sigma",
            reason: "must be a positive finite value",
        });
    }
    if !(0.0..=1.0).contains(&smooth) {
        return Err(EngineError::Configuration {
            param: "smooth",
            reason: "must be in [0.0, 1.0]",
        });
    }
    let m = smooth * (length - 1) as f64;
    let s = length as f64 / sigma;
    Ok(reduce(series, window, |w| {
        let mut weighted = 0.0;
        let mut norm = 0.0;
        for (k, x) in w.iter().enumerate() {
            let weight = (-((k as f64 - m).powi(2)) / (2.0 * s * s)).exp();
            weighted += weight * x;
            norm += weight;
        }
        weighted / norm
    }))
}

/// Volume weighted moving average. Windows where total volume is zero yield
/// `None`.
pub fn vwma(price: &Series, volume: &Series, length: usize) -> Result<Series> {
    Period::new(length)?;
    if price.len() != volume.len() {
        return Err(EngineError::Precondition(format!(
            "price ({}) and volume ({}) series lengths differ",
            price.len(),
            volume.len()
        )));
    }
    let cells = (0..price.len())
        .map(|i| {
            if i + 1 < length {
                return None;
            }
            let mut pv = 0.0;
            let mut v_total = 0.0;
            for j in (i + 1 - length)..=i {
                let p = price.get(j)?;
                let v = volume.get(j)?;
                pv += p * v;
                v_total += v;
            }
            (v_total != 0.0).then(|| pv / v_total)
        })
        .collect();
    Ok(Series::from_cells(cells))
}

// ============================================================
// MOVING-AVERAGE KINDS - generated via macro
// ============================================================

fn alma_default(series: &Series, length: usize) -> Result<Series> {
    alma(series, length, 6.0, 0.85)
}

fn kama_default(series: &Series, length: usize) -> Result<Series> {
    kama(series, length, 2, 30)
}

/// Macro to generate the MaKind enum without dispatch boilerplate
macro_rules! define_ma_kinds {
    (
        $(
            $variant:ident => $name:literal, $compute:path
        ),* $(,)?
    ) => {
        /// Closed set of interchangeable moving-average kinds.
        ///
        /// Selection by name goes through [`MaKind::from_name`], a static
        /// lookup over the enumerated variants.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
        pub enum MaKind {
            $($variant),*
        }

        impl MaKind {
            /// Resolve a kind from its script-facing name.
            pub fn from_name(name: &str) -> Result<Self> {
                match name {
                    $($name => Ok(Self::$variant),)*
                    _ => Err(EngineError::Configuration {
                        param: "ma_kind",
                        reason: "unknown moving average name",
                    }),
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name),*
                }
            }

            /// Compute this kind over `series` with the given window length.
            pub fn compute(&self, series: &Series, length: usize) -> Result<Series> {
                match self {
                    $(Self::$variant => $compute(series, length)),*
                }
            }

            pub const ALL: &'static [MaKind] = &[$(Self::$variant),*];
        }
    };
}

define_ma_kinds! {
    Sma => "sma", sma,
    Ema => "ema", ema,
    Rma => "rma", rma,
    Wma => "wma", wma,
    Hull => "hullma", hullma,
    Alma => "alma", alma_default,
    Kama => "kama", kama_default,
}

// ============================================================
// TESTS
// ============================================================

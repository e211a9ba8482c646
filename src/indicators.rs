//! Recursive and stateful indicators (EMA family, RSI, ATR, PSAR, Vortex,
//! SuperTrend, stochastics) and the volatility band constructors.
//!
//! Recursions follow explicit seed rules: EMA seeds with an SMA over its
//! first window, Wilder indicators seed with simple averages of their first
//! window of deltas. A `None` input cell after seeding resets the recursion;
//! output stays `None` until a fresh dense seed window accumulates.

use crate::reduce::{highest, lowest, sma, stdev, sum, wma};
use crate::series::Series;
use crate::{Candles, EngineError, Period, Result};

// ============================================================
// EMA FAMILY
// ============================================================

fn recursive_ma(series: &Series, length: usize, alpha: f64) -> Series {
    let mut cells = Vec::with_capacity(series.len());
    let mut state: Option<f64> = None;
    let mut run: Vec<f64> = Vec::with_capacity(length);

    for cell in series.iter() {
        match cell {
            None => {
                state = None;
                run.clear();
                cells.push(None);
            }
            Some(x) => {
                if let Some(prev) = state {
                    let next = prev + alpha * (x - prev);
                    state = Some(next);
                    cells.push(Some(next));
                } else {
                    run.push(x);
                    if run.len() == length {
                        let seed = run.iter().sum::<f64>() / length as f64;
                        state = Some(seed);
                        run.clear();
                        cells.push(Some(seed));
                    } else {
                        cells.push(None);
                    }
                }
            }
        }
    }
    Series::from_cells(cells)
}

/// Exponential moving average. Seed = SMA over the first `length` values,
/// then `ema[i] = ema[i-1] + α·(x[i] − ema[i-1])` with `α = 2/(length+1)`.
pub fn ema(series: &Series, length: usize) -> Result<Series> {
    Period::new(length)?;
    Ok(recursive_ma(series, length, 2.0 / (length as f64 + 1.0)))
}

/// Wilder moving average (RMA): the EMA recursion with `α = 1/length`.
pub fn rma(series: &Series, length: usize) -> Result<Series> {
    Period::new(length)?;
    Ok(recursive_ma(series, length, 1.0 / length as f64))
}

/// Hull moving average: `wma(2·wma(n/2) − wma(n), √n)`.
pub fn hullma(series: &Series, length: usize) -> Result<Series> {
    Period::new(length)?;
    let half = (length / 2).max(1);
    let sqrt_len = ((length as f64).sqrt().round() as usize).max(1);

    let wma_half = wma(series, half)?;
    let wma_full = wma(series, length)?;
    let diff = Series::from_cells(
        (0..series.len())
            .map(|i| Some(2.0 * wma_half.get(i)? - wma_full.get(i)?))
            .collect(),
    );
    wma(&diff, sqrt_len)
}

/// Kaufman adaptive moving average.
///
/// The efficiency ratio over `er_length` blends between the fast and slow
/// smoothing constants; the recursion seeds on the price at the first full
/// ER window.
pub fn kama(series: &Series, er_length: usize, fast: usize, slow: usize) -> Result<Series> {
    Period::new(er_length)?;
    if fast == 0 || slow <= fast {
        return Err(EngineError::Configuration {
            param: "fast/slow",
            reason: "fast must be > 0 and slow > fast",
        });
    }
    let alpha_fast = 2.0 / (fast as f64 + 1.0);
    let alpha_slow = 2.0 / (slow as f64 + 1.0);

    let mut cells = Vec::with_capacity(series.len());
    let mut state: Option<f64> = None;
    let mut run: Vec<f64> = Vec::new();

    for cell in series.iter() {
        match cell {
            None => {
                state = None;
                run.clear();
                cells.push(None);
            }
            Some(x) => {
                run.push(x);
                if run.len() < er_length + 1 {
                    cells.push(None);
                    continue;
                }
                let window = &run[run.len() - er_length - 1..];
                let change = (window[window.len() - 1] - window[0]).abs();
                let volatility: f64 = window.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
                let er = if volatility > 0.0 { change / volatility } else { 0.0 };
                let sc = (er * (alpha_fast - alpha_slow) + alpha_slow).powi(2);

                let next = match state {
                    Some(prev) => prev + sc * (x - prev),
                    None => x,
                };
                state = Some(next);
                cells.push(Some(next));
            }
        }
    }
    Ok(Series::from_cells(cells))
}

// ============================================================
// WILDER OSCILLATORS
// ============================================================

struct WilderSums {
    // Wilder-smoothed average gain / average loss per index.
    up: Vec<Option<f64>>,
    down: Vec<Option<f64>>,
}

fn wilder_sums(series: &Series, length: usize) -> WilderSums {
    let n = series.len();
    let mut up = vec![None; n];
    let mut down = vec![None; n];
    let mut state: Option<(f64, f64)> = None;
    let mut gains: Vec<(f64, f64)> = Vec::new();
    let mut prev_value: Option<f64> = None;

    for i in 0..n {
        let Some(x) = series.get(i) else {
            state = None;
            gains.clear();
            prev_value = None;
            continue;
        };
        let Some(prev) = prev_value else {
            prev_value = Some(x);
            continue;
        };
        prev_value = Some(x);
        let delta = x - prev;
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);

        match state {
            Some((au, ad)) => {
                let au = (au * (length as f64 - 1.0) + gain) / length as f64;
                let ad = (ad * (length as f64 - 1.0) + loss) / length as f64;
                state = Some((au, ad));
                up[i] = Some(au);
                down[i] = Some(ad);
            }
            None => {
                gains.push((gain, loss));
                if gains.len() == length {
                    let au = gains.iter().map(|g| g.0).sum::<f64>() / length as f64;
                    let ad = gains.iter().map(|g| g.1).sum::<f64>() / length as f64;
                    state = Some((au, ad));
                    gains.clear();
                    up[i] = Some(au);
                    down[i] = Some(ad);
                }
            }
        }
    }
    WilderSums { up, down }
}

/// Relative strength index over Wilder-smoothed gain/loss averages.
///
/// RSI = 100 when the average loss is 0 and there was any gain; 50 when both
/// averages are 0 (flat history).
pub fn rsi(series: &Series, length: usize) -> Result<Series> {
    Period::new(length)?;
    let sums = wilder_sums(series, length);
    let cells = sums
        .up
        .iter()
        .zip(&sums.down)
        .map(|(up, down)| {
            let (au, ad) = (up.as_ref()?, down.as_ref()?);
            Some(if *ad == 0.0 {
                if *au > 0.0 {
                    100.0
                } else {
                    50.0
                }
            } else {
                100.0 - 100.0 / (1.0 + au / ad)
            })
        })
        .collect();
    Ok(Series::from_cells(cells))
}

/// Chande momentum oscillator over the same Wilder-smoothed sums as RSI.
/// 0 when both averages are 0.
pub fn cmo(series: &Series, length: usize) -> Result<Series> {
    Period::new(length)?;
    let sums = wilder_sums(series, length);
    let cells = sums
        .up
        .iter()
        .zip(&sums.down)
        .map(|(up, down)| {
            let (au, ad) = (up.as_ref()?, down.as_ref()?);
            let total = au + ad;
            Some(if total == 0.0 {
                0.0
            } else {
                100.0 * (au - ad) / total
            })
        })
        .collect();
    Ok(Series::from_cells(cells))
}

// ============================================================
// ATR / TRUE RANGE
// ============================================================

/// True range: `max(high−low, |high−close[-1]|, |low−close[-1]|)`.
/// The first bar (or a bar after a close gap) falls back to `high−low`.
pub fn true_range(candles: &Candles) -> Series {
    let cells = (0..candles.len())
        .map(|i| {
            let h = candles.high().get(i)?;
            let l = candles.low().get(i)?;
            let hl = h - l;
            Some(match i.checked_sub(1).and_then(|p| candles.close().get(p)) {
                Some(pc) => hl.max((h - pc).abs()).max((l - pc).abs()),
                None => hl,
            })
        })
        .collect();
    Series::from_cells(cells)
}

/// Average true range: Wilder moving average of true range.
pub fn atr(candles: &Candles, length: usize) -> Result<Series> {
    rma(&true_range(candles), length)
}

// ============================================================
// WINDOW-NORMALIZED OSCILLATORS
// ============================================================

/// Stochastic oscillator output.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Stochastic {
    pub k: Series,
    pub d: Series,
}

/// Stochastic %K (`100·(close − LL) / (HH − LL)`) with %D = SMA of %K.
/// Flat windows (HH = LL) yield `None`.
pub fn stochastic(candles: &Candles, k_length: usize, d_length: usize) -> Result<Stochastic> {
    Period::new(k_length)?;
    let hh = highest(candles.high(), k_length)?;
    let ll = lowest(candles.low(), k_length)?;
    let k = Series::from_cells(
        (0..candles.len())
            .map(|i| {
                let (c, hh, ll) = (candles.close().get(i)?, hh.get(i)?, ll.get(i)?);
                (hh != ll).then(|| 100.0 * (c - ll) / (hh - ll))
            })
            .collect(),
    );
    let d = sma(&k, d_length)?;
    Ok(Stochastic { k, d })
}

/// Williams %R: `−100·(HH − close) / (HH − LL)`. Flat windows yield `None`.
pub fn williams_r(candles: &Candles, length: usize) -> Result<Series> {
    Period::new(length)?;
    let hh = highest(candles.high(), length)?;
    let ll = lowest(candles.low(), length)?;
    Ok(Series::from_cells(
        (0..candles.len())
            .map(|i| {
                let (c, hh, ll) = (candles.close().get(i)?, hh.get(i)?, ll.get(i)?);
                (hh != ll).then(|| -100.0 * (hh - c) / (hh - ll))
            })
            .collect(),
    ))
}

// ============================================================
// PSAR
// ============================================================

/// Parabolic SAR acceleration parameters.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct PsarParams {
    pub af_start: f64,
    pub af_step: f64,
    pub af_max: f64,
}

impl Default for PsarParams {
    fn default() -> Self {
        Self {
            af_start: 0.02,
            af_step: 0.02,
            af_max: 0.2,
        }
    }
}

impl PsarParams {
    fn validate(&self) -> Result<()> {
        let ok = self.af_start > 0.0
            && self.af_step > 0.0
            && self.af_max >= self.af_start
            && self.af_start.is_finite()
            && self.af_step.is_finite()
            && self.af_max.is_finite();
        if !ok {
            return Err(EngineError::Configuration {
                param: "psar",
                reason: "acceleration factors must be positive and af_max >= af_start",
            });
        }
        Ok(())
    }
}

/// Parabolic SAR trailing stop.
///
/// The trend flips when price crosses the current SAR; the SAR is clamped to
/// the prior two bars' extremes. Needs two dense bars to start; a gap in the
/// OHLC input resets the state.
pub fn psar(candles: &Candles, params: &PsarParams) -> Result<Series> {
    params.validate()?;
    let n = candles.len();
    let mut cells: Vec<Option<f64>> = vec![None; n];

    // (uptrend, sar, extreme point, acceleration factor)
    let mut state: Option<(bool, f64, f64, f64)> = None;
    let mut prev_bar: Option<(usize, f64, f64)> = None; // (index, high, low)
    let mut prev_prev: Option<(f64, f64)> = None; // (high, low)

    for i in 0..n {
        let (Some(h), Some(l), Some(c)) = (
            candles.high().get(i),
            candles.low().get(i),
            candles.close().get(i),
        ) else {
            state = None;
            prev_bar = None;
            prev_prev = None;
            continue;
        };

        let Some((pi, ph, pl)) = prev_bar else {
            prev_bar = Some((i, h, l));
            continue;
        };

        match state {
            None => {
                let prev_close = candles.close().get(pi);
                let up = prev_close.map_or(true, |pc| c >= pc);
                let (sar, ep) = if up { (pl, h) } else { (ph, l) };
                state = Some((up, sar, ep, params.af_start));
                cells[i] = Some(sar);
            }
            Some((up, sar, ep, af)) => {
                // SAR is clamped to the prior two bars' extremes.
                let (pph, ppl) = prev_prev.unwrap_or((ph, pl));
                let mut next_sar = sar + af * (ep - sar);
                if up {
                    next_sar = next_sar.min(pl).min(ppl);
                } else {
                    next_sar = next_sar.max(ph).max(pph);
                }

                let flipped = if up { l < next_sar } else { h > next_sar };
                if flipped {
                    // New SAR starts from the prior extreme point.
                    let sar = ep;
                    let new_ep = if up { l } else { h };
                    state = Some((!up, sar, new_ep, params.af_start));
                    cells[i] = Some(sar);
                } else {
                    let (ep, af) = if up && h > ep {
                        (h, (af + params.af_step).min(params.af_max))
                    } else if !up && l < ep {
                        (l, (af + params.af_step).min(params.af_max))
                    } else {
                        (ep, af)
                    };
                    state = Some((up, next_sar, ep, af));
                    cells[i] = Some(next_sar);
                }
            }
        }
        prev_prev = Some((ph, pl));
        prev_bar = Some((i, h, l));
    }
    Ok(Series::from_cells(cells))
}

// ============================================================
// VORTEX
// ============================================================

/// Vortex indicator output.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Vortex {
    pub plus: Series,
    pub minus: Series,
}

/// Vortex: `VI± = Σ|high − low[-1]| (resp. |low − high[-1]|) / Σ TR` over the
/// window. Windows with zero total true range yield `None`.
pub fn vortex(candles: &Candles, length: usize) -> Result<Vortex> {
    Period::new(length)?;
    let n = candles.len();
    let vm = |up: bool| {
        Series::from_cells(
            (0..n)
                .map(|i| {
                    let p = i.checked_sub(1)?;
                    Some(if up {
                        (candles.high().get(i)? - candles.low().get(p)?).abs()
                    } else {
                        (candles.low().get(i)? - candles.high().get(p)?).abs()
                    })
                })
                .collect(),
        )
    };
    let tr_sum = sum(&true_range(candles), length)?;
    let vm_plus = sum(&vm(true), length)?;
    let vm_minus = sum(&vm(false), length)?;

    let ratio = |vm: &Series| {
        Series::from_cells(
            (0..n)
                .map(|i| {
                    let (v, tr) = (vm.get(i)?, tr_sum.get(i)?);
                    (tr != 0.0).then(|| v / tr)
                })
                .collect(),
        )
    };
    Ok(Vortex {
        plus: ratio(&vm_plus),
        minus: ratio(&vm_minus),
    })
}

// ============================================================
// SUPERTREND
// ============================================================

/// SuperTrend output: the trailing band line and a +1/−1 direction series.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SuperTrend {
    pub line: Series,
    pub direction: Series,
}

/// SuperTrend trailing band: `hl2 ± multiplier·ATR` with band locking and
/// directional persistence. Direction is +1 while price rides the lower band,
/// −1 while it rides the upper band.
pub fn supertrend(candles: &Candles, length: usize, multiplier: f64) -> Result<SuperTrend> {
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return Err(EngineError::Configuration {
            param: "multiplier",
            reason: "must be a positive finite value",
        });
    }
    let atr = atr(candles, length)?;
    let hl2 = candles.hl2();
    let n = candles.len();

    let mut line = vec![None; n];
    let mut direction = vec![None; n];
    // (upper band, lower band, direction)
    let mut state: Option<(f64, f64, f64)> = None;

    for i in 0..n {
        let (Some(mid), Some(a), Some(c)) = (hl2.get(i), atr.get(i), candles.close().get(i))
        else {
            state = None;
            continue;
        };
        let basic_upper = mid + multiplier * a;
        let basic_lower = mid - multiplier * a;

        let (upper, lower, dir) = match state {
            None => (basic_upper, basic_lower, 1.0),
            Some((prev_upper, prev_lower, prev_dir)) => {
                let prev_close = i.checked_sub(1).and_then(|p| candles.close().get(p));
                // Bands only tighten unless the prior close already broke out.
                let upper = if basic_upper < prev_upper
                    || prev_close.map_or(false, |pc| pc > prev_upper)
                {
                    basic_upper
                } else {
                    prev_upper
                };
                let lower = if basic_lower > prev_lower
                    || prev_close.map_or(false, |pc| pc < prev_lower)
                {
                    basic_lower
                } else {
                    prev_lower
                };
                let dir = if prev_dir > 0.0 && c < lower {
                    -1.0
                } else if prev_dir < 0.0 && c > upper {
                    1.0
                } else {
                    prev_dir
                };
                (upper, lower, dir)
            }
        };
        state = Some((upper, lower, dir));
        line[i] = Some(if dir > 0.0 { lower } else { upper });
        direction[i] = Some(dir);
    }
    Ok(SuperTrend {
        line: Series::from_cells(line),
        direction: Series::from_cells(direction),
    })
}

// ============================================================
// BANDS
// ============================================================

/// Offset measure for [`bands`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BandKind {
    /// `width ×` population standard deviation over `length`.
    StDev,
    /// Fixed price offset of `width`.
    Constant,
    /// `width ×` ATR over `length` (requires candles).
    Atr,
    /// `width` percent of the base line.
    Percentage,
}

impl BandKind {
    /// Resolve a kind from its script-facing name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "stdev" | "st.dev." => Ok(Self::StDev),
            "constant" => Ok(Self::Constant),
            "atr" => Ok(Self::Atr),
            "percentage" => Ok(Self::Percentage),
            _ => Err(EngineError::Configuration {
                param: "band_kind",
                reason: "unknown band kind name",
            }),
        }
    }
}

/// A pair of offset lines around a base line.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Band {
    pub upper: Series,
    pub lower: Series,
}

/// Offset `base` up and down by a statistical or fixed measure.
///
/// `length` feeds the St.Dev./ATR window; `candles` is required for ATR bands
/// and ignored otherwise.
pub fn bands(
    base: &Series,
    kind: BandKind,
    width: f64,
    length: usize,
    candles: Option<&Candles>,
) -> Result<Band> {
    if !width.is_finite() {
        return Err(EngineError::Configuration {
            param: "width",
            reason: "must be finite",
        });
    }
    let offset: Series = match kind {
        BandKind::StDev => stdev(base, length)?.map(|c| c.map(|v| v * width)),
        BandKind::Constant => Series::constant(base.len(), width),
        BandKind::Atr => {
            let candles = candles.ok_or(EngineError::Configuration {
                param: "candles",
                reason: "ATR bands require candle data",
            })?;
            atr(candles, length)?.map(|c| c.map(|v| v * width))
        }
        BandKind::Percentage => base.map(|c| c.map(|v| v.abs() * width / 100.0)),
    };

    let combine = |sign: f64| {
        Series::from_cells(
            (0..base.len())
                .map(|i| Some(base.get(i)? + sign * offset.get(i)?))
                .collect(),
        )
    };
    Ok(Band {
        upper: combine(1.0),
        lower: combine(-1.0),
    })
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn s(values: Vec<f64>) -> Series {
        Series::from_values(values)
    }

    fn trending_candles(n: usize, step: f64) -> Candles {
        let close: Vec<f64> = (0..n).map(|i| 100.0 + i as f64 * step).collect();
        Candles::new(
            (0..n as i64).collect(),
            close.clone(),
            close.iter().map(|c| c + 1.0).collect(),
            close.iter().map(|c| c - 1.0).collect(),
            close.clone(),
            vec![1000.0; n],
        )
        .unwrap()
    }

    #[test]
    fn test_ema_seed_is_sma() {
        let input = s(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let out = ema(&input, 3).unwrap();
        assert_eq!(out.get(0), None);
        assert_eq!(out.get(1), None);
        assert_eq!(out.get(2), Some(2.0)); // SMA seed
        let alpha = 2.0 / 4.0;
        let expected = 2.0 + alpha * (4.0 - 2.0);
        assert!((out.get(3).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_ema_gap_resets() {
        let input = Series::from_cells(vec![
            Some(1.0),
            Some(2.0),
            Some(3.0),
            None,
            Some(10.0),
            Some(20.0),
            Some(30.0),
        ]);
        let out = ema(&input, 3).unwrap();
        assert!(out.get(2).is_some());
        assert_eq!(out.get(3), None);
        assert_eq!(out.get(4), None);
        assert_eq!(out.get(5), None);
        assert_eq!(out.get(6), Some(20.0)); // fresh SMA seed over 10,20,30
    }

    #[test]
    fn test_rma_alpha() {
        let input = s(vec![1.0, 2.0, 3.0, 4.0]);
        let out = rma(&input, 3).unwrap();
        let expected = 2.0 + (1.0 / 3.0) * (4.0 - 2.0);
        assert!((out.get(3).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_hullma_linear_input() {
        let input = s((0..30).map(f64::from).collect());
        let out = hullma(&input, 9).unwrap();
        // Hull of a linear ramp tracks the ramp closely.
        let last = out.get(29).unwrap();
        assert!((last - 29.0).abs() < 1.0, "hull lagged too far: {last}");
    }

    #[test]
    fn test_kama_constant_input() {
        let input = s(vec![5.0; 40]);
        let out = kama(&input, 10, 2, 30).unwrap();
        assert_eq!(out.get(5), None);
        assert!((out.get(39).unwrap() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_kama_validation() {
        let input = s(vec![1.0; 10]);
        assert!(kama(&input, 10, 0, 30).is_err());
        assert!(kama(&input, 10, 30, 2).is_err());
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let input = s((0..20).map(f64::from).collect());
        let out = rsi(&input, 14).unwrap();
        assert_eq!(out.get(19), Some(100.0));
    }

    #[test]
    fn test_rsi_flat_is_50() {
        let input = s(vec![7.0; 20]);
        let out = rsi(&input, 14).unwrap();
        assert_eq!(out.get(19), Some(50.0));
    }

    #[test]
    fn test_rsi_warmup_is_none() {
        let input = s((0..20).map(f64::from).collect());
        let out = rsi(&input, 14).unwrap();
        // First defined value needs length deltas, i.e. length+1 values.
        assert_eq!(out.get(13), None);
        assert!(out.get(14).is_some());
    }

    #[test]
    fn test_cmo_bounds() {
        let input = s((0..20).map(f64::from).collect());
        let out = cmo(&input, 14).unwrap();
        assert_eq!(out.get(19), Some(100.0));
        let flat = cmo(&s(vec![3.0; 20]), 14).unwrap();
        assert_eq!(flat.get(19), Some(0.0));
    }

    #[test]
    fn test_true_range_uses_prev_close() {
        let candles = Candles::new(
            vec![0, 1],
            vec![10.0, 14.0],
            vec![11.0, 15.0],
            vec![9.0, 13.0],
            vec![10.0, 14.0],
            vec![1.0, 1.0],
        )
        .unwrap();
        let tr = true_range(&candles);
        assert_eq!(tr.get(0), Some(2.0));
        // max(15-13, |15-10|, |13-10|) = 5
        assert_eq!(tr.get(1), Some(5.0));
    }

    #[test]
    fn test_atr_flat_range() {
        let candles = trending_candles(30, 0.0);
        let out = atr(&candles, 14).unwrap();
        assert!((out.get(29).unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_stochastic_bounds() {
        let candles = trending_candles(30, 1.0);
        let st = stochastic(&candles, 14, 3).unwrap();
        let k = st.k.get(29).unwrap();
        assert!((0.0..=100.0).contains(&k));
        assert!(k > 80.0, "rising market should sit near the top: {k}");
        assert!(st.d.get(29).is_some());
    }

    #[test]
    fn test_williams_r_bounds() {
        let candles = trending_candles(30, 1.0);
        let out = williams_r(&candles, 14).unwrap();
        let w = out.get(29).unwrap();
        assert!((-100.0..=0.0).contains(&w));
        assert!(w > -20.0, "rising market should be near 0: {w}");
    }

    #[test]
    fn test_psar_below_price_in_uptrend() {
        let candles = trending_candles(30, 1.0);
        let out = psar(&candles, &PsarParams::default()).unwrap();
        let sar = out.get(29).unwrap();
        let low = candles.low().get(29).unwrap();
        assert!(sar < low, "SAR {sar} should trail below lows in an uptrend");
    }

    #[test]
    fn test_psar_params_validation() {
        let candles = trending_candles(10, 1.0);
        let bad = PsarParams {
            af_start: 0.0,
            ..Default::default()
        };
        assert!(psar(&candles, &bad).is_err());
    }

    #[test]
    fn test_vortex_uptrend_bias() {
        let candles = trending_candles(40, 1.0);
        let v = vortex(&candles, 14).unwrap();
        let plus = v.plus.get(39).unwrap();
        let minus = v.minus.get(39).unwrap();
        assert!(plus > minus, "uptrend should have VI+ ({plus}) > VI- ({minus})");
    }

    #[test]
    fn test_supertrend_direction() {
        let candles = trending_candles(60, 1.0);
        let st = supertrend(&candles, 10, 3.0).unwrap();
        assert_eq!(st.direction.get(59), Some(1.0));
        let line = st.line.get(59).unwrap();
        assert!(line < candles.close().get(59).unwrap());
    }

    #[test]
    fn test_supertrend_validation() {
        let candles = trending_candles(10, 1.0);
        assert!(supertrend(&candles, 10, 0.0).is_err());
        assert!(supertrend(&candles, 10, f64::NAN).is_err());
    }

    #[test]
    fn test_bands_constant() {
        let base = s(vec![100.0; 5]);
        let band = bands(&base, BandKind::Constant, 2.0, 1, None).unwrap();
        assert_eq!(band.upper.get(0), Some(102.0));
        assert_eq!(band.lower.get(0), Some(98.0));
    }

    #[test]
    fn test_bands_percentage() {
        let base = s(vec![200.0; 3]);
        let band = bands(&base, BandKind::Percentage, 10.0, 1, None).unwrap();
        assert_eq!(band.upper.get(0), Some(220.0));
        assert_eq!(band.lower.get(0), Some(180.0));
    }

    #[test]
    fn test_bands_atr_requires_candles() {
        let base = s(vec![100.0; 5]);
        let err = bands(&base, BandKind::Atr, 2.0, 3, None);
        assert!(matches!(err, Err(EngineError::Configuration { .. })));
    }

    #[test]
    fn test_band_kind_from_name() {
        assert_eq!(BandKind::from_name("st.dev.").unwrap(), BandKind::StDev);
        assert_eq!(BandKind::from_name("atr").unwrap(), BandKind::Atr);
        assert!(BandKind::from_name("bogus").is_err());
    }
}

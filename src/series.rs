//! Index-aligned numeric series with explicit missing cells, plus the sparse
//! series utilities (point extraction, interpolation, cross-resolution
//! landing, trimming) and variadic series arithmetic.

use crate::{EngineError, Result};

// ============================================================
// SERIES
// ============================================================

/// Ordered sequence of optional values, oldest first.
///
/// A `Series` is immutable after creation; every transformation allocates a
/// new series. `None` cells mark missing history or sparse data, never an
/// error state. Non-finite inputs are normalized to `None` at construction.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Series {
    cells: Vec<Option<f64>>,
}

impl Series {
    /// Build from dense values. NaN and infinities become `None`.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self {
            cells: values
                .into_iter()
                .map(|v| v.is_finite().then_some(v))
                .collect(),
        }
    }

    /// Build from explicit cells. Non-finite values become `None`.
    pub fn from_cells(cells: Vec<Option<f64>>) -> Self {
        Self {
            cells: cells
                .into_iter()
                .map(|c| c.filter(|v| v.is_finite()))
                .collect(),
        }
    }

    /// A series of `len` copies of `value`.
    pub fn constant(len: usize, value: f64) -> Self {
        Self::from_cells(vec![Some(value); len])
    }

    /// A series of `len` missing cells.
    pub fn nulls(len: usize) -> Self {
        Self {
            cells: vec![None; len],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell at `index`; out-of-bounds reads are `None`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.cells.get(index).copied().flatten()
    }

    #[inline]
    pub fn cells(&self) -> &[Option<f64>] {
        &self.cells
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.cells.iter().copied()
    }

    /// New series with `f` applied to every cell.
    pub fn map<F: Fn(Option<f64>) -> Option<f64>>(&self, f: F) -> Series {
        Series::from_cells(self.cells.iter().map(|c| f(*c)).collect())
    }
}

impl From<Vec<f64>> for Series {
    fn from(values: Vec<f64>) -> Self {
        Series::from_values(values)
    }
}

// ============================================================
// SPARSE UTILITIES
// ============================================================

/// A non-null cell extracted from a series.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IndexedPoint {
    pub value: f64,
    pub index: usize,
}

/// Emit `{value, index}` for every non-null cell, in index order. O(n).
pub fn indexed_points_of(series: &Series) -> Vec<IndexedPoint> {
    series
        .iter()
        .enumerate()
        .filter_map(|(index, cell)| cell.map(|value| IndexedPoint { value, index }))
        .collect()
}

/// Fill mode for [`interpolate_sparse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Interpolation {
    /// Linear interpolation between consecutive anchors.
    Linear,
    /// Repeat the left anchor's value up to (not including) the right anchor.
    Constant,
}

/// Fill the gaps between consecutive non-null points.
///
/// Cells before the first anchor and after the last anchor stay `None`;
/// constant mode never extrapolates backward.
pub fn interpolate_sparse(series: &Series, mode: Interpolation) -> Series {
    let points = indexed_points_of(series);
    let mut cells = vec![None; series.len()];

    for pair in points.windows(2) {
        let (left, right) = (pair[0], pair[1]);
        cells[left.index] = Some(left.value);
        for i in (left.index + 1)..right.index {
            let value = match mode {
                Interpolation::Linear => {
                    let t = (i - left.index) as f64 / (right.index - left.index) as f64;
                    left.value + (right.value - left.value) * t
                }
                Interpolation::Constant => left.value,
            };
            cells[i] = Some(value);
        }
        cells[right.index] = Some(right.value);
    }

    // A lone anchor still lands on its own index.
    if points.len() == 1 {
        cells[points[0].index] = Some(points[0].value);
    }

    Series::from_cells(cells)
}

/// Target-index resolution for [`land_points_onto_series`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LandMethod {
    /// Exact timestamp match.
    Eq,
    /// First target timestamp strictly greater than the source timestamp.
    Gt,
    /// First target timestamp greater than or equal to the source timestamp.
    Ge,
    /// Last target timestamp strictly less than the source timestamp.
    Lt,
    /// Last target timestamp less than or equal to the source timestamp.
    Le,
}

fn ensure_sorted(name: &str, ts: &[i64]) -> Result<()> {
    if ts.windows(2).any(|w| w[0] > w[1]) {
        return Err(EngineError::Precondition(format!(
            "{name} timestamps must be sorted ascending"
        )));
    }
    Ok(())
}

fn resolve_target(target_ts: &[i64], ts: i64, method: LandMethod) -> Option<usize> {
    // partition_point gives the count of elements < ts (or <= ts).
    let lt = target_ts.partition_point(|&t| t < ts);
    let le = target_ts.partition_point(|&t| t <= ts);
    match method {
        LandMethod::Eq => (lt < le).then_some(lt),
        LandMethod::Ge => (lt < target_ts.len()).then_some(lt),
        LandMethod::Gt => (le < target_ts.len()).then_some(le),
        LandMethod::Le => le.checked_sub(1),
        LandMethod::Lt => lt.checked_sub(1),
    }
}

/// Land sparse source points onto another timestamp grid.
///
/// Both timestamp arrays must be sorted ascending. Each source point resolves
/// a target index by binary search per `method`; points with no resolvable
/// target are dropped. When several source points land on the same target
/// index they are combined with `merge(existing, new)`, defaulting to
/// overwrite.
pub fn land_points_onto_series(
    source_ts: &[i64],
    source_values: &[f64],
    target_ts: &[i64],
    method: LandMethod,
    merge: Option<&dyn Fn(f64, f64) -> f64>,
) -> Result<Series> {
    if source_ts.len() != source_values.len() {
        return Err(EngineError::Precondition(format!(
            "source timestamps ({}) and values ({}) differ in length",
            source_ts.len(),
            source_values.len()
        )));
    }
    ensure_sorted("source", source_ts)?;
    ensure_sorted("target", target_ts)?;

    let mut cells: Vec<Option<f64>> = vec![None; target_ts.len()];
    for (&ts, &value) in source_ts.iter().zip(source_values) {
        if let Some(idx) = resolve_target(target_ts, ts, method) {
            cells[idx] = Some(match (cells[idx], merge) {
                (Some(existing), Some(f)) => f(existing, value),
                _ => value,
            });
        }
    }
    Ok(Series::from_cells(cells))
}

/// Null out every cell outside `[from, to]`. Negative indices count from the
/// end (`-1` is the last cell). The kept range is not reallocated cell-wise;
/// values inside it are preserved exactly.
pub fn cut_series(series: &Series, from: isize, to: isize) -> Series {
    let len = series.len() as isize;
    let resolve = |i: isize| if i < 0 { len + i } else { i };
    let from = resolve(from).max(0);
    let to = resolve(to).min(len - 1);

    let cells = series
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let i = i as isize;
            if i >= from && i <= to {
                cell
            } else {
                None
            }
        })
        .collect();
    Series::from_cells(cells)
}

// ============================================================
// VARIADIC ARITHMETIC
// ============================================================

/// A series-or-scalar operand for the variadic arithmetic operations.
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    Series(&'a Series),
    Scalar(f64),
}

fn combine<F: Fn(f64, f64) -> Option<f64>>(operands: &[Operand<'_>], op: F) -> Result<Series> {
    if operands.is_empty() {
        return Err(EngineError::Configuration {
            param: "operands",
            reason: "operand list must be non-empty",
        });
    }
    let len = operands
        .iter()
        .find_map(|o| match o {
            Operand::Series(s) => Some(s.len()),
            Operand::Scalar(_) => None,
        })
        .ok_or(EngineError::Configuration {
            param: "operands",
            reason: "at least one operand must be a series",
        })?;

    for o in operands {
        if let Operand::Series(s) = o {
            if s.len() != len {
                return Err(EngineError::Precondition(format!(
                    "operand series lengths differ: {} vs {}",
                    len,
                    s.len()
                )));
            }
        }
    }

    let cell_at = |o: &Operand<'_>, i: usize| match o {
        Operand::Series(s) => s.get(i),
        Operand::Scalar(v) => Some(*v),
    };

    let cells = (0..len)
        .map(|i| {
            let mut acc = cell_at(&operands[0], i);
            for o in &operands[1..] {
                acc = match (acc, cell_at(o, i)) {
                    (Some(a), Some(b)) => op(a, b),
                    _ => None,
                };
            }
            acc
        })
        .collect();
    Ok(Series::from_cells(cells))
}

/// Pairwise left-to-right addition over a non-empty operand list.
pub fn add(operands: &[Operand<'_>]) -> Result<Series> {
    combine(operands, |a, b| Some(a + b))
}

/// Pairwise left-to-right subtraction.
pub fn sub(operands: &[Operand<'_>]) -> Result<Series> {
    combine(operands, |a, b| Some(a - b))
}

/// Pairwise left-to-right multiplication.
pub fn mul(operands: &[Operand<'_>]) -> Result<Series> {
    combine(operands, |a, b| Some(a * b))
}

/// Pairwise left-to-right division. Division by zero yields `None` cells.
pub fn div(operands: &[Operand<'_>]) -> Result<Series> {
    combine(operands, |a, b| (b != 0.0).then(|| a / b))
}

// ============================================================
// PER-CANDLE EVALUATION
// ============================================================

/// Evaluate `f(current values, previous output, index)` once per index in
/// increasing order.
///
/// All input series must share one length. `f` sees the freshly produced
/// previous output cell, which makes recursive definitions (EMA-style state)
/// expressible without mutation.
pub fn for_every<F>(inputs: &[&Series], mut f: F) -> Result<Series>
where
    F: FnMut(&[Option<f64>], Option<f64>, usize) -> Option<f64>,
{
    let len = match inputs.first() {
        Some(s) => s.len(),
        None => {
            return Err(EngineError::Configuration {
                param: "inputs",
                reason: "input list must be non-empty",
            })
        }
    };
    if inputs.iter().any(|s| s.len() != len) {
        return Err(EngineError::Precondition(
            "input series lengths differ".to_string(),
        ));
    }

    let mut cells: Vec<Option<f64>> = Vec::with_capacity(len);
    let mut row: Vec<Option<f64>> = vec![None; inputs.len()];
    let mut prev = None;
    for i in 0..len {
        for (slot, s) in row.iter_mut().zip(inputs) {
            *slot = s.get(i);
        }
        let out = f(&row, prev, i);
        prev = out;
        cells.push(out);
    }
    Ok(Series::from_cells(cells))
}

// ============================================================
// TESTS
// ============================================================

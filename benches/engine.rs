//! Benchmarks for series computation and pattern recognition.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trendscan::prelude::*;

/// Generate realistic deterministic candles
fn generate_candles(n: usize) -> Candles {
    let mut close = Vec::with_capacity(n);
    let mut high = Vec::with_capacity(n);
    let mut low = Vec::with_capacity(n);
    let mut open = Vec::with_capacity(n);
    let mut price = 100.0;

    for i in 0..n {
        let change = ((i * 7 + 13) % 100) as f64 / 50.0 - 1.0; // Deterministic "random"
        let volatility = 2.0 + ((i * 3) % 10) as f64 / 5.0;

        let o = price;
        let c = price + change;
        open.push(o);
        close.push(c);
        high.push(o.max(c) + volatility * 0.5);
        low.push(o.min(c) - volatility * 0.5);
        price = c;
    }

    Candles::new(
        (0..n as i64).collect(),
        open,
        high,
        low,
        close,
        vec![1_000.0; n],
    )
    .unwrap()
}

fn bench_reducers(c: &mut Criterion) {
    let candles = generate_candles(10_000);
    let closes = candles.close();

    c.bench_function("sma_10000_bars", |b| {
        b.iter(|| black_box(sma(black_box(closes), 20)))
    });
    c.bench_function("ema_10000_bars", |b| {
        b.iter(|| black_box(ema(black_box(closes), 20)))
    });
    c.bench_function("rsi_10000_bars", |b| {
        b.iter(|| black_box(rsi(black_box(closes), 14)))
    });
    c.bench_function("atr_10000_bars", |b| {
        b.iter(|| black_box(atr(black_box(&candles), 14)))
    });
}

fn bench_zigzag(c: &mut Criterion) {
    let params = ZigZagParams::default();

    let mut group = c.benchmark_group("zigzag");
    for size in [1_000, 10_000].iter() {
        let candles = generate_candles(*size);
        group.bench_with_input(BenchmarkId::new("extract", size), size, |b, _| {
            b.iter(|| black_box(zigzag_candles(black_box(&candles), black_box(&params))))
        });
    }
    group.finish();
}

fn bench_trend_scorer(c: &mut Criterion) {
    let candles = generate_candles(2_000);
    let points: Vec<BasePoint> = (0..candles.len())
        .step_by(40)
        .map(|index| BasePoint { index, weight: 1.0 })
        .collect();
    let params = TrendParams::default();

    c.bench_function("find_trends_50_points", |b| {
        b.iter(|| {
            black_box(find_trends(
                black_box(&candles),
                black_box(&points),
                AnchorField::High,
                black_box(&params),
                None,
            ))
        })
    });
}

fn bench_pattern_suite(c: &mut Criterion) {
    let candles = generate_candles(1_000);
    let suite = PatternSuite::default();

    c.bench_function("pattern_suite_1000_bars", |b| {
        b.iter(|| black_box(suite.run(black_box(&candles))))
    });
}

fn bench_parallel_scan(c: &mut Criterion) {
    let suite = PatternSuite::default();
    let charts: Vec<Candles> = (0..4).map(|i| generate_candles(1_000 + i * 37)).collect();
    let instruments: Vec<(&str, &Candles)> = vec![
        ("SYM1", &charts[0]),
        ("SYM2", &charts[1]),
        ("SYM3", &charts[2]),
        ("SYM4", &charts[3]),
    ];

    c.bench_function("parallel_scan_4_instruments", |b| {
        b.iter(|| black_box(scan_parallel(black_box(&suite), black_box(instruments.clone()))))
    });
}

criterion_group!(
    benches,
    bench_reducers,
    bench_zigzag,
    bench_trend_scorer,
    bench_pattern_suite,
    bench_parallel_scan
);
criterion_main!(benches);

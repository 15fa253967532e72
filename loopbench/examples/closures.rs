//! LoopBench Closure Benchmarks
//!
//! Measures a few Rust closures on the loop driver and prints the ranked
//! table. Setup inside a closure runs every iteration but is only timed when
//! it sits inside `r.measure(..)`.
//!
//! Run with:
//!   cargo run --example closures             # 0.5 s per target
//!   cargo run --example closures -- -1       # single iteration each
//!   cargo run --example closures -- 2.0      # 2 s per target

use loopbench::prelude::*;
use std::hint::black_box;

const SIZE: u64 = 2_000;

fn main() -> anyhow::Result<()> {
    let run_sec: f64 = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 0.5,
    };
    let floor = MeasurabilityFloor::calibrate();
    println!("measurability floor: {floor} s");

    let mut settings = MeasureSettings::new(RunBudget::from_secs(run_sec)?, floor);
    settings.check_too_fast = true;

    let mut samples = Vec::new();

    // Whole body: no region marked, the closure is timed end to end
    let mut iter_sum = ClosureRoutine::new("iter_sum", |_r| {
        black_box((0..black_box(SIZE)).sum::<u64>());
        Ok(())
    });
    samples.push(measure("iter_sum", &mut iter_sum, &settings)?);

    // Setup excluded: only the summation is timed
    let mut vec_sum = ClosureRoutine::new("vec_sum", |r| {
        let data: Vec<u64> = (0..SIZE).collect();
        r.measure("sum", || black_box(data.iter().sum::<u64>()))?;
        Ok(())
    });
    samples.push(measure("vec_sum", &mut vec_sum, &settings)?);

    // Two regions: sorting and the lookup afterwards; the shuffle is not timed
    let mut sort_then_search = ClosureRoutine::new("sort_then_search", |r| {
        let mut data: Vec<u64> = (0..SIZE).map(|i| (i * 7919) % SIZE).collect();
        r.measure("sort", || data.sort_unstable())?;
        r.measure("search", || {
            black_box((0..SIZE).filter(|k| data.binary_search(k).is_ok()).count())
        })?;
        Ok(())
    });
    samples.push(measure("sort_then_search", &mut sort_then_search, &settings)?);

    // With the collector left on, for comparison with the runs above
    let mut with_gc = ClosureRoutine::new("vec_sum_gc", |r| {
        let data: Vec<u64> = (0..SIZE).collect();
        r.measure("sum", || black_box(data.iter().sum::<u64>()))?;
        Ok(())
    });
    let gc_settings = MeasureSettings {
        with_gc: true,
        ..settings
    };
    samples.push(measure("vec_sum_gc", &mut with_gc, &gc_settings)?);

    let rows = rank_samples(samples, RankBy::Best);
    print!("{}", loopbench::format_table(&rows, false));
    Ok(())
}

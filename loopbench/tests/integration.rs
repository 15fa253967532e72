//! Integration tests for LoopBench
//!
//! These tests verify the end-to-end behavior of the benchmarking system.

use loopbench::prelude::*;
use loopbench::{WHOLE_BODY, generate_json_report};
use loopbench_cli::{Executor, FailurePolicy, LoopConfig, build_plan};
use std::path::PathBuf;
use std::time::Duration;

fn demos() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("demos")
}

fn zero_floor() -> MeasurabilityFloor {
    MeasurabilityFloor::from_secs(0.0)
}

/// The demo configuration runs end to end without failures
#[test]
fn test_demo_config_runs() {
    let mut config = LoopConfig::load(demos().join("loopbench.toml")).unwrap();
    config.settings.run_sec = -1.0;
    config.settings.repeat = 1;
    let plan = build_plan(&config, None).unwrap();
    assert_eq!(plan.target_count(), 6);

    let report = Executor::new(config.settings.clone(), FailurePolicy::Abort)
        .with_progress(false)
        .with_floor(zero_floor())
        .execute(&plan)
        .unwrap();

    assert_eq!(report.failure_count(), 0);
    assert_eq!(report.modules.len(), 2);
    assert_eq!(report.modules[0].passes[0].len(), 4);
    assert_eq!(report.modules[1].passes[0].len(), 2);
    for module in &report.modules {
        let table = &module.passes[0];
        assert_eq!(table[0].compare, 100.0);
        assert!(table.iter().all(|row| row.sample.loops == 1));
        assert!(table.iter().all(|row| row.sample.second_best_loop_sec.is_none()));
    }

    let json = generate_json_report(&report).unwrap();
    assert!(json.contains("\"passes\""));
    assert!(json.contains("scaled lengths"));
}

/// A timed budget loops until the wall clock passes it
#[test]
fn test_script_budget_and_ordering() {
    let module = ScriptModule::load(demos().join("sorting.lbs")).unwrap();
    let synth = Synthesizer::new(SynthSettings::new(0.1, zero_floor()).unwrap());
    let started = std::time::Instant::now();

    let routine = synth
        .synthesize(module.callable("sum_loop").unwrap(), &Args::new().arg(50i64))
        .unwrap();
    let sample = routine.run(false).unwrap();

    assert!(started.elapsed() >= Duration::from_millis(100));
    assert!(sample.loops > 1);
    assert!(sample.best_loop_sec <= sample.avg_loop_sec);
    assert!(sample.avg_loop_sec <= sample.worst_loop_sec);
    assert!(sample.second_best_loop_sec.is_some());
    assert!(sample.second_worst_loop_sec.is_some());
}

/// Closures and script routines rank together
#[test]
fn test_closures_rank_with_scripts() {
    let settings = MeasureSettings::new(RunBudget::Once, zero_floor());

    let mut slow = ClosureRoutine::new("slow", |r| {
        r.measure("sleep", || std::thread::sleep(Duration::from_millis(10)))
    });
    let mut fast = ClosureRoutine::new("fast", |_r| Ok(()));
    let samples = vec![
        measure("slow", &mut slow, &settings).unwrap(),
        measure("fast", &mut fast, &settings).unwrap(),
    ];

    let rows = rank_samples(samples, RankBy::Best);
    assert_eq!(rows[0].name(), "fast");
    assert_eq!(rows[0].rank, 1);
    assert_eq!(rows[1].name(), "slow");
    assert!(rows[1].compare > 100.0);

    // Ranking an already ranked table keeps the order
    let again = rank_samples(rows.iter().map(|r| r.sample.clone()).collect(), RankBy::Best);
    let names: Vec<&str> = again.iter().map(|r| r.name()).collect();
    assert_eq!(names, vec!["fast", "slow"]);
}

/// Too-fast regions fail with the region label
#[test]
fn test_too_fast_region_names_the_region() {
    let floor = MeasurabilityFloor::from_secs(10.0);
    let mut settings = MeasureSettings::new(RunBudget::Once, floor);
    settings.check_too_fast = true;

    let mut routine = ClosureRoutine::new("quick", |_r| Ok(()));
    let err = measure("quick", &mut routine, &settings).unwrap_err();
    assert!(matches!(
        err,
        BenchError::MeasurementTooFast { ref region, .. } if region == WHOLE_BODY
    ));
}

/// Argument errors are reported before anything runs
#[test]
fn test_unexpected_keyword() {
    let module = ScriptModule::load(demos().join("strings.lbs")).unwrap();
    let synth = Synthesizer::new(SynthSettings::new(-1.0, zero_floor()).unwrap());
    let err = synth
        .synthesize(
            module.callable("concat_words").unwrap(),
            &Args::new().kwarg("bogus", 1i64),
        )
        .unwrap_err();
    assert!(matches!(err, BenchError::UnexpectedKeyword { .. }));
}

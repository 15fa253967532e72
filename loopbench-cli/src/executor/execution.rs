//! Pass Execution
//!
//! Runs the planned targets for every repeat pass and collects the ranked
//! tables into a [`Report`].
//!
//! ## Data Flow
//!
//! ```text
//! ExecutionPlan (from loopbench.toml)
//!        │
//!        ▼
//!  ScriptModule::load            once per module
//!        │
//!        ▼
//! ┌──────────────────┐
//! │ pass 1..=repeat  │  calibrate floor → synthesize → measure → rank
//! └────────┬─────────┘
//!          │
//!          ▼
//!  Report (one ranked table per module per pass, failures, listings)
//! ```

use crate::config::BenchSettings;
use crate::planner::{ExecutionPlan, PlannedTarget};
use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use loopbench_core::{MeasurabilityFloor, TimingSample};
use loopbench_report::{
    FailureInfo, ModuleReport, Report, ReportConfig, SourceListing, rank_samples,
};
use loopbench_script::{ScriptError, ScriptModule, SynthSettings, Synthesizer};

/// What a pass does when a target fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the run with the target's error
    Abort,
    /// Record the failure, leave the target out of the table and continue
    #[default]
    Report,
}

/// Runs execution plans
#[derive(Debug, Clone)]
pub struct Executor {
    settings: BenchSettings,
    policy: FailurePolicy,
    show_progress: bool,
    floor: Option<MeasurabilityFloor>,
}

impl Executor {
    /// Create an executor with a visible progress bar.
    pub fn new(settings: BenchSettings, policy: FailurePolicy) -> Self {
        Self {
            settings,
            policy,
            show_progress: true,
            floor: None,
        }
    }

    /// Show or hide the progress bar.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Use a fixed measurability floor instead of calibrating every pass.
    pub fn with_floor(mut self, floor: MeasurabilityFloor) -> Self {
        self.floor = Some(floor);
        self
    }

    /// Execute every pass of `plan`.
    pub fn execute(&self, plan: &ExecutionPlan) -> anyhow::Result<Report> {
        let settings = &self.settings;
        let mut modules = Vec::with_capacity(plan.modules.len());
        for planned in &plan.modules {
            let module = ScriptModule::load(&planned.path)
                .with_context(|| format!("failed to load module {}", planned.path.display()))?;
            modules.push((module, ModuleReport::new(planned.path.display().to_string())));
        }

        let mut report = Report::new(ReportConfig {
            run_sec: settings.run_sec,
            repeat: settings.repeat,
            check_too_fast: settings.check_too_fast,
            with_gc: settings.with_gc,
            rank_by: settings.rank_by,
            floor_sec: Vec::with_capacity(settings.repeat as usize),
        });

        let pb = self.progress_bar((plan.target_count() * settings.repeat as usize) as u64);

        for pass in 1..=settings.repeat {
            let floor = self.floor.unwrap_or_else(MeasurabilityFloor::calibrate);
            tracing::info!(pass, floor = %floor, "measurability floor calibrated");
            report.meta.config.floor_sec.push(floor.as_secs());

            let synth = Synthesizer::new(
                SynthSettings::new(settings.run_sec, floor)?.check_too_fast(settings.check_too_fast),
            );

            for ((module, module_report), planned) in modules.iter_mut().zip(&plan.modules) {
                let mut samples = Vec::with_capacity(planned.targets.len());

                for target in &planned.targets {
                    pb.set_message(target.display_name.clone());
                    let listings =
                        (settings.output_source && pass == 1).then_some(&mut module_report.sources);
                    let result = measure_target(&synth, module, target, settings.with_gc, listings);
                    pb.inc(1);

                    match result {
                        Ok(sample) => samples.push(sample),
                        Err(e) if self.policy == FailurePolicy::Abort => {
                            pb.abandon();
                            return Err(anyhow::Error::new(e).context(format!(
                                "benchmark `{}` in {} failed",
                                target.display_name,
                                module.name()
                            )));
                        }
                        Err(e) => {
                            tracing::warn!(
                                benchmark = %target.display_name,
                                module = module.name(),
                                pass,
                                error = %e,
                                "benchmark failed"
                            );
                            module_report.failures.push(FailureInfo {
                                name: target.display_name.clone(),
                                pass,
                                kind: e.kind().to_string(),
                                message: e.to_string(),
                            });
                        }
                    }
                }

                module_report
                    .passes
                    .push(rank_samples(samples, settings.rank_by));
            }
        }

        pb.finish_with_message("Complete");
        report.modules = modules.into_iter().map(|(_, r)| r).collect();
        Ok(report)
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }
}

/// Synthesize and measure one target, naming the sample after its display name.
///
/// The listing goes to `listings` as soon as the routine exists, so targets
/// that fail while running still show their source.
fn measure_target(
    synth: &Synthesizer,
    module: &ScriptModule,
    target: &PlannedTarget,
    with_gc: bool,
    listings: Option<&mut Vec<SourceListing>>,
) -> Result<TimingSample, ScriptError> {
    let callable = module.callable(&target.function)?;
    let routine = synth.synthesize(callable, &target.args)?;
    if let Some(listings) = listings {
        listings.push(SourceListing {
            name: target.display_name.clone(),
            source: routine.source().to_string(),
        });
    }
    let mut sample = routine.run(with_gc)?;
    sample.name = target.display_name.clone();
    Ok(sample)
}

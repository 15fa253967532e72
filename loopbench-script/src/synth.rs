//! Routine Synthesizer
//!
//! Assembles the timed routine for one (callable, arguments) pair: extracted
//! body, region probes and parameter bindings are combined into a single
//! per-iteration program, which the shared loop driver runs under the
//! configured budget.
//!
//! The routine executes against a private copy of the callable's module
//! scope, so globals and native functions resolve as they do inside the
//! callable while assignments never leak back into the module.

use crate::binder::{Args, bind};
use crate::block::Program;
use crate::callable::Callable;
use crate::extract::{SourceLine, extract};
use crate::scope::Scope;
use crate::tagger::{Probe, TaggedLine, tag};
use loopbench_core::{
    IterationBody, IterationProbe, MeasurabilityFloor, MeasureSettings, Result, RunBudget,
    TimingSample,
};
use std::fmt::Write;

/// Settings baked into every synthesized routine.
#[derive(Debug, Clone, Copy)]
pub struct SynthSettings {
    /// How long each routine loops
    pub run_budget: RunBudget,
    /// Insert a too-fast guard after every region
    pub check_too_fast: bool,
    /// Calibrated measurability floor
    pub floor: MeasurabilityFloor,
}

impl SynthSettings {
    /// Validate a `run_sec` value and build settings with the too-fast check off.
    pub fn new(run_sec: f64, floor: MeasurabilityFloor) -> Result<Self> {
        Ok(Self {
            run_budget: RunBudget::from_secs(run_sec)?,
            check_too_fast: false,
            floor,
        })
    }

    /// Enable or disable the too-fast guard.
    pub fn check_too_fast(mut self, enabled: bool) -> Self {
        self.check_too_fast = enabled;
        self
    }
}

/// Builds timed routines from callables.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    settings: SynthSettings,
}

impl Synthesizer {
    /// Create a synthesizer using `settings` for every routine it builds.
    pub fn new(settings: SynthSettings) -> Self {
        Self { settings }
    }

    /// Settings applied to synthesized routines
    pub fn settings(&self) -> &SynthSettings {
        &self.settings
    }

    /// Build the timed routine measuring `callable` invoked with `args`.
    pub fn synthesize(&self, callable: &Callable, args: &Args) -> Result<SynthesizedRoutine> {
        let name = callable.name();
        let body = extract(callable)?;
        let tagged = tag(name, body, self.settings.check_too_fast)?;
        let bindings = bind(callable, args)?;

        let mut lines: Vec<TaggedLine> = bindings
            .iter()
            .map(|b| {
                TaggedLine::Code(SourceLine {
                    level: 0,
                    text: b.statement(),
                    line: callable.first_line(),
                })
            })
            .collect();
        lines.extend(tagged);

        let listing = render_listing(name, &self.settings, &lines);
        let program = Program::parse(name, &lines)?;
        tracing::debug!(
            function = name,
            bindings = bindings.len(),
            lines = lines.len(),
            "routine synthesized"
        );

        Ok(SynthesizedRoutine {
            listing,
            settings: self.settings,
            routine: ScriptRoutine {
                name: name.to_string(),
                program,
                scope: Scope::clone(callable.scope()),
            },
        })
    }
}

/// A routine ready to be measured once.
#[derive(Debug)]
pub struct SynthesizedRoutine {
    listing: String,
    settings: SynthSettings,
    routine: ScriptRoutine,
}

impl SynthesizedRoutine {
    /// Name of the measured callable
    pub fn name(&self) -> &str {
        &self.routine.name
    }

    /// Human-readable listing of the routine
    pub fn source(&self) -> &str {
        &self.listing
    }

    /// The per-iteration body, for driving with a custom loop driver.
    pub fn into_routine(self) -> ScriptRoutine {
        self.routine
    }

    /// Measure the routine with the collector forced to `with_gc`.
    pub fn run(self, with_gc: bool) -> Result<TimingSample> {
        let settings = MeasureSettings {
            budget: self.settings.run_budget,
            floor: self.settings.floor,
            check_too_fast: self.settings.check_too_fast,
            with_gc,
        };
        let mut routine = self.routine;
        let name = routine.name.clone();
        loopbench_core::measure(&name, &mut routine, &settings)
    }
}

/// The synthesized per-iteration body of a script callable.
#[derive(Debug)]
pub struct ScriptRoutine {
    name: String,
    program: Program,
    scope: Scope,
}

impl ScriptRoutine {
    /// Variables currently bound in the routine's private scope
    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl IterationBody for ScriptRoutine {
    fn run_iteration(&mut self, probe: &mut IterationProbe<'_>) -> Result<()> {
        self.program.run(&mut self.scope, probe)
    }
}

// ─── Listing ───

const INDENT: &str = "    ";

fn push_line(out: &mut String, depth: usize, text: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(text);
    out.push('\n');
}

fn render_listing(name: &str, settings: &SynthSettings, lines: &[TaggedLine]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "routine inner():  # from {name}");
    push_line(&mut out, 1, &format!("run_budget = {}", settings.run_budget));
    push_line(&mut out, 1, &format!("threshold = {}", settings.floor));
    push_line(
        &mut out,
        1,
        "loops = 0; total = 0.0; best = +inf; second_best = +inf; worst = 0.0; second_worst = 0.0",
    );
    push_line(&mut out, 1, "run_once = run_budget == -1");
    push_line(&mut out, 1, "start_wall = now()");
    push_line(&mut out, 1, "loop:");
    push_line(&mut out, 2, "loops += 1");
    push_line(&mut out, 2, "elapsed = 0.0");

    for line in lines {
        match line {
            TaggedLine::Code(code) => push_line(&mut out, 2 + code.level, &code.text),
            TaggedLine::Probe { level, probe, .. } => {
                let text = match probe {
                    Probe::Start => "region_start = now()".to_string(),
                    Probe::Accumulate { .. } => {
                        "region = now() - region_start; elapsed += region".to_string()
                    }
                    Probe::Guard { region } => format!(
                        "if region < threshold: fail MeasurementTooFast({name:?}, {region:?})"
                    ),
                };
                push_line(&mut out, 2 + level, &text);
            }
        }
    }

    push_line(&mut out, 2, "total += elapsed");
    push_line(&mut out, 2, "if elapsed <= best: second_best = best; best = elapsed");
    push_line(&mut out, 2, "elif elapsed < second_best: second_best = elapsed");
    push_line(&mut out, 2, "if elapsed >= worst: second_worst = worst; worst = elapsed");
    push_line(&mut out, 2, "elif elapsed > second_worst: second_worst = elapsed");
    push_line(&mut out, 2, "if run_once: break");
    push_line(&mut out, 2, "if now() - start_wall >= run_budget: break");
    push_line(&mut out, 1, "avg = total / loops");
    push_line(
        &mut out,
        1,
        "return {loops, total, avg, best, second_best if loops > 1, worst, second_worst if loops > 1}",
    );
    out
}

#![warn(missing_docs)]
//! LoopBench CLI Library
//!
//! Command line harness for script benchmarks: reads `loopbench.toml`,
//! measures every configured target for each repeat pass and prints the
//! ranked tables.
//!
//! # Example
//!
//! ```ignore
//! fn main() {
//!     if let Err(e) = loopbench_cli::run() {
//!         eprintln!("Error: {e:#}");
//!         std::process::exit(1);
//!     }
//! }
//! ```

mod config;
mod executor;
mod planner;

pub use config::*;
pub use executor::{Executor, FailurePolicy, format_human_output, format_table};
pub use planner::{ExecutionPlan, PlannedModule, PlannedTarget, build_plan};

use anyhow::Context;
use clap::{Parser, Subcommand};
use loopbench_report::{OutputFormat, RankBy, generate_json_report};
use regex::Regex;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

/// LoopBench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "loopbench")]
#[command(
    author,
    version,
    about = "LoopBench - micro-benchmarks for function bodies and marked regions"
)]
pub struct Cli {
    /// Optional subcommand (Run, List, Init); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Filter benchmarks by regex pattern on their display name
    #[arg(default_value = ".*")]
    pub filter: String,

    /// Configuration file (default: loopbench.toml found from the current directory up)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: human, json
    #[arg(long, default_value = "human")]
    pub format: String,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Loop budget per target in seconds, or -1 for a single iteration
    #[arg(long, allow_hyphen_values = true)]
    pub run_sec: Option<f64>,

    /// Number of ranked passes
    #[arg(long)]
    pub repeat: Option<u32>,

    /// Ranking metric: best, average
    #[arg(long)]
    pub rank_by: Option<RankBy>,

    /// Reject regions faster than the measurability floor
    #[arg(long, action = clap::ArgAction::Set)]
    pub check_too_fast: Option<bool>,

    /// Keep the collector enabled while measuring
    #[arg(long, action = clap::ArgAction::Set)]
    pub with_gc: Option<bool>,

    /// Print durations as raw seconds
    #[arg(long)]
    pub output_in_sec: bool,

    /// Display targets by benchmark name instead of function name
    #[arg(long)]
    pub bench_names: bool,

    /// Print the synthesized routine of every target
    #[arg(long)]
    pub source: bool,

    /// Stop at the first failing target
    #[arg(long)]
    pub fail_fast: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the configured benchmarks
    List,
    /// Run benchmarks (default)
    Run,
    /// Print a default loopbench.toml
    Init,
}

/// Run the LoopBench CLI with the process arguments.
///
/// # Returns
/// Returns `Ok(())` on success, or an error if something goes wrong.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the LoopBench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // Initialize logging; stdout stays reserved for the report
    let filter = if cli.verbose {
        "loopbench=debug"
    } else {
        "loopbench=info"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    if let Some(Commands::Init) = cli.command {
        print!("{}", LoopConfig::default_toml());
        return Ok(());
    }

    let config = resolve_config(&cli)?;
    let filter = Regex::new(&cli.filter)
        .with_context(|| format!("invalid filter pattern `{}`", cli.filter))?;
    let plan = build_plan(&config, Some(&filter))?;

    match cli.command {
        Some(Commands::List) => list_benchmarks(&plan),
        _ => run_benchmarks(&cli, &config, &plan),
    }
}

/// Load the configuration and layer CLI overrides on top.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<LoopConfig> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => LoopConfig::discover(),
    };
    let mut config = match path {
        Some(path) => LoopConfig::load(&path)?,
        None => {
            tracing::warn!("no {CONFIG_FILE} found, nothing to benchmark");
            LoopConfig::default()
        }
    };

    let settings = &mut config.settings;
    if let Some(run_sec) = cli.run_sec {
        settings.run_sec = run_sec;
    }
    if let Some(repeat) = cli.repeat {
        settings.repeat = repeat;
    }
    if let Some(rank_by) = cli.rank_by {
        settings.rank_by = rank_by;
    }
    if let Some(check) = cli.check_too_fast {
        settings.check_too_fast = check;
    }
    if let Some(with_gc) = cli.with_gc {
        settings.with_gc = with_gc;
    }
    settings.output_in_sec |= cli.output_in_sec;
    settings.output_source |= cli.source;
    if cli.bench_names {
        settings.use_func_name = false;
    }
    settings.validate()?;

    Ok(config)
}

fn list_benchmarks(plan: &ExecutionPlan) -> anyhow::Result<()> {
    println!("LoopBench Plan:");

    for module in &plan.modules {
        println!("├── module: {}", module.path.display());
        for target in &module.targets {
            if target.display_name == target.function {
                println!("│   ├── {}", target.display_name);
            } else {
                println!("│   ├── {} ({})", target.display_name, target.function);
            }
        }
    }

    println!("{} benchmarks found.", plan.target_count());
    Ok(())
}

fn run_benchmarks(cli: &Cli, config: &LoopConfig, plan: &ExecutionPlan) -> anyhow::Result<()> {
    if plan.is_empty() {
        println!("No benchmarks found.");
        return Ok(());
    }

    let format: OutputFormat = cli.format.parse().map_err(anyhow::Error::msg)?;
    let settings = &config.settings;
    let policy = if cli.fail_fast {
        FailurePolicy::Abort
    } else {
        FailurePolicy::Report
    };

    eprintln!(
        "Running {} benchmarks in {} module(s), {} pass(es)...\n",
        plan.target_count(),
        plan.modules.len(),
        settings.repeat
    );
    let start_time = Instant::now();

    let report = Executor::new(settings.clone(), policy)
        .with_progress(format == OutputFormat::Human)
        .execute(plan)?;

    tracing::info!(
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        failures = report.failure_count(),
        "run finished"
    );

    // Generate output
    let output = match format {
        OutputFormat::Json => generate_json_report(&report)?,
        OutputFormat::Human => format_human_output(&report, settings.output_in_sec),
    };

    // Write output
    if let Some(ref path) = cli.output {
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        file.write_all(output.as_bytes())?;
        eprintln!("Report written to: {}", path.display());
    } else {
        print!("{}", output);
    }

    let failures = report.failure_count();
    if failures > 0 {
        anyhow::bail!("{} benchmark(s) failed", failures);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("loopbench").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_overrides_apply_on_top_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[settings]\nrun_sec = 1.0\nrepeat = 2\n").unwrap();

        let cli = parse(&[
            "--config",
            path.to_str().unwrap(),
            "--run-sec",
            "-1",
            "--rank-by",
            "average",
            "--with-gc",
            "true",
            "--bench-names",
        ]);
        let config = resolve_config(&cli).unwrap();

        assert_eq!(config.settings.run_sec, -1.0);
        assert_eq!(config.settings.repeat, 2);
        assert_eq!(config.settings.rank_by, RankBy::Average);
        assert!(config.settings.with_gc);
        assert!(!config.settings.use_func_name);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "").unwrap();

        let cli = parse(&["--config", path.to_str().unwrap(), "--run-sec", "0.01"]);
        assert!(resolve_config(&cli).is_err());
    }

    #[test]
    fn test_subcommands_parse() {
        assert!(matches!(parse(&["list"]).command, Some(Commands::List)));
        assert!(matches!(parse(&["init"]).command, Some(Commands::Init)));
        assert!(parse(&[]).command.is_none());
        assert!(Cli::try_parse_from(["loopbench", "--rank-by", "median"]).is_err());
    }
}

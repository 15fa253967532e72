//! Output Formatting
//!
//! Human-readable output formatting for benchmark reports.
//!
//! Generates terminal-friendly output with:
//! - One aligned table per module per pass, in rank order
//! - Failed targets with their error kind (✗)
//! - Synthesized routine listings, when they were collected

use loopbench_report::{HEADERS, ModuleReport, RankedRow, Report, RowCells};

/// Format a report for human-readable terminal display
///
/// # Arguments
/// * `report` - Complete benchmark report
/// * `output_in_sec` - Print durations as raw seconds instead of human units
///
/// # Returns
/// Formatted string suitable for terminal output
pub fn format_human_output(report: &Report, output_in_sec: bool) -> String {
    let mut output = String::new();
    let config = &report.meta.config;

    output.push('\n');
    output.push_str("LoopBench Results\n");
    output.push_str(&"=".repeat(60));
    output.push('\n');
    let budget = if config.run_sec < 0.0 {
        "single iteration".to_string()
    } else {
        format!("{} s per target", config.run_sec)
    };
    output.push_str(&format!(
        "run: {}  ranked by: {}  gc: {}  too-fast check: {}\n\n",
        budget,
        config.rank_by,
        if config.with_gc { "on" } else { "off" },
        if config.check_too_fast { "on" } else { "off" },
    ));

    for module in &report.modules {
        format_module(&mut output, module, report, output_in_sec);
    }

    let failures = report.failure_count();
    if failures > 0 {
        output.push_str(&format!("{} benchmark failure(s)\n", failures));
    }
    output
}

fn format_module(output: &mut String, module: &ModuleReport, report: &Report, output_in_sec: bool) {
    output.push_str(&format!("Module: {}\n", module.module));
    output.push_str(&"-".repeat(60));
    output.push('\n');

    let passes = module.passes.len();
    for (i, table) in module.passes.iter().enumerate() {
        let floor = report
            .meta
            .config
            .floor_sec
            .get(i)
            .map(|f| format!("  (floor {:.11} s)", f))
            .unwrap_or_default();
        output.push_str(&format!("\nPass {}/{}{}\n", i + 1, passes, floor));
        output.push_str(&format_table(table, output_in_sec));

        for failure in module.failures.iter().filter(|f| f.pass as usize == i + 1) {
            output.push_str(&format!(
                "  ✗ {} [{}]: {}\n",
                failure.name, failure.kind, failure.message
            ));
        }
    }

    for listing in &module.sources {
        output.push_str(&format!("\nSource: {}\n", listing.name));
        output.push_str(&listing.source);
        if !listing.source.ends_with('\n') {
            output.push('\n');
        }
    }
    output.push('\n');
}

/// Format one ranked table with aligned columns
pub fn format_table(rows: &[RankedRow], output_in_sec: bool) -> String {
    if rows.is_empty() {
        return "  (no results)\n".to_string();
    }

    let cells: Vec<RowCells> = rows
        .iter()
        .map(|row| RowCells::from_row(row, output_in_sec))
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row.cells()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    push_row(&mut output, &HEADERS, &widths);
    let total: usize = widths.iter().sum::<usize>() + 2 * (widths.len() - 1);
    output.push_str(&format!("  {}\n", "-".repeat(total)));
    for row in &cells {
        push_row(&mut output, &row.cells(), &widths);
    }
    output
}

/// The name column is left aligned, numbers right aligned.
fn push_row(output: &mut String, cells: &[&str; 10], widths: &[usize; 10]) {
    output.push_str("  ");
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if i > 0 {
            output.push_str("  ");
        }
        // Pad by char count, µ is two bytes
        let pad = width.saturating_sub(cell.chars().count());
        if i == 0 {
            output.push_str(cell);
            output.push_str(&" ".repeat(pad));
        } else {
            output.push_str(&" ".repeat(pad));
            output.push_str(cell);
        }
    }
    output.push('\n');
}

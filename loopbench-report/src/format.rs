//! Row Formatting
//!
//! Renders ranked rows as display strings: durations either as raw seconds
//! or scaled to a human unit, counts with thousands separators.

use crate::rank::RankedRow;
use serde::Serialize;

/// Placeholder for a duration that was not measured
pub const NOT_MEASURED: &str = "NOT-MEASURED";

/// Format seconds with 11 decimals.
pub fn format_seconds(secs: f64) -> String {
    format!("{secs:.11}")
}

/// Format seconds in the largest unit that keeps the value at or above 1.
pub fn format_duration(secs: f64) -> String {
    let abs = secs.abs();
    if abs < 1e-6 {
        format!("{:.3} ns", secs * 1e9)
    } else if abs < 1e-3 {
        format!("{:.3} µs", secs * 1e6)
    } else if abs < 1.0 {
        format!("{:.3} ms", secs * 1e3)
    } else {
        format!("{secs:.3} s")
    }
}

/// Insert `,` between groups of three digits.
pub fn with_thousands(n: u64) -> String {
    group_digits(&n.to_string())
}

/// Format a percentage with three decimals and thousands separators.
pub fn format_compare(compare: f64) -> String {
    if !compare.is_finite() {
        return compare.to_string();
    }
    let text = format!("{compare:.3}");
    let (int, frac) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let (sign, digits) = match int.strip_prefix('-') {
        Some(digits) => ("-", digits),
        None => ("", int),
    };
    format!("{sign}{}.{frac}", group_digits(digits))
}

fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// A ranked row rendered to display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowCells {
    /// Display name
    pub name: String,
    /// 1-based rank
    pub rank: String,
    /// Percentage relative to the top row
    pub compare: String,
    /// Completed iterations
    pub loops: String,
    /// Mean iteration time
    pub avg_loop: String,
    /// Fastest iteration
    pub best_loop: String,
    /// Second fastest iteration
    pub second_best_loop: String,
    /// Slowest iteration
    pub worst_loop: String,
    /// Second slowest iteration
    pub second_worst_loop: String,
    /// Total measured time
    pub all_loops_time: String,
}

/// Column headers, in the order of [`RowCells::cells`]
pub const HEADERS: [&str; 10] = [
    "name",
    "rank",
    "compare %",
    "loops",
    "avg loop",
    "best loop",
    "second best",
    "worst loop",
    "second worst",
    "all loops",
];

impl RowCells {
    /// Render `row`, as raw seconds when `output_in_sec` is set.
    pub fn from_row(row: &RankedRow, output_in_sec: bool) -> Self {
        let duration = |secs: f64| {
            if output_in_sec {
                format_seconds(secs)
            } else {
                format_duration(secs)
            }
        };
        let optional = |secs: Option<f64>| secs.map_or_else(|| NOT_MEASURED.to_string(), duration);
        let s = &row.sample;

        Self {
            name: s.name.clone(),
            rank: with_thousands(row.rank as u64),
            compare: format_compare(row.compare),
            loops: with_thousands(s.loops),
            avg_loop: duration(s.avg_loop_sec),
            best_loop: duration(s.best_loop_sec),
            second_best_loop: optional(s.second_best_loop_sec),
            worst_loop: duration(s.worst_loop_sec),
            second_worst_loop: optional(s.second_worst_loop_sec),
            all_loops_time: duration(s.all_loops_time_sec),
        }
    }

    /// Cells in column order
    pub fn cells(&self) -> [&str; 10] {
        [
            &self.name,
            &self.rank,
            &self.compare,
            &self.loops,
            &self.avg_loop,
            &self.best_loop,
            &self.second_best_loop,
            &self.worst_loop,
            &self.second_worst_loop,
            &self.all_loops_time,
        ]
    }
}

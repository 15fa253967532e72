#![warn(missing_docs)]
//! LoopBench Report - Ranking and Output
//!
//! Turns timing samples into results:
//! - Ranking of one module's samples by best or average iteration time
//! - Display formatting (raw seconds or human units)
//! - Report structures and JSON output

mod format;
mod json;
mod rank;
mod report;

pub use format::{
    HEADERS, NOT_MEASURED, RowCells, format_compare, format_duration, format_seconds,
    with_thousands,
};
pub use json::generate_json_report;
pub use rank::{RankBy, RankedRow, rank_samples};
pub use report::{FailureInfo, ModuleReport, Report, ReportConfig, ReportMeta, SourceListing};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable terminal tables
    #[default]
    Human,
    /// JSON with the full report
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

//! Report Data Structures

use crate::rank::{RankBy, RankedRow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Complete benchmark report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Run metadata
    pub meta: ReportMeta,
    /// One entry per benchmarked module
    pub modules: Vec<ModuleReport>,
}

impl Report {
    /// An empty report stamped with the current time.
    pub fn new(config: ReportConfig) -> Self {
        Self {
            meta: ReportMeta {
                schema_version: 1,
                version: env!("CARGO_PKG_VERSION").to_string(),
                timestamp: Utc::now(),
                config,
            },
            modules: Vec::new(),
        }
    }

    /// Total number of failed targets across modules and passes
    pub fn failure_count(&self) -> usize {
        self.modules.iter().map(|m| m.failures.len()).sum()
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    /// Report layout version
    pub schema_version: u32,
    /// Version of the tool that wrote the report
    pub version: String,
    /// Start of the run
    pub timestamp: DateTime<Utc>,
    /// Settings the run used
    pub config: ReportConfig,
}

/// Execution settings captured in report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Loop budget in seconds, -1 for a single pass
    pub run_sec: f64,
    /// Number of ranked passes
    pub repeat: u32,
    /// Whether too-fast regions were rejected
    pub check_too_fast: bool,
    /// Whether the collector stayed enabled while measuring
    pub with_gc: bool,
    /// Ranking metric
    pub rank_by: RankBy,
    /// Measurability floor of each pass, in seconds
    pub floor_sec: Vec<f64>,
}

/// Results of one module
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleReport {
    /// Module path
    pub module: String,
    /// One ranked table per pass
    pub passes: Vec<Vec<RankedRow>>,
    /// Targets whose measurement failed
    pub failures: Vec<FailureInfo>,
    /// Routine listings, when requested
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceListing>,
}

impl ModuleReport {
    /// An empty report for `module`.
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Self::default()
        }
    }
}

/// A target whose measurement failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureInfo {
    /// Display name of the target
    pub name: String,
    /// 1-based pass the failure happened in
    pub pass: u32,
    /// Stable error kind
    pub kind: String,
    /// Full error message
    pub message: String,
}

/// Synthesized routine listing of one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceListing {
    /// Display name of the target
    pub name: String,
    /// Routine text
    pub source: String,
}

//! Ranking Reducer
//!
//! Orders the samples of one module by the chosen metric and expresses every
//! row relative to the winner.

use loopbench_core::TimingSample;
use serde::{Deserialize, Serialize};

/// Metric used to rank samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankBy {
    /// Fastest single iteration
    #[default]
    Best,
    /// Mean iteration time
    Average,
}

impl RankBy {
    /// The ranked metric of `sample`, in seconds.
    pub fn metric(&self, sample: &TimingSample) -> f64 {
        match self {
            RankBy::Best => sample.best_loop_sec,
            RankBy::Average => sample.avg_loop_sec,
        }
    }
}

impl std::str::FromStr for RankBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "best" => Ok(RankBy::Best),
            "average" | "avg" => Ok(RankBy::Average),
            other => Err(format!("Unknown ranking metric: {other} (expected best or average)")),
        }
    }
}

impl std::fmt::Display for RankBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RankBy::Best => write!(f, "best"),
            RankBy::Average => write!(f, "average"),
        }
    }
}

/// One ranked sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRow {
    /// 1-based position after sorting
    pub rank: usize,
    /// Metric relative to the top row, in percent
    pub compare: f64,
    /// The ranked sample; its name is the display name
    #[serde(flatten)]
    pub sample: TimingSample,
}

impl RankedRow {
    /// Display name
    pub fn name(&self) -> &str {
        &self.sample.name
    }
}

/// Rank the samples of one module.
///
/// Sorting is stable: rows with equal metrics keep their input order.
pub fn rank_samples(mut samples: Vec<TimingSample>, by: RankBy) -> Vec<RankedRow> {
    samples.sort_by(|a, b| by.metric(a).total_cmp(&by.metric(b)));

    let reference = samples.first().map_or(0.0, |s| by.metric(s));
    samples
        .into_iter()
        .enumerate()
        .map(|(i, sample)| RankedRow {
            rank: i + 1,
            compare: relative(by.metric(&sample), reference),
            sample,
        })
        .collect()
}

fn relative(metric: f64, reference: f64) -> f64 {
    if reference == 0.0 {
        if metric == 0.0 { 100.0 } else { f64::INFINITY }
    } else {
        metric / reference * 100.0
    }
}

//! JSON Output

use crate::report::Report;

/// Generate a prettified JSON report.
pub fn generate_json_report(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rank::{RankBy, rank_samples};
    use crate::report::{FailureInfo, ModuleReport, ReportConfig};
    use loopbench_core::TimingSample;

    #[test]
    fn test_report_serializes_rows_and_failures() {
        let mut report = Report::new(ReportConfig {
            run_sec: -1.0,
            repeat: 1,
            check_too_fast: false,
            with_gc: false,
            rank_by: RankBy::Best,
            floor_sec: vec![4e-8],
        });
        let mut module = ModuleReport::new("demos/sorting.lbs");
        module.passes.push(rank_samples(
            vec![TimingSample {
                name: "sorted".into(),
                loops: 1,
                all_loops_time_sec: 0.5,
                avg_loop_sec: 0.5,
                best_loop_sec: 0.5,
                second_best_loop_sec: None,
                worst_loop_sec: 0.5,
                second_worst_loop_sec: None,
            }],
            RankBy::Best,
        ));
        module.failures.push(FailureInfo {
            name: "broken".into(),
            pass: 1,
            kind: "missing-argument".into(),
            message: "<broken>: missing argument".into(),
        });
        report.modules.push(module);

        let json = generate_json_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let row = &value["modules"][0]["passes"][0][0];
        assert_eq!(row["name"], "sorted");
        assert_eq!(row["rank"], 1);
        assert_eq!(row["compare"], 100.0);
        assert!(row["second_best_loop_sec"].is_null());
        assert_eq!(value["meta"]["config"]["rank_by"], "best");
        assert_eq!(value["modules"][0]["failures"][0]["kind"], "missing-argument");
        assert!(value["modules"][0].get("sources").is_none());
        assert_eq!(report.failure_count(), 1);
    }
}

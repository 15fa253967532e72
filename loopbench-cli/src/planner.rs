//! Benchmark Planner
//!
//! Builds the execution plan from the configuration.
//!
//! Targets are selected with a regex on their display name. Modules keep the
//! configured order, and so do targets within a module, which makes ranking
//! ties resolve in configuration order.

use crate::config::{ConfigError, LoopConfig};
use loopbench_script::Args;
use regex::Regex;
use std::path::PathBuf;

/// Execution plan for one run
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    /// Modules with at least one selected target
    pub modules: Vec<PlannedModule>,
}

impl ExecutionPlan {
    /// Number of selected targets across modules
    pub fn target_count(&self) -> usize {
        self.modules.iter().map(|m| m.targets.len()).sum()
    }

    /// Whether nothing was selected
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// A module and its selected targets
#[derive(Debug, Clone)]
pub struct PlannedModule {
    /// Path of the `.lbs` file
    pub path: PathBuf,
    /// Targets in configuration order
    pub targets: Vec<PlannedTarget>,
}

/// One target ready to be synthesized
#[derive(Debug, Clone)]
pub struct PlannedTarget {
    /// Name used in tables and reports
    pub display_name: String,
    /// Function to measure
    pub function: String,
    /// Converted arguments
    pub args: Args,
}

/// Build execution plan from the configuration
///
/// Fails if an argument cannot be converted, so bad configuration surfaces
/// before any measurement starts.
pub fn build_plan(
    config: &LoopConfig,
    filter: Option<&Regex>,
) -> Result<ExecutionPlan, ConfigError> {
    let use_func_name = config.settings.use_func_name;
    let mut modules = Vec::new();

    for module in &config.module {
        let mut targets = Vec::new();
        for bench in &module.benchmark {
            let display_name = bench.display_name(use_func_name);
            if filter.is_some_and(|re| !re.is_match(display_name)) {
                continue;
            }
            targets.push(PlannedTarget {
                display_name: display_name.to_string(),
                function: bench.function.clone(),
                args: bench.to_args()?,
            });
        }
        if !targets.is_empty() {
            modules.push(PlannedModule {
                path: module.path.clone(),
                targets,
            });
        }
    }

    Ok(ExecutionPlan { modules })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        [settings]
        use_func_name = false

        [[module]]
        path = "sorting.lbs"

        [[module.benchmark]]
        name = "sort small"
        function = "sort_plain"
        args = [10]

        [[module.benchmark]]
        name = "sort large"
        function = "sort_plain"
        args = [10000]

        [[module]]
        path = "strings.lbs"

        [[module.benchmark]]
        name = "join"
        function = "join_words"
    "#;

    fn config() -> LoopConfig {
        toml::from_str(CONFIG).unwrap()
    }

    #[test]
    fn test_no_filter() {
        let plan = build_plan(&config(), None).unwrap();

        assert_eq!(plan.target_count(), 3);
        assert_eq!(plan.modules.len(), 2);
        // Configuration order is kept
        assert_eq!(plan.modules[0].targets[0].display_name, "sort small");
        assert_eq!(plan.modules[0].targets[1].display_name, "sort large");
        assert_eq!(plan.modules[1].path, PathBuf::from("strings.lbs"));
    }

    #[test]
    fn test_regex_filter_drops_empty_modules() {
        let re = Regex::new("^sort").unwrap();
        let plan = build_plan(&config(), Some(&re)).unwrap();

        assert_eq!(plan.modules.len(), 1);
        assert_eq!(plan.target_count(), 2);
    }

    #[test]
    fn test_filter_uses_display_name() {
        let mut config = config();
        config.settings.use_func_name = true;
        let re = Regex::new("join_words").unwrap();
        let plan = build_plan(&config, Some(&re)).unwrap();

        assert_eq!(plan.target_count(), 1);
        assert_eq!(plan.modules[0].targets[0].display_name, "join_words");
    }

    #[test]
    fn test_filter_without_matches() {
        let re = Regex::new("nothing").unwrap();
        let plan = build_plan(&config(), Some(&re)).unwrap();
        assert!(plan.is_empty());
    }
}

//! Configuration loading from loopbench.toml
//!
//! A `loopbench.toml` file lists the modules to benchmark, the targets inside
//! each module and the run settings. The file is discovered by walking up
//! from the current directory, or given explicitly with `--config`.

use evalexpr::Value;
use loopbench_core::RunBudget;
use loopbench_report::RankBy;
use loopbench_script::Args;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file looked up by [`LoopConfig::discover`]
pub const CONFIG_FILE: &str = "loopbench.toml";

/// Configuration failures. Unknown keys and invalid values are rejected
/// instead of falling back to defaults.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// The file is not valid TOML or has unknown keys
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: Box<toml::de::Error>,
    },
    /// A setting is out of range
    #[error("invalid setting `{key}`: {message}")]
    InvalidSetting {
        /// Setting name
        key: &'static str,
        /// What is wrong with it
        message: String,
    },
    /// A benchmark argument has no script equivalent
    #[error("benchmark `{benchmark}`: argument {argument} cannot be passed to a script ({kind})")]
    UnsupportedArgument {
        /// Benchmark name
        benchmark: String,
        /// Positional index or keyword name
        argument: String,
        /// TOML type of the value
        kind: &'static str,
    },
}

/// LoopBench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoopConfig {
    /// Run settings
    #[serde(default)]
    pub settings: BenchSettings,
    /// Modules to benchmark, in run order
    #[serde(default)]
    pub module: Vec<ModuleConfig>,
}

/// Settings shared by every target of a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BenchSettings {
    /// Loop budget per target in seconds, or -1 for a single iteration
    #[serde(default = "default_run_sec")]
    pub run_sec: f64,
    /// Number of ranked passes
    #[serde(default = "default_repeat")]
    pub repeat: u32,
    /// Reject regions faster than the measurability floor
    #[serde(default = "default_true")]
    pub check_too_fast: bool,
    /// Keep the collector enabled while measuring
    #[serde(default)]
    pub with_gc: bool,
    /// Ranking metric
    #[serde(default)]
    pub rank_by: RankBy,
    /// Print raw seconds instead of human units
    #[serde(default)]
    pub output_in_sec: bool,
    /// Display targets by function name rather than benchmark name
    #[serde(default = "default_true")]
    pub use_func_name: bool,
    /// Print the synthesized routine of every target
    #[serde(default)]
    pub output_source: bool,
}

impl Default for BenchSettings {
    fn default() -> Self {
        Self {
            run_sec: default_run_sec(),
            repeat: default_repeat(),
            check_too_fast: true,
            with_gc: false,
            rank_by: RankBy::default(),
            output_in_sec: false,
            use_func_name: true,
            output_source: false,
        }
    }
}

fn default_run_sec() -> f64 {
    0.5
}
fn default_repeat() -> u32 {
    1
}
fn default_true() -> bool {
    true
}

impl BenchSettings {
    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        RunBudget::from_secs(self.run_sec).map_err(|e| ConfigError::InvalidSetting {
            key: "run_sec",
            message: e.to_string(),
        })?;
        if self.repeat == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "repeat",
                message: "at least one pass is required".to_string(),
            });
        }
        Ok(())
    }
}

/// One script module and its targets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModuleConfig {
    /// Path of the `.lbs` file, relative to the config file
    pub path: PathBuf,
    /// Targets in this module
    #[serde(default)]
    pub benchmark: Vec<BenchmarkConfig>,
}

/// One benchmark target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BenchmarkConfig {
    /// Display name when `use_func_name` is off
    pub name: String,
    /// Function to measure
    pub function: String,
    /// Positional arguments
    #[serde(default)]
    pub args: Vec<toml::Value>,
    /// Keyword arguments
    #[serde(default)]
    pub kwargs: toml::Table,
}

impl BenchmarkConfig {
    /// Name shown in tables and reports.
    pub fn display_name(&self, use_func_name: bool) -> &str {
        if use_func_name {
            &self.function
        } else {
            &self.name
        }
    }

    /// Convert the TOML arguments to script arguments.
    pub fn to_args(&self) -> Result<Args, ConfigError> {
        let mut args = Args::new();
        for (i, value) in self.args.iter().enumerate() {
            args.positional
                .push(script_value(value).map_err(|kind| self.unsupported(i.to_string(), kind))?);
        }
        for (key, value) in &self.kwargs {
            let value = script_value(value).map_err(|kind| self.unsupported(key.clone(), kind))?;
            args.keyword.insert(key.clone(), value);
        }
        Ok(args)
    }

    fn unsupported(&self, argument: String, kind: &'static str) -> ConfigError {
        ConfigError::UnsupportedArgument {
            benchmark: self.name.clone(),
            argument,
            kind,
        }
    }
}

/// Convert a TOML value to a script value. Arrays become sequences and
/// tables become mappings (sequences of key/value pairs).
fn script_value(value: &toml::Value) -> Result<Value, &'static str> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::Int(*i),
        toml::Value::Float(f) => Value::Float(*f),
        toml::Value::Boolean(b) => Value::Boolean(*b),
        toml::Value::Datetime(_) => return Err("datetime"),
        toml::Value::Array(items) => {
            Value::Tuple(items.iter().map(script_value).collect::<Result<_, _>>()?)
        }
        toml::Value::Table(table) => {
            let mut pairs = Vec::with_capacity(table.len());
            for (key, value) in table {
                pairs.push(Value::Tuple(vec![Value::String(key.clone()), script_value(value)?]));
            }
            Value::Tuple(pairs)
        }
    })
}

impl LoopConfig {
    /// Load and validate configuration from a TOML file.
    ///
    /// Relative module paths are resolved against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        config.settings.validate()?;

        if let Some(base) = path.parent() {
            for module in &mut config.module {
                if module.path.is_relative() {
                    module.path = base.join(&module.path);
                }
            }
        }
        tracing::debug!(path = %path.display(), modules = config.module.len(), "configuration loaded");
        Ok(config)
    }

    /// Find `loopbench.toml` by walking up from the current directory.
    pub fn discover() -> Option<PathBuf> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# LoopBench Configuration

[settings]
# Loop budget per target in seconds (at least 0.1), or -1 for one iteration
run_sec = 0.5
# Number of ranked passes
repeat = 1
# Fail regions faster than the calibrated measurability floor
check_too_fast = true
# Keep the collector enabled while measuring
with_gc = false
# Ranking metric: best or average
rank_by = "best"
# Print raw seconds instead of ns/µs/ms/s
output_in_sec = false
# Display targets by function name (false: by benchmark name)
use_func_name = true
# Print the synthesized routine of every target
output_source = false

# [[module]]
# path = "benches/sorting.lbs"
#
# [[module.benchmark]]
# name = "sort ascending"
# function = "sort_plain"
# args = [200]
# kwargs = { seed = 7 }
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = LoopConfig::default();
        assert_eq!(config.settings.run_sec, 0.5);
        assert_eq!(config.settings.repeat, 1);
        assert!(config.settings.check_too_fast);
        assert!(!config.settings.with_gc);
        assert_eq!(config.settings.rank_by, RankBy::Best);
        assert!(config.module.is_empty());
    }

    #[test]
    fn test_default_toml_parses_to_defaults() {
        let config: LoopConfig = toml::from_str(&LoopConfig::default_toml()).unwrap();
        assert_eq!(config, LoopConfig::default());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [settings]
            run_sec = -1
            rank_by = "average"

            [[module]]
            path = "sorting.lbs"

            [[module.benchmark]]
            name = "sort"
            function = "sort_plain"
            args = [200, [1, 2]]
            kwargs = { seed = 7, opts = { fast = true } }
        "#;

        let config: LoopConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.settings.run_sec, -1.0);
        assert_eq!(config.settings.rank_by, RankBy::Average);
        // Defaults should still apply
        assert_eq!(config.settings.repeat, 1);
        config.settings.validate().unwrap();

        let bench = &config.module[0].benchmark[0];
        let args = bench.to_args().unwrap();
        assert_eq!(
            args.positional,
            vec![
                Value::Int(200),
                Value::Tuple(vec![Value::Int(1), Value::Int(2)])
            ]
        );
        assert_eq!(args.keyword["seed"], Value::Int(7));
        assert_eq!(
            args.keyword["opts"],
            Value::Tuple(vec![Value::Tuple(vec![
                Value::String("fast".into()),
                Value::Boolean(true)
            ])])
        );
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(toml::from_str::<LoopConfig>("[settings]\nrun_secs = 1.0\n").is_err());
        assert!(toml::from_str::<LoopConfig>("[settings]\nrank_by = \"median\"\n").is_err());
    }

    #[test]
    fn test_invalid_settings() {
        let mut settings = BenchSettings {
            run_sec: 0.05,
            ..BenchSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidSetting { key: "run_sec", .. })
        ));

        settings.run_sec = 0.1;
        settings.repeat = 0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidSetting { key: "repeat", .. })
        ));
    }

    #[test]
    fn test_datetime_argument_is_rejected() {
        let config: LoopConfig = toml::from_str(
            "[[module]]\npath = \"m.lbs\"\n[[module.benchmark]]\nname = \"d\"\nfunction = \"f\"\nargs = [1979-05-27]\n",
        )
        .unwrap();
        let err = config.module[0].benchmark[0].to_args().unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedArgument { kind: "datetime", .. }));
    }

    #[test]
    fn test_display_name() {
        let bench = BenchmarkConfig {
            name: "sort ascending".into(),
            function: "sort_plain".into(),
            args: Vec::new(),
            kwargs: toml::Table::new(),
        };
        assert_eq!(bench.display_name(true), "sort_plain");
        assert_eq!(bench.display_name(false), "sort ascending");
    }

    #[test]
    fn test_load_resolves_module_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[[module]]\npath = \"sorting.lbs\"").unwrap();

        let config = LoopConfig::load(&path).unwrap();
        assert_eq!(config.module[0].path, dir.path().join("sorting.lbs"));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[settings]\nrepeat = 0\n").unwrap();
        assert!(matches!(
            LoopConfig::load(&path),
            Err(ConfigError::InvalidSetting { .. })
        ));
    }
}

//! Pipeline configuration.
//!
//! All paths are resolved once at startup into a [`PipelineConfig`], which is
//! then passed explicitly to every task. Sources, lowest precedence first:
//!
//! 1. Defaults derived from the working directory
//! 2. TOML config file (`--config trafic.toml`)
//! 3. Environment (`TRAFIC_*`, `.env` is loaded by the CLI)
//! 4. CLI flags
//!
//! ```toml
//! workdir = "/usr/local/airflow"
//! database = "db/datascience.db"
//! table = "trafic_record"
//! short_groups = "emit"
//! load_mode = "replace"
//! ```

use clap::ValueEnum;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};
use crate::load::LoadMode;
use crate::transform::ShortGroupPolicy;

/// Raw input, relative to the working directory.
pub const DEFAULT_RAW_INPUT: &str = "raw_data/trafic.csv";

/// Processed output, relative to the working directory.
pub const DEFAULT_PROCESSED_OUTPUT: &str = "processed_data/processed_data.csv";

/// SQLite database, relative to the working directory.
pub const DEFAULT_DATABASE: &str = "db/datascience.db";

/// Destination table.
pub const DEFAULT_TABLE: &str = "trafic_record";

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Fully resolved configuration shared by both tasks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineConfig {
    pub workdir: PathBuf,
    pub raw_input: PathBuf,
    pub processed_output: PathBuf,
    pub database: PathBuf,
    pub table: String,
    pub short_groups: ShortGroupPolicy,
    pub load_mode: LoadMode,
}

/// Optional values, as read from a config file or given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    pub workdir: Option<PathBuf>,
    pub raw_input: Option<PathBuf>,
    pub processed_output: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub table: Option<String>,
    pub short_groups: Option<ShortGroupPolicy>,
    pub load_mode: Option<LoadMode>,
}

impl ConfigOverrides {
    /// Read overrides from a TOML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Read overrides from `TRAFIC_*` variables through `lookup`.
    pub fn from_env<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            workdir: lookup("TRAFIC_WORKDIR").map(PathBuf::from),
            raw_input: lookup("TRAFIC_RAW_INPUT").map(PathBuf::from),
            processed_output: lookup("TRAFIC_PROCESSED_OUTPUT").map(PathBuf::from),
            database: lookup("TRAFIC_DATABASE").map(PathBuf::from),
            table: lookup("TRAFIC_TABLE"),
            short_groups: lookup("TRAFIC_SHORT_GROUPS")
                .map(|v| parse_enum("TRAFIC_SHORT_GROUPS", &v))
                .transpose()?,
            load_mode: lookup("TRAFIC_LOAD_MODE")
                .map(|v| parse_enum("TRAFIC_LOAD_MODE", &v))
                .transpose()?,
        })
    }

    /// Layer `other` on top of `self`; values set in `other` win.
    pub fn merge(self, other: ConfigOverrides) -> ConfigOverrides {
        ConfigOverrides {
            workdir: other.workdir.or(self.workdir),
            raw_input: other.raw_input.or(self.raw_input),
            processed_output: other.processed_output.or(self.processed_output),
            database: other.database.or(self.database),
            table: other.table.or(self.table),
            short_groups: other.short_groups.or(self.short_groups),
            load_mode: other.load_mode.or(self.load_mode),
        }
    }
}

fn parse_enum<T: ValueEnum>(var: &str, value: &str) -> ConfigResult<T> {
    T::from_str(value.trim(), true).map_err(|message| ConfigError::InvalidEnv {
        var: var.to_string(),
        message,
    })
}

impl PipelineConfig {
    /// Default layout under `workdir`.
    pub fn from_workdir(workdir: impl Into<PathBuf>) -> Self {
        let workdir = workdir.into();
        Self {
            raw_input: workdir.join(DEFAULT_RAW_INPUT),
            processed_output: workdir.join(DEFAULT_PROCESSED_OUTPUT),
            database: workdir.join(DEFAULT_DATABASE),
            table: DEFAULT_TABLE.to_string(),
            short_groups: ShortGroupPolicy::default(),
            load_mode: LoadMode::Replace,
            workdir,
        }
    }

    /// Resolve from an optional config file, the process environment and CLI flags.
    pub fn resolve(config_file: Option<&Path>, cli: ConfigOverrides) -> ConfigResult<Self> {
        Self::resolve_with_env(config_file, |var| std::env::var(var).ok(), cli)
    }

    /// Same as [`PipelineConfig::resolve`] with an explicit environment lookup.
    pub fn resolve_with_env<F>(
        config_file: Option<&Path>,
        env: F,
        cli: ConfigOverrides,
    ) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match config_file {
            Some(path) => ConfigOverrides::from_file(path)?,
            None => ConfigOverrides::default(),
        };
        let merged = file.merge(ConfigOverrides::from_env(env)?).merge(cli);

        let mut config =
            Self::from_workdir(merged.workdir.unwrap_or_else(|| PathBuf::from(".")));
        if let Some(p) = merged.raw_input {
            config.raw_input = config.workdir.join(p);
        }
        if let Some(p) = merged.processed_output {
            config.processed_output = config.workdir.join(p);
        }
        if let Some(p) = merged.database {
            config.database = config.workdir.join(p);
        }
        if let Some(table) = merged.table {
            config.table = table;
        }
        if let Some(policy) = merged.short_groups {
            config.short_groups = policy;
        }
        if let Some(mode) = merged.load_mode {
            config.load_mode = mode;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check values that end up in SQL.
    pub fn validate(&self) -> ConfigResult<()> {
        if !IDENTIFIER.is_match(&self.table) {
            return Err(ConfigError::InvalidTable(self.table.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_workdir_layout() {
        let config = PipelineConfig::from_workdir("/opt/airflow");
        assert_eq!(config.raw_input, PathBuf::from("/opt/airflow/raw_data/trafic.csv"));
        assert_eq!(
            config.processed_output,
            PathBuf::from("/opt/airflow/processed_data/processed_data.csv")
        );
        assert_eq!(config.database, PathBuf::from("/opt/airflow/db/datascience.db"));
        assert_eq!(config.table, "trafic_record");
        assert_eq!(config.load_mode, LoadMode::Replace);
        assert_eq!(config.short_groups, ShortGroupPolicy::Emit);
    }

    #[test]
    fn test_env_overrides_defaults() {
        let config = PipelineConfig::resolve_with_env(
            None,
            env_from(&[("TRAFIC_WORKDIR", "/data"), ("TRAFIC_DATABASE", "/var/lib/t.db")]),
            ConfigOverrides::default(),
        )
        .unwrap();

        assert_eq!(config.raw_input, PathBuf::from("/data/raw_data/trafic.csv"));
        assert_eq!(config.database, PathBuf::from("/var/lib/t.db"));
    }

    #[test]
    fn test_cli_wins_over_env() {
        let cli = ConfigOverrides {
            workdir: Some(PathBuf::from("/cli")),
            short_groups: Some(ShortGroupPolicy::Reject),
            ..Default::default()
        };
        let config = PipelineConfig::resolve_with_env(
            None,
            env_from(&[("TRAFIC_WORKDIR", "/env"), ("TRAFIC_SHORT_GROUPS", "skip")]),
            cli,
        )
        .unwrap();

        assert_eq!(config.workdir, PathBuf::from("/cli"));
        assert_eq!(config.short_groups, ShortGroupPolicy::Reject);
    }

    #[test]
    fn test_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "workdir = \"/srv\"\ntable = \"records\"\nload_mode = \"append\"").unwrap();

        let config = PipelineConfig::resolve_with_env(
            Some(file.path()),
            env_from(&[]),
            ConfigOverrides::default(),
        )
        .unwrap();

        assert_eq!(config.workdir, PathBuf::from("/srv"));
        assert_eq!(config.table, "records");
        assert_eq!(config.load_mode, LoadMode::Append);
    }

    #[test]
    fn test_unknown_config_key_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "databse = \"typo.db\"").unwrap();

        let result = PipelineConfig::resolve_with_env(
            Some(file.path()),
            env_from(&[]),
            ConfigOverrides::default(),
        );
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_invalid_env_enum() {
        let result = PipelineConfig::resolve_with_env(
            None,
            env_from(&[("TRAFIC_LOAD_MODE", "upsert")]),
            ConfigOverrides::default(),
        );
        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
    }

    #[test]
    fn test_table_name_validated() {
        let cli = ConfigOverrides {
            table: Some("x; DROP TABLE y".to_string()),
            ..Default::default()
        };
        let result = PipelineConfig::resolve_with_env(None, env_from(&[]), cli);
        assert!(matches!(result, Err(ConfigError::InvalidTable(_))));
    }
}

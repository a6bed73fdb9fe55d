use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use framesql_engine::{BackendKind, DEFAULT_MAX_ENGINES, DataFusionOptions, LoadOptions};
use framesql_gate::SqlDialect;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings of a [`SqlExpressions`](crate::SqlExpressions) service.
///
/// Every key is optional in TOML:
///
/// ```toml
/// backend = "sqlite"
/// max_connections = 4
/// dialect = "postgres"
/// default_time_limit_ms = 5000
/// extra_functions = ["regexp_like"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SqlExpressionsConfig {
    /// Engine that runs the statements.
    ///
    /// Identifier case differs between backends. DataFusion matches table and column
    /// names exactly as written, so a field named `Value` is not found as `value`.
    /// SQLite matches them without regard to case.
    pub backend: BackendKind,
    /// Engines open at once. Further evaluations wait for one to close.
    pub max_connections: usize,
    /// Grammar the gatekeeper parses with. Engines parse the statement themselves,
    /// so syntax the gatekeeper accepts, such as `FOR SYSTEM_TIME AS OF`, can still
    /// be rejected at execution.
    pub dialect: SqlDialect,
    /// Time limit of a request that does not set one.
    pub default_time_limit_ms: u64,
    /// Cell limit of a request that does not set one.
    pub default_input_cell_limit: u64,
    /// Load NULLs through placeholders even where the engine appends them natively.
    pub null_placeholders: bool,
    pub append_batch_rows: usize,
    pub target_partitions: usize,
    /// Functions allowed on top of the standard allow-list.
    pub extra_functions: Vec<String>,
}

impl Default for SqlExpressionsConfig {
    fn default() -> Self {
        SqlExpressionsConfig {
            backend: BackendKind::default(),
            max_connections: DEFAULT_MAX_ENGINES,
            dialect: SqlDialect::default(),
            default_time_limit_ms: 10_000,
            default_input_cell_limit: 100_000,
            null_placeholders: false,
            append_batch_rows: LoadOptions::default().batch_rows,
            target_partitions: DataFusionOptions::default().target_partitions,
            extra_functions: Vec::new(),
        }
    }
}

impl SqlExpressionsConfig {
    /// Parse and validate TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: SqlExpressionsConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be at least 1".into(),
            ));
        }
        if self.default_time_limit_ms == 0 {
            return Err(ConfigError::Invalid(
                "default_time_limit_ms must be greater than 0".into(),
            ));
        }
        if self.append_batch_rows == 0 {
            return Err(ConfigError::Invalid(
                "append_batch_rows must be greater than 0".into(),
            ));
        }
        if self.target_partitions == 0 {
            return Err(ConfigError::Invalid(
                "target_partitions must be greater than 0".into(),
            ));
        }
        if let Some(name) = self.extra_functions.iter().find(|name| name.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "extra_functions contains a blank name {name:?}"
            )));
        }
        Ok(())
    }

    pub fn default_time_limit(&self) -> Duration {
        Duration::from_millis(self.default_time_limit_ms)
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            null_placeholders: self.null_placeholders,
            batch_rows: self.append_batch_rows,
        }
    }

    pub fn datafusion_options(&self) -> DataFusionOptions {
        DataFusionOptions {
            target_partitions: self.target_partitions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn defaults_are_valid() {
        let config = SqlExpressionsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.backend, BackendKind::DataFusion);
        assert_eq!(config.default_time_limit(), Duration::from_secs(10));
        assert_eq!(SqlExpressionsConfig::from_toml("").unwrap(), config);
    }

    #[test]
    fn parses_every_key() {
        let config = SqlExpressionsConfig::from_toml(indoc! {r#"
            backend = "sqlite"
            max_connections = 4
            dialect = "postgres"
            default_time_limit_ms = 250
            default_input_cell_limit = 10
            null_placeholders = true
            append_batch_rows = 16
            target_partitions = 2
            extra_functions = ["regexp_like"]
        "#})
        .unwrap();
        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.dialect, SqlDialect::PostgreSql);
        assert_eq!(config.load_options().batch_rows, 16);
        assert!(config.load_options().null_placeholders);
        assert_eq!(config.datafusion_options().target_partitions, 2);
        assert_eq!(config.extra_functions, ["regexp_like"]);
    }

    #[test]
    fn rejects_invalid_values() {
        for text in [
            "max_connections = 0",
            "default_time_limit_ms = 0",
            "append_batch_rows = 0",
            "extra_functions = [\" \"]",
        ] {
            assert!(
                matches!(
                    SqlExpressionsConfig::from_toml(text),
                    Err(ConfigError::Invalid(_))
                ),
                "{text}"
            );
        }
        assert!(matches!(
            SqlExpressionsConfig::from_toml("backend = \"oracle\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            SqlExpressionsConfig::from_toml("max_conections = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sql.toml");
        fs::write(&path, "backend = \"sqlite\"\n").unwrap();
        let config = SqlExpressionsConfig::from_file(&path).unwrap();
        assert_eq!(config.backend, BackendKind::Sqlite);

        let missing = SqlExpressionsConfig::from_file(dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}

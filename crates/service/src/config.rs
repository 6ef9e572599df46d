use std::path::PathBuf;

use opsdeck_core::oracle::OracleConfig;

/// Service configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development; the Oracle
/// profile only exists when `ORACLE_SID` is set.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Catalog document location (default: `data/scripts.json`).
    pub scripts_file: PathBuf,
    /// Connection profile for control operations. `None` means
    /// shutdown/startup fail with "not configured".
    pub oracle: Option<OracleConfig>,
}

impl ServiceConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var        | Default             |
    /// |----------------|---------------------|
    /// | `SCRIPTS_FILE` | `data/scripts.json` |
    /// | `ORACLE_SID`   | -- (unset)          |
    /// | `ORACLE_HOME`  | -- (unset)          |
    /// | `SQLPLUS_PATH` | `sqlplus`           |
    pub fn from_env() -> Self {
        let scripts_file = std::env::var("SCRIPTS_FILE")
            .unwrap_or_else(|_| "data/scripts.json".into())
            .into();

        let oracle = std::env::var("ORACLE_SID")
            .ok()
            .filter(|sid| !sid.trim().is_empty())
            .map(|oracle_sid| OracleConfig {
                sqlplus_path: std::env::var("SQLPLUS_PATH").unwrap_or_else(|_| "sqlplus".into()),
                oracle_sid,
                oracle_home: std::env::var("ORACLE_HOME").ok(),
            });

        Self {
            scripts_file,
            oracle,
        }
    }
}

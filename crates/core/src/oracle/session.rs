//! Elevated administrative session adapter.
//!
//! [`AdminSession`] is the seam between the control service and the
//! managed database. The production implementation drives `sqlplus` as
//! a child process: connect `AS SYSDBA`, issue the single statement,
//! exit. The trait exists so the control service can be tested with
//! mock sessions.

use async_trait::async_trait;

use crate::scripting::executor::{ExecError, ExecLimits};
use crate::scripting::subprocess;

use super::control::OracleError;

/// Connection profile for the managed database.
///
/// Operating-system authentication is used (`CONNECT / AS SYSDBA`), so
/// no credentials are stored; the service process must run as a member
/// of the DBA group.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Path to the `sqlplus` binary.
    pub sqlplus_path: String,
    /// Value exported as `ORACLE_SID` for the session child.
    pub oracle_sid: String,
    /// Value exported as `ORACLE_HOME`, when the environment does not
    /// already carry one.
    pub oracle_home: Option<String>,
}

/// One elevated session, one administrative statement.
#[async_trait]
pub trait AdminSession: Send + Sync {
    /// Open a SYSDBA session, run `statement`, close the session, and
    /// return the combined textual output.
    async fn run_sysdba(&self, statement: &str) -> Result<String, OracleError>;
}

/// Production session backed by the `sqlplus` command-line client.
pub struct SqlplusSession {
    config: OracleConfig,
}

impl SqlplusSession {
    pub fn new(config: OracleConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl AdminSession for SqlplusSession {
    async fn run_sysdba(&self, statement: &str) -> Result<String, OracleError> {
        let mut cmd = tokio::process::Command::new(&self.config.sqlplus_path);
        // -S silences the banner, -L stops retry prompts on a failed
        // connect so the child exits instead of waiting on stdin.
        cmd.args(["-S", "-L", "/nolog"])
            .env("ORACLE_SID", &self.config.oracle_sid);
        if let Some(home) = &self.config.oracle_home {
            cmd.env("ORACLE_HOME", home);
        }

        let script = format!("CONNECT / AS SYSDBA\n{statement}\nEXIT\n");

        tracing::info!(
            sid = %self.config.oracle_sid,
            statement,
            "Opening SYSDBA session"
        );

        let result = subprocess::run_command(&mut cmd, Some(script), &ExecLimits::default()).await;

        match result {
            Ok(output) => {
                let combined = combine(&output.stdout, &output.stderr);
                // sqlplus exits zero even when the server rejects the
                // statement; ORA- diagnostics in the output are the
                // only failure signal left.
                if let Some(line) = first_ora_error(&combined) {
                    tracing::error!(sid = %self.config.oracle_sid, error = %line, "SYSDBA statement failed");
                    return Err(OracleError::SessionFailed {
                        detail: line.to_string(),
                        output: combined,
                    });
                }
                tracing::info!(sid = %self.config.oracle_sid, "SYSDBA session closed");
                Ok(combined)
            }
            Err(ExecError::Spawn(e)) => Err(OracleError::SessionFailed {
                detail: format!("Failed to start {}: {e}", self.config.sqlplus_path),
                output: String::new(),
            }),
            Err(e) => {
                let output = e
                    .partial_output()
                    .map(|(stdout, stderr)| combine(stdout, stderr))
                    .unwrap_or_default();
                Err(OracleError::SessionFailed {
                    detail: e.to_string(),
                    output,
                })
            }
        }
    }
}

/// Merge the two streams into one text block, stderr last.
fn combine(stdout: &str, stderr: &str) -> String {
    match (stdout.trim(), stderr.trim()) {
        (out, "") => out.to_string(),
        ("", err) => err.to_string(),
        (out, err) => format!("{out}\n{err}"),
    }
}

/// First `ORA-`/`SP2-` diagnostic line in the session output, if any.
fn first_ora_error(output: &str) -> Option<&str> {
    output
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("ORA-") || line.starts_with("SP2-"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ora_diagnostics_are_detected() {
        let output = "Connected.\nORA-01031: insufficient privileges\n";
        assert_eq!(
            first_ora_error(output),
            Some("ORA-01031: insufficient privileges")
        );
    }

    #[test]
    fn clean_output_has_no_diagnostic() {
        assert_eq!(first_ora_error("Database closed.\nDatabase dismounted.\n"), None);
        assert_eq!(first_ora_error(""), None);
    }

    #[test]
    fn combine_joins_streams_in_order() {
        assert_eq!(combine("out", "err"), "out\nerr");
        assert_eq!(combine("out", ""), "out");
        assert_eq!(combine("", "err"), "err");
    }

    #[tokio::test]
    async fn missing_sqlplus_binary_fails_the_session() {
        let session = SqlplusSession::new(OracleConfig {
            sqlplus_path: "/nonexistent/sqlplus".to_string(),
            oracle_sid: "ORCL".to_string(),
            oracle_home: None,
        });
        let err = session
            .run_sysdba("SHUTDOWN IMMEDIATE")
            .await
            .expect_err("should fail");
        match err {
            OracleError::SessionFailed { detail, .. } => {
                assert!(detail.contains("/nonexistent/sqlplus"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

//! Control service: guarded shutdown/startup dispatch.
//!
//! Owns the single-flight guard and the session adapter. Both
//! operations share the guard, acquisition fails fast, and the permit
//! is released on every exit path.

use std::sync::Arc;

use chrono::Utc;

use crate::types::Timestamp;

use super::guard::ControlGuard;
use super::modes::{ShutdownMode, StartupMode};
use super::session::{AdminSession, OracleConfig, SqlplusSession};

/// Failure modes of a control operation. Each carries a distinct
/// user-facing hint (see [`OracleError::hint`]).
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("Oracle connection is not configured")]
    NotConfigured,

    #[error("Another database control operation is already in progress")]
    AlreadyInProgress,

    #[error("Invalid {operation} mode '{value}'")]
    InvalidMode {
        operation: &'static str,
        value: String,
    },

    #[error("Administrative session failed: {detail}")]
    SessionFailed { detail: String, output: String },
}

impl OracleError {
    /// Human-readable guidance for the common failure causes.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NotConfigured => Some(
                "Set ORACLE_SID (and ORACLE_HOME if needed) so the service can open SYSDBA sessions.",
            ),
            Self::AlreadyInProgress => {
                Some("Wait for the current shutdown/startup to finish, then retry.")
            }
            Self::SessionFailed { detail, .. } if detail.contains("ORA-01031") => Some(
                "Connecting AS SYSDBA requires the service account to be in the DBA group.",
            ),
            _ => None,
        }
    }
}

/// Result reported for a control operation. Mirrors the generic run
/// report so the web layer renders both the same way.
#[derive(Debug, Clone)]
pub struct ControlOutcome {
    pub success: bool,
    pub output: String,
    pub executed_at: Timestamp,
    pub error: Option<String>,
}

/// Dispatches shutdown/startup through the guard and session.
///
/// Injectable: tests construct instances with mock sessions, and each
/// instance carries its own guard.
pub struct OracleControlService {
    session: Option<Arc<dyn AdminSession>>,
    guard: ControlGuard,
}

impl OracleControlService {
    /// Build from an optional connection profile. Without a profile
    /// every operation fails "not configured" before taking the lock.
    pub fn new(config: Option<OracleConfig>) -> Self {
        let session = config.map(|c| Arc::new(SqlplusSession::new(c)) as Arc<dyn AdminSession>);
        Self {
            session,
            guard: ControlGuard::new(),
        }
    }

    /// Build with an explicit session implementation.
    pub fn with_session(session: Arc<dyn AdminSession>) -> Self {
        Self {
            session: Some(session),
            guard: ControlGuard::new(),
        }
    }

    /// Shut the database down in the given mode.
    pub async fn shutdown(&self, mode: ShutdownMode) -> ControlOutcome {
        self.run_statement("shutdown", mode.statement()).await
    }

    /// Start the database up in the given mode.
    pub async fn startup(&self, mode: StartupMode) -> ControlOutcome {
        self.run_statement("startup", mode.statement()).await
    }

    /// Whether a control operation is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }

    async fn run_statement(&self, operation: &'static str, statement: &str) -> ControlOutcome {
        tracing::info!(operation, statement, "Database control operation requested");

        match self.try_run(statement).await {
            Ok(output) => {
                tracing::info!(operation, "Database control operation succeeded");
                let output = if output.trim().is_empty() {
                    format!("{statement} completed")
                } else {
                    output
                };
                ControlOutcome {
                    success: true,
                    output,
                    executed_at: Utc::now(),
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!(operation, error = %e, "Database control operation failed");
                ControlOutcome {
                    success: false,
                    output: failure_output(&e),
                    executed_at: Utc::now(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn try_run(&self, statement: &str) -> Result<String, OracleError> {
        let session = self.session.as_ref().ok_or(OracleError::NotConfigured)?;

        // Fail fast; no queueing behind an in-flight operation. The
        // permit is dropped on every path out of this function.
        let _permit = self
            .guard
            .try_acquire()
            .ok_or(OracleError::AlreadyInProgress)?;

        session.run_sysdba(statement).await
    }
}

/// Render a failure into the report text: message, hint, then any
/// session output.
fn failure_output(error: &OracleError) -> String {
    let mut text = format!("Error: {error}");
    if let Some(hint) = error.hint() {
        text.push('\n');
        text.push_str(hint);
    }
    if let OracleError::SessionFailed { output, .. } = error {
        if !output.trim().is_empty() {
            text.push_str("\n\nSession output:\n");
            text.push_str(output);
        }
    }
    text
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;

    /// Session that records calls and returns a canned result.
    struct RecordingSession {
        calls: AtomicUsize,
        fail: bool,
    }

    impl RecordingSession {
        fn succeeding() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AdminSession for RecordingSession {
        async fn run_sysdba(&self, statement: &str) -> Result<String, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(OracleError::SessionFailed {
                    detail: "ORA-01031: insufficient privileges".to_string(),
                    output: "ORA-01031: insufficient privileges".to_string(),
                })
            } else {
                Ok(format!("{statement} ok"))
            }
        }
    }

    /// Session that parks until released, to hold the guard busy.
    struct ParkedSession {
        release: Notify,
    }

    #[async_trait]
    impl AdminSession for ParkedSession {
        async fn run_sysdba(&self, _statement: &str) -> Result<String, OracleError> {
            self.release.notified().await;
            Ok("done".to_string())
        }
    }

    #[tokio::test]
    async fn unconfigured_service_fails_before_locking() {
        let service = OracleControlService::new(None);
        let outcome = service.shutdown(ShutdownMode::Immediate).await;
        assert!(!outcome.success);
        assert!(outcome.output.contains("not configured"));
        assert!(!service.is_busy());
    }

    #[tokio::test]
    async fn successful_shutdown_reports_session_output() {
        let session = RecordingSession::succeeding();
        let service = OracleControlService::with_session(session.clone());

        let outcome = service.shutdown(ShutdownMode::Abort).await;
        assert!(outcome.success);
        assert_eq!(outcome.output, "SHUTDOWN ABORT ok");
        assert_eq!(session.call_count(), 1);
        assert!(!service.is_busy());
    }

    #[tokio::test]
    async fn session_failure_releases_the_guard() {
        let session = RecordingSession::failing();
        let service = OracleControlService::with_session(session);

        let outcome = service.startup(StartupMode::Mount).await;
        assert!(!outcome.success);
        assert!(outcome.error.as_deref().unwrap_or_default().contains("ORA-01031"));
        // Hint for the privilege failure is appended.
        assert!(outcome.output.contains("DBA group"));
        // The lock must be free immediately after the failure.
        assert!(!service.is_busy());
    }

    #[tokio::test]
    async fn concurrent_operations_admit_exactly_one() {
        let parked = Arc::new(ParkedSession {
            release: Notify::new(),
        });
        let service = Arc::new(OracleControlService::with_session(parked.clone()));

        // First operation parks inside the session, holding the guard.
        let first = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.shutdown(ShutdownMode::Immediate).await })
        };
        while !service.is_busy() {
            tokio::task::yield_now().await;
        }

        // Second operation must fail fast without opening a session.
        let second = service.startup(StartupMode::Open).await;
        assert!(!second.success);
        assert!(second.output.contains("already in progress"));

        parked.release.notify_one();
        let first = first.await.expect("join");
        assert!(first.success);
        assert!(!service.is_busy());
    }
}

//! Integration tests for the orchestrator operation surface.
//!
//! Tests cover the full wiring: catalog persistence, registration,
//! run dispatch with status tracking, control-operation exclusivity,
//! and concurrent status updates.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use opsdeck_core::oracle::{
    self, AdminSession, OracleControlService, OracleError,
};
use opsdeck_store::models::script::{CreateScript, RunStatus};
use opsdeck_store::ScriptStore;

use opsdeck_service::{ScriptService, ServiceError};

async fn build_service(dir: &tempfile::TempDir, oracle: OracleControlService) -> ScriptService {
    let store = ScriptStore::open(dir.path().join("data").join("scripts.json"))
        .await
        .expect("open store");
    ScriptService::new(Arc::new(store), Arc::new(oracle))
}

fn draft(name: &str, command: &str, arguments: Option<&str>) -> CreateScript {
    CreateScript {
        name: name.to_string(),
        description: Some(format!("{name} (integration test)")),
        command: command.to_string(),
        arguments: arguments.map(str::to_string),
    }
}

/// Session that parks until released, holding the guard busy.
struct ParkedSession {
    release: Notify,
}

#[async_trait]
impl AdminSession for ParkedSession {
    async fn run_sysdba(&self, statement: &str) -> Result<String, OracleError> {
        self.release.notified().await;
        Ok(format!("{statement} done"))
    }
}

// ---------------------------------------------------------------------------
// Test 1: Register, run, inspect history, delete
// ---------------------------------------------------------------------------

/// The full lifecycle of a generic definition against a real catalog
/// file.
#[tokio::test]
async fn register_run_history_delete_lifecycle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = build_service(&dir, OracleControlService::new(None)).await;

    let script = service
        .add_script(draft("Kernel info", "uname", Some("-a")))
        .await
        .expect("add");
    assert!(script.last_status.is_none());

    let report = service.run_script(script.id).await.expect("run");
    assert!(report.success);
    assert!(report.output.starts_with("STDOUT:"));

    let history = service
        .execution_history(script.id)
        .await
        .expect("history");
    assert_eq!(history.last_status, Some(RunStatus::Success));
    assert!(history.last_run_at.expect("stamped") >= script.created_at);

    assert!(service.delete_script(script.id).await.expect("delete"));
    assert!(matches!(
        service.run_script(script.id).await,
        Err(ServiceError::NotFound { .. })
    ));
}

// ---------------------------------------------------------------------------
// Test 2: Status survives a restart of the service
// ---------------------------------------------------------------------------

/// Run status written by one service instance is visible to the next
/// one opened on the same catalog file.
#[tokio::test]
async fn run_status_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");

    let script_id = {
        let service = build_service(&dir, OracleControlService::new(None)).await;
        let script = service
            .add_script(draft("Hostname", "hostname", None))
            .await
            .expect("add");
        let report = service.run_script(script.id).await.expect("run");
        assert!(report.success);
        script.id
    };

    let reopened = build_service(&dir, OracleControlService::new(None)).await;
    let history = reopened
        .execution_history(script_id)
        .await
        .expect("history");
    assert_eq!(history.last_status, Some(RunStatus::Success));
}

// ---------------------------------------------------------------------------
// Test 3: Shutdown and startup share one single-flight lock
// ---------------------------------------------------------------------------

/// With a shutdown parked inside its session, a concurrent startup is
/// rejected fast and never opens a session; after release, the lock is
/// free again.
#[tokio::test]
async fn concurrent_control_operations_are_exclusive() {
    let dir = tempfile::tempdir().expect("tempdir");
    let parked = Arc::new(ParkedSession {
        release: Notify::new(),
    });
    let service = Arc::new(
        build_service(
            &dir,
            OracleControlService::with_session(parked.clone() as Arc<dyn AdminSession>),
        )
        .await,
    );

    let shutdown = service
        .add_script(draft("DB shutdown", oracle::SHUTDOWN_COMMAND, Some("immediate")))
        .await
        .expect("add shutdown");
    let startup = service
        .add_script(draft("DB startup", oracle::STARTUP_COMMAND, Some("open")))
        .await
        .expect("add startup");

    // Park the shutdown inside its session.
    let running = {
        let service = Arc::clone(&service);
        let id = shutdown.id;
        tokio::spawn(async move { service.run_script(id).await })
    };
    while !service.control_in_progress() {
        tokio::task::yield_now().await;
    }

    // The startup must lose the race without queueing.
    let rejected = service.run_script(startup.id).await.expect("run");
    assert!(!rejected.success);
    assert!(rejected.output.contains("already in progress"));

    let startup_history = service
        .execution_history(startup.id)
        .await
        .expect("history");
    assert_eq!(startup_history.last_status, Some(RunStatus::Failed));

    // Release the parked session; the shutdown completes and frees the
    // lock.
    parked.release.notify_one();
    let report = running
        .await
        .expect("join")
        .expect("run");
    assert!(report.success);
    assert!(!service.control_in_progress());

    let shutdown_history = service
        .execution_history(shutdown.id)
        .await
        .expect("history");
    assert_eq!(shutdown_history.last_status, Some(RunStatus::Success));
}

// ---------------------------------------------------------------------------
// Test 4: Concurrent runs of one definition settle on one writer
// ---------------------------------------------------------------------------

/// Two racing runs of the same id interleave their status writes;
/// last-writer-wins is accepted, and the catalog stays consistent.
#[tokio::test]
async fn concurrent_same_id_runs_settle_last_writer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = Arc::new(build_service(&dir, OracleControlService::new(None)).await);

    let script = service
        .add_script(draft("Racer", "echo", Some("race")))
        .await
        .expect("add");

    let mut handles = Vec::new();
    for _ in 0..4 {
        let service = Arc::clone(&service);
        let id = script.id;
        handles.push(tokio::spawn(async move { service.run_script(id).await }));
    }
    for handle in handles {
        let report = handle.await.expect("join").expect("run");
        assert!(report.success);
    }

    let history = service
        .execution_history(script.id)
        .await
        .expect("history");
    assert_eq!(history.last_status, Some(RunStatus::Success));
    assert!(history.last_run_at.is_some());
    // The catalog is still a single healthy document.
    assert_eq!(service.list_scripts().await.len(), 3); // 2 seeded + 1 added
}

// ---------------------------------------------------------------------------
// Test 5: Validation surface round-trip
// ---------------------------------------------------------------------------

/// The validator response mirrors classification results and carries a
/// message or error accordingly.
#[tokio::test]
async fn validation_surface_reports_kind_and_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = build_service(&dir, OracleControlService::new(None)).await;

    let control = service.validate(oracle::STARTUP_COMMAND).await;
    assert!(control.valid);

    let missing = service.validate("/no/such/binary").await;
    assert!(!missing.valid);
    assert!(missing
        .error
        .as_deref()
        .expect("error")
        .contains("File not found"));
}

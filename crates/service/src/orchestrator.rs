//! Central script orchestrator service.
//!
//! Coordinates definition lookup, status tracking, executor dispatch,
//! and Oracle control interception. Held by the web layer as an
//! `Arc<ScriptService>`.
//!
//! Every run follows the same lifecycle:
//! 1. Resolve the definition (unknown id is the only raised error).
//! 2. Record `running`.
//! 3. Dispatch: control commands go through the guarded Oracle
//!    service, everything else through the constrained executor.
//! 4. Record `success`/`failed` -- on failures too, so history is
//!    never stale.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use opsdeck_core::error::CoreError;
use opsdeck_core::oracle::{self, OracleControlService, ShutdownMode, StartupMode};
use opsdeck_core::scripting::executor::{self, ExecError, ExecLimits, ExecOutput};
use opsdeck_core::scripting::invocation::build_invocation;
use opsdeck_core::scripting::validator::{validate_command, CommandKind};
use opsdeck_core::types::{ScriptId, Timestamp};
use opsdeck_store::models::script::{CreateScript, RunStatus, ScriptDefinition, UpdateScript};
use opsdeck_store::ScriptStore;

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Validator result as exposed to the web layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<CommandKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of one run attempt, for scripts and control operations alike.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub success: bool,
    pub output: String,
    pub executed_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Last known run state of a definition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionHistory {
    pub script_id: ScriptId,
    pub script_name: String,
    pub last_run_at: Option<Timestamp>,
    pub last_status: Option<RunStatus>,
    pub command: String,
    pub arguments: Option<String>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Orchestrates definition CRUD and run dispatch.
pub struct ScriptService {
    store: Arc<ScriptStore>,
    oracle: Arc<OracleControlService>,
}

impl ScriptService {
    /// Assemble from an already-opened store and control service.
    pub fn new(store: Arc<ScriptStore>, oracle: Arc<OracleControlService>) -> Self {
        Self { store, oracle }
    }

    /// Open the catalog and build the control service per `config`.
    pub async fn from_config(config: &ServiceConfig) -> ServiceResult<Self> {
        let store = ScriptStore::open(&config.scripts_file).await?;
        let oracle = OracleControlService::new(config.oracle.clone());
        Ok(Self::new(Arc::new(store), Arc::new(oracle)))
    }

    /// All registered definitions.
    pub async fn list_scripts(&self) -> Vec<ScriptDefinition> {
        self.store.list().await
    }

    /// Register a new definition. The command is classified up front;
    /// a draft that fails validation is rejected.
    pub async fn add_script(&self, draft: CreateScript) -> ServiceResult<ScriptDefinition> {
        if draft.name.trim().is_empty() {
            return Err(CoreError::Validation("Script name must not be empty".to_string()).into());
        }

        let validated = validate_command(&draft.command).await?;
        let definition = self.store.add(draft, validated.kind).await?;

        tracing::info!(id = definition.id, name = %definition.name, "Registered script definition");
        Ok(definition)
    }

    /// Update an existing definition, re-classifying the command when
    /// it changed.
    pub async fn update_script(
        &self,
        id: ScriptId,
        draft: UpdateScript,
    ) -> ServiceResult<ScriptDefinition> {
        if let Some(name) = &draft.name {
            if name.trim().is_empty() {
                return Err(
                    CoreError::Validation("Script name must not be empty".to_string()).into(),
                );
            }
        }

        let kind = match &draft.command {
            Some(command) => Some(validate_command(command).await?.kind),
            None => None,
        };

        self.store
            .update(id, draft, kind)
            .await?
            .ok_or(ServiceError::NotFound {
                entity: "script",
                id,
            })
    }

    /// Remove a definition. Returns whether anything was removed.
    pub async fn delete_script(&self, id: ScriptId) -> ServiceResult<bool> {
        Ok(self.store.delete(id).await?)
    }

    /// Classify a raw command string without storing anything.
    pub async fn validate(&self, raw: &str) -> CommandValidation {
        match validate_command(raw).await {
            Ok(validated) => {
                let message = match validated.kind {
                    CommandKind::SystemCommand => {
                        let name = raw.trim().split_whitespace().next().unwrap_or_default();
                        format!("System command '{name}' is valid")
                    }
                    CommandKind::ExecutableFile => "Script file is valid and accessible".to_string(),
                    CommandKind::OracleControl => "Database control command is valid".to_string(),
                };
                CommandValidation {
                    valid: true,
                    kind: Some(validated.kind),
                    resolved_path: validated.resolved_path,
                    warning: validated.warning,
                    message: Some(message),
                    error: None,
                }
            }
            Err(e) => CommandValidation {
                valid: false,
                kind: None,
                resolved_path: None,
                warning: None,
                message: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Run a definition by id.
    ///
    /// An unknown id raises `NotFound`; every other outcome -- including
    /// validation, execution, and control failures -- is returned as a
    /// tagged [`RunReport`], with the definition's status updated on
    /// both paths.
    pub async fn run_script(&self, id: ScriptId) -> ServiceResult<RunReport> {
        let script = self.store.get(id).await.ok_or(ServiceError::NotFound {
            entity: "script",
            id,
        })?;

        tracing::info!(id, name = %script.name, command = %script.command, "Running script");
        self.store.record_status(id, RunStatus::Running).await?;

        let report = match script.kind {
            CommandKind::OracleControl => self.run_control(&script).await,
            _ => self.run_process(&script).await,
        };

        let status = if report.success {
            RunStatus::Success
        } else {
            RunStatus::Failed
        };
        self.store.record_status(id, status).await?;

        if report.success {
            tracing::info!(id, name = %script.name, "Script completed successfully");
        } else {
            tracing::error!(
                id,
                name = %script.name,
                error = report.error.as_deref().unwrap_or("unknown"),
                "Script execution failed"
            );
        }

        Ok(report)
    }

    /// Last known status and timestamp for a definition.
    pub async fn execution_history(&self, id: ScriptId) -> ServiceResult<ExecutionHistory> {
        let script = self.store.get(id).await.ok_or(ServiceError::NotFound {
            entity: "script",
            id,
        })?;

        Ok(ExecutionHistory {
            script_id: script.id,
            script_name: script.name,
            last_run_at: script.last_run_at,
            last_status: script.last_status,
            command: script.command,
            arguments: script.arguments,
        })
    }

    /// Whether a control operation currently holds the exclusivity
    /// lock.
    pub fn control_in_progress(&self) -> bool {
        self.oracle.is_busy()
    }

    /// Platform-appropriate command suggestions for an entry form.
    pub fn suggested_commands(&self) -> &'static [&'static str] {
        opsdeck_core::scripting::validator::suggested_commands()
    }

    /// Dispatch a control definition to the guarded Oracle service.
    /// The mode comes from the definition's `arguments` field.
    async fn run_control(&self, script: &ScriptDefinition) -> RunReport {
        let mode_arg = script.arguments.as_deref().unwrap_or("");

        let outcome = match script.command.as_str() {
            oracle::SHUTDOWN_COMMAND => match mode_arg.parse::<ShutdownMode>() {
                Ok(mode) => self.oracle.shutdown(mode).await,
                Err(e) => return invalid_mode_report(e),
            },
            oracle::STARTUP_COMMAND => match mode_arg.parse::<StartupMode>() {
                Ok(mode) => self.oracle.startup(mode).await,
                Err(e) => return invalid_mode_report(e),
            },
            other => {
                return RunReport {
                    success: false,
                    output: format!("Error: unknown control command '{other}'"),
                    executed_at: Utc::now(),
                    error: Some(format!("unknown control command '{other}'")),
                }
            }
        };

        RunReport {
            success: outcome.success,
            output: outcome.output,
            executed_at: outcome.executed_at,
            error: outcome.error,
        }
    }

    /// Build and execute a generic invocation under the fixed limits.
    async fn run_process(&self, script: &ScriptDefinition) -> RunReport {
        let invocation =
            build_invocation(&script.command, script.arguments.as_deref(), script.kind);

        match executor::run_invocation(&invocation, &ExecLimits::default()).await {
            Ok(output) => RunReport {
                success: true,
                output: success_output(&output),
                executed_at: Utc::now(),
                error: None,
            },
            Err(e) => RunReport {
                success: false,
                output: failure_output(&e),
                executed_at: Utc::now(),
                error: Some(e.to_string()),
            },
        }
    }
}

/// Label and concatenate the captured streams; an all-quiet success is
/// reported explicitly instead of as an empty string.
fn success_output(output: &ExecOutput) -> String {
    let mut text = String::new();
    if !output.stdout.is_empty() {
        text.push_str("STDOUT:\n");
        text.push_str(&output.stdout);
        text.push('\n');
    }
    if !output.stderr.is_empty() {
        text.push_str("STDERR:\n");
        text.push_str(&output.stderr);
        text.push('\n');
    }
    if text.trim().is_empty() {
        "Script completed successfully (no output)".to_string()
    } else {
        text
    }
}

/// Error message first, then whatever partial output was captured.
fn failure_output(error: &ExecError) -> String {
    let mut text = format!("Error: {error}\n");
    if let Some((stdout, stderr)) = error.partial_output() {
        if !stdout.is_empty() {
            text.push_str("\nOutput:\n");
            text.push_str(stdout);
        }
        if !stderr.is_empty() {
            text.push_str("\nError Output:\n");
            text.push_str(stderr);
        }
    }
    text
}

fn invalid_mode_report(error: opsdeck_core::oracle::OracleError) -> RunReport {
    RunReport {
        success: false,
        output: format!("Error: {error}"),
        executed_at: Utc::now(),
        error: Some(error.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

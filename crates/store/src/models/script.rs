//! Script definition entity model and DTOs.
//!
//! Field names serialize in camelCase to match the catalog document
//! layout consumed and produced by the dashboard.

use serde::{Deserialize, Serialize};

use opsdeck_core::scripting::validator::CommandKind;
use opsdeck_core::types::{ScriptId, Timestamp};

/// Last-run lifecycle status of a definition.
///
/// Transitions: (never run) -> `Running` -> `Success` | `Failed` ->
/// `Running` -> ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

/// A registered script or control-operation definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDefinition {
    pub id: ScriptId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Path, system-command name, or Oracle control command.
    pub command: String,
    /// Verbatim argument string; selects the mode for control
    /// definitions.
    #[serde(default)]
    pub arguments: Option<String>,
    pub kind: CommandKind,
    /// `None` until the first run attempt.
    #[serde(default)]
    pub last_status: Option<RunStatus>,
    /// Set on every status transition, including `running`.
    #[serde(default)]
    pub last_run_at: Option<Timestamp>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

/// DTO for registering a new definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScript {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub command: String,
    #[serde(default)]
    pub arguments: Option<String>,
}

/// DTO for updating an existing definition. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScript {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

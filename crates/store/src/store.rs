//! JSON-file backed definition catalog.
//!
//! One mutex serializes every read-modify-write; persistence replaces
//! the whole document atomically via a temp file and rename, so a
//! failed write leaves the previous document intact.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use opsdeck_core::scripting::validator::CommandKind;
use opsdeck_core::types::{ScriptId, Timestamp};

use crate::error::StoreError;
use crate::models::script::{CreateScript, RunStatus, ScriptDefinition, UpdateScript};

/// The persisted whole-document layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptCatalog {
    scripts: Vec<ScriptDefinition>,
    last_updated: Timestamp,
}

impl ScriptCatalog {
    fn empty() -> Self {
        Self {
            scripts: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}

/// Durable collection of script definitions.
///
/// The store is the sole owner of definition identity: ids are
/// assigned here (highest existing id + 1) and never reused while the
/// holder remains in the catalog.
pub struct ScriptStore {
    path: PathBuf,
    catalog: Mutex<ScriptCatalog>,
}

impl ScriptStore {
    /// Open the catalog at `path`, creating parent directories and
    /// seeding the default definitions when no file exists yet.
    ///
    /// An unreadable or corrupt document is logged and treated as an
    /// empty catalog rather than refusing to start.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let store = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<ScriptCatalog>(&bytes) {
                Ok(catalog) => Self {
                    path,
                    catalog: Mutex::new(catalog),
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Corrupt catalog document, starting empty");
                    Self {
                        path,
                        catalog: Mutex::new(ScriptCatalog::empty()),
                    }
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let store = Self {
                    path,
                    catalog: Mutex::new(default_catalog()),
                };
                let catalog = store.catalog.lock().await;
                store.persist(&catalog).await?;
                drop(catalog);
                tracing::info!(path = %store.path.display(), "Seeded default script catalog");
                store
            }
            Err(e) => return Err(e.into()),
        };

        Ok(store)
    }

    /// All definitions, in catalog order.
    pub async fn list(&self) -> Vec<ScriptDefinition> {
        self.catalog.lock().await.scripts.clone()
    }

    /// Look up one definition.
    pub async fn get(&self, id: ScriptId) -> Option<ScriptDefinition> {
        self.catalog
            .lock()
            .await
            .scripts
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    /// Register a new definition with a fresh id.
    pub async fn add(
        &self,
        draft: CreateScript,
        kind: CommandKind,
    ) -> Result<ScriptDefinition, StoreError> {
        let mut catalog = self.catalog.lock().await;

        let id = catalog.scripts.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        let definition = ScriptDefinition {
            id,
            name: draft.name.trim().to_string(),
            description: draft.description,
            command: draft.command.trim().to_string(),
            arguments: draft.arguments,
            kind,
            last_status: None,
            last_run_at: None,
            created_at: Utc::now(),
            updated_at: None,
        };

        catalog.scripts.push(definition.clone());
        self.persist(&catalog).await?;
        Ok(definition)
    }

    /// Apply a partial update. Returns `None` for an unknown id. When
    /// the command changed, the caller passes its fresh classification.
    pub async fn update(
        &self,
        id: ScriptId,
        draft: UpdateScript,
        kind: Option<CommandKind>,
    ) -> Result<Option<ScriptDefinition>, StoreError> {
        let mut catalog = self.catalog.lock().await;

        let Some(definition) = catalog.scripts.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };

        if let Some(name) = draft.name {
            definition.name = name.trim().to_string();
        }
        if let Some(description) = draft.description {
            definition.description = Some(description);
        }
        if let Some(command) = draft.command {
            definition.command = command.trim().to_string();
        }
        if let Some(arguments) = draft.arguments {
            definition.arguments = Some(arguments);
        }
        if let Some(kind) = kind {
            definition.kind = kind;
        }
        definition.updated_at = Some(Utc::now());

        let updated = definition.clone();
        self.persist(&catalog).await?;
        Ok(Some(updated))
    }

    /// Remove a definition. Returns whether anything was removed.
    pub async fn delete(&self, id: ScriptId) -> Result<bool, StoreError> {
        let mut catalog = self.catalog.lock().await;

        let before = catalog.scripts.len();
        catalog.scripts.retain(|s| s.id != id);
        if catalog.scripts.len() == before {
            return Ok(false);
        }

        self.persist(&catalog).await?;
        Ok(true)
    }

    /// Record a run-status transition, stamping `last_run_at`.
    /// Returns whether the definition still exists.
    pub async fn record_status(
        &self,
        id: ScriptId,
        status: RunStatus,
    ) -> Result<bool, StoreError> {
        let mut catalog = self.catalog.lock().await;

        let Some(definition) = catalog.scripts.iter_mut().find(|s| s.id == id) else {
            return Ok(false);
        };

        definition.last_status = Some(status);
        definition.last_run_at = Some(Utc::now());

        self.persist(&catalog).await?;
        Ok(true)
    }

    /// Write the whole document atomically: temp file in the same
    /// directory, then rename over the target.
    async fn persist(&self, catalog: &ScriptCatalog) -> Result<(), StoreError> {
        let document = ScriptCatalog {
            scripts: catalog.scripts.clone(),
            last_updated: Utc::now(),
        };
        let bytes = serde_json::to_vec_pretty(&document)?;

        let temp = temp_path(&self.path);
        tokio::fs::write(&temp, &bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

/// Sidecar path used for the atomic replace.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// The two definitions the catalog ships with on first start.
fn default_catalog() -> ScriptCatalog {
    let now = Utc::now();
    let seed = |id: ScriptId, name: &str, description: &str, command: &str, arguments: Option<&str>| {
        ScriptDefinition {
            id,
            name: name.to_string(),
            description: Some(description.to_string()),
            command: command.to_string(),
            arguments: arguments.map(str::to_string),
            kind: CommandKind::SystemCommand,
            last_status: None,
            last_run_at: None,
            created_at: now,
            updated_at: None,
        }
    };

    #[cfg(windows)]
    let scripts = vec![
        seed(1, "System Information", "Display basic system information", "systeminfo", None),
        seed(2, "Directory Listing", "List current directory contents", "dir", Some("/w")),
    ];

    #[cfg(not(windows))]
    let scripts = vec![
        seed(1, "System Information", "Display basic system information", "uname -a", None),
        seed(2, "Directory Listing", "List current directory contents", "ls", Some("-la")),
    ];

    ScriptCatalog {
        scripts,
        last_updated: now,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

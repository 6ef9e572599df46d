//! `opsdeck-service` -- the operation surface consumed by the
//! dashboard's web layer.
//!
//! Wires the catalog store, the validator/executor, and the Oracle
//! control service into one orchestrator: definition CRUD, command
//! validation, run dispatch with status tracking, and execution
//! history.

pub mod config;
pub mod error;
pub mod orchestrator;

pub use config::ServiceConfig;
pub use error::{ServiceError, ServiceResult};
pub use orchestrator::{CommandValidation, ExecutionHistory, RunReport, ScriptService};

//! Oracle database control operations.
//!
//! Implements the two built-in privileged operations (administrative
//! shutdown and startup) behind a single-flight guard: one elevated
//! session is opened, exactly one command is issued, and the session is
//! closed. At most one control operation is in flight per service
//! instance at any instant, across both operation types.

pub mod control;
pub mod guard;
pub mod modes;
pub mod session;

pub use control::{ControlOutcome, OracleControlService, OracleError};
pub use guard::{ControlGuard, ControlPermit};
pub use modes::{ShutdownMode, StartupMode};
pub use session::{AdminSession, OracleConfig, SqlplusSession};

/// Definition command selecting the database shutdown operation.
pub const SHUTDOWN_COMMAND: &str = "ORACLE_SHUTDOWN";

/// Definition command selecting the database startup operation.
pub const STARTUP_COMMAND: &str = "ORACLE_STARTUP";

//! `opsdeck-core` -- domain logic for the script execution subsystem.
//!
//! Pure command classification, invocation building, constrained
//! subprocess execution, and Oracle control operations. No persistence
//! access lives here; the catalog store and the orchestrator facade
//! build on top of this crate.

pub mod error;
pub mod oracle;
pub mod scripting;
pub mod types;

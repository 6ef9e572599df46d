//! Command classification and constrained execution domain logic.
//!
//! Provides the path/command validator, the invocation builder, and the
//! subprocess executor with fixed time and output limits. All of it is
//! pure (no catalog access) and lives in `core` for isolation and
//! testability.

pub mod executor;
pub mod invocation;
pub mod subprocess;
pub mod validator;

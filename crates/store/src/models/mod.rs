//! Catalog entity models and DTOs.

pub mod script;

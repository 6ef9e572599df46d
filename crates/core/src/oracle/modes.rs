//! Shutdown and startup mode enumerations.
//!
//! A control definition's `arguments` field selects the mode; parsing
//! is case-insensitive and an empty value selects the default
//! (immediate shutdown, open startup).

use std::str::FromStr;

use super::control::OracleError;

/// `SHUTDOWN` variants accepted by the control service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownMode {
    #[default]
    Immediate,
    Normal,
    Abort,
}

impl ShutdownMode {
    /// The administrative statement issued for this mode.
    pub fn statement(self) -> &'static str {
        match self {
            Self::Immediate => "SHUTDOWN IMMEDIATE",
            Self::Normal => "SHUTDOWN NORMAL",
            Self::Abort => "SHUTDOWN ABORT",
        }
    }
}

impl FromStr for ShutdownMode {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "immediate" => Ok(Self::Immediate),
            "normal" => Ok(Self::Normal),
            "abort" => Ok(Self::Abort),
            other => Err(OracleError::InvalidMode {
                operation: "shutdown",
                value: other.to_string(),
            }),
        }
    }
}

/// `STARTUP` variants accepted by the control service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartupMode {
    #[default]
    Open,
    Mount,
    Nomount,
}

impl StartupMode {
    /// The administrative statement issued for this mode.
    pub fn statement(self) -> &'static str {
        match self {
            Self::Open => "STARTUP",
            Self::Mount => "STARTUP MOUNT",
            Self::Nomount => "STARTUP NOMOUNT",
        }
    }
}

impl FromStr for StartupMode {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "open" => Ok(Self::Open),
            "mount" => Ok(Self::Mount),
            "nomount" => Ok(Self::Nomount),
            other => Err(OracleError::InvalidMode {
                operation: "startup",
                value: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

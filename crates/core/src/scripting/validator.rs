//! Path/command validation and classification.
//!
//! Classifies a raw operator-supplied command string as an allow-listed
//! system command, a file-backed executable, or an Oracle control
//! command. Filesystem probes only happen for file-backed candidates;
//! every failure is returned as a validation error, never raised.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::oracle;

/// Command names assumed present on the host. Validation of these never
/// touches the filesystem.
pub const SYSTEM_COMMANDS: &[&str] = &[
    "systeminfo", "dir", "ipconfig", "netstat", "tasklist", "ping", "whoami", "hostname", "date",
    "time", "echo", "cls", "type", "ls", "ps", "uname", "df", "free", "top", "cat", "grep",
    "python", "node", "npm", "git", "docker", "kubectl",
];

/// Executable extensions accepted on Windows.
#[cfg(windows)]
const ALLOWED_EXTENSIONS: &[&str] = &["bat", "cmd", "ps1", "exe", "com", "msi"];

/// How a definition's `command` field is interpreted at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    /// An allow-listed command name resolved by the shell.
    SystemCommand,
    /// A path to an executable file, spawned directly without a shell.
    ExecutableFile,
    /// A built-in Oracle control operation (shutdown/startup).
    OracleControl,
}

/// Successful classification of a command string.
#[derive(Debug, Clone)]
pub struct ValidatedCommand {
    pub kind: CommandKind,
    /// The probed executable path, for file-backed commands only.
    pub resolved_path: Option<String>,
    /// Non-fatal advisory (e.g. missing executable bit on Unix).
    pub warning: Option<String>,
}

/// Classify `raw` as a system command, a file-backed executable, or an
/// Oracle control command.
///
/// The first whitespace-delimited token (after unquoting a surrounding
/// quote pair) is the executable candidate; the remainder is ignored
/// here. An unquoted path containing spaces is therefore split at the
/// first space and will usually fail as "file not found".
pub async fn validate_command(raw: &str) -> Result<ValidatedCommand, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Command must not be empty".to_string(),
        ));
    }

    // Oracle control commands are fixed, case-sensitive strings matched
    // by equality. No filesystem state is involved.
    if trimmed == oracle::SHUTDOWN_COMMAND || trimmed == oracle::STARTUP_COMMAND {
        return Ok(ValidatedCommand {
            kind: CommandKind::OracleControl,
            resolved_path: None,
            warning: None,
        });
    }

    // System commands validate on name alone.
    if let Some(first) = trimmed.split_whitespace().next() {
        if is_system_command(first) {
            return Ok(ValidatedCommand {
                kind: CommandKind::SystemCommand,
                resolved_path: None,
                warning: None,
            });
        }
    }

    // Everything else must point at an existing regular file.
    let unquoted = unquote(trimmed);
    let candidate = unquoted.split_whitespace().next().unwrap_or(unquoted);

    let metadata = match tokio::fs::metadata(candidate).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CoreError::Validation(format!(
                "File not found: \"{candidate}\". Check the path and ensure the file exists."
            )));
        }
        Err(e) => {
            return Err(CoreError::Validation(format!(
                "Error validating command: {e}"
            )));
        }
    };

    if !metadata.is_file() {
        return Err(CoreError::Validation(
            "Command path must point to a file, not a directory".to_string(),
        ));
    }

    let warning = platform_check(candidate, &metadata)?;

    Ok(ValidatedCommand {
        kind: CommandKind::ExecutableFile,
        resolved_path: Some(candidate.to_string()),
        warning,
    })
}

/// True when `token` (case-insensitive, with or without an extension)
/// names an allow-listed system command.
pub fn is_system_command(token: &str) -> bool {
    let lowered = token.to_ascii_lowercase();
    if SYSTEM_COMMANDS.contains(&lowered.as_str()) {
        return true;
    }
    Path::new(&lowered)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| SYSTEM_COMMANDS.contains(&stem))
}

/// Strip one surrounding pair of matching single or double quotes.
fn unquote(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// Windows requires an allow-listed executable extension.
#[cfg(windows)]
fn platform_check(
    candidate: &str,
    _metadata: &std::fs::Metadata,
) -> Result<Option<String>, CoreError> {
    let extension = Path::new(candidate)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        let allowed = ALLOWED_EXTENSIONS
            .iter()
            .map(|ext| format!(".{ext}"))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(CoreError::Validation(format!(
            "Unsupported file type: .{extension}. Allowed types: {allowed}"
        )));
    }
    Ok(None)
}

/// Unix probes the executable bit and warns without failing.
#[cfg(unix)]
fn platform_check(
    candidate: &str,
    metadata: &std::fs::Metadata,
) -> Result<Option<String>, CoreError> {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode();
    if mode & 0o111 == 0 {
        return Ok(Some(format!("File may not be executable: {candidate}")));
    }
    Ok(None)
}

/// Commonly useful commands to suggest in an entry form, by platform.
#[cfg(windows)]
pub fn suggested_commands() -> &'static [&'static str] {
    &[
        r"C:\Windows\System32\systeminfo.exe",
        r"C:\Windows\System32\ipconfig.exe",
        r"C:\Windows\System32\ping.exe",
        r"C:\Windows\System32\netstat.exe",
        r"C:\Program Files\PowerShell\7\pwsh.exe",
        "systeminfo",
        "dir",
        "ipconfig /all",
        "ping google.com",
    ]
}

/// Commonly useful commands to suggest in an entry form, by platform.
#[cfg(not(windows))]
pub fn suggested_commands() -> &'static [&'static str] {
    &[
        "/bin/ls",
        "/bin/ps",
        "/usr/bin/uname",
        "/usr/bin/df",
        "/usr/bin/free",
        "ls -la",
        "ps aux",
        "uname -a",
        "df -h",
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

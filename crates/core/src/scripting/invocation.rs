//! Invocation building.
//!
//! Turns a classified definition (`command` + `arguments`) into either a
//! direct argv spawn (file-backed executables, no shell interpretation)
//! or a single shell command line (allow-listed system commands, which
//! may be shell built-ins).

use super::validator::{is_system_command, CommandKind};

/// A runnable invocation produced by [`build_invocation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Spawn `program` directly with `args` as the argv tail.
    Direct { program: String, args: Vec<String> },
    /// Run `command_line` through the platform shell.
    Shell { command_line: String },
}

/// Build the invocation for a classified command.
///
/// Oracle control commands never reach this function; they are
/// intercepted by the orchestrator before invocation building.
pub fn build_invocation(command: &str, arguments: Option<&str>, kind: CommandKind) -> Invocation {
    match kind {
        CommandKind::ExecutableFile => {
            let program = unquote(command.trim()).to_string();
            let args = arguments
                .map(|a| a.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default();
            Invocation::Direct { program, args }
        }
        _ => Invocation::Shell {
            command_line: build_shell_line(command, arguments),
        },
    }
}

/// Assemble a single shell command line.
///
/// A command containing whitespace that is not already quoted and whose
/// first token is not an allow-listed system command is wrapped in
/// quotes, so executable paths with spaces survive shell word
/// splitting. Trimmed arguments are appended with a single space.
pub fn build_shell_line(command: &str, arguments: Option<&str>) -> String {
    let mut line = command.trim().to_string();

    if line.contains(' ') && !line.starts_with('"') && !line.starts_with('\'') {
        let first = line.split_whitespace().next().unwrap_or_default();
        if !is_system_command(first) {
            line = format!("\"{line}\"");
        }
    }

    if let Some(args) = arguments {
        let trimmed = args.trim();
        if !trimmed.is_empty() {
            line.push(' ');
            line.push_str(trimmed);
        }
    }

    line
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

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Constrained process execution.
//!
//! Runs a built [`Invocation`] under fixed resource limits: a hard
//! wall-clock timeout and a combined stdout/stderr byte cap. Every
//! expected failure mode is returned as a tagged [`ExecError`], never
//! raised.

use std::time::Duration;

use tokio::process::Command;

use super::invocation::Invocation;
use super::subprocess;

/// Wall-clock limit applied to every run.
pub const EXEC_TIMEOUT_SECS: u64 = 300;

/// Combined stdout + stderr cap. Exceeding it kills the child and fails
/// the run; output is never silently truncated into a success.
pub const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Resource limits for one execution.
///
/// The orchestrator always runs with [`ExecLimits::default`]; the
/// fields exist so tests can exercise the limit handling quickly.
#[derive(Debug, Clone)]
pub struct ExecLimits {
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

impl Default for ExecLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(EXEC_TIMEOUT_SECS),
            max_output_bytes: MAX_OUTPUT_BYTES,
        }
    }
}

/// Captured output of a zero-exit completion.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u64,
}

/// Expected execution failure modes. Partial output captured before the
/// failure is preserved on the variants that can have any.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Failed to start process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("I/O error while awaiting process: {0}")]
    Io(#[source] std::io::Error),

    #[error("Execution timed out after {elapsed_ms}ms")]
    Timeout {
        elapsed_ms: u64,
        stdout: String,
        stderr: String,
    },

    #[error("Combined output exceeded the {limit_bytes}-byte limit")]
    OutputLimit {
        limit_bytes: usize,
        stdout: String,
        stderr: String,
    },

    #[error("Process exited with code {exit_code}")]
    NonZeroExit {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
}

impl ExecError {
    /// Partial stdout/stderr captured before the failure, if any.
    pub fn partial_output(&self) -> Option<(&str, &str)> {
        match self {
            Self::Timeout { stdout, stderr, .. }
            | Self::OutputLimit { stdout, stderr, .. }
            | Self::NonZeroExit { stdout, stderr, .. } => Some((stdout, stderr)),
            Self::Spawn(_) | Self::Io(_) => None,
        }
    }
}

/// Run an invocation under `limits`.
///
/// The child runs hidden/non-interactively with its working directory
/// pinned to the invoking user's home, so scripts cannot depend on the
/// service's own layout.
pub async fn run_invocation(
    invocation: &Invocation,
    limits: &ExecLimits,
) -> Result<ExecOutput, ExecError> {
    let mut cmd = match invocation {
        Invocation::Direct { program, args } => {
            let mut cmd = Command::new(program);
            cmd.args(args);
            cmd
        }
        Invocation::Shell { command_line } => shell_command(command_line),
    };

    if let Some(home) = dirs::home_dir() {
        cmd.current_dir(home);
    }

    subprocess::run_command(&mut cmd, None, limits).await
}

#[cfg(not(windows))]
fn shell_command(command_line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command_line);
    cmd
}

#[cfg(windows)]
fn shell_command(command_line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command_line);
    cmd
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::scripting::invocation::Invocation;

    fn quick_limits() -> ExecLimits {
        ExecLimits {
            timeout: Duration::from_secs(5),
            max_output_bytes: MAX_OUTPUT_BYTES,
        }
    }

    fn shell(line: &str) -> Invocation {
        Invocation::Shell {
            command_line: line.to_string(),
        }
    }

    #[tokio::test]
    async fn echo_succeeds_with_captured_stdout() {
        let output = run_invocation(&shell("echo hello"), &quick_limits())
            .await
            .expect("run");
        assert_eq!(output.exit_code, 0);
        assert!(output.stdout.contains("hello"));
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn silent_success_has_empty_output() {
        let output = run_invocation(&shell("true"), &quick_limits())
            .await
            .expect("run");
        assert_eq!(output.exit_code, 0);
        assert!(output.stdout.is_empty());
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn nonzero_exit_preserves_output() {
        let result = run_invocation(&shell("echo partial; exit 3"), &quick_limits()).await;
        assert_matches!(
            result,
            Err(ExecError::NonZeroExit { exit_code: 3, ref stdout, .. }) if stdout.contains("partial")
        );
    }

    #[tokio::test]
    async fn timeout_is_classified_as_timeout() {
        let limits = ExecLimits {
            timeout: Duration::from_millis(200),
            max_output_bytes: MAX_OUTPUT_BYTES,
        };
        let result = run_invocation(&shell("echo early; sleep 60"), &limits).await;
        assert_matches!(
            result,
            Err(ExecError::Timeout { ref stdout, .. }) if stdout.contains("early")
        );
    }

    #[tokio::test]
    async fn output_over_the_cap_is_a_hard_failure() {
        let limits = ExecLimits {
            timeout: Duration::from_secs(10),
            max_output_bytes: 1024,
        };
        // Emits ~40 KiB, far over the 1 KiB test cap.
        let result = run_invocation(&shell("yes opsdeck | head -c 40960"), &limits).await;
        assert_matches!(result, Err(ExecError::OutputLimit { limit_bytes: 1024, .. }));
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let invocation = Invocation::Direct {
            program: "/nonexistent/program".to_string(),
            args: vec![],
        };
        let result = run_invocation(&invocation, &quick_limits()).await;
        assert_matches!(result, Err(ExecError::Spawn(_)));
    }

    #[tokio::test]
    async fn direct_invocation_passes_argv_without_shell() {
        // A shell metacharacter in argv must reach the program verbatim.
        let invocation = Invocation::Direct {
            program: "/bin/echo".to_string(),
            args: vec!["$(hostname)".to_string()],
        };
        let output = run_invocation(&invocation, &quick_limits())
            .await
            .expect("run");
        assert!(output.stdout.contains("$(hostname)"));
    }

    #[test]
    fn default_limits_match_the_contract() {
        let limits = ExecLimits::default();
        assert_eq!(limits.timeout, Duration::from_secs(300));
        assert_eq!(limits.max_output_bytes, 10 * 1024 * 1024);
    }
}

//! Shared subprocess management.
//!
//! Provides [`run_command`], the spawn + I/O + limit enforcement logic
//! used by the generic executor and the Oracle session adapter. The
//! caller builds a [`tokio::process::Command`]; stdin handling, output
//! capture, the timeout, and the combined output cap are applied here.

use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::executor::{ExecError, ExecLimits, ExecOutput};

/// Read buffer size for the output capture loops.
const READ_CHUNK_BYTES: usize = 8 * 1024;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Result of awaiting the child, before output collection.
enum WaitStep {
    Completed(std::io::Result<std::process::ExitStatus>),
    TimedOut,
    Overflowed,
}

/// Spawn `cmd`, optionally pipe `stdin_payload` to its stdin, capture
/// stdout/stderr, and enforce the timeout and combined output cap.
///
/// The child is spawned hidden/non-interactive; with no stdin payload
/// its stdin is closed so interactive prompts fail fast instead of
/// hanging until the timeout.
pub async fn run_command(
    cmd: &mut Command,
    stdin_payload: Option<String>,
    limits: &ExecLimits,
) -> Result<ExecOutput, ExecError> {
    cmd.stdin(if stdin_payload.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(ExecError::Spawn)?;

    if let Some(payload) = stdin_payload {
        if let Some(mut stdin) = child.stdin.take() {
            // Best-effort write; a child that closes stdin early is not
            // an error here.
            let _ = stdin.write_all(payload.as_bytes()).await;
            drop(stdin);
        }
    }

    // Both streams draw from one shared byte budget. The first reader
    // to cross it signals overflow so the child can be killed without
    // waiting out the timeout. The original sender is kept alive for
    // the whole wait, so `recv` only ever yields on a real overflow.
    let used = Arc::new(AtomicUsize::new(0));
    let (overflow_tx, mut overflow_rx) = mpsc::channel::<()>(2);

    let stdout_task = tokio::spawn(read_stream(
        child.stdout.take(),
        limits.max_output_bytes,
        Arc::clone(&used),
        overflow_tx.clone(),
    ));
    let stderr_task = tokio::spawn(read_stream(
        child.stderr.take(),
        limits.max_output_bytes,
        Arc::clone(&used),
        overflow_tx.clone(),
    ));

    let step = tokio::select! {
        wait_result = tokio::time::timeout(limits.timeout, child.wait()) => match wait_result {
            Ok(res) => WaitStep::Completed(res),
            Err(_elapsed) => WaitStep::TimedOut,
        },
        _ = overflow_rx.recv() => WaitStep::Overflowed,
    };

    match step {
        WaitStep::Completed(Ok(status)) => {
            let duration_ms = start.elapsed().as_millis() as u64;
            let (stdout, stderr) = collect(stdout_task, stderr_task).await;

            if used.load(Ordering::Acquire) > limits.max_output_bytes {
                return Err(ExecError::OutputLimit {
                    limit_bytes: limits.max_output_bytes,
                    stdout,
                    stderr,
                });
            }

            if status.success() {
                Ok(ExecOutput {
                    stdout,
                    stderr,
                    exit_code: 0,
                    duration_ms,
                })
            } else {
                Err(ExecError::NonZeroExit {
                    exit_code: status.code().unwrap_or(-1),
                    stdout,
                    stderr,
                })
            }
        }
        WaitStep::Completed(Err(e)) => Err(ExecError::Io(e)),
        WaitStep::TimedOut => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            let (stdout, stderr) = collect(stdout_task, stderr_task).await;
            Err(ExecError::Timeout {
                elapsed_ms: start.elapsed().as_millis() as u64,
                stdout,
                stderr,
            })
        }
        WaitStep::Overflowed => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            let (stdout, stderr) = collect(stdout_task, stderr_task).await;
            Err(ExecError::OutputLimit {
                limit_bytes: limits.max_output_bytes,
                stdout,
                stderr,
            })
        }
    }
}

/// Read one output stream, charging the shared byte budget. Stops and
/// signals overflow once the combined budget is exceeded.
async fn read_stream<R: AsyncRead + Unpin>(
    handle: Option<R>,
    limit: usize,
    used: Arc<AtomicUsize>,
    overflow: mpsc::Sender<()>,
) -> Vec<u8> {
    let mut buf = Vec::new();
    let Some(mut handle) = handle else {
        return buf;
    };

    let mut chunk = [0u8; READ_CHUNK_BYTES];
    loop {
        match handle.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if used.fetch_add(n, Ordering::AcqRel) + n > limit {
                    let _ = overflow.try_send(());
                    break;
                }
            }
        }
    }
    buf
}

/// Join both capture tasks and decode lossily.
async fn collect(
    stdout_task: JoinHandle<Vec<u8>>,
    stderr_task: JoinHandle<Vec<u8>>,
) -> (String, String) {
    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();
    (
        String::from_utf8_lossy(&stdout).into_owned(),
        String::from_utf8_lossy(&stderr).into_owned(),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

// Process helpers shared by the prober and the downloader backends

use std::collections::VecDeque;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration as TokioDuration};
use tracing::{debug, info};

use super::errors::DownloadError;
use super::status::{StatusEmitter, StatusEvent};

/// Lines of stderr kept for the failure report
const STDERR_TAIL_LINES: usize = 5;

/// Where the external tool's own output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Straight to our terminal (CLI)
    #[default]
    Inherit,
    /// Piped, parsed into status events (GUI)
    Capture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub success: bool,
    pub code: Option<i32>,
}

/// Turns one line of tool output into a status event, if it is interesting.
pub type ProgressParser = fn(&str) -> Option<StatusEvent>;

/// Run command with timeout, capturing its output
pub async fn run_output_with_timeout(
    program: &str,
    args: Vec<String>,
    timeout_secs: u64,
) -> Result<std::process::Output, String> {
    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("Failed to start {}: {}", program, e))?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| format!("Failed to capture stdout from {}", program))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| format!("Failed to capture stderr from {}", program))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe
            .read_to_end(&mut buf)
            .await
            .map_err(|e| format!("Failed to read stdout: {}", e))?;
        Ok::<Vec<u8>, String>(buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe
            .read_to_end(&mut buf)
            .await
            .map_err(|e| format!("Failed to read stderr: {}", e))?;
        Ok::<Vec<u8>, String>(buf)
    });

    let waited = timeout(TokioDuration::from_secs(timeout_secs), child.wait()).await;
    match waited {
        Ok(status_res) => {
            let status = status_res.map_err(|e| format!("Failed to wait for {}: {}", program, e))?;
            let stdout = stdout_task
                .await
                .map_err(|e| format!("stdout task failed: {}", e))??;
            let stderr = stderr_task
                .await
                .map_err(|e| format!("stderr task failed: {}", e))??;
            Ok(std::process::Output { status, stdout, stderr })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(format!("Timed out after {}s", timeout_secs))
        }
    }
}

/// Render a command line for logs. Never passed to a shell.
pub fn display_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .map(|part| {
            if part.is_empty() || part.contains(char::is_whitespace) {
                format!("\"{}\"", part)
            } else {
                part.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Feed `reader` to `on_line` one line at a time. Both `\n` and `\r` end a
/// line, so carriage-return progress bars come through as separate updates.
pub async fn read_segments<R, F>(mut reader: R, mut on_line: F) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut buf = [0u8; 4096];
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        for &byte in &buf[..n] {
            if byte == b'\n' || byte == b'\r' {
                if !pending.is_empty() {
                    on_line(String::from_utf8_lossy(&pending).trim_end());
                    pending.clear();
                }
            } else {
                pending.push(byte);
            }
        }
    }

    if !pending.is_empty() {
        on_line(String::from_utf8_lossy(&pending).trim_end());
    }
    Ok(())
}

/// Run a downloader to completion. There is no timeout: the tool decides
/// when it is done.
pub async fn run_tool(
    program: &str,
    args: &[String],
    mode: OutputMode,
    emitter: &StatusEmitter,
    parse: ProgressParser,
) -> Result<ProcessOutcome, DownloadError> {
    info!(command = %display_command(program, args), "starting downloader");

    let mut cmd = TokioCommand::new(program);
    cmd.args(args).stdin(Stdio::null());

    let status = match mode {
        OutputMode::Inherit => cmd
            .status()
            .await
            .map_err(|e| DownloadError::ExecutionError(format!("Failed to start {}: {}", program, e)))?,
        OutputMode::Capture => {
            let mut child = cmd
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .map_err(|e| DownloadError::ExecutionError(format!("Failed to start {}: {}", program, e)))?;

            let stdout = child.stdout.take().ok_or_else(|| {
                DownloadError::ExecutionError(format!("Failed to capture stdout from {}", program))
            })?;
            let stderr = child.stderr.take().ok_or_else(|| {
                DownloadError::ExecutionError(format!("Failed to capture stderr from {}", program))
            })?;

            let out_emitter = emitter.clone();
            let stdout_task = tokio::spawn(async move {
                let _ = read_segments(stdout, |line| {
                    if let Some(event) = parse(line) {
                        out_emitter.emit(event);
                    }
                })
                .await;
            });

            let err_emitter = emitter.clone();
            let stderr_task = tokio::spawn(async move {
                let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
                let _ = read_segments(stderr, |line| {
                    if let Some(event) = parse(line) {
                        err_emitter.emit(event);
                        return;
                    }
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line.to_string());
                })
                .await;
                tail
            });

            let status = child
                .wait()
                .await
                .map_err(|e| DownloadError::ExecutionError(format!("Process error: {}", e)))?;
            let _ = stdout_task.await;
            let tail = stderr_task.await.unwrap_or_default();

            if !status.success() {
                for line in tail {
                    emitter.warn(format!("{}: {}", program, line));
                }
            }
            status
        }
    };

    debug!(%status, "downloader exited");
    Ok(ProcessOutcome {
        success: status.success(),
        code: status.code(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::status::StatusLevel;

    fn no_progress(_: &str) -> Option<StatusEvent> {
        None
    }

    #[tokio::test]
    async fn test_read_segments_splits_on_cr_and_lf() {
        let data: &[u8] = b"first\nframe=1 time=00:00:01\rframe=2 time=00:00:02\r\nlast";
        let mut lines = Vec::new();
        read_segments(data, |line| lines.push(line.to_string())).await.unwrap();
        assert_eq!(
            lines,
            ["first", "frame=1 time=00:00:01", "frame=2 time=00:00:02", "last"]
        );
    }

    #[test]
    fn test_display_command_quotes_spaces() {
        let args = vec!["-headers".to_string(), "Referer: https://a.example/".to_string()];
        assert_eq!(
            display_command("ffmpeg", &args),
            "ffmpeg -headers \"Referer: https://a.example/\""
        );
    }

    #[tokio::test]
    async fn test_run_tool_missing_binary_is_execution_error() {
        let emitter = StatusEmitter::silent();
        let result = run_tool(
            "m3u8-grabber-no-such-tool",
            &[],
            OutputMode::Capture,
            &emitter,
            no_progress,
        )
        .await;
        assert!(matches!(result, Err(DownloadError::ExecutionError(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_tool_reports_exit_code_and_stderr_tail() {
        let (emitter, mut rx) = StatusEmitter::channel();
        let args = vec!["-c".to_string(), "echo broken pipe >&2; exit 3".to_string()];
        let outcome = run_tool("sh", &args, OutputMode::Capture, &emitter, no_progress)
            .await
            .unwrap();
        assert_eq!(outcome, ProcessOutcome { success: false, code: Some(3) });

        drop(emitter);
        let mut warnings = Vec::new();
        while let Some(event) = rx.recv().await {
            if event.level == StatusLevel::Warning {
                warnings.push(event.message);
            }
        }
        assert_eq!(warnings, ["sh: broken pipe"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_output_with_timeout_kills_slow_process() {
        let result = run_output_with_timeout("sleep", vec!["5".to_string()], 1).await;
        assert_eq!(result.unwrap_err(), "Timed out after 1s");
    }
}

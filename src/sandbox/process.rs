//! Child interpreter variant: `<interpreter> -c <source>`.

use std::{process::Stdio, time::Duration};

use tokio::{process::Command, time::timeout};
use tracing::debug;

use super::ExecutionResult;

pub(super) async fn run(interpreter: &str, source: &str, limit: Duration) -> ExecutionResult {
    let mut cmd = Command::new(interpreter);
    cmd.arg("-c")
        .arg(source)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return ExecutionResult::failed(format!("Error: failed to start {interpreter}: {e}")),
    };
    debug!(interpreter, pid = child.id(), "snippet process started");

    // Dropping the wait future on timeout drops the child, which kills it.
    let out = match timeout(limit, child.wait_with_output()).await {
        Ok(Ok(out)) => out,
        Ok(Err(e)) => return ExecutionResult::failed(format!("Error: {e}")),
        Err(_) => return ExecutionResult::timed_out(),
    };

    let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
    if !out.status.success() || !stderr.is_empty() {
        if stderr.is_empty() {
            let code = out.status.code().map_or_else(|| "signal".to_string(), |c| c.to_string());
            return ExecutionResult::failed(format!("Error: process exited with status {code}"));
        }
        return ExecutionResult::failed(stderr);
    }

    ExecutionResult::completed(String::from_utf8_lossy(&out.stdout).trim())
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::sandbox::{ExecutionStatus, TIMEOUT_OUTPUT};

    #[tokio::test]
    async fn stdout_is_trimmed() {
        let result = run("sh", "echo '  42 quintals  '", Duration::from_secs(5)).await;
        assert_eq!(result.status, ExecutionStatus::Completed);
        assert_eq!(result.output, "42 quintals");
    }

    #[tokio::test]
    async fn stderr_replaces_stdout() {
        let result = run("sh", "echo partial; echo 'bad input' >&2", Duration::from_secs(5)).await;
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert_eq!(result.output, "bad input");
    }

    #[tokio::test]
    async fn silent_failure_reports_status() {
        let result = run("sh", "exit 3", Duration::from_secs(5)).await;
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert!(result.output.contains("status 3"), "{}", result.output);
    }

    #[tokio::test]
    async fn slow_process_is_killed_at_timeout() {
        let started = Instant::now();
        let result = run("sh", "sleep 5", Duration::from_millis(200)).await;
        assert_eq!(result.output, TIMEOUT_OUTPUT);
        assert_eq!(result.status, ExecutionStatus::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn missing_interpreter_is_rendered() {
        let result = run("/no/such/interpreter", "print(1)", Duration::from_secs(1)).await;
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert!(result.output.starts_with("Error: failed to start"));
    }
}

//! Child process execution

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use crate::env::ExecutionContext;
use crate::error::{CoreError, Result};

/// Outcome of one executed directive.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Exit status of the child.
    pub status: ExitStatus,
    /// Error-stream content, also passed through live to the parent's
    /// stderr while the child runs.
    pub stderr: String,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code; `-1` when the child was terminated by a signal.
    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }
}

/// Run a resolved command with the given argument list and environment.
///
/// The child is spawned directly, never through a shell, so nothing in
/// the argument list is subject to shell interpretation. Its environment
/// is exactly the ExecutionContext. Stdin and stdout are inherited;
/// stderr is streamed through to the parent's stderr and captured for
/// error reporting. Blocks until the child exits; there is no timeout.
pub fn execute(program: &Path, args: &[String], ctx: &ExecutionContext) -> Result<ExecutionResult> {
    let mut child = Command::new(program)
        .args(args)
        .env_clear()
        .envs(ctx.iter())
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| CoreError::ProcessLaunch {
            command: program.display().to_string(),
            source,
        })?;

    let mut captured = String::new();
    if let Some(stderr) = child.stderr.take() {
        let mut reader = BufReader::new(stderr);
        let mut own_stderr = std::io::stderr();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let n = reader.read_until(b'\n', &mut buf)?;
            if n == 0 {
                break;
            }
            own_stderr.write_all(&buf)?;
            captured.push_str(&String::from_utf8_lossy(&buf));
        }
    }

    let status = child.wait()?;
    Ok(ExecutionResult { status, stderr: captured })
}

use crate::utils::error::{HubError, Result};
use std::ffi::OsStr;
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Run an external program to completion, capturing stdout and stderr.
///
/// A missing executable becomes [`HubError::ToolUnavailable`] and a non-zero
/// exit becomes [`HubError::ToolError`] carrying the trimmed stderr.
pub async fn run_tool<I, S>(program: &str, args: I) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_tool_with_input(program, args, None).await
}

/// Same as [`run_tool`], writing `input` to the child's stdin first.
pub async fn run_tool_with_input<I, S>(program: &str, args: I, input: Option<&[u8]>) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::debug!("Running {:?}", command.as_std());

    let mut child = command.spawn().map_err(|source| HubError::ToolUnavailable {
        program: program.to_string(),
        source,
    })?;

    if let (Some(bytes), Some(mut stdin)) = (input, child.stdin.take()) {
        stdin.write_all(bytes).await?;
        // 關閉 stdin 讓子行程讀到 EOF
        drop(stdin);
    }

    let output = child.wait_with_output().await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("exited with {}", output.status)
        } else {
            stderr
        };
        return Err(HubError::ToolError {
            program: program.to_string(),
            message,
        });
    }

    Ok(output)
}

//! Shell tool: run a command through the platform shell.
//!
//! The child is killed if the wall-clock timeout fires (or the future is
//! dropped by the registry's own timeout), and also once either pipe has
//! produced more than the output cap. Commands that would delete an
//! installation or data root are refused before anything is spawned.

use async_trait::async_trait;
use ember_core::error::ToolError;
use ember_core::session::Action;
use ember_core::tool::{Tool, ToolContext, truncate_chars};
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};
use crate::guard::DeletionGuard;

/// UTF-8 worst case, so a pipe cut at the byte limit still holds
/// `max_output_chars` characters.
const BYTES_PER_CHAR: usize = 4;

pub struct ShellTool {
    guard: DeletionGuard,
    timeout: Duration,
    default_cwd: PathBuf,
    max_output_chars: usize,
}

impl ShellTool {
    pub fn new(
        guard: DeletionGuard,
        timeout: Duration,
        default_cwd: PathBuf,
        max_output_chars: usize,
    ) -> Self {
        Self {
            guard,
            timeout,
            default_cwd,
            max_output_chars,
        }
    }
}

/// Read at most `limit` bytes from `pipe`. The flag is set when the pipe
/// had more to give; the pipe is closed either way.
async fn read_capped<R: AsyncRead + Unpin>(
    pipe: Option<R>,
    limit: usize,
) -> std::io::Result<(Vec<u8>, bool)> {
    let Some(pipe) = pipe else {
        return Ok((Vec::new(), false));
    };
    let mut buf = Vec::new();
    pipe.take((limit as u64).saturating_add(1))
        .read_to_end(&mut buf)
        .await?;
    let overflowed = buf.len() > limit;
    buf.truncate(limit);
    Ok((buf, overflowed))
}

struct Captured {
    status: std::process::ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    truncated: bool,
}

/// The directory a `mkdir` in `command` creates, if any.
pub fn created_directory(command: &str) -> Option<String> {
    let mut tokens = command.split_whitespace().skip_while(|t| !t.eq_ignore_ascii_case("mkdir"));
    tokens.next()?;
    tokens
        .find(|t| !t.starts_with('-'))
        .map(|t| t.trim_matches(['"', '\'', ';']).to_string())
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its combined stdout/stderr. Use for running programs, \
         git, package managers and filesystem housekeeping."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "cwd": {
                    "type": "string",
                    "description": "Working directory (optional)"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, arguments: Value, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        let command = arguments["command"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'command' argument".into()))?;
        let cwd = arguments["cwd"]
            .as_str()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.default_cwd.clone());

        self.guard.check_command(self.name(), command, &cwd)?;

        debug!(command = %command, cwd = %cwd.display(), "Executing shell command");
        ctx.record(Action::new("command").with_detail(command)).await;

        let mut child = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        child
            .current_dir(&cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = child.spawn().map_err(|e| {
            ctx.session.log_error(format!("{command}: {e}"));
            ToolError::failed("bash", e)
        })?;

        let limit = self.max_output_chars.saturating_mul(BYTES_PER_CHAR);
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let run = async {
            let stdout = read_capped(stdout, limit);
            let stderr = read_capped(stderr, limit);
            tokio::pin!(stdout, stderr);
            let (mut out, mut err) = (None, None);
            while out.is_none() || err.is_none() {
                let overflowed = tokio::select! {
                    r = &mut stdout, if out.is_none() => out.insert(r?).1,
                    r = &mut stderr, if err.is_none() => err.insert(r?).1,
                };
                if overflowed
                    && let Err(e) = child.start_kill()
                {
                    debug!("Could not stop chatty command: {e}");
                }
            }
            let status = child.wait().await?;
            let (stdout, out_full) = out.unwrap_or_default();
            let (stderr, err_full) = err.unwrap_or_default();
            Ok::<_, std::io::Error>(Captured {
                status,
                stdout,
                stderr,
                truncated: out_full || err_full,
            })
        };

        let output = match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                ctx.session.log_error(format!("{command}: {e}"));
                return Err(ToolError::failed("bash", e));
            }
            Err(_) => {
                ctx.session.log_error(format!("{command}: timed out"));
                return Err(ToolError::Timeout {
                    tool_name: "bash".into(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        let text = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let text = truncate_chars(text.trim(), self.max_output_chars).to_string();

        if output.truncated {
            warn!(command = %command, cap = self.max_output_chars, "Command output capped");
            return Ok(format!(
                "{text}\n[output truncated at {} chars; command stopped]",
                self.max_output_chars
            ));
        }

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            warn!(command = %command, exit_code = code, "Command failed");
            ctx.session.log_error(format!("{command}: exit code {code}"));
            return Err(ToolError::failed("bash", format!("exit code {code}\n{text}")));
        }

        if let Some(dir) = created_directory(command) {
            ctx.session.last_created_path = Some(dir.clone());
            ctx.record(Action::new("created_folder").with_path(dir)).await;
        }

        if text.is_empty() {
            Ok("(command completed, no output)".into())
        } else {
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::session::Session;
    use ember_memory::KvStore;

    fn tool(cwd: &std::path::Path, timeout: Duration) -> ShellTool {
        ShellTool::new(
            DeletionGuard::new(vec![cwd.to_path_buf()]),
            timeout,
            cwd.to_path_buf(),
            1000,
        )
    }

    #[test]
    fn mkdir_target_is_detected() {
        assert_eq!(created_directory("mkdir -p projects/demo"), Some("projects/demo".into()));
        assert_eq!(created_directory("cd x && mkdir \"out\""), Some("out".into()));
        assert_eq!(created_directory("ls -la"), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn execute_echo() {
        let dir = tempfile::tempdir().unwrap();
        let memory = KvStore::ephemeral();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);

        let out = tool(dir.path(), Duration::from_secs(10))
            .execute(serde_json::json!({"command": "echo hello"}), &mut ctx)
            .await
            .unwrap();
        assert_eq!(out, "hello");
        assert_eq!(session.short_term.len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn mkdir_sets_last_created_path() {
        let dir = tempfile::tempdir().unwrap();
        let memory = KvStore::ephemeral();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);

        tool(dir.path(), Duration::from_secs(10))
            .execute(serde_json::json!({"command": "mkdir reports"}), &mut ctx)
            .await
            .unwrap();
        assert!(dir.path().join("reports").is_dir());
        assert_eq!(session.last_created_path.as_deref(), Some("reports"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_an_error_and_logged() {
        let dir = tempfile::tempdir().unwrap();
        let memory = KvStore::ephemeral();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);

        let err = tool(dir.path(), Duration::from_secs(10))
            .execute(serde_json::json!({"command": "echo nope >&2; exit 3"}), &mut ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exit code 3"));
        assert!(err.to_string().contains("nope"));
        assert_eq!(session.errors.len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_command_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let memory = KvStore::ephemeral();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);

        let err = tool(dir.path(), Duration::from_millis(200))
            .execute(serde_json::json!({"command": "sleep 5"}), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn flood_of_output_is_capped_and_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let memory = KvStore::ephemeral();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);

        let out = tool(dir.path(), Duration::from_secs(30))
            .execute(
                serde_json::json!({"command": "head -c 20000000 /dev/zero | tr '\\0' a"}),
                &mut ctx,
            )
            .await
            .unwrap();
        assert!(out.starts_with(&"a".repeat(1000)));
        assert!(out.ends_with("[output truncated at 1000 chars; command stopped]"));
        assert!(out.chars().count() < 1100);
    }

    #[tokio::test]
    async fn deleting_the_root_is_refused_without_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let memory = KvStore::ephemeral();
        let mut session = Session::default();
        let mut ctx = ToolContext::new(&mut session, &memory);

        let command = format!("rm -rf {}", dir.path().display());
        let err = tool(dir.path(), Duration::from_secs(10))
            .execute(serde_json::json!({ "command": command }), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PermissionDenied { .. }));
        assert!(dir.path().exists());
        assert!(session.short_term.is_empty());
    }
}

//! Exec tool: run a command through the platform shell.
//!
//! Supports an allowlist on the program name and a wall-clock timeout.

use async_trait::async_trait;
use modai_core::error::ToolError;
use modai_core::tool::{Arguments, Tool, ToolResult};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::required_str;

pub struct ExecTool {
    /// If non-empty, only these programs may be launched.
    allowed_commands: Vec<String>,
    timeout: Duration,
}

impl ExecTool {
    pub fn new(allowed_commands: Vec<String>, timeout: Duration) -> Self {
        Self {
            allowed_commands,
            timeout,
        }
    }

    fn is_command_allowed(&self, command: &str) -> bool {
        if self.allowed_commands.is_empty() {
            return true;
        }
        let program = command.split_whitespace().next().unwrap_or("");
        self.allowed_commands.iter().any(|a| a == program)
    }

    async fn run(&self, arguments: &Arguments) -> Result<Value, ToolError> {
        let command = required_str(arguments, "command")?;

        if !self.is_command_allowed(command) {
            return Err(ToolError::PermissionDenied {
                tool_name: "exec".into(),
                reason: format!(
                    "'{}' is not in the command allowlist",
                    command.split_whitespace().next().unwrap_or("")
                ),
            });
        }

        debug!(command = %command, "Executing command");

        let mut child = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        child.kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, child.output())
            .await
            .map_err(|_| ToolError::Timeout {
                tool_name: "exec".into(),
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "exec".into(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            warn!(command = %command, exit_code = code, "Command failed");
            return Err(ToolError::ExecutionFailed {
                tool_name: "exec".into(),
                reason: if stderr.is_empty() {
                    format!("exit code {code}")
                } else {
                    format!("exit code {code}: {stderr}")
                },
            });
        }

        Ok(json!({ "stdout": stdout, "stderr": stderr }))
    }
}

#[async_trait]
impl Tool for ExecTool {
    fn name(&self) -> &str {
        "exec"
    }

    fn description(&self) -> &str {
        "Run a shell command and return its stdout and stderr."
    }

    fn example(&self) -> Value {
        json!({ "command": "ls -la" })
    }

    async fn execute(&self, arguments: &Arguments) -> Result<ToolResult, ToolError> {
        Ok(self.run(arguments).await.into())
    }
}

//! A plugin executed as a child process.
//!
//! The directive's arguments are written to the child's stdin as one JSON
//! object. Whatever the child prints on stdout becomes the result: a
//! `{"success":..}` object is taken as a full result, any other JSON is
//! the payload, and plain text is passed through as a string.

use async_trait::async_trait;
use modai_core::error::ToolError;
use modai_core::tool::{Arguments, Tool, ToolResult};
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::manifest::PluginManifest;

pub struct CommandTool {
    manifest: PluginManifest,
    program: PathBuf,
}

impl CommandTool {
    /// `program` is the located entry point for `manifest`.
    pub fn new(manifest: PluginManifest, program: PathBuf) -> Self {
        Self { manifest, program }
    }

    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    fn failed(&self, reason: impl Into<String>) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: self.manifest.name.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Tool for CommandTool {
    fn name(&self) -> &str {
        &self.manifest.name
    }

    fn description(&self) -> &str {
        &self.manifest.description
    }

    fn example(&self) -> Value {
        self.manifest.example.clone()
    }

    async fn execute(&self, arguments: &Arguments) -> Result<ToolResult, ToolError> {
        let input = serde_json::to_vec(arguments).map_err(|e| self.failed(e.to_string()))?;

        let mut child = Command::new(&self.program)
            .args(&self.manifest.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.failed(format!("failed to start {}: {e}", self.program.display())))?;

        let stdin = child.stdin.take();
        let name = &self.manifest.name;
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // A plugin that ignores its input may close stdin early.
                if let Err(e) = stdin.write_all(&input).await {
                    debug!(plugin = %name, error = %e, "Plugin did not read its input");
                }
            }
        };

        // Feeding stdin counts against the timeout.
        let timeout_secs = self.manifest.timeout_secs;
        let (_, output) = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            async move { tokio::join!(feed, child.wait_with_output()) },
        )
        .await
        .map_err(|_| ToolError::Timeout {
            tool_name: self.manifest.name.clone(),
            timeout_secs,
        })?;
        let output = output.map_err(|e| self.failed(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            warn!(plugin = %self.manifest.name, exit_code = code, "Plugin failed");
            let detail = if stderr.is_empty() { &stdout } else { &stderr };
            return Ok(ToolResult::failure(if detail.is_empty() {
                format!("exit code {code}")
            } else {
                format!("exit code {code}: {detail}")
            }));
        }

        Ok(interpret_stdout(&stdout))
    }
}

fn interpret_stdout(stdout: &str) -> ToolResult {
    match serde_json::from_str::<Value>(stdout) {
        Ok(value) if value.get("success").is_some_and(Value::is_boolean) => {
            serde_json::from_value::<ToolResult>(value.clone())
                .unwrap_or_else(|_| ToolResult::ok(value))
        }
        Ok(value) => ToolResult::ok(value),
        Err(_) => ToolResult::ok(stdout),
    }
}

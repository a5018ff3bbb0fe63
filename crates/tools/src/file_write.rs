//! write_file: create or overwrite a file, subject to the path guard.

use async_trait::async_trait;
use modai_core::error::ToolError;
use modai_core::tool::{Arguments, Tool, ToolResult};
use serde_json::{Value, json};

use crate::path::PathGuard;
use crate::required_str;

pub struct FileWriteTool {
    guard: PathGuard,
}

impl FileWriteTool {
    pub fn new(guard: PathGuard) -> Self {
        Self { guard }
    }

    async fn run(&self, arguments: &Arguments) -> Result<Value, ToolError> {
        let path = required_str(arguments, "path")?;
        let content = required_str(arguments, "content")?;

        let resolved = self
            .guard
            .check(path)
            .map_err(|e| ToolError::PermissionDenied {
                tool_name: "write_file".into(),
                reason: e.to_string(),
            })?;

        let failed = |what: &str, e: std::io::Error| ToolError::ExecutionFailed {
            tool_name: "write_file".into(),
            reason: format!("Failed to {what}: {e}"),
        };

        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| failed("create directory", e))?;
        }
        tokio::fs::write(&resolved, content)
            .await
            .map_err(|e| failed("write file", e))?;

        Ok(json!({ "path": resolved.to_string_lossy(), "bytes": content.len() }))
    }
}

impl Default for FileWriteTool {
    fn default() -> Self {
        Self::new(PathGuard::permissive())
    }
}

#[async_trait]
impl Tool for FileWriteTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write text to a file, creating parent directories and replacing any existing content."
    }

    fn example(&self) -> Value {
        json!({ "path": "notes/todo.md", "content": "- ship it" })
    }

    async fn execute(&self, arguments: &Arguments) -> Result<ToolResult, ToolError> {
        Ok(self.run(arguments).await.into())
    }
}

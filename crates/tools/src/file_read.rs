//! read_file: return a file's contents, subject to the path guard.

use async_trait::async_trait;
use modai_core::error::ToolError;
use modai_core::tool::{Arguments, Tool, ToolResult};
use serde_json::{Value, json};

use crate::path::PathGuard;
use crate::required_str;

pub struct FileReadTool {
    guard: PathGuard,
}

impl FileReadTool {
    pub fn new(guard: PathGuard) -> Self {
        Self { guard }
    }

    async fn run(&self, arguments: &Arguments) -> Result<Value, ToolError> {
        let path = required_str(arguments, "path")?;
        let resolved = self
            .guard
            .check(path)
            .map_err(|e| ToolError::PermissionDenied {
                tool_name: "read_file".into(),
                reason: e.to_string(),
            })?;

        let content = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "read_file".into(),
                reason: format!("Failed to read {path}: {e}"),
            })?;

        Ok(Value::String(content))
    }
}

impl Default for FileReadTool {
    fn default() -> Self {
        Self::new(PathGuard::permissive())
    }
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a text file at the given path."
    }

    fn example(&self) -> Value {
        json!({ "path": "src/main.rs" })
    }

    async fn execute(&self, arguments: &Arguments) -> Result<ToolResult, ToolError> {
        Ok(self.run(arguments).await.into())
    }
}

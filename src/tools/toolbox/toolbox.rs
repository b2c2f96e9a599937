use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    tools::{Tool, ToolError},
    utils::helper::normalize_tool_name,
};

#[async_trait]
pub trait Toolbox: Send + Sync {
    fn name(&self) -> String;

    /// Tools keyed by their normalized name.
    fn get_tools(&self) -> HashMap<&str, &dyn Tool>;

    fn get_tool(&self, tool_name: &str) -> Result<&dyn Tool, ToolError> {
        let tool_name = normalize_tool_name(tool_name);

        self.get_tools()
            .get(tool_name.as_str())
            .copied()
            .ok_or(ToolError::ToolNotFound(tool_name))
    }

    async fn call_tool(&self, tool_name: &str, input: Value) -> Result<String, ToolError> {
        let tool = self.get_tool(tool_name)?;
        log::debug!("Calling tool {} from toolbox {}", tool.name(), self.name());

        tool.call(input).await
    }

    /// Plain text descriptions of every tool, sorted by name.
    fn describe(&self) -> String {
        let tools = self.get_tools();
        let mut names = tools.keys().copied().collect::<Vec<_>>();
        names.sort_unstable();

        names
            .into_iter()
            .filter_map(|name| tools.get(name))
            .map(|tool| tool.to_plain_description())
            .collect::<Vec<_>>()
            .join("\n---\n")
    }
}

use std::{sync::OnceLock, thread};

use async_openai::types::{
    ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolType, FunctionObjectArgs,
};
use async_trait::async_trait;
use indoc::formatdoc;
use schemars::{schema::RootSchema, schema_for};
use serde_json::Value;
use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

use crate::{tools::DefaultToolInput, utils::helper::normalize_tool_name};

use super::ToolError;

static BLOCKING_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Runtime shared by every blocking [`Tool::invoke`] call, so pooled HTTP
/// connections outlive a single invocation.
fn blocking_runtime() -> Result<&'static Runtime, ToolError> {
    if let Some(runtime) = BLOCKING_RUNTIME.get() {
        return Ok(runtime);
    }

    let runtime = Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("research-tools-blocking")
        .enable_all()
        .build()
        .map_err(ToolError::Runtime)?;

    Ok(BLOCKING_RUNTIME.get_or_init(move || runtime))
}

#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the name of the tool.
    fn name(&self) -> String;

    /// Provides a description of what the tool does and when to use it.
    fn description(&self) -> String;

    /// JSON schema for the tool input parameters.
    ///
    /// If not implemented, it will default to
    /// ```json
    /// {
    ///     "type": "object",
    ///     "properties": {
    ///         "query": {
    ///             "type": "string",
    ///             "description": "The query to look up"
    ///         }
    ///     },
    ///     "required": ["query"]
    /// }
    /// ```
    fn parameters(&self) -> RootSchema {
        schema_for!(DefaultToolInput)
    }

    /// Value for `strict` in the OpenAI function call
    ///
    /// If not implemented, it will default to `false`
    fn strict(&self) -> bool {
        false
    }

    /// Runs the tool for a single query without blocking the caller.
    async fn invoke_async(&self, query: &str) -> Result<String, ToolError>;

    /// Blocking variant of [`Tool::invoke_async`].
    ///
    /// Callable from plain threads as well as from tasks of a running tokio runtime.
    fn invoke(&self, query: &str) -> Result<String, ToolError> {
        let future = self.invoke_async(query);

        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            // A current-thread runtime cannot be blocked in place, so the
            // future runs on the shared runtime from a separate thread.
            Ok(_) => {
                let runtime = blocking_runtime()?;
                thread::scope(|scope| {
                    scope
                        .spawn(|| runtime.block_on(future))
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
            }
            Err(_) => blocking_runtime()?.block_on(future),
        }
    }

    /// Entry point used by agents: parses the raw input and runs the tool.
    async fn call(&self, input: Value) -> Result<String, ToolError> {
        let input = DefaultToolInput::from_value(input)?;
        self.invoke_async(&input.query).await
    }

    fn to_plain_description(&self) -> String {
        let parameters = serde_json::to_string(&self.parameters().schema).unwrap_or_else(|e| {
            log::warn!(
                "Failed to describe parameters for tool {}: {e}",
                self.name()
            );
            String::new()
        });

        formatdoc! {"
            > {}: {}
            <INPUT_FORMAT>
            {}
            </INPUT_FORMAT>",
            normalize_tool_name(&self.name()),
            self.description(),
            parameters
        }
    }

    fn as_openai_tool(&self) -> ChatCompletionTool {
        let parameters = serde_json::to_value(self.parameters()).unwrap_or_else(|e| {
            log::warn!(
                "Failed to serialize parameters for tool {}: {e}",
                self.name(),
            );
            Value::Null
        });

        let tool = FunctionObjectArgs::default()
            .name(normalize_tool_name(&self.name()))
            .description(self.description())
            .parameters(parameters)
            .strict(self.strict())
            .build()
            .unwrap_or_else(|e| unreachable!("All fields must be set: {}", e));

        ChatCompletionToolArgs::default()
            .r#type(ChatCompletionToolType::Function)
            .function(tool)
            .build()
            .unwrap_or_else(|e| unreachable!("All fields must be set: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> String {
            "Echo Tool".into()
        }

        fn description(&self) -> String {
            "Repeats the query".into()
        }

        async fn invoke_async(&self, query: &str) -> Result<String, ToolError> {
            Ok(format!("echo: {query}"))
        }
    }

    #[tokio::test]
    async fn test_call_parses_input() {
        let result = Echo.call(json!({ "query": "hi" })).await.unwrap();
        assert_eq!(result, "echo: hi");

        let result = Echo.call(json!("raw")).await.unwrap();
        assert_eq!(result, "echo: raw");
    }

    #[tokio::test]
    async fn test_call_rejects_bad_input() {
        let result = Echo.call(json!({ "unexpected": 1 })).await;
        assert!(matches!(result, Err(ToolError::InputParseError(_))));
    }

    #[test]
    fn test_blocking_invoke() {
        assert_eq!(Echo.invoke("sync").unwrap(), "echo: sync");
        assert_eq!(Echo.invoke("again").unwrap(), "echo: again");
    }

    #[tokio::test]
    async fn test_blocking_invoke_on_current_thread_runtime() {
        assert_eq!(Echo.invoke("inside").unwrap(), "echo: inside");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_blocking_invoke_on_multi_thread_runtime() {
        assert_eq!(Echo.invoke("inside").unwrap(), "echo: inside");
    }

    #[test]
    fn test_plain_description() {
        let description = Echo.to_plain_description();
        assert!(description.starts_with("> echo_tool: Repeats the query\n<INPUT_FORMAT>\n"));
        assert!(description.contains("\"query\""));
        assert!(description.ends_with("</INPUT_FORMAT>"));
    }

    #[test]
    fn test_as_openai_tool() {
        let tool = Echo.as_openai_tool();
        assert_eq!(tool.function.name, "echo_tool");
        assert_eq!(tool.function.description.as_deref(), Some("Repeats the query"));
        assert_eq!(tool.function.strict, Some(false));
    }
}

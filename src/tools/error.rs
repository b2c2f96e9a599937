use thiserror::Error;

use crate::tools::search::ProviderError;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Input parsing error: {0}")]
    InputParseError(#[from] serde_json::Error),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Failed to start the blocking runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl ToolError {
    /// The provider failure behind this error, if any.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            ToolError::Provider(error) => Some(error),
            _ => None,
        }
    }
}

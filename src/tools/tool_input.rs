use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[schemars(description = "The input for the tool")]
pub struct DefaultToolInput {
    #[serde(alias = "input")]
    #[schemars(description = "The query to look up")]
    pub query: String,
}

impl DefaultToolInput {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }

    /// Parses the input, which could be a JSON object or a raw string, depending on the LLM model.
    pub fn from_value(input: Value) -> Result<Self, serde_json::Error> {
        if let Ok(result) = serde_json::from_value::<DefaultToolInput>(input.clone()) {
            return Ok(result);
        }

        let query = serde_json::from_value::<String>(input)?;
        Ok(Self { query })
    }
}

impl From<String> for DefaultToolInput {
    fn from(query: String) -> Self {
        Self { query }
    }
}

impl From<&str> for DefaultToolInput {
    fn from(query: &str) -> Self {
        Self::new(query)
    }
}

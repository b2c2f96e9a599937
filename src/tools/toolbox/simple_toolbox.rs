use std::collections::HashMap;

use crate::{
    tools::{Arxiv, DuckDuckGoSearch, SearchAdapter, Tool, Wikipedia},
    utils::helper::normalize_tool_name,
};

use super::Toolbox;

pub struct SimpleToolbox {
    name: String,
    tools: HashMap<String, Box<dyn Tool>>,
}

impl SimpleToolbox {
    /// Registers `tools` under their normalized names; a later tool with the same name wins.
    pub fn new<S>(name: S, tools: Vec<Box<dyn Tool>>) -> Self
    where
        S: Into<String>,
    {
        Self {
            name: name.into(),
            tools: tools
                .into_iter()
                .map(|tool| (normalize_tool_name(&tool.name()), tool))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Toolbox for SimpleToolbox {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn get_tools(&self) -> HashMap<&str, &dyn Tool> {
        self.tools
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_ref()))
            .collect()
    }
}

/// Web search, arXiv and Wikipedia, configured the way a chat-with-search agent uses them:
/// five search hits, and a single short summary from each lookup tool.
pub fn research_toolbox() -> SimpleToolbox {
    SimpleToolbox::new(
        "research",
        vec![
            Box::new(SearchAdapter::new(
                DuckDuckGoSearch::default().with_max_results(5),
            )) as Box<dyn Tool>,
            Box::new(
                Arxiv::default()
                    .with_top_k_results(1)
                    .with_doc_content_chars_max(200),
            ) as Box<dyn Tool>,
            Box::new(
                Wikipedia::default()
                    .with_top_k_results(1)
                    .with_doc_content_chars_max(200),
            ) as Box<dyn Tool>,
        ],
    )
}

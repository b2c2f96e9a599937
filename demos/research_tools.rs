use research_tools::tools::{research_toolbox, Toolbox};
use serde_json::json;

#[tokio::main]
async fn main() {
    let query = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let query = if query.is_empty() {
        "What is machine learning?".to_string()
    } else {
        query
    };

    let toolbox = research_toolbox();
    println!("{}\n", toolbox.describe());

    for tool in ["Search", "arxiv", "wikipedia"] {
        match toolbox.call_tool(tool, json!({ "query": query })).await {
            Ok(result) => println!("[{tool}]\n{result}\n"),
            Err(e) => eprintln!("[{tool}] failed: {e}\n"),
        }
    }
}

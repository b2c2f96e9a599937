mod duckduckgo_search;
pub use duckduckgo_search::*;

mod options;
pub use options::*;

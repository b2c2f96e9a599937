mod adapter;
pub use adapter::*;

mod article;
pub use article::*;

mod error;
pub use error::*;

mod provider;
pub use provider::*;

mod duckduckgo;
pub use duckduckgo::*;

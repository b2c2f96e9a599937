mod tool;
pub use tool::*;

mod toolbox;
pub use toolbox::*;

mod tool_input;
pub use tool_input::*;

mod search;
pub use search::*;

mod arxiv;
pub use arxiv::*;

mod wikipedia;
pub use wikipedia::*;

mod error;
pub use error::*;

mod wikipedia;
pub use wikipedia::*;

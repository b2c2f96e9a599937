mod arxiv;
pub use arxiv::*;

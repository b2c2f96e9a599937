mod toolbox;
pub use toolbox::*;

mod simple_toolbox;
pub use simple_toolbox::*;

pub mod tools;
pub extern crate url;

pub(crate) mod utils;

pub mod catalog_config;
pub mod source_config;

pub use catalog_config::*;
pub use source_config::*;

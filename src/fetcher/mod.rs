pub mod aggregator;
pub mod http_source;
pub mod json_path;
pub mod source;

pub use aggregator::*;
pub use http_source::*;
pub use source::*;

pub mod clustering;
pub mod presenter;
pub mod quantity_extractor;
pub mod record_mapper;
pub mod similarity;
pub mod text_normalizer;

pub use clustering::*;
pub use presenter::*;
pub use quantity_extractor::*;
pub use record_mapper::*;
pub use text_normalizer::*;

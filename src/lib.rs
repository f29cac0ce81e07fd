pub mod harvest;
pub mod model;

// Re-export common types for convenience
pub use harvest::{
    collect_all_caption_data, CaptionCollector, CaptionExtractor, CollectionStats,
    ExtractionError, Extractor,
};
pub use model::CaptionMapping;

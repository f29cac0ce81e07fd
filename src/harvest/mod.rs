//! Harvest module - caption extraction and collection.
//!
//! This module provides the core abstractions for the caption harvester:
//! - **Traits**: [`CaptionExtractor`], the contract every source format implements
//! - **Formats**: spreadsheet, CSV and JSON record extractors behind [`Extractor`]
//! - **Errors**: [`ExtractionError`], contained at the per-file boundary
//! - **Collector**: directory walk and merge via [`collector::CaptionCollector`]

pub mod collector;
pub mod formats;
pub mod traits;

// Re-export commonly used types
pub use traits::{
    image_path, passes_validation, strip_variant_suffix, CaptionExtractor, ExtractionError,
};

pub use formats::{DelimitedExtractor, Extractor, RecordExtractor, SpreadsheetExtractor};

pub use collector::{collect_all_caption_data, CaptionCollector, CollectionStats, Route};

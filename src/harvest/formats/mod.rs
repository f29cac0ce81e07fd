//! Caption source format implementations.
//!
//! - `spreadsheet` - XLSX workbooks (image name, caption columns)
//! - `delimited` - CSV files with `caption_id`/`bengali_caption` columns
//! - `records` - JSON arrays of `filename`/`caption` records
//!
//! Each format keeps its own caption formatting; the marker spacing differs
//! between sources and downstream consumers rely on it.

pub mod delimited;
pub mod records;
pub mod spreadsheet;

use std::path::Path;

use crate::harvest::traits::{CaptionExtractor, ExtractionError};
use crate::model::CaptionMapping;

pub use delimited::DelimitedExtractor;
pub use records::RecordExtractor;
pub use spreadsheet::SpreadsheetExtractor;

/// The closed set of supported caption extractors.
#[derive(Debug, Clone, Copy)]
pub enum Extractor {
    Spreadsheet(SpreadsheetExtractor),
    Delimited(DelimitedExtractor),
    Records(RecordExtractor),
}

impl Extractor {
    fn inner(&self) -> &dyn CaptionExtractor {
        match self {
            Extractor::Spreadsheet(e) => e,
            Extractor::Delimited(e) => e,
            Extractor::Records(e) => e,
        }
    }
}

impl CaptionExtractor for Extractor {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn default_validate_images(&self) -> bool {
        self.inner().default_validate_images()
    }

    fn extract_into(
        &self,
        source: &Path,
        image_root: &Path,
        validate_images: bool,
        mapping: &mut CaptionMapping,
    ) -> Result<(), ExtractionError> {
        self.inner()
            .extract_into(source, image_root, validate_images, mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_delegation() {
        let header = Extractor::Spreadsheet(SpreadsheetExtractor::new(true));
        let csv = Extractor::Delimited(DelimitedExtractor);
        let json = Extractor::Records(RecordExtractor);

        assert_eq!(header.name(), "xlsx");
        assert_eq!(csv.name(), "csv");
        assert_eq!(json.name(), "json");

        assert!(!header.default_validate_images());
        assert!(csv.default_validate_images());
        assert!(json.default_validate_images());
    }
}

//! Core traits and types for caption extraction.
//!
//! This module defines the contract every caption source implements:
//! - Extraction via [`CaptionExtractor`]
//! - Standardized failure taxonomy via [`ExtractionError`]
//! - Image-name helpers shared by the format implementations

use std::path::Path;
use thiserror::Error;
use tracing::error;

use crate::model::CaptionMapping;

// ============================================================================
// Extractor Trait
// ============================================================================

/// Abstraction over caption source formats (spreadsheet, CSV, JSON records).
///
/// Each format implements the fallible [`CaptionExtractor::extract_into`]
/// pass. The provided [`CaptionExtractor::extract`] wraps it and never fails:
/// errors are logged and whatever was collected before the failure is
/// returned.
///
/// # Idempotence
///
/// Implementations hold only configuration, so extracting the same file with
/// the same arguments always yields the same mapping.
pub trait CaptionExtractor: Send + Sync {
    /// Returns the identifier for this format.
    ///
    /// Examples: `"xlsx"`, `"csv"`, `"json"`
    fn name(&self) -> &str;

    /// Whether image existence is checked when the caller has no preference.
    fn default_validate_images(&self) -> bool;

    /// Parses `source` and adds its entries to `mapping`.
    ///
    /// # Arguments
    ///
    /// * `source` - Path to one file in this extractor's format
    /// * `image_root` - Directory prepended to raw image names; empty means the
    ///   raw name is used unmodified
    /// * `validate_images` - Keep only entries whose image path exists
    /// * `mapping` - Destination; entries added before an error are kept
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] if the file cannot be opened or its
    /// structure cannot be parsed.
    fn extract_into(
        &self,
        source: &Path,
        image_root: &Path,
        validate_images: bool,
        mapping: &mut CaptionMapping,
    ) -> Result<(), ExtractionError>;

    /// Extracts the image → captions mapping from `source`.
    ///
    /// Recoverable failures are reported through `tracing` and the partial
    /// (possibly empty) mapping is returned.
    fn extract(&self, source: &Path, image_root: &Path, validate_images: bool) -> CaptionMapping {
        let mut mapping = CaptionMapping::new();
        if let Err(e) = self.extract_into(source, image_root, validate_images, &mut mapping) {
            error!(
                format = self.name(),
                file = %source.display(),
                entries = mapping.len(),
                "Extraction failed: {}",
                e
            );
        }
        mapping
    }

    /// Same as [`CaptionExtractor::extract`] using this format's default for
    /// image validation.
    fn extract_with_defaults(&self, source: &Path, image_root: &Path) -> CaptionMapping {
        self.extract(source, image_root, self.default_validate_images())
    }
}

// ============================================================================
// Image Name Helpers
// ============================================================================

/// Drops the `#<index>` caption-variant suffix from a raw image name.
///
/// `"photo.jpg#3"` becomes `"photo.jpg"`; names without `#` are unchanged.
pub fn strip_variant_suffix(name: &str) -> &str {
    match name.find('#') {
        Some(pos) => &name[..pos],
        None => name,
    }
}

/// Builds the mapping key for `name` under `image_root`.
///
/// An empty root yields the name itself. An absolute `name` replaces the root,
/// as with [`Path::join`].
pub fn image_path(image_root: &Path, name: &str) -> String {
    if image_root.as_os_str().is_empty() {
        name.to_string()
    } else {
        image_root.join(name).to_string_lossy().into_owned()
    }
}

/// Whether an entry for `image_path` may be kept.
///
/// The filesystem is only consulted when `validate_images` is set.
pub fn passes_validation(image_path: &str, validate_images: bool) -> bool {
    !validate_images || Path::new(image_path).exists()
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that end the extraction of a single file.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// File missing or unreadable
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Not a valid zip container, or a corrupt entry
    #[error("Invalid spreadsheet container: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// XML inside the container could not be read
    #[error("XML parsing failed: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Delimited text could not be read
    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    /// Record file is not valid JSON
    #[error("Invalid JSON format: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected part is absent from the container
    #[error("Missing required part: {0}")]
    MissingPart(String),

    /// File parsed but has the wrong shape
    #[error("Malformed content: {0}")]
    Malformed(String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct FailingExtractor;

    impl CaptionExtractor for FailingExtractor {
        fn name(&self) -> &str {
            "failing"
        }

        fn default_validate_images(&self) -> bool {
            false
        }

        fn extract_into(
            &self,
            _source: &Path,
            _image_root: &Path,
            _validate_images: bool,
            mapping: &mut CaptionMapping,
        ) -> Result<(), ExtractionError> {
            mapping.push_caption("kept.jpg", "<start> partial <end>".to_string());
            Err(ExtractionError::Malformed("broken halfway".to_string()))
        }
    }

    #[test]
    fn test_strip_variant_suffix() {
        assert_eq!(strip_variant_suffix("photo1.jpg#1"), "photo1.jpg");
        assert_eq!(strip_variant_suffix("photo1.jpg#1#2"), "photo1.jpg");
        assert_eq!(strip_variant_suffix("photo1.jpg"), "photo1.jpg");
        assert_eq!(strip_variant_suffix("#0"), "");
    }

    #[test]
    fn test_image_path_with_empty_root() {
        assert_eq!(image_path(Path::new(""), "a.jpg"), "a.jpg");
    }

    #[test]
    fn test_image_path_joins_root() {
        let joined = image_path(Path::new("/data/images"), "a.jpg");
        assert_eq!(Path::new(&joined), Path::new("/data/images/a.jpg"));
    }

    #[test]
    fn test_passes_validation() {
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("present.jpg");
        std::fs::write(&present, b"jpg").unwrap();
        let present = present.to_string_lossy().into_owned();
        let missing = dir.path().join("missing.jpg").to_string_lossy().into_owned();

        assert!(passes_validation(&present, true));
        assert!(!passes_validation(&missing, true));
        assert!(passes_validation(&missing, false));
    }

    #[test]
    fn test_extract_returns_partial_mapping_on_error() {
        let mapping = FailingExtractor.extract(Path::new("any"), Path::new(""), false);
        assert_eq!(mapping.len(), 1);
        assert!(mapping.contains("kept.jpg"));
    }
}
